//! Request forwarding to the selected upstream.
//!
//! # Responsibilities
//! - Rewrite scheme, authority and path of the inbound target
//! - Copy end-to-end request headers
//! - Perform the outbound call and buffer the body
//!
//! # Design Decisions
//! - One shared `reqwest::Client`; connection reuse is the client's business
//! - No retries: a transport failure is reported once
//! - Redirects are passed back to the caller, not followed
//! - The request future owns the outbound call, so a client disconnect that
//!   drops the handler also aborts the upstream request

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::upstream::{FirstUpstream, Upstream, UpstreamPolicy};

/// Hop-by-hop headers (RFC 9110 §7.6.1), never forwarded in either direction.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Header names a message nominates as hop-by-hop through its `Connection`
/// header (RFC 9110 §7.6.1).
fn connection_options(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

/// The end-to-end headers of a message: static hop-by-hop names and those
/// listed in `Connection` are skipped.
pub fn end_to_end_headers<'a>(
    headers: &'a HeaderMap,
) -> impl Iterator<Item = (&'a HeaderName, &'a HeaderValue)> + 'a {
    let nominated = connection_options(headers);
    headers
        .iter()
        .filter(move |(name, _)| !is_hop_by_hop(name) && !nominated.contains(*name))
}

/// Forwards inbound requests to an upstream chosen by an [`UpstreamPolicy`].
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    upstreams: Arc<[Upstream]>,
    policy: Arc<dyn UpstreamPolicy>,
    max_body_bytes: usize,
}

impl Forwarder {
    /// Build a forwarder from validated configuration.
    ///
    /// Every upstream address is parsed here, so a bad address surfaces as
    /// [`ProxyError::Configuration`] before any network traffic.
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let upstreams = config
            .upstreams
            .iter()
            .map(|address| Upstream::parse(address))
            .collect::<Result<Vec<_>>>()?;
        if upstreams.is_empty() {
            return Err(ProxyError::Configuration(
                "at least one upstream must be configured".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            upstreams: upstreams.into(),
            policy: Arc::new(FirstUpstream),
            max_body_bytes: config.limits.max_upstream_body_bytes,
        })
    }

    /// Replace the upstream selection policy.
    pub fn with_policy(mut self, policy: Arc<dyn UpstreamPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn upstreams(&self) -> &[Upstream] {
        &self.upstreams
    }

    /// Largest body [`UpstreamResponse::read_body`] will accept.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Send the inbound request to the selected upstream.
    pub async fn forward(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> Result<UpstreamResponse> {
        let upstream = self
            .policy
            .pick_upstream(&self.upstreams)
            .ok_or(ProxyError::NoUpstream)?
            .clone();
        let target = upstream.target_url(uri.path(), uri.query())?;

        tracing::debug!(
            upstream = %upstream,
            target = %target,
            method = %method,
            "Forwarding request"
        );

        let response = self
            .client
            .request(method.clone(), target)
            .headers(outbound_headers(headers))
            .send()
            .await
            .map_err(ProxyError::UpstreamUnavailable)?;

        Ok(UpstreamResponse { upstream, response })
    }
}

/// Response from an upstream, body not yet read.
#[derive(Debug)]
pub struct UpstreamResponse {
    upstream: Upstream,
    response: reqwest::Response,
}

impl UpstreamResponse {
    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Read the whole body, refusing anything larger than `limit` bytes.
    ///
    /// Returns the status and headers alongside the buffered body; the
    /// underlying connection is released once this returns.
    pub async fn read_body(self, limit: usize) -> Result<(StatusCode, HeaderMap, Bytes)> {
        let mut response = self.response;
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(ProxyError::BodyTooLarge { limit });
        }

        let status = response.status();
        let headers = std::mem::take(response.headers_mut());

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(ProxyError::BodyRead)? {
            if body.len() + chunk.len() > limit {
                return Err(ProxyError::BodyTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok((status, headers, Bytes::from(body)))
    }
}

/// Headers sent upstream: everything end-to-end except `host`, which the
/// client derives from the target URL, and `accept-encoding`, because a
/// compressed Bundle could not be rewritten.
fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in end_to_end_headers(inbound) {
        if name == header::HOST
            || name == header::ACCEPT_ENCODING
            || name == header::CONTENT_LENGTH
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
