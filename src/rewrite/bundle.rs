//! Bundle body rewriting.
//!
//! # Responsibilities
//! - Leave single-resource responses byte-identical
//! - Rewrite `entry[].fullUrl` and `link[].url` of Bundle responses so they
//!   point at the proxy
//! - Keep every other member of the document as it was, in order

use axum::body::Bytes;
use serde_json::{Map, Value};
use url::Url;

use crate::config::validation::parse_public_origin;
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::rewrite::{server_to_proxy_url, RewriteError};

/// Result of a rewrite: either the original bytes or a new document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewritten {
    /// Body returned as received.
    Unchanged(Bytes),
    /// Re-serialized Bundle and the number of URLs that were translated.
    Rewritten { body: Bytes, urls: usize },
}

impl Rewritten {
    pub fn into_body(self) -> Bytes {
        match self {
            Rewritten::Unchanged(body) | Rewritten::Rewritten { body, .. } => body,
        }
    }

    /// Metric label for this outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            Rewritten::Unchanged(_) => "passthrough",
            Rewritten::Rewritten { .. } => "rewritten",
        }
    }
}

/// Rewrites upstream URLs in Bundle documents to the proxy's origin.
#[derive(Debug, Clone)]
pub struct BundleRewriter {
    origin: Url,
}

impl BundleRewriter {
    /// Rewriter targeting `origin` (`scheme://host:port/`).
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }

    /// Rewriter for a plain-HTTP proxy reachable at `proxy_address` (host:port).
    pub fn for_address(proxy_address: &str) -> Result<Self, ProxyError> {
        parse_public_origin("http", proxy_address)
            .map(Self::new)
            .map_err(|reason| ProxyError::Configuration(format!("{proxy_address}: {reason}")))
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let address = config.public_address();
        parse_public_origin(&config.listener.public_scheme, address)
            .map(Self::new)
            .map_err(|reason| ProxyError::Configuration(format!("{address}: {reason}")))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Rewrite `body` if it answers a bundle request.
    ///
    /// When `is_bundle_request` is false the body is never looked at. Empty
    /// bodies (HEAD, 304) and valid JSON that is not a Bundle (e.g. an
    /// `OperationOutcome`) are also returned unchanged.
    pub fn rewrite(&self, body: Bytes, is_bundle_request: bool) -> Result<Rewritten, RewriteError> {
        if !is_bundle_request || body.is_empty() {
            return Ok(Rewritten::Unchanged(body));
        }

        let mut document: Map<String, Value> = serde_json::from_slice(&body)?;
        match document.get("resourceType").and_then(Value::as_str) {
            Some("Bundle") => {}
            other => {
                tracing::debug!(
                    resource_type = other.unwrap_or("<none>"),
                    "Bundle request answered with another resource, passing through"
                );
                return Ok(Rewritten::Unchanged(body));
            }
        }

        let urls = self.rewrite_members(&mut document, "entry", "fullUrl")?
            + self.rewrite_members(&mut document, "link", "url")?;

        let body = serde_json::to_vec(&document).map_err(RewriteError::Serialization)?;
        Ok(Rewritten::Rewritten {
            body: Bytes::from(body),
            urls,
        })
    }

    /// Rewrite `document[array][*][field]` in place, returning how many
    /// URLs were translated. Missing, empty and authority-less values are
    /// skipped and not counted.
    fn rewrite_members(
        &self,
        document: &mut Map<String, Value>,
        array: &str,
        field: &str,
    ) -> Result<usize, RewriteError> {
        let items = match document.get_mut(array) {
            None | Some(Value::Null) => return Ok(0),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(RewriteError::Shape(format!("`{array}` is not an array"))),
        };

        let mut rewritten = 0;
        for (index, item) in items.iter_mut().enumerate() {
            let item = item.as_object_mut().ok_or_else(|| {
                RewriteError::Shape(format!("`{array}[{index}]` is not an object"))
            })?;
            match item.get_mut(field) {
                None | Some(Value::Null) => {}
                Some(Value::String(url)) if url.is_empty() => {}
                Some(Value::String(url)) => {
                    if let Some(translated) = server_to_proxy_url(url, &self.origin)? {
                        *url = translated;
                        rewritten += 1;
                    }
                }
                Some(_) => {
                    return Err(RewriteError::Shape(format!(
                        "`{array}[{index}].{field}` is not a string"
                    )))
                }
            }
        }
        Ok(rewritten)
    }
}
