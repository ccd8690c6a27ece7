//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener, drain on shutdown
//! - Forward each request upstream, rewrite Bundle bodies, copy headers
//! - Turn per-request failures into 5xx responses

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{request::Parts, Method, Request},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::{request_id, RequestIdGenerator};
use crate::http::response::build_response;
use crate::observability::metrics;
use crate::rewrite::{is_collection_path, BundleRewriter};
use crate::upstream::{FirstUpstream, Forwarder, UpstreamPolicy};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub rewriter: Arc<BundleRewriter>,
}

/// HTTP server for the FHIR proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails with [`ProxyError::Configuration`] when an upstream or the
    /// public address cannot be used; nothing touches the network here.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        Self::with_policy(config, Arc::new(FirstUpstream))
    }

    /// Like [`HttpServer::new`] with a custom upstream selection policy.
    pub fn with_policy(
        config: ProxyConfig,
        policy: Arc<dyn UpstreamPolicy>,
    ) -> Result<Self, ProxyError> {
        let forwarder = Forwarder::new(&config)?.with_policy(policy);
        let rewriter = BundleRewriter::from_config(&config)?;

        tracing::debug!(
            upstreams = forwarder.upstreams().len(),
            origin = %rewriter.origin(),
            "Proxy pipeline initialized"
        );

        let state = AppState {
            forwarder: Arc::new(forwarder),
            rewriter: Arc::new(rewriter),
        };

        Ok(Self {
            router: Self::build_router(state),
            config: Arc::new(config),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(proxy_handler))
            .route("/{*path}", get(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(RequestIdGenerator))
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                request_id = %request_id(request.headers()),
                                method = %request.method(),
                                path = %request.uri().path(),
                            )
                        },
                    ))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The fully layered router, e.g. for driving with `tower::ServiceExt`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives. In-flight requests are drained first.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            public_address = %self.config.public_address(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler: forward, rewrite, answer.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, _body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();
    let method = parts.method.to_string();

    // HEAD has no document to rewrite
    let is_bundle_request = parts.method == Method::GET && is_collection_path(parts.uri.path());

    tracing::debug!(
        request_id = %request_id,
        path = %parts.uri.path(),
        is_bundle_request,
        "Proxying request"
    );

    match proxy(&state, &parts, is_bundle_request).await {
        Ok((response, upstream)) => {
            metrics::record_request(&method, response.status().as_u16(), &upstream, start_time);
            response
        }
        Err(err) => {
            tracing::error!(
                request_id = %request_id,
                path = %parts.uri.path(),
                error = %err,
                "Proxy request failed"
            );
            let response = err.into_response();
            metrics::record_request(&method, response.status().as_u16(), "none", start_time);
            response
        }
    }
}

/// Forward to the upstream, buffer the body, rewrite it when the request
/// addressed a collection. Returns the response and the upstream label.
async fn proxy(
    state: &AppState,
    parts: &Parts,
    is_bundle_request: bool,
) -> Result<(Response, String), ProxyError> {
    let upstream_response = state
        .forwarder
        .forward(&parts.method, &parts.uri, &parts.headers)
        .await?;
    let upstream = upstream_response.upstream().to_string();

    let (status, headers, body) = upstream_response
        .read_body(state.forwarder.max_body_bytes())
        .await?;

    let rewritten = match state.rewriter.rewrite(body, is_bundle_request) {
        Ok(rewritten) => rewritten,
        Err(err) => {
            metrics::record_rewrite("failed");
            return Err(err.into());
        }
    };
    metrics::record_rewrite(rewritten.outcome());

    Ok((build_response(status, &headers, rewritten.into_body()), upstream))
}
