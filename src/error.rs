//! Per-request error taxonomy.
//!
//! Every failure inside the forward → rewrite pipeline is a `ProxyError`.
//! Handlers log the detail and convert it into a 5xx whose body is only the
//! canonical reason phrase; nothing about the upstream leaks to the client.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::rewrite::RewriteError;

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Error, Debug)]
pub enum ProxyError {
    /// Upstream or public address could not be turned into a usable URL.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The outbound request could not be built from the inbound one.
    #[error("cannot construct upstream request: {0}")]
    RequestConstruction(String),

    /// The selected upstream could not be reached (connect, timeout, TLS).
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[source] reqwest::Error),

    /// No upstream was returned by the selection policy.
    #[error("no upstream selected")]
    NoUpstream,

    #[error("failed to read upstream body: {0}")]
    BodyRead(#[source] reqwest::Error),

    #[error("upstream body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

impl ProxyError {
    /// Status reported to the client for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Configuration(_)
            | ProxyError::RequestConstruction(_)
            | ProxyError::UpstreamUnavailable(_)
            | ProxyError::NoUpstream => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::BodyRead(_) | ProxyError::BodyTooLarge { .. } | ProxyError::Rewrite(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("error");
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            reason,
        )
            .into_response()
    }
}
