//! Bundle URL rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path
//!     → classify.rs (is this a collection/search request?)
//! Upstream body (fully buffered)
//!     → bundle.rs (parse, walk entry[].fullUrl and link[].url)
//!     → link.rs (swap origin, drop the upstream base segment)
//!     → re-serialized body
//! ```
//!
//! # Design Decisions
//! - Which responses get rewritten is decided from the request path alone
//! - Documents are parsed as generic JSON with insertion order preserved,
//!   so unknown fields survive; whitespace does not
//! - Every failure is a per-request [`RewriteError`]

pub mod bundle;
pub mod classify;
pub mod link;

use thiserror::Error;

pub use bundle::{BundleRewriter, Rewritten};
pub use classify::is_collection_path;
pub use link::server_to_proxy_url;

#[derive(Debug, Error)]
pub enum RewriteError {
    /// Body is not JSON, or not a JSON object.
    #[error("failed to parse bundle: {0}")]
    Parse(#[from] serde_json::Error),

    /// Valid JSON, but a rewritten field has an unexpected shape.
    #[error("malformed bundle: {0}")]
    Shape(String),

    #[error("failed to serialize bundle: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("cannot rewrite url `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
