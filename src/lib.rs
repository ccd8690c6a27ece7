//! FHIR reverse proxy library.
//!
//! Forwards requests to an upstream FHIR server and rewrites the absolute
//! URLs inside Bundle responses (`entry[].fullUrl`, `link[].url`) so they
//! point back at the proxy.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod upstream;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rewrite::{is_collection_path, BundleRewriter};
