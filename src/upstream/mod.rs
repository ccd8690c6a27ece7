//! Upstream selection and request forwarding.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → policy (pick an upstream from the configured list)
//!     → path.rs (join upstream base path with inbound path)
//!     → forwarder.rs (outbound call, buffered body read)
//!     → UpstreamResponse handed to the bundle rewriter
//! ```
//!
//! # Design Decisions
//! - Upstream list is parsed once at startup and never mutated
//! - Selection is a trait so a balancing strategy can be dropped in later;
//!   the shipped policy always returns the first upstream

pub mod first;
pub mod forwarder;
pub mod path;
pub mod target;

pub use first::FirstUpstream;
pub use forwarder::{Forwarder, UpstreamResponse};
pub use target::Upstream;

/// Upstream selection policy.
pub trait UpstreamPolicy: Send + Sync + std::fmt::Debug {
    /// Pick the upstream to forward the next request to.
    fn pick_upstream<'a>(&self, upstreams: &'a [Upstream]) -> Option<&'a Upstream>;
}
