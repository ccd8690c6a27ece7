//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every upstream is an absolute http(s) URL with a host
//! - Listen address is a socket address, public address a host:port pair
//! - Value ranges (timeouts > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one upstream must be configured")]
    NoUpstreams,

    #[error("upstream `{address}` is not an absolute http(s) URL: {reason}")]
    InvalidUpstream { address: String, reason: String },

    #[error("bind address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("public address `{0}` is not a valid host:port pair")]
    InvalidPublicAddress(String),

    #[error("public scheme `{0}` must be http or https")]
    InvalidPublicScheme(String),

    #[error("metrics address `{0}` is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a merged configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.upstreams.is_empty() {
        errors.push(ValidationError::NoUpstreams);
    }
    for address in &config.upstreams {
        if let Err(reason) = parse_upstream(address) {
            errors.push(ValidationError::InvalidUpstream {
                address: address.clone(),
                reason,
            });
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let scheme = config.listener.public_scheme.as_str();
    if scheme != "http" && scheme != "https" {
        errors.push(ValidationError::InvalidPublicScheme(scheme.to_string()));
    } else if parse_public_origin(scheme, config.public_address()).is_err() {
        errors.push(ValidationError::InvalidPublicAddress(
            config.public_address().to_string(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.limits.max_upstream_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_upstream_body_bytes"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse an upstream base address into a URL.
pub fn parse_upstream(address: &str) -> Result<Url, String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("query and fragment are not allowed".to_string());
    }
    Ok(url)
}

/// Build the proxy's own origin (`scheme://host:port/`) from a host:port pair.
pub fn parse_public_origin(scheme: &str, address: &str) -> Result<Url, String> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| "missing port".to_string())?;
    if host.is_empty() {
        return Err("missing host".to_string());
    }
    port.parse::<u16>().map_err(|e| e.to_string())?;

    let url = Url::parse(&format!("{scheme}://{address}/")).map_err(|e| e.to_string())?;
    if url.path() != "/" || url.host_str().is_none() {
        return Err("expected only host:port".to_string());
    }
    Ok(url)
}
