//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive `Deserialize` so they can be read from TOML config files.

use serde::Deserialize;

/// Upstream used when nothing else is configured.
pub const DEFAULT_UPSTREAM: &str = "https://hapi.fhir.org/baseR4";

/// Root configuration for the FHIR proxy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, externally visible address).
    pub listener: ListenerConfig,

    /// Ordered upstream FHIR base URLs (e.g. "https://hapi.fhir.org/baseR4").
    pub upstreams: Vec<String>,

    /// Timeout configuration for the outbound call.
    pub timeouts: TimeoutConfig,

    /// Size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstreams: vec![DEFAULT_UPSTREAM.to_string()],
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Address written into rewritten Bundle URLs.
    ///
    /// Falls back to the bind address when no public address is configured.
    pub fn public_address(&self) -> &str {
        self.listener
            .public_address
            .as_deref()
            .unwrap_or(&self.listener.bind_address)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9090").
    pub bind_address: String,

    /// Externally visible host:port of the proxy.
    pub public_address: Option<String>,

    /// Scheme clients use to reach the proxy ("http" or "https").
    pub public_scheme: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9090".to_string(),
            public_address: None,
            public_scheme: "http".to_string(),
        }
    }
}

/// Timeout configuration for the outbound call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time for the upstream request and body read, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
        }
    }
}

/// Size limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest upstream body the proxy will buffer, in bytes.
    pub max_upstream_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upstream_body_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9464".to_string(),
        }
    }
}
