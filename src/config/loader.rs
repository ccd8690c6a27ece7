//! Configuration loading from disk and the command line.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command-line / environment overrides, applied on top of the file.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigOverrides {
    /// Address to listen on (e.g. 0.0.0.0:9090).
    #[arg(long = "listen", env = "FHIR_PROXY_LISTEN")]
    pub bind_address: Option<String>,

    /// Upstream FHIR base URL; repeat for several, the first one is used.
    #[arg(
        long = "upstream",
        env = "FHIR_PROXY_UPSTREAMS",
        value_delimiter = ','
    )]
    pub upstreams: Vec<String>,

    /// Externally visible host:port written into rewritten Bundle links.
    #[arg(long, env = "FHIR_PROXY_PUBLIC_ADDRESS")]
    pub public_address: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "FHIR_PROXY_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Overwrite every field that was given on the command line.
    pub fn apply(self, config: &mut ProxyConfig) {
        if let Some(bind_address) = self.bind_address {
            config.listener.bind_address = bind_address;
        }
        if !self.upstreams.is_empty() {
            config.upstreams = self.upstreams;
        }
        if let Some(public_address) = self.public_address {
            config.listener.public_address = Some(public_address);
        }
        if let Some(log_level) = self.log_level {
            config.observability.log_level = log_level;
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build the effective configuration: defaults, then the optional file,
/// then overrides. Validation runs once on the merged result.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}
