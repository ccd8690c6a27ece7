//! Upstream abstraction.

use std::fmt;

use url::Url;

use crate::config::validation::parse_upstream;
use crate::error::ProxyError;
use crate::upstream::path::join_path;

/// A single upstream FHIR server, identified by its base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    base_url: Url,
}

impl Upstream {
    /// Parse and validate an upstream base address.
    pub fn parse(address: &str) -> Result<Self, ProxyError> {
        let base_url = parse_upstream(address)
            .map_err(|reason| ProxyError::Configuration(format!("{address}: {reason}")))?;
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Target URL for an inbound path and query.
    ///
    /// Scheme and authority come from the upstream, the path is the upstream
    /// base path joined with `path`, the query is carried over verbatim.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Result<Url, ProxyError> {
        let mut url = self.base_url.clone();
        url.set_path(&join_path(self.base_url.path(), path)?);
        url.set_query(query);
        Ok(url)
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_keeps_base_path_and_query() {
        let upstream = Upstream::parse("https://hapi.fhir.org/baseR4").unwrap();
        let url = upstream.target_url("/Patient", Some("name=Smith")).unwrap();
        assert_eq!(url.as_str(), "https://hapi.fhir.org/baseR4/Patient?name=Smith");
    }

    #[test]
    fn target_without_base_path() {
        let upstream = Upstream::parse("http://127.0.0.1:8080").unwrap();
        let url = upstream.target_url("/Patient/123", None).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/Patient/123");
    }

    #[test]
    fn invalid_upstream_is_configuration_error() {
        let err = Upstream::parse("hapi.fhir.org").unwrap_err();
        assert!(matches!(err, ProxyError::Configuration(_)));
    }
}
