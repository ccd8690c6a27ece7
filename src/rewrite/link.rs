//! Upstream → proxy URL translation.

use url::Url;

use crate::rewrite::RewriteError;

/// Translate a URL minted by the upstream into one that points at the proxy.
///
/// Scheme and authority are replaced with `origin`'s. The path loses its
/// first two `/`-separated pieces (the empty piece before the leading slash
/// and the upstream base segment such as `baseR4`); whatever remains is
/// re-rooted under `/`. Query and fragment are kept.
///
/// URLs without an authority (`urn:uuid:...`, `urn:oid:...`) never name the
/// upstream; they yield `None` and stay as they are.
pub fn server_to_proxy_url(raw: &str, origin: &Url) -> Result<Option<String>, RewriteError> {
    let source = Url::parse(raw).map_err(|source| RewriteError::Url {
        url: raw.to_string(),
        source,
    })?;
    if source.cannot_be_a_base() || !source.has_host() {
        return Ok(None);
    }

    let mut rewritten = origin.clone();
    rewritten.set_path(&strip_base_segments(source.path()));
    rewritten.set_query(source.query());
    rewritten.set_fragment(source.fragment());
    Ok(Some(rewritten.into()))
}

/// `/baseR4/Patient/123` → `/Patient/123`; `/baseR4` and `/` → `/`.
fn strip_base_segments(path: &str) -> String {
    let remaining: Vec<&str> = path
        .split('/')
        .skip(2)
        .filter(|segment| !segment.is_empty())
        .collect();

    let mut stripped = format!("/{}", remaining.join("/"));
    if path.ends_with('/') && !remaining.is_empty() {
        stripped.push('/');
    }
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://proxy.local:9090/").unwrap()
    }

    #[test]
    fn rewrites_pagination_link() {
        let rewritten = server_to_proxy_url(
            "https://hapi.fhir.org/baseR4/Patient?name=Smith&page=2",
            &origin(),
        )
        .unwrap();
        assert_eq!(
            rewritten.as_deref(),
            Some("http://proxy.local:9090/Patient?name=Smith&page=2")
        );
    }

    #[test]
    fn rewrites_full_url() {
        let rewritten =
            server_to_proxy_url("https://hapi.fhir.org/baseR4/Patient/592912", &origin()).unwrap();
        assert_eq!(rewritten.as_deref(), Some("http://proxy.local:9090/Patient/592912"));
    }

    #[test]
    fn keeps_deeper_structure_and_fragment() {
        let rewritten = server_to_proxy_url(
            "https://hapi.fhir.org/baseR4/Patient/1/_history/3#frag",
            &origin(),
        )
        .unwrap();
        assert_eq!(
            rewritten.as_deref(),
            Some("http://proxy.local:9090/Patient/1/_history/3#frag")
        );
    }

    #[test]
    fn short_paths_collapse_to_root() {
        assert_eq!(
            server_to_proxy_url("https://hapi.fhir.org/baseR4", &origin()).unwrap(),
            Some("http://proxy.local:9090/".to_string())
        );
        assert_eq!(
            server_to_proxy_url("https://hapi.fhir.org", &origin()).unwrap(),
            Some("http://proxy.local:9090/".to_string())
        );
    }

    #[test]
    fn urns_are_left_alone() {
        for urn in [
            "urn:uuid:61ebe359-bfdc-4613-8bf2-c5e300945f0a",
            "urn:oid:1.2.840.113619.6.197",
        ] {
            assert_eq!(server_to_proxy_url(urn, &origin()).unwrap(), None);
        }
    }

    #[test]
    fn unparseable_url_is_an_error() {
        let err = server_to_proxy_url("Patient/123", &origin()).unwrap_err();
        assert!(matches!(err, RewriteError::Url { .. }));
    }

    #[test]
    fn strip_keeps_trailing_slash() {
        assert_eq!(strip_base_segments("/baseR4/Patient/"), "/Patient/");
        assert_eq!(strip_base_segments("/baseR4//Patient"), "/Patient");
        assert_eq!(strip_base_segments(""), "/");
    }
}
