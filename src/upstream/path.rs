//! Slash-safe path joining.

use crate::error::ProxyError;

/// Join an upstream base path with an inbound request path.
///
/// Empty segments are collapsed so the result never contains `//`, the base
/// path is always kept as a prefix and a trailing slash on `path` survives.
/// Dot segments would let a client climb out of the base path and are
/// rejected.
pub fn join_path(base: &str, path: &str) -> Result<String, ProxyError> {
    if let Some(segment) = path.split('/').find(|s| is_dot_segment(s)) {
        return Err(ProxyError::RequestConstruction(format!(
            "dot segment `{segment}` in path `{path}`"
        )));
    }

    let segments: Vec<&str> = base
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();

    let mut joined = String::with_capacity(base.len() + path.len() + 1);
    for segment in &segments {
        joined.push('/');
        joined.push_str(segment);
    }
    if joined.is_empty() || (path.ends_with('/') && !path.trim_matches('/').is_empty()) {
        joined.push('/');
    }
    Ok(joined)
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}
