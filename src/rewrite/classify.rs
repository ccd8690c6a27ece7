//! Request-shape classification.

/// Whether an inbound path addresses a resource-type collection (a search
/// such as `/Patient?name=Smith`), whose response is expected to be a Bundle.
///
/// The rule only counts path pieces: splitting on `/` must yield at most two
/// pieces, i.e. `/` or `/{type}`. Anything deeper, including `/{type}/{id}`,
/// is treated as a single resource and passed through untouched.
///
/// Known misclassifications, kept as-is: `/Patient/123/_history` and
/// compartment searches like `/Patient/123/Observation` do return Bundles
/// but are not rewritten, and `/Patient/` (trailing slash) counts as three
/// pieces.
pub fn is_collection_path(path: &str) -> bool {
    path.split('/').count() <= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_level_paths_are_collections() {
        assert!(is_collection_path("/"));
        assert!(is_collection_path("/Patient"));
        assert!(is_collection_path("/Observation"));
    }

    #[test]
    fn instance_paths_are_not() {
        assert!(!is_collection_path("/Patient/123"));
        assert!(!is_collection_path("/Patient/123/_history/2"));
        assert!(!is_collection_path("/Binary/abc"));
    }

    #[test]
    fn compartment_search_is_not_a_collection() {
        assert!(!is_collection_path("/Patient/123/Observation"));
        assert!(!is_collection_path("/Patient/"));
    }
}
