//! First-address selection.

use crate::upstream::{Upstream, UpstreamPolicy};

/// Always selects the first configured upstream.
///
/// No balancing happens: additional upstreams are accepted by the
/// configuration but never receive traffic under this policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstUpstream;

impl UpstreamPolicy for FirstUpstream {
    fn pick_upstream<'a>(&self, upstreams: &'a [Upstream]) -> Option<&'a Upstream> {
        upstreams.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_upstream() {
        let policy = FirstUpstream;
        let upstreams = vec![
            Upstream::parse("https://a.example/baseR4").unwrap(),
            Upstream::parse("https://b.example/baseR4").unwrap(),
        ];

        for _ in 0..3 {
            let picked = policy.pick_upstream(&upstreams).unwrap();
            assert_eq!(picked.base_url().host_str(), Some("a.example"));
        }
        assert!(policy.pick_upstream(&[]).is_none());
    }
}
