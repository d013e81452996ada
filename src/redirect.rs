use crate::config::MAX_REDIRECTS;
use tracing::debug;
use url::Url;

/// Counter of accepted redirect hops for one resolution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RedirectState {
    accepted: usize,
}

impl RedirectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }
}

/// Decides which redirect hops a scraper may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub max_redirects: usize,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::new(MAX_REDIRECTS)
    }
}

impl RedirectPolicy {
    pub fn new(max_redirects: usize) -> Self {
        Self { max_redirects }
    }

    /// Accepts the hop from `base` to `next` and counts it, or rejects it when the
    /// bound is reached or the hop leaves the site.
    pub fn accept(&self, state: &mut RedirectState, base: &Url, next: &Url) -> bool {
        if state.accepted >= self.max_redirects {
            debug!(
                base = %base,
                next = %next,
                accepted = state.accepted,
                "Redirect bound reached"
            );
            return false;
        }

        match (base.host_str(), next.host_str()) {
            (Some(base_host), Some(next_host)) if is_same_site(base_host, next_host) => {
                state.accepted += 1;
                true
            }
            _ => {
                debug!(base = %base, next = %next, "Rejected cross-site redirect");
                false
            }
        }
    }
}

/// Hosts are the same site when identical or when one is the other with a `www.` prefix.
pub fn is_same_site(base_host: &str, next_host: &str) -> bool {
    next_host == base_host
        || next_host.strip_prefix("www.") == Some(base_host)
        || base_host.strip_prefix("www.") == Some(next_host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_site() {
        assert!(is_same_site("example.com", "example.com"));
        assert!(is_same_site("example.com", "www.example.com"));
        assert!(is_same_site("www.example.com", "example.com"));
        assert!(!is_same_site("example.com", "evil.com"));
        assert!(!is_same_site("example.com", "cdn.example.com"));
        assert!(!is_same_site("example.com", "www.www.example.com"));
        assert!(!is_same_site("example.com", "example.com.evil.com"));
    }

    #[test]
    fn test_sixth_same_site_hop_is_rejected() {
        let policy = RedirectPolicy::default();
        let mut state = RedirectState::new();
        let base = url("https://example.com/a");
        let next = url("https://www.example.com/b");

        for _ in 0..5 {
            assert!(policy.accept(&mut state, &base, &next));
        }
        assert!(!policy.accept(&mut state, &base, &next));
        assert_eq!(state.accepted(), 5);
    }

    #[test]
    fn test_cross_site_rejected_regardless_of_counter() {
        let policy = RedirectPolicy::default();
        let mut state = RedirectState::new();
        let base = url("https://example.com/");

        assert!(!policy.accept(&mut state, &base, &url("https://attacker.net/")));
        assert_eq!(state.accepted(), 0);

        assert!(policy.accept(&mut state, &base, &url("https://example.com/next")));
        assert!(!policy.accept(&mut state, &base, &url("https://attacker.net/")));
        assert_eq!(state.accepted(), 1);
    }

    #[test]
    fn test_states_are_independent() {
        let policy = RedirectPolicy::new(1);
        let base = url("http://example.com/");
        let next = url("http://example.com/x");

        let mut first = RedirectState::new();
        let mut second = RedirectState::new();
        assert!(policy.accept(&mut first, &base, &next));
        assert!(!policy.accept(&mut first, &base, &next));
        assert!(policy.accept(&mut second, &base, &next));
    }

    #[test]
    fn test_zero_bound_rejects_everything() {
        let policy = RedirectPolicy::new(0);
        let mut state = RedirectState::new();
        assert!(!policy.accept(
            &mut state,
            &url("https://example.com/"),
            &url("https://example.com/other")
        ));
    }
}
