use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use beacon_core::error::{BeaconError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// How the next registry URL is chosen.
enum Strategy {
    /// Uniformly random on every call.
    Random(Mutex<StdRng>),
    /// Cycle through the list in order.
    RoundRobin(AtomicUsize),
}

/// Picks one registry server URL per call.
///
/// Selection is stateless from the caller's point of view: no URL is
/// pinned to a session.
pub struct ServiceUrlSelector {
    urls: Vec<String>,
    strategy: Strategy,
}

impl ServiceUrlSelector {
    /// Random selection seeded from the OS.
    pub fn new(urls: Vec<String>) -> Result<Self> {
        Self::with_rng(urls, StdRng::from_entropy())
    }

    /// Random selection driven by the given generator.
    pub fn with_rng(urls: Vec<String>, rng: StdRng) -> Result<Self> {
        Self::build(urls, Strategy::Random(Mutex::new(rng)))
    }

    /// Deterministic round-robin selection.
    pub fn round_robin(urls: Vec<String>) -> Result<Self> {
        Self::build(urls, Strategy::RoundRobin(AtomicUsize::new(0)))
    }

    fn build(urls: Vec<String>, strategy: Strategy) -> Result<Self> {
        if urls.is_empty() {
            return Err(BeaconError::Config(
                "There are no registry service URLs configured".into(),
            ));
        }

        let urls = urls
            .into_iter()
            .map(|u| u.trim_end_matches('/').to_string())
            .collect();
        Ok(Self { urls, strategy })
    }

    /// Choose a URL for the next call.
    pub fn select(&self) -> &str {
        let index = match &self.strategy {
            Strategy::Random(rng) => {
                let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                rng.gen_range(0..self.urls.len())
            }
            Strategy::RoundRobin(next) => next.fetch_add(1, Ordering::Relaxed) % self.urls.len(),
        };
        &self.urls[index]
    }

    /// Join path segments onto a selected URL.
    pub fn build_url(&self, segments: &[&str]) -> String {
        let mut url = self.select().to_string();
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_list_is_config_error() {
        let result = ServiceUrlSelector::new(Vec::new());
        assert!(matches!(result, Err(BeaconError::Config(_))));
    }

    #[test]
    fn test_single_url_always_selected() {
        let selector = ServiceUrlSelector::new(urls(&["http://a:8761/eureka/"])).unwrap();
        for _ in 0..20 {
            assert_eq!(selector.select(), "http://a:8761/eureka");
        }
    }

    #[test]
    fn test_draws_only_from_set() {
        let configured = urls(&["http://a:8761", "http://b:8761", "http://c:8761"]);
        let selector =
            ServiceUrlSelector::with_rng(configured.clone(), StdRng::seed_from_u64(7)).unwrap();

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let url = selector.select().to_string();
            assert!(configured.contains(&url));
            seen.insert(url);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let configured = urls(&["http://a:8761", "http://b:8761", "http://c:8761"]);
        let first = ServiceUrlSelector::with_rng(configured.clone(), StdRng::seed_from_u64(42))
            .unwrap();
        let second =
            ServiceUrlSelector::with_rng(configured, StdRng::seed_from_u64(42)).unwrap();

        let a: Vec<String> = (0..10).map(|_| first.select().to_string()).collect();
        let b: Vec<String> = (0..10).map(|_| second.select().to_string()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_robin() {
        let selector = ServiceUrlSelector::round_robin(urls(&["http://a", "http://b"])).unwrap();
        assert_eq!(selector.select(), "http://a");
        assert_eq!(selector.select(), "http://b");
        assert_eq!(selector.select(), "http://a");
    }

    #[test]
    fn test_build_url() {
        let selector = ServiceUrlSelector::new(urls(&["http://a:8761/eureka/"])).unwrap();
        assert_eq!(
            selector.build_url(&["apps", "svc", "svc:1"]),
            "http://a:8761/eureka/apps/svc/svc:1"
        );
        assert_eq!(selector.build_url(&["apps"]), "http://a:8761/eureka/apps");
    }
}
