//! Per-host robots.txt policies for one crawl run

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use super::RobotsPolicy;
use crate::crawler::fetcher::Fetcher;

/// Policies keyed by host (and explicit port), fetched once per run
///
/// http and https share an entry because the fetcher downgrades anyway.
#[derive(Debug, Default)]
pub struct RobotsCache {
    policies: HashMap<String, Arc<RobotsPolicy>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Cached policy for the URL's host, if already fetched
    pub fn get(&self, url: &Url) -> Option<Arc<RobotsPolicy>> {
        self.policies.get(&cache_key(url)?).cloned()
    }

    pub fn insert(&mut self, url: &Url, policy: RobotsPolicy) -> Arc<RobotsPolicy> {
        let policy = Arc::new(policy);
        if let Some(key) = cache_key(url) {
            self.policies.insert(key, Arc::clone(&policy));
        }
        policy
    }

    /// Returns the policy for the URL's host, fetching it on first use
    pub async fn policy_for(&mut self, url: &Url, fetcher: &Fetcher) -> Arc<RobotsPolicy> {
        if let Some(policy) = self.get(url) {
            return policy;
        }
        let policy = super::fetch_robots(url, fetcher).await;
        self.insert(url, policy)
    }
}

fn cache_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
