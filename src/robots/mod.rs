//! Robots.txt handling
//!
//! Fetches robots.txt once per host, parses it with the robotstxt crate and
//! answers allow/deny and crawl-delay questions for the rest of the run. Any
//! failure to obtain a policy degrades to [`RobotsPolicy::Absent`].

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::RobotsPolicy;

use url::Url;

use crate::crawler::fetcher::Fetcher;

/// URL of the robots.txt governing `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    robots.host_str()?;
    Some(robots)
}

/// Fetches and parses robots.txt for the host of `url`
///
/// Never fails: an unreachable or non-200 robots.txt is logged and treated
/// as "no restrictions".
pub async fn fetch_robots(url: &Url, fetcher: &Fetcher) -> RobotsPolicy {
    let Some(robots) = robots_url(url) else {
        return RobotsPolicy::Absent;
    };

    match fetcher.fetch_text(&robots).await {
        Some(body) => {
            tracing::info!("Loaded robots.txt from {}", robots);
            RobotsPolicy::from_content(&body)
        }
        None => {
            tracing::warn!("robots.txt unavailable at {}, allowing all", robots);
            RobotsPolicy::Absent
        }
    }
}

/// Checks if a URL is allowed by a policy
pub fn is_allowed(policy: &RobotsPolicy, url: &Url, agent: &str) -> bool {
    policy.is_allowed(url.as_str(), agent)
}
