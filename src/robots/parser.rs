//! Robots.txt rules for one host, matched with the robotstxt crate

use robotstxt::DefaultMatcher;

/// Parsed robots.txt for one host, or "absent"
///
/// An absent policy (robots.txt unreachable, non-200 or empty) allows
/// everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsPolicy {
    Absent,
    Rules(String),
}

impl RobotsPolicy {
    /// Builds a policy from a robots.txt body
    ///
    /// A blank body is treated the same as a missing file.
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            Self::Absent
        } else {
            Self::Rules(content.to_string())
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Checks if a URL is allowed for the given product token
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path (e.g. `/private/page`)
    /// * `agent` - Crawler product token such as `NKUSearchBot`
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        match self {
            Self::Absent => true,
            Self::Rules(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, agent, url)
            }
        }
    }

    /// `Crawl-delay` in seconds for the agent, falling back to the `*` group
    ///
    /// Consecutive `User-agent` lines form one group; the group ends at the
    /// next `User-agent` line that follows a rule.
    pub fn crawl_delay(&self, agent: &str) -> Option<f64> {
        let Self::Rules(body) = self else {
            return None;
        };

        let agent = agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    if in_rules {
                        group.clear();
                        in_rules = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        specific = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        specific.or(wildcard)
    }
}
