//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate (Google's
//! matcher semantics); `Crawl-delay` and `Sitemap` lines, which that crate
//! does not expose, are read here directly.

use robotstxt::DefaultMatcher;

#[derive(Debug, Clone)]
enum Rules {
    AllowAll,
    DisallowAll,
    Content(String),
}

/// Parsed robots.txt data
///
/// This is a wrapper around the robotstxt crate's matcher, providing a
/// simplified interface for checking if URLs are allowed.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    rules: Rules,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            rules: Rules::Content(content.to_string()),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            rules: Rules::AllowAll,
        }
    }

    /// Creates a ParsedRobots that disallows everything
    ///
    /// This is used when the server refuses access to robots.txt itself.
    pub fn disallow_all() -> Self {
        Self {
            rules: Rules::DisallowAll,
        }
    }

    /// Returns true if the policy came from an actual robots.txt body
    pub fn is_loaded(&self) -> bool {
        matches!(self.rules, Rules::Content(_))
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to check
    /// * `user_agent` - The agent product token (e.g. "ExampleBot")
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match &self.rules {
            Rules::AllowAll => true,
            Rules::DisallowAll => false,
            Rules::Content(content) if content.trim().is_empty() => true,
            Rules::Content(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url)
            }
        }
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// A group naming the agent explicitly wins over the `*` group.
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no usable crawl delay is specified
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let Rules::Content(content) = &self.rules else {
            return None;
        };

        let agent = user_agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut collecting_agents = false;
        let mut delay_for_wildcard: Option<f64> = None;
        let mut delay_for_agent: Option<f64> = None;

        for (key, value) in directives(content) {
            if key == "user-agent" {
                // Consecutive User-agent lines share one group
                if !collecting_agents {
                    group.clear();
                    collecting_agents = true;
                }
                group.push(value.to_lowercase());
                continue;
            }

            collecting_agents = false;

            if key != "crawl-delay" {
                continue;
            }

            let Ok(delay) = value.parse::<f64>() else {
                continue;
            };
            if !delay.is_finite() || delay < 0.0 {
                continue;
            }

            if group.iter().any(|ua| *ua == agent) {
                delay_for_agent.get_or_insert(delay);
            } else if group.iter().any(|ua| ua == "*") {
                delay_for_wildcard.get_or_insert(delay);
            }
        }

        delay_for_agent.or(delay_for_wildcard)
    }

    /// Returns the sitemap locations listed with `Sitemap:` directives
    pub fn sitemaps(&self) -> Vec<String> {
        let Rules::Content(content) = &self.rules else {
            return Vec::new();
        };

        directives(content)
            .filter(|(key, value)| key == "sitemap" && !value.is_empty())
            .map(|(_, value)| value.to_string())
            .collect()
    }
}

/// Iterates `(lowercased key, trimmed value)` pairs, skipping comments
fn directives(content: &str) -> impl Iterator<Item = (String, &str)> + '_ {
    content.lines().filter_map(|line| {
        let line = line.split('#').next().unwrap_or_default().trim();
        let (key, value) = line.split_once(':')?;
        Some((key.trim().to_lowercase(), value.trim()))
    })
}
