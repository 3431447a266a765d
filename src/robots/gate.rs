//! Per-URL robots.txt decisions

use crate::robots::ParsedRobots;
use std::sync::Arc;
use url::Url;

/// Answers whether a URL may be fetched under the run's robots policy
///
/// The gate only consults robots rules. Origin scoping is checked by the
/// discovery and retrieval layers.
#[derive(Debug, Clone)]
pub struct PolicyGate {
    robots: Arc<ParsedRobots>,
    agent: String,
}

impl PolicyGate {
    /// Creates a gate for the given policy and robots agent token
    pub fn new(robots: ParsedRobots, agent: impl Into<String>) -> Self {
        Self {
            robots: Arc::new(robots),
            agent: agent.into(),
        }
    }

    /// A gate with no policy loaded, which allows everything
    pub fn open(agent: impl Into<String>) -> Self {
        Self::new(ParsedRobots::allow_all(), agent)
    }

    /// Returns false only if the policy disallows the URL for our agent
    pub fn allowed(&self, url: &Url) -> bool {
        let allowed = self.robots.is_allowed(url.as_str(), &self.agent);
        if !allowed {
            tracing::debug!("Disallowed by robots.txt: {}", url);
        }
        allowed
    }

    pub fn policy(&self) -> &ParsedRobots {
        &self.robots
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }
}
