//! Robots.txt handling module
//!
//! The policy for the crawl origin is fetched once per run and shared by every
//! decision. A missing or unreachable robots.txt degrades to allow-all.

mod gate;
mod parser;

pub use gate::PolicyGate;
pub use parser::ParsedRobots;

use crate::crawler::PageFetcher;
use crate::url::SiteScope;
use crate::FetchErrorKind;
use std::fmt;

/// How the robots policy for a run was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotsStatus {
    /// robots.txt was fetched and parsed
    Loaded,
    /// robots.txt does not exist; everything is allowed
    Missing,
    /// The server refused access to robots.txt; everything is disallowed
    Forbidden,
    /// robots.txt could not be retrieved; everything is allowed
    Unavailable,
}

impl RobotsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotsStatus::Loaded => "loaded",
            RobotsStatus::Missing => "missing",
            RobotsStatus::Forbidden => "forbidden",
            RobotsStatus::Unavailable => "unavailable",
        }
    }

    /// True when the run proceeds without the site's actual policy
    pub fn is_degraded(&self) -> bool {
        matches!(self, RobotsStatus::Unavailable)
    }
}

impl fmt::Display for RobotsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetches and parses robots.txt for the crawl origin
///
/// # Outcomes
///
/// | Response | Policy | Status |
/// |----------|--------|--------|
/// | 2xx | parsed body | Loaded |
/// | 401, 403 | disallow all | Forbidden |
/// | other 4xx, redirect loop | allow all | Missing |
/// | 5xx, network error | allow all | Unavailable |
///
/// Redirects are followed to any origin, up to five hops.
pub async fn load_policy(fetcher: &PageFetcher, scope: &SiteScope) -> (ParsedRobots, RobotsStatus) {
    let robots_url = scope.robots_url();

    match fetcher.fetch_robots(&robots_url).await {
        Ok(result) => {
            tracing::info!("Loaded robots.txt from {}", result.final_url);
            (ParsedRobots::from_content(&result.body), RobotsStatus::Loaded)
        }
        Err(error) => match error.kind {
            FetchErrorKind::HttpStatus(401 | 403) => {
                tracing::warn!(
                    "Access to {} refused ({}); treating the whole site as disallowed",
                    robots_url,
                    error.kind
                );
                (ParsedRobots::disallow_all(), RobotsStatus::Forbidden)
            }
            FetchErrorKind::HttpStatus(code) if (300..500).contains(&code) => {
                tracing::info!("No robots.txt at {} ({}); all paths allowed", robots_url, code);
                (ParsedRobots::allow_all(), RobotsStatus::Missing)
            }
            FetchErrorKind::TooManyRedirects => {
                tracing::info!(
                    "robots.txt at {} redirects too often; all paths allowed",
                    robots_url
                );
                (ParsedRobots::allow_all(), RobotsStatus::Missing)
            }
            FetchErrorKind::Cancelled => {
                tracing::info!("Run cancelled before robots.txt was fetched");
                (ParsedRobots::allow_all(), RobotsStatus::Unavailable)
            }
            _ => {
                tracing::warn!(
                    "robots.txt unavailable at {}: {}. Proceeding WITHOUT a crawl policy (allow-all)",
                    robots_url,
                    error
                );
                (ParsedRobots::allow_all(), RobotsStatus::Unavailable)
            }
        },
    }
}
