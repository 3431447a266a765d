//! Crawl report: per-run counts and their console rendering

use crate::robots::RobotsStatus;
use crate::FetchErrorKind;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Which discovery strategy produced the URL set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    Sitemap,
    Frontier,
}

impl fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryStrategy::Sitemap => f.write_str("sitemap"),
            DiscoveryStrategy::Frontier => f.write_str("breadth-first crawl"),
        }
    }
}

/// Why a discovered URL produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    /// Disallowed by robots.txt
    PolicyDenied,
    /// Outside the crawl origin, directly or after a redirect
    OutOfScope,
    /// Timeout or connection failure after all retries
    Unreachable,
    /// Non-success HTTP status
    HttpStatus,
    /// The response was not an HTML document
    NonHtml,
    /// The record could not be written
    Storage,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::PolicyDenied => "policy-denied",
            SkipReason::OutOfScope => "out-of-scope",
            SkipReason::Unreachable => "unreachable",
            SkipReason::HttpStatus => "http-status",
            SkipReason::NonHtml => "non-html",
            SkipReason::Storage => "storage",
        }
    }

    /// True for skips caused by an error rather than by policy or content type
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SkipReason::Unreachable | SkipReason::HttpStatus | SkipReason::Storage
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one URL during retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlOutcome {
    /// A record was written
    Saved,
    /// The page had no visible text
    Empty,
    /// No record, for the given reason
    Skipped(SkipReason),
    /// The run was cancelled before the URL was requested
    Interrupted,
}

impl From<FetchErrorKind> for UrlOutcome {
    fn from(kind: FetchErrorKind) -> Self {
        match kind {
            FetchErrorKind::Unreachable => UrlOutcome::Skipped(SkipReason::Unreachable),
            FetchErrorKind::HttpStatus(_) | FetchErrorKind::TooManyRedirects => {
                UrlOutcome::Skipped(SkipReason::HttpStatus)
            }
            FetchErrorKind::OutOfScope => UrlOutcome::Skipped(SkipReason::OutOfScope),
            FetchErrorKind::Cancelled => UrlOutcome::Interrupted,
        }
    }
}

/// Summary of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub strategy: DiscoveryStrategy,
    pub robots: RobotsStatus,
    /// Size of the URL set handed to retrieval
    pub discovered: usize,
    pub saved: usize,
    pub empty: usize,
    pub skipped: usize,
    pub skipped_by_reason: BTreeMap<SkipReason, usize>,
    /// URLs left unrequested because the run was cancelled
    pub interrupted: usize,
    /// The run was interrupted before every URL was processed
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn new(strategy: DiscoveryStrategy, robots: RobotsStatus, discovered: usize) -> Self {
        Self {
            strategy,
            robots,
            discovered,
            saved: 0,
            empty: 0,
            skipped: 0,
            skipped_by_reason: BTreeMap::new(),
            interrupted: 0,
            cancelled: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Counts one URL outcome
    pub fn record(&mut self, outcome: UrlOutcome) {
        match outcome {
            UrlOutcome::Saved => self.saved += 1,
            UrlOutcome::Empty => self.empty += 1,
            UrlOutcome::Skipped(reason) => {
                self.skipped += 1;
                *self.skipped_by_reason.entry(reason).or_insert(0) += 1;
            }
            UrlOutcome::Interrupted => self.interrupted += 1,
        }
    }

    /// Number of URLs processed so far
    pub fn processed(&self) -> usize {
        self.saved + self.empty + self.skipped
    }

    /// Skips caused by errors
    pub fn failures(&self) -> usize {
        self.skipped_by_reason
            .iter()
            .filter(|(reason, _)| reason.is_failure())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped_by_reason.get(&reason).copied().unwrap_or(0)
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Overview:");
    println!("  Discovery: {}", report.strategy);
    println!("  robots.txt: {}", report.robots);
    println!("  URLs discovered: {}", report.discovered);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    println!();

    println!("Results:");
    println!("  Saved: {}", report.saved);
    println!("  Empty (no text): {}", report.empty);
    println!("  Skipped: {}", report.skipped);

    // Sort reasons by count (descending)
    let mut reasons: Vec<_> = report.skipped_by_reason.iter().collect();
    reasons.sort_by(|a, b| b.1.cmp(a.1));
    for (reason, count) in reasons {
        println!("    {}: {}", reason, count);
    }
    println!();

    if report.robots.is_degraded() {
        println!("WARNING: robots.txt could not be retrieved; the crawl ran without a policy.");
    }

    if report.cancelled {
        println!(
            "Run cancelled: {} of {} URLs processed, {} interrupted before their request.",
            report.processed(),
            report.discovered,
            report.interrupted
        );
    }

    let success_rate = if report.discovered > 0 {
        (report.saved as f64 / report.discovered as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages saved, {} failures)",
        success_rate,
        report.saved,
        report.discovered,
        report.failures()
    );
}
