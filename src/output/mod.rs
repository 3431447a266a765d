//! Output module for crawl reports
//!
//! This module handles:
//! - Counting what happened to every discovered URL
//! - Printing the end-of-run summary

mod report;

pub use report::{print_report, CrawlReport, DiscoveryStrategy, SkipReason, UrlOutcome};
