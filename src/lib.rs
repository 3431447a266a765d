//! Site-Gleaner: a polite single-site page harvester
//!
//! This crate discovers every reachable HTML page of one website (sitemap first,
//! breadth-first crawl as a fallback), respects robots.txt and a global rate
//! limit, and writes one normalized record per page.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Gleaner operations
///
/// Only problems detected before the crawl loop starts surface through this
/// type; per-URL failures are folded into the crawl report instead.
#[derive(Debug, Error)]
pub enum GleanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingDomain,
}

/// Why a single request did not produce a usable response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FetchErrorKind {
    /// Timeout, connection failure or broken body stream
    #[error("unreachable")]
    Unreachable,

    /// The server answered with a non-success status
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// A redirect led outside the crawl origin
    #[error("redirected out of scope")]
    OutOfScope,

    /// The redirect chain looped or exceeded the hop limit
    #[error("too many redirects")]
    TooManyRedirects,

    /// The run was cancelled before the request was sent
    #[error("cancelled")]
    Cancelled,
}

/// A failed fetch, carrying the requested URL and the failure kind
#[derive(Debug, Clone, Error)]
#[error("{kind} for {url}: {message}")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(url: &::url::Url, kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            kind,
            message: message.into(),
        }
    }
}

/// Result type alias for Site-Gleaner operations
pub type Result<T> = std::result::Result<T, GleanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator};
pub use output::CrawlReport;
pub use storage::PageRecord;
pub use crate::url::{canonicalize, SiteScope};
