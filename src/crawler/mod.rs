//! Crawler module for URL discovery and page retrieval
//!
//! This module contains the core crawling logic, including:
//! - Rate-limited HTTP fetching with retry logic
//! - Sitemap and breadth-first URL discovery
//! - HTML parsing, link extraction and record extraction
//! - Overall crawl coordination

mod context;
mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod limiter;
mod parser;
mod sitemap;

pub use context::{CrawlContext, FrontierLimits};
pub use coordinator::{run_crawl, Coordinator};
pub use extractor::{record_id, Extractor, TIMESTAMP_FORMAT};
pub use fetcher::{
    build_http_client, build_robots_client, is_html, FetchResult, PageFetcher, RetryPolicy,
    MAX_REDIRECTS, MAX_ROBOTS_REDIRECTS,
};
pub use frontier::{Frontier, FrontierCrawler};
pub use limiter::RateLimiter;
pub use parser::{extract_content, extract_links_simple};
pub use sitemap::{
    decode_sitemap, parse_sitemap, SitemapDiscoverer, SitemapDocument, SitemapError,
    SitemapOutcome, MAX_SITEMAP_DEPTH,
};
