//! Configuration module for Site-Gleaner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_gleaner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("gleaner.toml")).unwrap();
//! println!("Rate limit: {}ms", config.crawler.rate_limit_interval);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, OutputFormat, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{load_config, parse_config, with_root_override};
pub use validation::validate;
