use serde::Deserialize;

/// Main configuration structure for Site-Gleaner
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The single website to harvest
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root URL; its scheme, host and port bound the crawl
    #[serde(rename = "root-origin")]
    pub root_origin: String,

    /// Label written into every record's `source` field
    #[serde(default)]
    pub source: Option<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Minimum time between two outbound requests (milliseconds)
    pub rate_limit_interval: u64,

    /// Timeout for a single request, including the body (milliseconds)
    pub request_timeout: u64,

    /// Extra attempts for requests that fail as unreachable
    pub max_retries: u32,

    /// Delay before the first retry, doubled for each further one (milliseconds)
    pub retry_backoff: u64,

    /// Maximum number of pages fetched during breadth-first discovery
    pub max_pages: u32,

    /// Wall-clock bound for breadth-first discovery (seconds)
    pub max_crawl_time: Option<u64>,

    /// Number of concurrent retrieval tasks
    pub workers: u32,

    /// Widen the rate limit to the robots.txt Crawl-delay when it is larger
    pub respect_crawl_delay: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            rate_limit_interval: 300,
            request_timeout: 10_000,
            max_retries: 2,
            retry_backoff: 500,
            max_pages: 5_000,
            max_crawl_time: None,
            workers: 1,
            respect_crawl_delay: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the agent token matched against robots.txt
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`, the URL part
    /// being omitted when not configured.
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!(
                "{}/{} (+{}; {})",
                self.crawler_name, self.crawler_version, url, self.contact_email
            ),
            None => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, self.contact_email
            ),
        }
    }

    /// The product token robots.txt groups are matched against
    pub fn robots_token(&self) -> &str {
        &self.crawler_name
    }
}

/// Output format for page records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One pretty-printed `<id>.json` file per record
    #[default]
    Json,
    /// One row per record in a SQLite database
    Sqlite,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Directory for JSON records, or database file for SQLite
    #[serde(default = "default_output_path")]
    pub path: String,
}

fn default_output_path() -> String {
    "./data".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            path: default_output_path(),
        }
    }
}
