//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Rate limiting every request attempt through the shared limiter
//! - Retry with exponential backoff for transient failures
//! - Redirect handling restricted to the crawl origin
//! - Content-Type filtering and error classification

use crate::config::{Config, UserAgentConfig};
use crate::crawler::limiter::RateLimiter;
use crate::url::{canonicalize_url, SiteScope};
use crate::{FetchError, FetchErrorKind};
use reqwest::{header, redirect::Policy, Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Maximum number of redirect hops followed for a single request
pub const MAX_REDIRECTS: usize = 10;

/// Maximum number of redirect hops followed when fetching robots.txt
pub const MAX_ROBOTS_REDIRECTS: usize = 5;

/// Content types treated as HTML pages
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// A response that passed scope and status checks
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value (empty if absent)
    pub content_type: String,
    /// Whether the Content-Type denotes an HTML document
    pub html: bool,
    /// Decoded body; empty for non-HTML pages and for sitemap fetches
    pub body: String,
    /// Undecoded body, filled only by [`PageFetcher::fetch_sitemap`]
    pub bytes: Vec<u8>,
}

/// Retry schedule for unreachable URLs
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based), doubling each time
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// What a request is for; decides client, scope check and body handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// A page: body read only when HTML
    Page,
    /// A sitemap document: raw bytes, possibly gzip-compressed
    Sitemap,
    /// robots.txt: may be served from another origin after redirects
    Robots,
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed up to [`MAX_REDIRECTS`] hops as long as they stay
/// on the crawl origin. A redirect pointing elsewhere is not followed; the
/// fetcher reports it as out of scope.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total time allowed for one request attempt
/// * `scope` - The crawl origin redirects must stay within
///
/// # Example
///
/// ```no_run
/// use site_gleaner::config::UserAgentConfig;
/// use site_gleaner::crawler::build_http_client;
/// use site_gleaner::SiteScope;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "ExampleBot".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: Some("https://example.com/bot".to_string()),
///     contact_email: "admin@example.com".to_string(),
/// };
/// let scope = SiteScope::new("https://example.com").unwrap();
///
/// let client = build_http_client(&config, Duration::from_secs(10), &scope).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
    scope: &SiteScope,
) -> Result<Client, reqwest::Error> {
    let origin = scope.root().origin();
    let redirect_policy = Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if attempt.url().origin() != origin {
            attempt.stop()
        } else {
            attempt.follow()
        }
    });

    base_client(config, timeout).redirect(redirect_policy).build()
}

/// Builds the client used for robots.txt
///
/// Unlike page requests, robots.txt redirects are followed to any origin
/// (canonical hosts and CDNs are common), up to [`MAX_ROBOTS_REDIRECTS`] hops.
pub fn build_robots_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    base_client(config, timeout)
        .redirect(Policy::limited(MAX_ROBOTS_REDIRECTS))
        .build()
}

fn base_client(config: &UserAgentConfig, timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
}

/// Rate-limited, retrying HTTP access to the crawl origin
///
/// Cloning is cheap; clones share the clients, the rate limiter and the
/// cancellation token.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    robots_client: Client,
    limiter: Arc<RateLimiter>,
    scope: SiteScope,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl PageFetcher {
    pub fn new(
        client: Client,
        robots_client: Client,
        limiter: Arc<RateLimiter>,
        scope: SiteScope,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            robots_client,
            limiter,
            scope,
            retry,
            cancel: CancellationToken::new(),
        }
    }

    /// Builds a fetcher and its rate limiter from the crawler configuration
    pub fn from_config(config: &Config, scope: SiteScope) -> Result<Self, reqwest::Error> {
        let crawler = &config.crawler;
        let timeout = Duration::from_millis(crawler.request_timeout);
        let client = build_http_client(&config.user_agent, timeout, &scope)?;
        let robots_client = build_robots_client(&config.user_agent, timeout)?;
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(
            crawler.rate_limit_interval,
        )));
        let retry = RetryPolicy {
            max_retries: crawler.max_retries,
            backoff: Duration::from_millis(crawler.retry_backoff),
        };

        Ok(Self::new(client, robots_client, limiter, scope, retry))
    }

    /// Stops issuing requests once `cancel` fires
    ///
    /// Requests already sent are allowed to finish. Requests still waiting for
    /// the rate limiter or a retry backoff fail with
    /// [`FetchErrorKind::Cancelled`].
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The limiter shared by every request this fetcher issues
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn scope(&self) -> &SiteScope {
        &self.scope
    }

    /// Fetches a page, reading the body only if the response is HTML
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - A successful in-scope response; check `html`
    /// * `Err(FetchError)` - Unreachable, non-success status, out of scope or cancelled
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        self.request(url, Target::Page).await
    }

    /// Fetches a sitemap document as raw bytes, whatever its content type
    pub async fn fetch_sitemap(&self, url: &Url) -> Result<FetchResult, FetchError> {
        self.request(url, Target::Sitemap).await
    }

    /// Fetches robots.txt, following redirects to other origins
    pub async fn fetch_robots(&self, url: &Url) -> Result<FetchResult, FetchError> {
        self.request(url, Target::Robots).await
    }

    async fn request(&self, url: &Url, target: Target) -> Result<FetchResult, FetchError> {
        let mut attempt = 0;

        loop {
            match self.attempt(url, target).await {
                Err(error)
                    if error.kind == FetchErrorKind::Unreachable
                        && attempt < self.retry.max_retries =>
                {
                    let delay = self.retry.delay_for(attempt);
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} in {:?} (attempt {}/{}): {}",
                        url,
                        delay,
                        attempt,
                        self.retry.max_retries,
                        error.message
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(cancelled(url)),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                result => return result,
            }
        }
    }

    async fn attempt(&self, url: &Url, target: Target) -> Result<FetchResult, FetchError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(cancelled(url)),
            _ = self.limiter.wait() => {}
        }

        let client = match target {
            Target::Robots => &self.robots_client,
            Target::Page | Target::Sitemap => &self.client,
        };

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, &e))?;

        let final_url =
            canonicalize_url(response.url().clone()).unwrap_or_else(|_| response.url().clone());
        let status = response.status();

        if status.is_redirection() {
            return Err(self.redirect_error(url, &response));
        }

        if target != Target::Robots && !self.scope.contains(&final_url) {
            return Err(FetchError::new(
                url,
                FetchErrorKind::OutOfScope,
                format!("landed on {}", final_url),
            ));
        }

        if !status.is_success() {
            return Err(FetchError::new(
                url,
                FetchErrorKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let html = is_html(&content_type);

        let (body, bytes) = match target {
            Target::Page if !html => (String::new(), Vec::new()),
            Target::Page | Target::Robots => {
                let text = response
                    .text()
                    .await
                    .map_err(|e| classify_error(url, &e))?;
                (text, Vec::new())
            }
            Target::Sitemap => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| classify_error(url, &e))?;
                (String::new(), bytes.to_vec())
            }
        };

        Ok(FetchResult {
            final_url,
            status_code: status.as_u16(),
            content_type,
            html,
            body,
            bytes,
        })
    }

    /// Classifies a redirect the client declined to follow
    fn redirect_error(&self, url: &Url, response: &Response) -> FetchError {
        let target = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| response.url().join(location).ok());

        match target {
            Some(target) if !self.scope.contains(&target) => FetchError::new(
                url,
                FetchErrorKind::OutOfScope,
                format!("redirected to {}", target),
            ),
            _ => FetchError::new(
                url,
                FetchErrorKind::HttpStatus(response.status().as_u16()),
                "redirect without a usable location",
            ),
        }
    }
}

/// Returns true if a Content-Type header value denotes HTML
pub fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    HTML_CONTENT_TYPES.contains(&mime.as_str())
}

fn cancelled(url: &Url) -> FetchError {
    FetchError::new(url, FetchErrorKind::Cancelled, "run cancelled before the request was sent")
}

fn classify_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_redirect() {
        return FetchError::new(
            url,
            FetchErrorKind::TooManyRedirects,
            "redirect loop or too many redirects",
        );
    }

    let message = if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        error.to_string()
    };

    FetchError::new(url, FetchErrorKind::Unreachable, message)
}
