//! Per-run shared state

use crate::config::Config;
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::PageFetcher;
use crate::robots::{load_policy, PolicyGate, RobotsStatus};
use crate::storage::PageStore;
use crate::url::SiteScope;
use crate::GleanError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper bound applied to a robots.txt Crawl-delay (seconds)
const MAX_CRAWL_DELAY_SECS: f64 = 60.0;

/// Bounds for breadth-first discovery
#[derive(Debug, Clone, Copy)]
pub struct FrontierLimits {
    /// Maximum number of fetches
    pub max_pages: usize,
    /// Wall-clock budget
    pub max_duration: Option<Duration>,
}

/// Everything one crawl run needs, built once and passed to every component
///
/// Nothing in here outlives the run: the policy, limiter, fetcher, store and
/// cancellation token all belong to this context.
pub struct CrawlContext {
    pub scope: SiteScope,
    pub fetcher: PageFetcher,
    pub gate: PolicyGate,
    pub robots_status: RobotsStatus,
    pub extractor: Extractor,
    pub store: Arc<dyn PageStore>,
    pub limits: FrontierLimits,
    pub workers: usize,
    pub cancel: CancellationToken,
}

impl CrawlContext {
    /// Builds the run context and loads the robots policy
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlContext)` - Ready to discover and retrieve
    /// * `Err(GleanError)` - The root URL or HTTP client could not be set up
    pub async fn initialize(
        config: &Config,
        store: Arc<dyn PageStore>,
        cancel: CancellationToken,
    ) -> Result<Self, GleanError> {
        let scope = SiteScope::new(&config.site.root_origin)?;
        let fetcher =
            PageFetcher::from_config(config, scope.clone())?.with_cancellation(cancel.clone());

        let (robots, robots_status) = load_policy(&fetcher, &scope).await;
        let agent = config.user_agent.robots_token();

        if config.crawler.respect_crawl_delay {
            if let Some(delay) = robots.crawl_delay(agent) {
                let delay = Duration::from_secs_f64(delay.min(MAX_CRAWL_DELAY_SECS));
                let effective = fetcher.limiter().widen_to(delay).await;
                tracing::info!(
                    "robots.txt Crawl-delay is {:?}; request interval is {:?}",
                    delay,
                    effective
                );
            }
        }

        let source = config
            .site
            .source
            .clone()
            .unwrap_or_else(|| scope.default_source());

        let limits = FrontierLimits {
            max_pages: config.crawler.max_pages as usize,
            max_duration: config.crawler.max_crawl_time.map(Duration::from_secs),
        };

        Ok(Self {
            gate: PolicyGate::new(robots, agent),
            robots_status,
            extractor: Extractor::new(source),
            store,
            limits,
            workers: config.crawler.workers.max(1) as usize,
            cancel,
            scope,
            fetcher,
        })
    }
}
