//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loop that coordinates all aspects of a crawl:
//! - Building the per-run context and loading robots.txt
//! - Choosing the discovery strategy (sitemap first, breadth-first fallback)
//! - Retrieving, extracting and storing every discovered URL
//! - Handling cancellation and producing the final report

use crate::config::Config;
use crate::crawler::context::CrawlContext;
use crate::crawler::frontier::FrontierCrawler;
use crate::crawler::sitemap::{SitemapDiscoverer, SitemapOutcome};
use crate::output::{CrawlReport, DiscoveryStrategy, SkipReason, UrlOutcome};
use crate::storage::{open_store, PageStore};
use crate::{FetchErrorKind, GleanError};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    store: Arc<dyn PageStore>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator writing records to `store`
    pub fn new(config: Config, store: Arc<dyn PageStore>) -> Self {
        Self {
            config,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an externally owned token to cancel the run
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs discovery and retrieval to completion or cancellation
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The run finished; per-URL failures are counted in the report
    /// * `Err(GleanError)` - The run could not start
    pub async fn run(&self) -> Result<CrawlReport, GleanError> {
        let started = Instant::now();
        let ctx = Arc::new(
            CrawlContext::initialize(&self.config, self.store.clone(), self.cancel.clone()).await?,
        );

        tracing::info!("Starting crawl of {}", ctx.scope.root());

        let (strategy, urls) = discover_urls(&ctx).await;
        let mut report = CrawlReport::new(strategy, ctx.robots_status, urls.len());

        tracing::info!(
            "Discovered {} URLs via {}; retrieving with {} worker(s)",
            urls.len(),
            strategy,
            ctx.workers
        );

        retrieve_all(&ctx, urls, &mut report).await;

        report.cancelled = self.cancel.is_cancelled();
        report.elapsed = started.elapsed();

        tracing::info!(
            "Crawl finished in {:?}: {} saved, {} empty, {} skipped, {} interrupted",
            report.elapsed,
            report.saved,
            report.empty,
            report.skipped,
            report.interrupted
        );

        Ok(report)
    }
}

/// Sitemap first; breadth-first crawl when the sitemap yields nothing
async fn discover_urls(ctx: &CrawlContext) -> (DiscoveryStrategy, BTreeSet<Url>) {
    match SitemapDiscoverer::new(ctx).probe().await {
        SitemapOutcome::Populated(urls) => (DiscoveryStrategy::Sitemap, urls),
        outcome => {
            tracing::info!(
                "Sitemap outcome {:?}; falling back to breadth-first crawl",
                outcome
            );
            let urls = FrontierCrawler::new(ctx).discover().await;
            (DiscoveryStrategy::Frontier, urls)
        }
    }
}

/// Processes the URL set in lexicographic order on up to `workers` tasks
async fn retrieve_all(ctx: &Arc<CrawlContext>, urls: BTreeSet<Url>, report: &mut CrawlReport) {
    let total = urls.len();
    let semaphore = Arc::new(Semaphore::new(ctx.workers));
    let mut tasks: JoinSet<(Url, UrlOutcome)> = JoinSet::new();

    let mut pending = urls.into_iter();
    while let Some(url) = pending.next() {
        let permit = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit.filter(|_| !ctx.cancel.is_cancelled()) else {
            // This URL and everything after it is never requested
            report.interrupted += 1 + pending.len();
            break;
        };

        let task_ctx = ctx.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let outcome = process_url(&task_ctx, &url).await;
            (url, outcome)
        });

        while let Some(joined) = tasks.try_join_next() {
            record_outcome(report, joined, total);
        }
    }

    if ctx.cancel.is_cancelled() {
        tracing::warn!(
            "Crawl cancelled; waiting for {} in-flight request(s)",
            tasks.len()
        );
    }

    while let Some(joined) = tasks.join_next().await {
        record_outcome(report, joined, total);
    }
}

fn record_outcome(
    report: &mut CrawlReport,
    joined: Result<(Url, UrlOutcome), JoinError>,
    total: usize,
) {
    let (url, outcome) = match joined {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Retrieval task failed: {}", e);
            return;
        }
    };

    report.record(outcome);
    let position = report.processed();

    match outcome {
        UrlOutcome::Interrupted => tracing::debug!("interrupted {}", url),
        UrlOutcome::Saved => tracing::info!("[{}/{}] saved {}", position, total, url),
        UrlOutcome::Empty => tracing::info!("[{}/{}] empty {}", position, total, url),
        UrlOutcome::Skipped(reason) => {
            tracing::info!("[{}/{}] skipped ({}) {}", position, total, reason, url)
        }
    }
}

/// Retrieves one URL and stores its record
///
/// Scope and robots policy are checked again here, whatever the discovery
/// source.
async fn process_url(ctx: &CrawlContext, url: &Url) -> UrlOutcome {
    if !ctx.scope.contains(url) {
        return UrlOutcome::Skipped(SkipReason::OutOfScope);
    }

    if !ctx.gate.allowed(url) {
        return UrlOutcome::Skipped(SkipReason::PolicyDenied);
    }

    let page = match ctx.fetcher.fetch(url).await {
        Ok(page) => page,
        Err(e) if e.kind == FetchErrorKind::Cancelled => return UrlOutcome::Interrupted,
        Err(e) => {
            tracing::warn!("Failed to fetch {}", e);
            return e.kind.into();
        }
    };

    if !page.html {
        tracing::debug!("Not HTML ({}): {}", page.content_type, url);
        return UrlOutcome::Skipped(SkipReason::NonHtml);
    }

    let Some(record) = ctx.extractor.extract(url, &page.body) else {
        return UrlOutcome::Empty;
    };

    match ctx.store.save(&record) {
        Ok(()) => UrlOutcome::Saved,
        Err(e) => {
            tracing::error!("Failed to store record for {}: {}", url, e);
            UrlOutcome::Skipped(SkipReason::Storage)
        }
    }
}

/// Runs a complete crawl with the configured output store
///
/// # Example
///
/// ```no_run
/// use site_gleaner::config::load_config;
/// use site_gleaner::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("gleaner.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} pages saved", report.saved);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport, GleanError> {
    let store = open_store(&config.output)?;
    Coordinator::new(config, store).run().await
}
