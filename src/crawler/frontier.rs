//! Breadth-first discovery from the site root
//!
//! The frontier is owned by a single task, so the `seen` set needs no lock.
//! A URL is marked seen when it is enqueued, which makes the Queued to
//! Visited transition happen at most once per URL.

use crate::crawler::context::{CrawlContext, FrontierLimits};
use crate::crawler::parser::extract_links_simple;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::time::Instant;
use url::Url;

/// FIFO queue of pending URLs plus the set of every URL ever enqueued
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Url>,
    seen: HashSet<Url>,
}

impl Frontier {
    /// Creates a frontier holding only the root, already marked seen
    pub fn with_root(root: Url) -> Self {
        let mut frontier = Self::default();
        frontier.push(root);
        frontier
    }

    /// Enqueues a URL unless it was seen before
    ///
    /// # Returns
    ///
    /// `true` if the URL was newly enqueued
    pub fn push(&mut self, url: Url) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Dequeues the oldest pending URL
    pub fn pop(&mut self) -> Option<Url> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

/// Why a breadth-first traversal stopped before the frontier emptied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    PageLimit,
    TimeLimit,
    Cancelled,
}

/// Breadth-first traversal of the crawl origin
pub struct FrontierCrawler<'a> {
    ctx: &'a CrawlContext,
}

impl<'a> FrontierCrawler<'a> {
    pub fn new(ctx: &'a CrawlContext) -> Self {
        Self { ctx }
    }

    /// Discovers HTML pages reachable from the root
    ///
    /// # Algorithm
    ///
    /// 1. Seed the frontier with the root
    /// 2. Dequeue the oldest URL; skip it if robots.txt disallows it
    /// 3. Fetch it; failures and non-HTML responses are dropped silently
    /// 4. Record it and enqueue every unseen same-origin link
    /// 5. Repeat until the frontier is empty or a limit is hit
    ///
    /// # Returns
    ///
    /// The set of URLs that answered with HTML
    pub async fn discover(&self) -> BTreeSet<Url> {
        let root = self.ctx.scope.root().clone();
        let mut frontier = Frontier::with_root(root.clone());
        let mut found = BTreeSet::new();
        let mut fetches = 0usize;
        let started = Instant::now();

        tracing::info!("Starting breadth-first discovery from {}", root);

        while let Some(url) = frontier.pop() {
            if let Some(reason) = self.should_stop(&self.ctx.limits, fetches, started) {
                tracing::warn!(
                    "Breadth-first discovery stopped ({:?}) after {} fetches, {} URLs still queued",
                    reason,
                    fetches,
                    frontier.len() + 1
                );
                break;
            }

            if !self.ctx.gate.allowed(&url) {
                continue;
            }

            fetches += 1;
            let page = match self.ctx.fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::debug!("Discovery fetch failed: {}", e);
                    continue;
                }
            };

            if !page.html {
                tracing::debug!("Not HTML ({}): {}", page.content_type, url);
                continue;
            }

            found.insert(url.clone());

            let mut queued = 0;
            for link in extract_links_simple(&page.body, &page.final_url) {
                if !self.ctx.scope.contains(&link) {
                    tracing::debug!("Ignoring out-of-scope link {}", link);
                    continue;
                }
                if frontier.push(link) {
                    queued += 1;
                }
            }

            tracing::debug!(
                "Visited {} ({} new links, {} queued, {} found)",
                url,
                queued,
                frontier.len(),
                found.len()
            );
        }

        tracing::info!(
            "Breadth-first discovery found {} pages ({} fetches, {} URLs seen)",
            found.len(),
            fetches,
            frontier.seen_count()
        );

        found
    }

    fn should_stop(
        &self,
        limits: &FrontierLimits,
        fetches: usize,
        started: Instant,
    ) -> Option<StopReason> {
        if self.ctx.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        if fetches >= limits.max_pages {
            return Some(StopReason::PageLimit);
        }
        if limits
            .max_duration
            .is_some_and(|budget| started.elapsed() >= budget)
        {
            return Some(StopReason::TimeLimit);
        }
        None
    }
}
