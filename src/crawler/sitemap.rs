//! Sitemap-based URL discovery
//!
//! Entry points are the `Sitemap:` lines of robots.txt followed by the
//! well-known `/sitemap.xml` and `/sitemap_index.xml`. Index files are
//! followed down to [`MAX_SITEMAP_DEPTH`] levels; every page URL they list is
//! canonicalized and filtered by origin and robots policy.
//!
//! Gzip-compressed documents (`sitemap.xml.gz` served without a
//! `Content-Encoding` header) are decompressed before parsing.

use crate::crawler::context::CrawlContext;
use crate::url::canonicalize;
use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::io::Read;
use thiserror::Error;
use url::Url;

/// Deepest level of nested sitemap indexes that is followed
pub const MAX_SITEMAP_DEPTH: usize = 5;

/// Well-known sitemap locations probed after the robots.txt entries
const WELL_KNOWN_SITEMAPS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml"];

/// Largest decompressed sitemap accepted (the sitemap protocol limit)
const MAX_SITEMAP_BYTES: u64 = 50 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors raised while reading a single sitemap document
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document is not a sitemap")]
    NotASitemap,

    #[error("gzip error: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("decompressed document exceeds the sitemap size limit")]
    TooLarge,
}

/// Turns a fetched sitemap body into XML text
///
/// Bodies starting with the gzip magic bytes are decompressed; anything else
/// is read as UTF-8, replacing invalid sequences.
pub fn decode_sitemap(bytes: &[u8]) -> Result<String, SitemapError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }

    let mut xml = Vec::new();
    GzDecoder::new(bytes)
        .take(MAX_SITEMAP_BYTES + 1)
        .read_to_end(&mut xml)?;
    if xml.len() as u64 > MAX_SITEMAP_BYTES {
        return Err(SitemapError::TooLarge);
    }

    Ok(String::from_utf8_lossy(&xml).into_owned())
}

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: locations of further sitemaps
    Index(Vec<String>),
    /// `<urlset>`: locations of pages
    UrlSet(Vec<String>),
}

/// Parses a sitemap or sitemap index
///
/// Only the unprefixed `<loc>` elements are collected, so extension entries
/// such as `<image:loc>` are ignored.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut is_index: Option<bool> = None;
    let mut in_loc = false;
    let mut current = String::new();
    let mut locations = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if is_index.is_none() {
                    is_index = Some(root_kind(e.local_name().as_ref())?);
                } else if e.name().as_ref() == b"loc" {
                    in_loc = true;
                    current.clear();
                }
            }
            Event::Empty(e) if is_index.is_none() => {
                is_index = Some(root_kind(e.local_name().as_ref())?);
            }
            Event::Text(e) if in_loc => current.push_str(&e.unescape()?),
            Event::CData(e) if in_loc => current.push_str(&String::from_utf8_lossy(&e)),
            Event::End(e) if e.name().as_ref() == b"loc" => {
                in_loc = false;
                let location = current.trim();
                if !location.is_empty() {
                    locations.push(location.to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match is_index {
        Some(true) => Ok(SitemapDocument::Index(locations)),
        Some(false) => Ok(SitemapDocument::UrlSet(locations)),
        None => Err(SitemapError::NotASitemap),
    }
}

fn root_kind(name: &[u8]) -> Result<bool, SitemapError> {
    match name {
        b"sitemapindex" => Ok(true),
        b"urlset" => Ok(false),
        _ => Err(SitemapError::NotASitemap),
    }
}

/// Result of probing a site's sitemaps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapOutcome {
    /// No readable sitemap document was found
    NotFound,
    /// Sitemaps exist but list no admissible page
    Empty,
    /// Page URLs listed by the sitemaps
    Populated(BTreeSet<Url>),
}

impl SitemapOutcome {
    pub fn into_urls(self) -> BTreeSet<Url> {
        match self {
            SitemapOutcome::Populated(urls) => urls,
            _ => BTreeSet::new(),
        }
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, SitemapOutcome::Populated(_))
    }
}

/// Enumerates page URLs from the site's sitemap tree
pub struct SitemapDiscoverer<'a> {
    ctx: &'a CrawlContext,
}

impl<'a> SitemapDiscoverer<'a> {
    pub fn new(ctx: &'a CrawlContext) -> Self {
        Self { ctx }
    }

    /// All admissible page URLs listed by the sitemaps; empty on any failure
    pub async fn discover(&self) -> BTreeSet<Url> {
        self.probe().await.into_urls()
    }

    /// Walks the sitemap tree and reports what was found
    ///
    /// Each sitemap URL is fetched at most once. Documents that cannot be
    /// fetched or parsed are skipped; the rest of the tree is still read.
    pub async fn probe(&self) -> SitemapOutcome {
        let mut pending: VecDeque<(Url, usize)> =
            self.entry_points().into_iter().map(|url| (url, 0)).collect();
        let mut fetched: HashSet<Url> = HashSet::new();
        let mut documents = 0usize;
        let mut urls = BTreeSet::new();

        while let Some((sitemap_url, depth)) = pending.pop_front() {
            if self.ctx.cancel.is_cancelled() {
                tracing::warn!("Sitemap discovery cancelled");
                break;
            }

            if !fetched.insert(sitemap_url.clone()) {
                continue;
            }

            if depth > MAX_SITEMAP_DEPTH {
                tracing::warn!(
                    "Sitemap index nesting deeper than {} levels, skipping {}",
                    MAX_SITEMAP_DEPTH,
                    sitemap_url
                );
                continue;
            }

            let bytes = match self.ctx.fetcher.fetch_sitemap(&sitemap_url).await {
                Ok(result) => result.bytes,
                Err(e) => {
                    tracing::debug!("No sitemap at {}: {}", sitemap_url, e);
                    continue;
                }
            };

            match decode_sitemap(&bytes).and_then(|xml| parse_sitemap(&xml)) {
                Ok(SitemapDocument::Index(locations)) => {
                    documents += 1;
                    tracing::debug!(
                        "Sitemap index {} lists {} sitemaps",
                        sitemap_url,
                        locations.len()
                    );
                    for child in locations.iter().filter_map(|loc| self.in_scope(loc)) {
                        pending.push_back((child, depth + 1));
                    }
                }
                Ok(SitemapDocument::UrlSet(locations)) => {
                    documents += 1;
                    tracing::debug!("Sitemap {} lists {} URLs", sitemap_url, locations.len());
                    urls.extend(locations.iter().filter_map(|loc| self.admit(loc)));
                }
                Err(e) => {
                    tracing::warn!("Unreadable sitemap {}: {}", sitemap_url, e);
                }
            }
        }

        if documents == 0 {
            tracing::info!("No sitemap found");
            SitemapOutcome::NotFound
        } else if urls.is_empty() {
            tracing::info!("Sitemaps list no crawlable URLs");
            SitemapOutcome::Empty
        } else {
            tracing::info!(
                "Sitemaps list {} URLs ({} documents read)",
                urls.len(),
                documents
            );
            SitemapOutcome::Populated(urls)
        }
    }

    /// robots.txt `Sitemap:` entries, then the well-known locations
    fn entry_points(&self) -> Vec<Url> {
        let mut entries: Vec<Url> = self
            .ctx
            .gate
            .policy()
            .sitemaps()
            .iter()
            .filter_map(|loc| self.in_scope(loc))
            .collect();

        for path in WELL_KNOWN_SITEMAPS {
            let url = self.ctx.scope.at_path(path);
            if !entries.contains(&url) {
                entries.push(url);
            }
        }

        entries
    }

    /// Canonicalizes a location and keeps it only if it is on the crawl origin
    fn in_scope(&self, location: &str) -> Option<Url> {
        let url = match canonicalize(location) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Ignoring sitemap entry '{}': {}", location, e);
                return None;
            }
        };

        if !self.ctx.scope.contains(&url) {
            tracing::debug!("Ignoring out-of-scope sitemap entry {}", url);
            return None;
        }

        Some(url)
    }

    /// Like `in_scope`, additionally requiring robots permission
    fn admit(&self, location: &str) -> Option<Url> {
        self.in_scope(location)
            .filter(|url| self.ctx.gate.allowed(url))
    }
}
