//! URL handling module for Site-Gleaner
//!
//! This module provides URL canonicalization and the origin scope that bounds
//! every crawl run.

mod normalize;

use crate::UrlResult;
use ::url::{Origin, Url};

// Re-export main functions
pub use normalize::{canonicalize, canonicalize_url};

/// The crawl boundary: scheme, host and port of the configured root URL
///
/// Every URL that is discovered or fetched during a run must belong to this
/// scope. Membership is decided on the URL's origin, so
/// `https://example.test` and `http://example.test` are different scopes, as
/// are `example.test` and `www.example.test`.
#[derive(Debug, Clone)]
pub struct SiteScope {
    root: Url,
    origin: Origin,
}

impl SiteScope {
    /// Creates a scope from the root URL string
    ///
    /// # Returns
    ///
    /// * `Ok(SiteScope)` - Canonical root and its origin
    /// * `Err(UrlError)` - The root is malformed or not HTTP(S)
    pub fn new(root: &str) -> UrlResult<Self> {
        let root = canonicalize(root)?;
        let origin = root.origin();
        Ok(Self { root, origin })
    }

    /// The canonical root URL, starting point of breadth-first discovery
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Returns true if the URL lies within the crawl origin
    pub fn contains(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    /// Location of the origin's robots.txt
    pub fn robots_url(&self) -> Url {
        self.at_path("/robots.txt")
    }

    /// Builds a URL on the crawl origin with the given absolute path
    pub fn at_path(&self, path: &str) -> Url {
        let mut url = self.root.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    /// Source label used for records when none is configured
    ///
    /// This is the root host without a leading `www.`.
    pub fn default_source(&self) -> String {
        let host = self.root.host_str().unwrap_or_default();
        host.strip_prefix("www.").unwrap_or(host).to_string()
    }
}
