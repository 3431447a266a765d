//! Page to record conversion

use crate::crawler::parser::extract_content;
use crate::storage::PageRecord;
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use url::Url;

/// Timestamp layout of `PageRecord::retrieved_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Stable record id: lowercase hex SHA-1 of the URL string
///
/// Output directories keyed this way stay valid across re-crawls.
pub fn record_id(url: &Url) -> String {
    hex::encode(Sha1::digest(url.as_str().as_bytes()))
}

/// Turns fetched HTML into page records
#[derive(Debug, Clone)]
pub struct Extractor {
    source: String,
}

impl Extractor {
    /// Creates an extractor stamping records with `source`
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Extracts a record stamped with the current time
    ///
    /// Returns `None` when the page has no visible text.
    pub fn extract(&self, url: &Url, html: &str) -> Option<PageRecord> {
        self.extract_at(url, html, Utc::now())
    }

    /// Extracts a record stamped with the given retrieval time
    pub fn extract_at(
        &self,
        url: &Url,
        html: &str,
        retrieved_at: DateTime<Utc>,
    ) -> Option<PageRecord> {
        let (title, text) = extract_content(html);
        if text.is_empty() {
            return None;
        }

        Some(PageRecord {
            id: record_id(url),
            url: url.to_string(),
            title: title.unwrap_or_default(),
            text,
            retrieved_at: retrieved_at.format(TIMESTAMP_FORMAT).to_string(),
            source: self.source.clone(),
        })
    }
}
