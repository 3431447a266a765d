use crate::UrlError;
use url::Url;

/// Canonicalizes a URL string according to Site-Gleaner's identity rules
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Reject URLs without a host
/// 4. Lowercase the host, drop the default port, resolve dot segments
///    (done by the `url` parser)
/// 5. Remove the fragment (everything after #)
/// 6. Remove an empty query string (trailing ?)
///
/// Paths and query parameters are otherwise kept verbatim: the canonical form
/// is also the address that gets fetched, so it must stay servable.
///
/// # Examples
///
/// ```
/// use site_gleaner::url::canonicalize;
///
/// let url = canonicalize("https://EXAMPLE.test:443/page#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.test/page");
/// ```
pub fn canonicalize(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize_url(url)
}

/// Canonicalizes an already parsed URL
///
/// See [`canonicalize`] for the rules applied.
pub fn canonicalize_url(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}
