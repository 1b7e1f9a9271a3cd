use url::Url;

/// Extracts the host from a URL
///
/// The host is returned lowercase and without the port. URLs without a host
/// (which shouldn't happen for valid HTTP(S) URLs) return None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitewalk::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if `url` lives on exactly `host`
///
/// Subdomains do not count: `blog.example.com` is a different site from
/// `example.com` for crawl confinement purposes.
pub fn same_host(url: &Url, host: &str) -> bool {
    extract_host(url).is_some_and(|h| h == host)
}
