use crate::UrlError;
use url::Url;

/// Tracking query parameters that never change page content
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "mc_cid", "msclkid"];

/// Normalizes a URL into its visited-set key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not absolute
/// 2. Reject anything but `http` and `https`
/// 3. Lowercase the host (done by the parser for HTTP(S))
/// 4. Remove the fragment
/// 5. Remove tracking query parameters, keeping the order of the rest
/// 6. Remove an empty query string
///
/// Scheme, port and path are kept as-is so the normalized URL is still the
/// one that gets fetched and recorded.
///
/// # Examples
///
/// ```
/// use sitewalk::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/page?utm_source=x&id=3#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page?id=3");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
