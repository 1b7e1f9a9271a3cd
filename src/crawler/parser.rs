//! HTML parser for extracting links and metadata
//!
//! This module turns a fetched HTML document into a [`PageRecord`] plus the
//! list of links found on it. Extraction sits behind the [`PageExtractor`]
//! trait so the crawl loop can be driven with a different extractor.
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `<a href="...">` tags, resolved against the page URL
//!
//! **Exclude:**
//! - `javascript:`, `mailto:`, `tel:` links
//! - Data URIs
//! - Fragment-only links (same page anchors)
//! - Anything that doesn't resolve to an `http`/`https` URL

use crate::state::PageRecord;
use crate::url::normalize_url;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// HTML extraction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Empty document")]
    EmptyDocument,

    #[error("Invalid selector '{0}'")]
    Selector(String),
}

/// Where a page came from; copied into its record
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    /// The URL the page was requested under
    pub url: &'a Url,

    /// Base for resolving relative links (the final URL after redirects)
    pub base_url: &'a Url,

    pub depth: u32,
    pub referrer: Option<&'a str>,
    pub load_time: Duration,
}

/// A page record together with the links discovered on the page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub record: PageRecord,

    /// Absolute, normalized links in document order (not yet filtered by
    /// host or visited state)
    pub links: Vec<Url>,
}

/// Turns HTML into a page record
pub trait PageExtractor: Send + Sync {
    fn extract(&self, html: &str, context: &PageContext<'_>)
        -> Result<ExtractedPage, ExtractError>;
}

/// Default extractor built on `scraper`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PageExtractor for HtmlExtractor {
    fn extract(
        &self,
        html: &str,
        context: &PageContext<'_>,
    ) -> Result<ExtractedPage, ExtractError> {
        if html.trim().is_empty() {
            return Err(ExtractError::EmptyDocument);
        }

        let document = Html::parse_document(html);

        let anchors = selector("a[href]")?;
        let hrefs: Vec<&str> = document
            .select(&anchors)
            .filter_map(|element| element.value().attr("href"))
            .collect();
        let links = hrefs
            .iter()
            .filter_map(|href| resolve_link(href, context.base_url))
            .collect();

        let record = PageRecord {
            url: context.url.to_string(),
            title: extract_title(&document)?,
            description: extract_meta(&document, "description")?,
            keywords: extract_meta(&document, "keywords")?,
            headings: extract_headings(&document)?,
            link_count: hrefs.len(),
            image_count: document.select(&selector("img")?).count(),
            word_count: count_words(&document)?,
            depth: context.depth,
            referrer: context.referrer.map(str::to_string),
            crawled_at: Utc::now(),
            content_length: html.len(),
            load_time_ms: context.load_time.as_millis() as u64,
        };

        Ok(ExtractedPage { record, links })
    }
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))
}

/// Joins an element's text and collapses runs of whitespace
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Result<String, ExtractError> {
    Ok(document
        .select(&selector("title")?)
        .next()
        .map(element_text)
        .unwrap_or_default())
}

/// Content of `<meta name="...">`, matched case-insensitively
fn extract_meta(document: &Html, name: &str) -> Result<String, ExtractError> {
    Ok(document
        .select(&selector("meta[name][content]")?)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default())
}

/// Text of every non-empty h1..h6, keyed by tag name, in document order
fn extract_headings(document: &Html) -> Result<BTreeMap<String, Vec<String>>, ExtractError> {
    let mut headings = BTreeMap::new();

    for level in 1..=6 {
        let tag = format!("h{}", level);
        let texts: Vec<String> = document
            .select(&selector(&tag)?)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();

        if !texts.is_empty() {
            headings.insert(tag, texts);
        }
    }

    Ok(headings)
}

/// Whitespace-separated words in the body's visible text
///
/// Text inside `<script>`, `<style>` and `<noscript>` is not counted.
fn count_words(document: &Html) -> Result<usize, ExtractError> {
    let Some(body) = document.select(&selector("body")?).next() else {
        return Ok(0);
    };

    let count = body
        .descendants()
        .filter(|node| {
            node.parent()
                .and_then(|parent| parent.value().as_element())
                .map_or(true, |element| {
                    !matches!(element.name(), "script" | "style" | "noscript")
                })
        })
        .filter_map(|node| node.value().as_text())
        .map(|text| text.split_whitespace().count())
        .sum();

    Ok(count)
}

/// Resolves a link href to an absolute, normalized URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}
