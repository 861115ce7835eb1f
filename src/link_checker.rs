use crate::models::{BrokenLink, LinkValidationReport};
use futures::future::join_all;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("a[href] selector should be valid"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("img[src] selector should be valid"));

const SKIPPED_PREFIXES: &[&str] = &["#", "mailto:", "tel:", "javascript:", "data:"];

/// Outcome of checking one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    /// HTTP status, or 0 when the request never completed
    pub status: u16,
    pub error: Option<String>,
}

impl LinkStatus {
    pub fn is_broken(&self) -> bool {
        self.status == 0 || self.status >= 400
    }
}

/// Per-run memo of checked URLs. Create one per analysis run and hand it to
/// every `validate` call of that run.
#[derive(Debug, Default)]
pub struct LinkCache {
    entries: Mutex<HashMap<String, LinkStatus>>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<LinkStatus> {
        self.entries.lock().ok()?.get(url).cloned()
    }

    /// A second write for the same URL simply overwrites the first.
    pub fn insert(&self, url: &str, status: LinkStatus) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(url.to_string(), status);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unique, resolved link and image URLs of a page, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTargets {
    pub links: Vec<String>,
    pub images: Vec<String>,
}

impl LinkTargets {
    pub fn from_document(document: &Html, page_url: &Url) -> Self {
        let links = unique_resolved(
            document
                .select(&LINK_SELECTOR)
                .filter_map(|el| el.value().attr("href")),
            page_url,
        );
        let images = unique_resolved(
            document
                .select(&IMG_SELECTOR)
                .filter_map(|el| el.value().attr("src")),
            page_url,
        );

        Self { links, images }
    }

    pub fn len(&self) -> usize {
        self.links.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.images.is_empty()
    }
}

fn unique_resolved<'a>(hrefs: impl Iterator<Item = &'a str>, page_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    hrefs
        .filter_map(|href| resolve_url(href, page_url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Resolves an href against the page it appears on.
///
/// Absolute URLs are kept verbatim; protocol-relative, root-relative and
/// relative paths are joined with the page URL. Fragments, `mailto:`, `tel:`,
/// `javascript:`, `data:` and non-http(s) targets yield `None`.
pub fn resolve_url(href: &str, page_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let lower = href.to_lowercase();
    if SKIPPED_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return None;
    }

    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(href.to_string());
    }

    let resolved = page_url.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Checks link reachability with HEAD requests in fixed-size concurrent
/// batches, pausing between batches.
pub struct LinkChecker {
    client: reqwest::Client,
    batch_size: usize,
    batch_delay: Duration,
}

impl LinkChecker {
    pub fn new(client: reqwest::Client, batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    /// Checks links first, then images. URLs already in `cache` cost no
    /// request.
    pub async fn validate(&self, targets: &LinkTargets, cache: &LinkCache) -> LinkValidationReport {
        if targets.is_empty() {
            return LinkValidationReport::default();
        }

        let broken_links = self.check_batched(&targets.links, cache).await;
        let broken_images = self.check_batched(&targets.images, cache).await;

        LinkValidationReport {
            total_broken: broken_links.len() + broken_images.len(),
            checked: targets.len(),
            broken_links,
            broken_images,
        }
    }

    async fn check_batched(&self, urls: &[String], cache: &LinkCache) -> Vec<BrokenLink> {
        let mut broken = Vec::new();

        for (index, batch) in urls.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let results = join_all(batch.iter().map(|url| self.check_url(url, cache))).await;

            for (url, result) in batch.iter().zip(results) {
                if result.is_broken() {
                    broken.push(BrokenLink {
                        url: url.clone(),
                        status: result.status,
                        error: result.error,
                    });
                }
            }
        }

        broken
    }

    pub async fn check_url(&self, url: &str, cache: &LinkCache) -> LinkStatus {
        if let Some(cached) = cache.get(url) {
            return cached;
        }

        let status = match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                LinkStatus {
                    status: status.as_u16(),
                    error: (!status.is_success() && !status.is_redirection())
                        .then(|| status.canonical_reason().unwrap_or("HTTP error").to_string()),
                }
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Link check failed");
                LinkStatus {
                    status: 0,
                    error: Some(e.to_string()),
                }
            }
        };

        cache.insert(url, status.clone());
        status
    }
}
