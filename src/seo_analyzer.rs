use crate::fetcher::FetchedPage;
use crate::models::{HreflangEntry, PageResult, StructuredDataEntry, StructuredDataKind};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
/// Pages above this size get a "page too large" issue
pub const MAX_PAGE_BYTES: u64 = 3 * 1024 * 1024;

const TITLE_MIN: usize = 50;
const TITLE_MAX: usize = 60;
const DESCRIPTION_MIN: usize = 150;
const DESCRIPTION_MAX: usize = 160;
/// More images without alt text than this makes the page an error
const MISSING_ALT_ERROR_THRESHOLD: usize = 5;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("title selector should be valid"));
static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[content]").expect("meta selector should be valid"));
static H1_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1").expect("h1 selector should be valid"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("img selector should be valid"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("a[href] selector should be valid"));
static CANONICAL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("link[rel='canonical'][href]").expect("canonical selector should be valid")
});
static HREFLANG_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("link[rel='alternate'][hreflang][href]")
        .expect("hreflang selector should be valid")
});
static FAVICON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("link[rel~='icon'][href]").expect("favicon selector should be valid")
});
static JSON_LD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("JSON-LD selector should be valid")
});
static MICRODATA_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[itemscope]").expect("itemscope selector should be valid"));
static RDFA_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[typeof]").expect("typeof selector should be valid"));

pub struct SeoAnalyzer;

impl SeoAnalyzer {
    /// Extracts and validates a fetched page.
    ///
    /// Relative references and the canonical are resolved against the URL
    /// the page was served from; the result keeps the requested URL.
    pub fn analyze(document: &Html, fetched: &FetchedPage) -> PageResult {
        let mut page = match Url::parse(&fetched.final_url) {
            Ok(final_url) => Self::extract(document, &final_url),
            Err(_) => PageResult::new(fetched.final_url.clone()),
        };

        page.page_size = Some(fetched.size);
        page.redirect_type = fetched.redirect_type;

        Self::validate(&mut page);
        page.url = fetched.url.clone();
        page
    }

    /// Pulls every on-page SEO attribute out of `document`. No rules are applied.
    pub fn extract(document: &Html, page_url: &Url) -> PageResult {
        let mut page = PageResult::new(page_url.as_str());
        let meta = collect_meta(document);
        let meta_get = |key: &str| meta.get(key).cloned();

        page.title = document.select(&TITLE_SELECTOR).next().and_then(element_text);
        page.meta_description = meta_get("description");
        page.h1 = document.select(&H1_SELECTOR).next().and_then(element_text);

        page.og_title = meta_get("og:title");
        // Falls back to the meta description
        page.og_description = meta_get("og:description").or_else(|| page.meta_description.clone());
        page.og_image = meta_get("og:image");
        page.og_url = meta_get("og:url");
        page.og_type = meta_get("og:type");

        page.twitter_card = meta_get("twitter:card");
        page.twitter_title = meta_get("twitter:title");
        page.twitter_description = meta_get("twitter:description");
        page.twitter_image = meta_get("twitter:image");

        page.robots = meta_get("robots");
        page.viewport = meta_get("viewport");
        page.mobile_friendly = page.viewport.is_some();
        page.https = page_url.scheme() == "https";

        page.canonical = document
            .select(&CANONICAL_SELECTOR)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty());

        page.favicon = document
            .select(&FAVICON_SELECTOR)
            .filter_map(|el| el.value().attr("href"))
            .find_map(|href| page_url.join(href.trim()).ok())
            .map(|url| url.to_string());

        page.hreflang = document
            .select(&HREFLANG_SELECTOR)
            .filter_map(|el| {
                let lang = el.value().attr("hreflang")?.trim();
                let href = el.value().attr("href")?;
                let url = page_url.join(href.trim()).ok()?;
                Some(HreflangEntry {
                    lang: lang.to_string(),
                    url: url.to_string(),
                })
            })
            .collect();

        page.structured_data = extract_structured_data(document);

        for img in document.select(&IMG_SELECTOR) {
            page.images_total += 1;
            let has_alt = img
                .value()
                .attr("alt")
                .is_some_and(|alt| !alt.trim().is_empty());
            if !has_alt {
                page.images_without_alt += 1;
            }
        }

        for anchor in document.select(&ANCHOR_SELECTOR) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            match classify_link(href, page_url) {
                Some(LinkScope::Internal) => page.internal_links_count += 1,
                Some(LinkScope::External) => page.external_links_count += 1,
                None => {}
            }
        }

        page
    }

    /// Applies the single-page rules. Each failing rule adds one issue.
    pub fn validate(page: &mut PageResult) {
        match page.title.as_deref().map(|t| t.chars().count()) {
            None => page.warn("missing title"),
            Some(len) if len < TITLE_MIN => page.warn(format!("title too short ({} chars)", len)),
            Some(len) if len > TITLE_MAX => page.warn(format!("title too long ({} chars)", len)),
            Some(_) => {}
        }

        match page.meta_description.as_deref().map(|d| d.chars().count()) {
            None => page.warn("missing description"),
            Some(len) if len < DESCRIPTION_MIN => {
                page.warn(format!("description too short ({} chars)", len))
            }
            Some(len) if len > DESCRIPTION_MAX => {
                page.warn(format!("description too long ({} chars)", len))
            }
            Some(_) => {}
        }

        if page.h1.is_none() {
            page.warn("missing h1");
        }

        if let Some(canonical) = page.canonical.clone() {
            if let Ok(page_url) = Url::parse(&page.url) {
                match page_url.join(&canonical) {
                    Ok(target) if without_fragment(&target) != without_fragment(&page_url) => {
                        page.warn(format!("canonical mismatch (points to {})", target));
                    }
                    Ok(_) => {}
                    Err(_) => page.warn("invalid canonical"),
                }
            }
        }

        let invalid_json_ld: Vec<String> = page
            .structured_data
            .iter()
            .filter(|entry| entry.kind == StructuredDataKind::JsonLd && !entry.valid)
            .map(|entry| entry.errors.join(", "))
            .collect();
        for errors in invalid_json_ld {
            page.warn(format!("invalid structured data (JSON-LD): {}", errors));
        }

        if page.images_without_alt > 0 {
            let issue = format!("{} images without alt text", page.images_without_alt);
            if page.images_without_alt > MISSING_ALT_ERROR_THRESHOLD {
                page.fail(issue);
            } else {
                page.warn(issue);
            }
        }

        if !page.https {
            page.warn("page is not served over HTTPS");
        }

        if page.viewport.is_none() {
            page.warn("missing viewport meta tag");
        }

        if page.favicon.is_none() {
            page.warn("missing favicon");
        }

        if let Some(size) = page.page_size
            && size > MAX_PAGE_BYTES
        {
            page.warn(format!("page too large ({:.2} MB)", size as f64 / BYTES_PER_MB));
        }

        if page.redirect_type == Some(302) {
            page.warn("uses temporary redirect, 301 recommended");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    Internal,
    External,
}

/// Classifies an anchor href relative to the page it appears on.
///
/// Returns `None` for links that are not counted: fragments, `mailto:`,
/// `tel:`, `javascript:` and non-HTTP schemes.
pub fn classify_link(href: &str, page_url: &Url) -> Option<LinkScope> {
    let href = href.trim();
    let lower = href.to_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("javascript:")
    {
        return None;
    }

    let target = page_url.join(href).ok()?;
    if !matches!(target.scheme(), "http" | "https") {
        return None;
    }

    match (target.host_str(), page_url.host_str()) {
        (Some(link_host), Some(page_host)) if is_same_site(link_host, page_host) => {
            Some(LinkScope::Internal)
        }
        _ => Some(LinkScope::External),
    }
}

/// Same host or a subdomain of it, ignoring a leading `www.`
fn is_same_site(link_host: &str, page_host: &str) -> bool {
    let link_host = link_host.to_lowercase();
    let page_host = page_host.to_lowercase();
    let link_host = link_host.strip_prefix("www.").unwrap_or(&link_host);
    let page_host = page_host.strip_prefix("www.").unwrap_or(&page_host);
    link_host == page_host || link_host.ends_with(&format!(".{}", page_host))
}

fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Maps lowercased `name`/`property` to the first non-empty `content`
fn collect_meta(document: &Html) -> HashMap<String, String> {
    let mut meta = HashMap::new();
    for element in document.select(&META_SELECTOR) {
        let value = element.value();
        let Some(content) = value.attr("content").map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        for key in [value.attr("name"), value.attr("property")].into_iter().flatten() {
            meta.entry(key.trim().to_lowercase())
                .or_insert_with(|| content.to_string());
        }
    }
    meta
}

fn extract_structured_data(document: &Html) -> Vec<StructuredDataEntry> {
    let mut entries = Vec::new();

    for script in document.select(&JSON_LD_SELECTOR) {
        let raw = script.text().collect::<String>();
        let entry = match serde_json::from_str::<Value>(raw.trim()) {
            Ok(data) => {
                let errors = json_ld_errors(&data);
                StructuredDataEntry {
                    kind: StructuredDataKind::JsonLd,
                    valid: errors.is_empty(),
                    data,
                    errors,
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Invalid JSON-LD block");
                StructuredDataEntry {
                    kind: StructuredDataKind::JsonLd,
                    data: Value::String(raw.trim().to_string()),
                    valid: false,
                    errors: vec!["invalid JSON".to_string()],
                }
            }
        };
        entries.push(entry);
    }

    let itemtypes = typed_markers(document, &MICRODATA_SELECTOR, "itemtype");
    if let Some(types) = itemtypes {
        entries.push(StructuredDataEntry {
            kind: StructuredDataKind::Microdata,
            data: types,
            valid: true,
            errors: Vec::new(),
        });
    }

    if let Some(types) = typed_markers(document, &RDFA_SELECTOR, "typeof") {
        entries.push(StructuredDataEntry {
            kind: StructuredDataKind::Rdfa,
            data: types,
            valid: true,
            errors: Vec::new(),
        });
    }

    entries
}

/// `None` when no element matches; otherwise the distinct `attr` values found
fn typed_markers(document: &Html, selector: &Selector, attr: &str) -> Option<Value> {
    let mut elements = document.select(selector).peekable();
    elements.peek()?;

    let mut types: Vec<Value> = Vec::new();
    for element in elements {
        if let Some(value) = element.value().attr(attr).map(str::trim).filter(|v| !v.is_empty()) {
            let value = Value::String(value.to_string());
            if !types.contains(&value) {
                types.push(value);
            }
        }
    }
    Some(Value::Array(types))
}

fn json_ld_errors(data: &Value) -> Vec<String> {
    let items: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            Value::Object(map) if !map.contains_key("@type") && !map.contains_key("@context") => {
                Some(format!("item {} has neither @type nor @context", index))
            }
            Value::Object(_) => None,
            _ => Some(format!("item {} is not an object", index)),
        })
        .collect()
}
