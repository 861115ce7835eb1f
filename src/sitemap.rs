use crate::error::AnalysisError;
use crate::models::SitemapCheck;
use crate::robots::{RobotsTxt, fetch_robots_txt};
use anyhow::{Context, Result, anyhow};
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Well-known sitemap locations, probed in order
const SITEMAP_PATHS: [&str; 3] = ["/sitemap.xml", "/sitemap_index.xml", "/sitemap1.xml"];

/// A `<loc>` entry from either a urlset or a sitemap index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapLoc {
    pub loc: String,
    pub lastmod: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: nested sitemap URLs
    Index(Vec<SitemapLoc>),
    /// `<urlset>`: page URLs
    UrlSet(Vec<SitemapLoc>),
}

impl SitemapDocument {
    pub fn entries(&self) -> &[SitemapLoc] {
        match self {
            SitemapDocument::Index(entries) | SitemapDocument::UrlSet(entries) => entries,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SitemapParseError {
    #[error("invalid XML: {0}")]
    Xml(String),
    #[error("unexpected root element <{0}>")]
    UnexpectedRoot(String),
    #[error("document has no root element")]
    NoRoot,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    Lastmod,
}

/// Depth of `<url>`/`<sitemap>` under the root, and of their `<loc>`/`<lastmod>`
const ENTRY_DEPTH: usize = 2;
const FIELD_DEPTH: usize = 3;

/// Parses a sitemap document, matching elements by local name so any
/// namespace prefix is accepted. Only direct children of an entry are read,
/// so extension elements such as `<image:loc>` are ignored.
pub fn parse_sitemap_document(xml: &[u8]) -> Result<SitemapDocument, SitemapParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut is_index: Option<bool> = None;
    let mut entries = Vec::new();
    let mut field: Option<Field> = None;
    let mut loc = String::new();
    let mut lastmod = String::new();
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| SitemapParseError::Xml(e.to_string()))?;

        let opens_element = matches!(event, Event::Start(_));
        match event {
            Event::Start(e) | Event::Empty(e) if is_index.is_none() => {
                match e.local_name().as_ref() {
                    b"urlset" => is_index = Some(false),
                    b"sitemapindex" => is_index = Some(true),
                    other => {
                        return Err(SitemapParseError::UnexpectedRoot(
                            String::from_utf8_lossy(other).into_owned(),
                        ));
                    }
                }
                if opens_element {
                    depth = 1;
                }
            }
            Event::Start(e) => {
                depth += 1;
                match (depth, e.local_name().as_ref()) {
                    (ENTRY_DEPTH, b"url" | b"sitemap") => {
                        loc.clear();
                        lastmod.clear();
                    }
                    (FIELD_DEPTH, b"loc") => field = Some(Field::Loc),
                    (FIELD_DEPTH, b"lastmod") => field = Some(Field::Lastmod),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let Some(field) = field {
                    let text = t
                        .unescape()
                        .map_err(|e| SitemapParseError::Xml(e.to_string()))?;
                    push_text(field, &text, &mut loc, &mut lastmod);
                }
            }
            Event::CData(t) => {
                if let Some(field) = field {
                    let bytes = t.into_inner();
                    push_text(field, &String::from_utf8_lossy(&bytes), &mut loc, &mut lastmod);
                }
            }
            Event::End(e) => {
                match (depth, e.local_name().as_ref()) {
                    (FIELD_DEPTH, b"loc" | b"lastmod") => field = None,
                    (ENTRY_DEPTH, b"url" | b"sitemap") => {
                        let entry_loc = loc.trim();
                        if !entry_loc.is_empty() {
                            let entry_lastmod = lastmod.trim();
                            entries.push(SitemapLoc {
                                loc: entry_loc.to_string(),
                                lastmod: (!entry_lastmod.is_empty())
                                    .then(|| entry_lastmod.to_string()),
                            });
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    match is_index {
        Some(true) => Ok(SitemapDocument::Index(entries)),
        Some(false) => Ok(SitemapDocument::UrlSet(entries)),
        None => Err(SitemapParseError::NoRoot),
    }
}

fn push_text(field: Field, text: &str, loc: &mut String, lastmod: &mut String) {
    match field {
        Field::Loc => loc.push_str(text),
        Field::Lastmod => lastmod.push_str(text),
    }
}

/// Finds a site's sitemap and flattens it into a sorted list of page URLs
pub struct SitemapResolver {
    client: Client,
    base_url: Url,
    nested_delay: Duration,
}

impl SitemapResolver {
    /// `client` should follow redirects; `nested_delay` paces nested sitemap fetches.
    pub fn new(client: Client, base_url: Url, nested_delay: Duration) -> Self {
        Self {
            client,
            base_url,
            nested_delay,
        }
    }

    /// Probes the well-known locations, then robots.txt `Sitemap:` lines
    pub async fn find_sitemap(&self) -> Option<String> {
        for path in SITEMAP_PATHS {
            let Ok(candidate) = self.base_url.join(path) else {
                continue;
            };

            match self.client.head(candidate.as_str()).send().await {
                Ok(response) => {
                    let is_xml = response
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|ct| ct.to_lowercase().contains("xml"));

                    if response.status().as_u16() == 200 && is_xml {
                        return Some(response.url().to_string());
                    }
                }
                Err(e) => {
                    tracing::debug!(url = %candidate, error = %e, "Sitemap probe failed");
                }
            }
        }

        let robots = match fetch_robots_txt(&self.client, &self.base_url).await {
            Ok(Some(content)) => RobotsTxt::parse(&content),
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch robots.txt while looking for a sitemap");
                return None;
            }
        };

        for sitemap_url in robots.sitemaps() {
            match self.client.head(sitemap_url).send().await {
                Ok(response) if response.status().as_u16() == 200 => {
                    return Some(sitemap_url.clone());
                }
                Ok(response) => {
                    tracing::debug!(url = %sitemap_url, status = %response.status(), "Declared sitemap unreachable");
                }
                Err(e) => {
                    tracing::debug!(url = %sitemap_url, error = %e, "Declared sitemap unreachable");
                }
            }
        }

        None
    }

    async fn fetch_document(&self, url: &str) -> Result<SitemapDocument> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch sitemap {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {}", status));
        }

        let body = response.bytes().await?;
        Ok(parse_sitemap_document(&body)?)
    }

    /// Walks the sitemap tree rooted at `root_url`.
    ///
    /// Every sitemap URL is fetched at most once. Failures below the root are
    /// logged and contribute nothing; a failing root is an error.
    pub async fn parse_sitemap(&self, root_url: &str) -> Result<BTreeSet<String>> {
        let mut urls = BTreeSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut pending: Vec<String> = Vec::new();

        let root_url = normalize_url(root_url);
        visited.insert(root_url.clone());
        let root = self.fetch_document(&root_url).await?;
        self.collect(&root_url, root, &mut urls, &mut pending, &visited);

        while let Some(sitemap_url) = pending.pop() {
            if !visited.insert(sitemap_url.clone()) {
                continue;
            }

            tokio::time::sleep(self.nested_delay).await;

            match self.fetch_document(&sitemap_url).await {
                Ok(document) => {
                    self.collect(&sitemap_url, document, &mut urls, &mut pending, &visited)
                }
                Err(e) => {
                    tracing::warn!(url = %sitemap_url, error = %e, "Skipping unreadable nested sitemap");
                }
            }
        }

        Ok(urls)
    }

    fn collect(
        &self,
        source: &str,
        document: SitemapDocument,
        urls: &mut BTreeSet<String>,
        pending: &mut Vec<String>,
        visited: &HashSet<String>,
    ) {
        match document {
            SitemapDocument::UrlSet(entries) => {
                tracing::debug!(url = %source, count = entries.len(), "Parsed urlset");
                urls.extend(entries.into_iter().map(|entry| entry.loc));
            }
            SitemapDocument::Index(entries) => {
                tracing::debug!(url = %source, count = entries.len(), "Parsed sitemap index");
                // Reversed so the stack pops children in document order
                for entry in entries.into_iter().rev() {
                    let child = resolve_loc(source, &entry.loc);
                    if !visited.contains(&child) {
                        pending.push(child);
                    }
                }
            }
        }
    }

    /// Discovers the sitemap and returns every page URL it declares, sorted
    pub async fn get_all_urls(&self) -> Result<(String, Vec<String>), AnalysisError> {
        let sitemap_url = self
            .find_sitemap()
            .await
            .ok_or_else(|| AnalysisError::SitemapNotFound(self.base_url.to_string()))?;

        tracing::info!(url = %sitemap_url, "Found sitemap");

        let urls = self
            .parse_sitemap(&sitemap_url)
            .await
            .map_err(|e| AnalysisError::SitemapUnreadable {
                url: sitemap_url.clone(),
                reason: format!("{:#}", e),
            })?;

        if urls.is_empty() {
            return Err(AnalysisError::EmptySitemap(sitemap_url));
        }

        tracing::info!(count = urls.len(), "Collected sitemap URLs");
        Ok((sitemap_url, urls.into_iter().collect()))
    }

    /// Structural check of a sitemap for the advanced checks report
    pub async fn check(&self, sitemap_url: Option<&str>) -> SitemapCheck {
        let Some(sitemap_url) = sitemap_url else {
            return SitemapCheck {
                valid: false,
                url: None,
                issues: vec!["sitemap not found".to_string()],
            };
        };

        let mut check = SitemapCheck {
            valid: false,
            url: Some(sitemap_url.to_string()),
            issues: Vec::new(),
        };

        let body = match self.client.get(sitemap_url).send().await {
            Ok(response) if response.status().is_success() => response.bytes().await,
            Ok(response) => {
                check
                    .issues
                    .push(format!("sitemap could not be fetched (HTTP {})", response.status()));
                return check;
            }
            Err(e) => Err(e),
        };

        let body = match body {
            Ok(body) => body,
            Err(e) => {
                check.issues.push(format!("sitemap could not be fetched: {}", e));
                return check;
            }
        };

        match parse_sitemap_document(&body) {
            Ok(document) => {
                let entries = document.entries();
                if entries.is_empty() {
                    check.issues.push("sitemap is empty".to_string());
                    return check;
                }

                check.valid = true;
                let undated = entries.iter().filter(|e| e.lastmod.is_none()).count();
                if undated > 0 {
                    check.issues.push(format!(
                        "{} of {} entries have no lastmod date",
                        undated,
                        entries.len()
                    ));
                }
            }
            Err(SitemapParseError::Xml(_)) => {
                check.issues.push("sitemap is not valid XML".to_string());
            }
            Err(_) => {
                check
                    .issues
                    .push("sitemap has no urlset or sitemapindex root".to_string());
            }
        }

        check
    }
}

/// Resolves a possibly-relative `<loc>` against the sitemap that declared it
fn normalize_url(raw: &str) -> String {
    Url::parse(raw)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn resolve_loc(source: &str, loc: &str) -> String {
    Url::parse(source)
        .and_then(|base| base.join(loc))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| loc.to_string())
}
