use crate::aggregator::Aggregator;
use crate::content::ContentAnalyzer;
use crate::error::AnalysisError;
use crate::fetcher::PageFetcher;
use crate::http_client::{build_http_client, build_probe_client};
use crate::link_checker::{LinkCache, LinkChecker, LinkTargets};
use crate::models::{
    AdvancedChecks, AnalysisReport, AnalysisRequest, LinkValidationReport, PageResult, PageStatus,
};
use crate::performance::PerformanceAnalyzer;
use crate::robots::check_robots;
use crate::scoring::ScoreEngine;
use crate::seo_analyzer::SeoAnalyzer;
use crate::sitemap::SitemapResolver;
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DELAY_SECS: f64 = 0.5;
pub const DEFAULT_BATCH_SIZE: usize = 5;

const MAX_LINK_DELAY: Duration = Duration::from_millis(100);
const SITEMAP_DELAY: Duration = Duration::from_millis(500);
const LARGE_SITE_URLS: usize = 1000;
const BROKEN_LINK_ERROR_THRESHOLD: usize = 5;

pub const PAGE_LOAD_FAILED: &str = "page could not be loaded";

/// Resolved settings for one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// Per-request timeout, shared by every HTTP call of the run
    pub timeout: Duration,
    /// Pause before each page fetch
    pub delay: Duration,
    /// Pause between link-validation batches
    pub link_delay: Duration,
    /// Pause before each nested sitemap fetch
    pub sitemap_delay: Duration,
    pub batch_size: usize,
    pub limit: Option<usize>,
    pub skip_links: bool,
    pub keyword: Option<String>,
    pub show_progress: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            delay: secs_to_duration(DEFAULT_DELAY_SECS),
            link_delay: secs_to_duration(DEFAULT_DELAY_SECS).min(MAX_LINK_DELAY),
            sitemap_delay: SITEMAP_DELAY,
            batch_size: DEFAULT_BATCH_SIZE,
            limit: None,
            skip_links: false,
            keyword: None,
            show_progress: false,
        }
    }
}

impl AnalysisOptions {
    /// Sets the page delay; link batches wait the same, capped at 100ms.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self.link_delay = delay.min(MAX_LINK_DELAY);
        self
    }

    pub fn from_request(request: &AnalysisRequest) -> Self {
        let mut options = Self::default();
        if let Some(timeout) = request.timeout {
            options.timeout = Duration::from_secs(timeout);
        }
        if let Some(delay) = request.delay {
            options = options.with_delay(secs_to_duration(delay));
        }
        options.limit = request.limit;
        options.skip_links = request.skip_links;
        options
    }
}

/// Negative or non-finite values become zero
pub fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_default()
}

/// Checks that `url` is an absolute http(s) URL
pub fn validate_url(url: &str) -> Result<Url, AnalysisError> {
    let trimmed = url.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(AnalysisError::InvalidUrl(url.to_string()));
    }
    Url::parse(trimmed).map_err(|_| AnalysisError::InvalidUrl(url.to_string()))
}

/// Runs the full pipeline for an inbound request
pub async fn analyze_site(request: AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
    let options = AnalysisOptions::from_request(&request);
    SiteAnalyzer::new(&request.url, options)?.run().await
}

/// Sitemap-driven audit of a whole site
pub struct SiteAnalyzer {
    base_url: Url,
    options: AnalysisOptions,
    progress_bar: Option<ProgressBar>,
}

/// Per-run collaborators handed to each page analysis
struct PageContext<'a> {
    fetcher: &'a PageFetcher,
    performance: &'a PerformanceAnalyzer,
    link_checker: &'a LinkChecker,
    link_cache: &'a LinkCache,
}

impl SiteAnalyzer {
    pub fn new(url: &str, options: AnalysisOptions) -> Result<Self, AnalysisError> {
        let base_url = validate_url(url)?;
        let progress_bar = options.show_progress.then(Self::progress_bar);

        Ok(Self {
            base_url,
            options,
            progress_bar,
        })
    }

    fn progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {wide_msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }

    pub async fn run(&self) -> Result<AnalysisReport, AnalysisError> {
        let timeout = self.options.timeout;
        let client = build_http_client(timeout, true)?;
        let fetcher = PageFetcher::new(build_http_client(timeout, false)?);
        let performance = PerformanceAnalyzer::new(build_probe_client(timeout)?);
        let link_checker = LinkChecker::new(
            client.clone(),
            self.options.batch_size,
            self.options.link_delay,
        );
        let link_cache = LinkCache::new();

        let resolver =
            SitemapResolver::new(client.clone(), self.base_url.clone(), self.options.sitemap_delay);
        let (sitemap_url, mut urls) = resolver.get_all_urls().await?;

        if let Some(limit) = self.options.limit.filter(|&limit| limit > 0) {
            urls.truncate(limit);
        }
        if urls.len() > LARGE_SITE_URLS {
            tracing::warn!(
                count = urls.len(),
                "Large site; consider --limit or --skip-links to shorten the run"
            );
        }

        let ctx = PageContext {
            fetcher: &fetcher,
            performance: &performance,
            link_checker: &link_checker,
            link_cache: &link_cache,
        };

        if let Some(pb) = &self.progress_bar {
            pb.set_length(urls.len() as u64);
        }

        let mut results = Vec::with_capacity(urls.len());
        for url in &urls {
            if let Some(pb) = &self.progress_bar {
                pb.set_message(url.clone());
            }

            let page = self.analyze_page(url, &ctx).await;
            tracing::info!(url = %url, status = %page.status(), issues = page.issues().len(), "Analyzed page");
            results.push(page);

            if let Some(pb) = &self.progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = &self.progress_bar {
            pb.finish_and_clear();
        }

        let duplicates = Aggregator::detect_duplicates(&results);
        if !duplicates.is_empty() {
            tracing::info!(
                titles = duplicates.titles.len(),
                descriptions = duplicates.descriptions.len(),
                "Found duplicate titles or descriptions"
            );
            Aggregator::annotate_duplicates(&mut results, &duplicates);
        }
        let statistics = Aggregator::compute_statistics(&results);

        let advanced_checks = AdvancedChecks {
            sitemap: resolver.check(Some(&sitemap_url)).await,
            robots: check_robots(&client, &self.base_url).await,
        };

        Ok(AnalysisReport {
            results,
            duplicate_titles: duplicates.titles,
            duplicate_descriptions: duplicates.descriptions,
            advanced_checks,
            statistics,
        })
    }

    async fn analyze_page(&self, url: &str, ctx: &PageContext<'_>) -> PageResult {
        if !self.options.delay.is_zero() {
            tokio::time::sleep(self.options.delay).await;
        }

        let Some(fetched) = ctx.fetcher.fetch(url).await else {
            let mut page = PageResult::new(url);
            page.fail(PAGE_LOAD_FAILED);
            return page;
        };

        // Html is !Send, keep it out of any await
        let (mut page, content, targets) = {
            let document = Html::parse_document(&fetched.html);
            let page = SeoAnalyzer::analyze(&document, &fetched);
            let content = ContentAnalyzer::analyze(&document, self.options.keyword.as_deref());
            let targets = if self.options.skip_links {
                None
            } else {
                Url::parse(&fetched.final_url)
                    .ok()
                    .map(|final_url| LinkTargets::from_document(&document, &final_url))
            };
            (page, content, targets)
        };

        let headers = ctx.performance.headers_for(&fetched).await;
        let performance = PerformanceAnalyzer::analyze(&fetched.html, &headers);

        if let Some(targets) = targets {
            let report = ctx.link_checker.validate(&targets, ctx.link_cache).await;
            record_broken_links(&mut page, report);
        }

        page.seo_score = Some(ScoreEngine::score(&page, Some(&content), Some(&performance)));
        page.content_metrics = Some(content);
        page.performance_metrics = Some(performance);
        page
    }
}

/// Stores a link report on the page: any broken target is a warning, more
/// than five is an error.
pub fn record_broken_links(page: &mut PageResult, report: LinkValidationReport) {
    page.broken_links_count = report.total_broken;

    if report.total_broken > 0 {
        page.warn(format!("{} broken links/images", report.total_broken));
        if report.total_broken > BROKEN_LINK_ERROR_THRESHOLD {
            page.escalate(PageStatus::Error);
        }
    }

    page.broken_links_detail = Some(report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BrokenLink;

    fn report_with(broken: usize) -> LinkValidationReport {
        LinkValidationReport {
            total_broken: broken,
            checked: 10,
            broken_links: (0..broken)
                .map(|i| BrokenLink {
                    url: format!("https://example.com/missing/{}", i),
                    status: 404,
                    error: Some("Not Found".to_string()),
                })
                .collect(),
            broken_images: vec![],
        }
    }

    #[test]
    fn test_default_options() {
        let options = AnalysisOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.delay, Duration::from_millis(500));
        assert_eq!(options.link_delay, Duration::from_millis(100));
        assert_eq!(options.sitemap_delay, Duration::from_millis(500));
        assert_eq!(options.batch_size, 5);
        assert!(!options.skip_links);
    }

    #[test]
    fn test_options_from_request() {
        let request = AnalysisRequest {
            url: "https://example.com".to_string(),
            timeout: Some(3),
            delay: Some(0.05),
            limit: Some(20),
            skip_links: true,
        };

        let options = AnalysisOptions::from_request(&request);
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert_eq!(options.delay, Duration::from_millis(50));
        assert_eq!(options.link_delay, Duration::from_millis(50));
        assert_eq!(options.limit, Some(20));
        assert!(options.skip_links);
    }

    #[test]
    fn test_negative_delay_is_zero() {
        assert_eq!(secs_to_duration(-1.0), Duration::ZERO);
        assert_eq!(secs_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(secs_to_duration(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://example.com/shop").is_ok());
        assert!(matches!(
            validate_url("example.com"),
            Err(AnalysisError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(AnalysisError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("https://"),
            Err(AnalysisError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_broken_link_escalation() {
        let mut clean = PageResult::new("https://example.com/");
        record_broken_links(&mut clean, report_with(0));
        assert_eq!(clean.status(), PageStatus::Ok);
        assert_eq!(clean.broken_links_count, 0);
        assert!(clean.broken_links_detail.is_some());

        let mut few = PageResult::new("https://example.com/");
        record_broken_links(&mut few, report_with(2));
        assert_eq!(few.status(), PageStatus::Warning);
        assert!(few.has_issue("2 broken links/images"));

        let mut many = PageResult::new("https://example.com/");
        record_broken_links(&mut many, report_with(6));
        assert_eq!(many.status(), PageStatus::Error);
        assert_eq!(many.broken_links_count, 6);
    }
}
