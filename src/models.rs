use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic status of a single page. Ordered so that `Ok < Warning < Error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Ok,
    Warning,
    Error,
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageStatus::Ok => write!(f, "ok"),
            PageStatus::Warning => write!(f, "warning"),
            PageStatus::Error => write!(f, "error"),
        }
    }
}

/// Everything learned about one URL from the sitemap.
///
/// `status` and `issues` are private: issues can only be appended and the
/// status can only be escalated, whatever order the rules run in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub og_url: Option<String>,
    pub og_type: Option<String>,
    pub twitter_card: Option<String>,
    pub twitter_title: Option<String>,
    pub twitter_description: Option<String>,
    pub twitter_image: Option<String>,
    pub canonical: Option<String>,
    pub robots: Option<String>,
    pub hreflang: Vec<HreflangEntry>,
    pub structured_data: Vec<StructuredDataEntry>,
    pub favicon: Option<String>,
    pub viewport: Option<String>,
    pub images_total: usize,
    pub images_without_alt: usize,
    pub external_links_count: usize,
    pub internal_links_count: usize,
    pub page_size: Option<u64>,
    pub broken_links_count: usize,
    pub broken_links_detail: Option<LinkValidationReport>,
    pub https: bool,
    pub mobile_friendly: bool,
    pub redirect_type: Option<u16>,
    status: PageStatus,
    issues: Vec<String>,
    pub content_metrics: Option<ContentMetrics>,
    pub performance_metrics: Option<PerformanceMetrics>,
    pub seo_score: Option<SeoScoreResult>,
}

impl PageResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn status(&self) -> PageStatus {
        self.status
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn has_issue(&self, needle: &str) -> bool {
        self.issues.iter().any(|issue| issue.contains(needle))
    }

    /// Raises the status to `status` if it is more severe; never lowers it.
    pub fn escalate(&mut self, status: PageStatus) {
        if status > self.status {
            self.status = status;
        }
    }

    /// Records an issue and escalates to at least `warning`.
    pub fn warn(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
        self.escalate(PageStatus::Warning);
    }

    /// Records an issue and escalates to `error`.
    pub fn fail(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
        self.escalate(PageStatus::Error);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HreflangEntry {
    pub lang: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuredDataKind {
    #[serde(rename = "JSON-LD")]
    JsonLd,
    Microdata,
    #[serde(rename = "RDFa")]
    Rdfa,
}

impl fmt::Display for StructuredDataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuredDataKind::JsonLd => write!(f, "JSON-LD"),
            StructuredDataKind::Microdata => write!(f, "Microdata"),
            StructuredDataKind::Rdfa => write!(f, "RDFa"),
        }
    }
}

/// One structured-data block. Validity is structural only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDataEntry {
    #[serde(rename = "type")]
    pub kind: StructuredDataKind,
    pub data: serde_json::Value,
    pub valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordFrequency {
    pub keyword: String,
    pub count: usize,
    pub density: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub word_count: usize,
    pub character_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub heading_count: usize,
    pub link_count: usize,
    pub image_count: usize,
    pub readability_score: f64,
    pub top_keywords: Vec<KeywordFrequency>,
    pub keyword_density: f64,
    pub target_keyword: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub compression_enabled: bool,
    pub compression_type: Option<String>,
    pub cache_headers_present: bool,
    pub cache_control: Option<String>,
    pub minified: bool,
    pub lazy_loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{}", letter)
    }
}

/// Recommendation priority. Declaration order is the sort order (high first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Basic,
    Content,
    Technical,
    Performance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: ScoreCategory,
    pub issue: String,
    pub recommendation: String,
    pub impact: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub basic: u8,
    pub content: u8,
    pub technical: u8,
    pub performance: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoScoreResult {
    pub score: u8,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub url: String,
    /// HTTP status, or 0 when the request never completed.
    pub status: u16,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkValidationReport {
    pub total_broken: usize,
    pub checked: usize,
    pub broken_links: Vec<BrokenLink>,
    pub broken_images: Vec<BrokenLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCount {
    pub issue: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    pub total_pages: usize,
    pub error_pages: usize,
    pub warning_pages: usize,
    pub ok_pages: usize,
    pub average_page_size: f64,
    pub total_external_links: usize,
    pub total_internal_links: usize,
    pub total_broken_links: usize,
    pub mobile_friendly_pages: usize,
    pub https_pages: usize,
    pub average_score: Option<f64>,
    pub top_issues: Vec<IssueCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapCheck {
    pub valid: bool,
    pub url: Option<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsCheck {
    pub exists: bool,
    pub content: Option<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedChecks {
    pub sitemap: SitemapCheck,
    pub robots: RobotsCheck,
}

/// Inbound request shape accepted by the pipeline boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout: Option<u64>,
    /// Delay before each page scrape, in seconds.
    pub delay: Option<f64>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub skip_links: bool,
}

/// Outbound response shape, consumed by reporters and exporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub results: Vec<PageResult>,
    pub duplicate_titles: Vec<String>,
    pub duplicate_descriptions: Vec<String>,
    pub advanced_checks: AdvancedChecks,
    pub statistics: AggregateStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_starts_ok() {
        let page = PageResult::new("https://example.com/");
        assert_eq!(page.status(), PageStatus::Ok);
        assert!(page.issues().is_empty());
    }

    #[test]
    fn test_status_never_downgrades() {
        let mut page = PageResult::new("https://example.com/");
        page.fail("page could not be loaded");
        page.warn("missing title");
        page.escalate(PageStatus::Ok);
        assert_eq!(page.status(), PageStatus::Error);
        assert_eq!(page.issues().len(), 2);
    }

    #[test]
    fn test_status_order_independent() {
        let mut a = PageResult::new("https://example.com/");
        a.warn("missing h1");
        a.fail("8 images without alt text");

        let mut b = PageResult::new("https://example.com/");
        b.fail("8 images without alt text");
        b.warn("missing h1");

        assert_eq!(a.status(), b.status());
        assert_eq!(a.status(), PageStatus::Error);
    }

    #[test]
    fn test_report_serializes_camel_case_keys() {
        let report = AnalysisReport {
            results: vec![PageResult::new("https://example.com/")],
            duplicate_titles: vec!["Home".to_string()],
            duplicate_descriptions: vec![],
            advanced_checks: AdvancedChecks::default(),
            statistics: AggregateStatistics::default(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("duplicateTitles").is_some());
        assert!(json.get("advancedChecks").is_some());
        assert_eq!(json["results"][0]["status"], "ok");
        assert!(json["results"][0]["issues"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_request_defaults_skip_links() {
        let request: AnalysisRequest =
            serde_json::from_str(r#"{"url": "https://example.com", "timeout": 5}"#).unwrap();
        assert_eq!(request.timeout, Some(5));
        assert!(!request.skip_links);
        assert_eq!(request.delay, None);
    }
}
