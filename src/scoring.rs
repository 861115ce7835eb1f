use crate::models::{
    ContentMetrics, Grade, PageResult, PerformanceMetrics, Priority, Recommendation,
    ScoreBreakdown, ScoreCategory, SeoScoreResult,
};
use crate::seo_analyzer::MAX_PAGE_BYTES;

const BASIC_WEIGHT: f64 = 0.4;
const CONTENT_WEIGHT: f64 = 0.3;
const TECHNICAL_WEIGHT: f64 = 0.2;
const PERFORMANCE_WEIGHT: f64 = 0.1;

const HEAVY_PAGE_BYTES: u64 = 1024 * 1024;

/// Running category scores plus the recommendations that explain each deduction
struct Scorecard {
    basic: i32,
    content: i32,
    technical: i32,
    performance: i32,
    recommendations: Vec<Recommendation>,
}

impl Scorecard {
    fn new() -> Self {
        Self {
            basic: 100,
            content: 100,
            technical: 100,
            performance: 100,
            recommendations: Vec::new(),
        }
    }

    fn penalize(
        &mut self,
        category: ScoreCategory,
        points: i32,
        priority: Priority,
        issue: impl Into<String>,
        recommendation: &str,
        impact: &str,
    ) {
        let score = match category {
            ScoreCategory::Basic => &mut self.basic,
            ScoreCategory::Content => &mut self.content,
            ScoreCategory::Technical => &mut self.technical,
            ScoreCategory::Performance => &mut self.performance,
        };
        *score -= points;

        self.recommendations.push(Recommendation {
            priority,
            category,
            issue: issue.into(),
            recommendation: recommendation.to_string(),
            impact: impact.to_string(),
        });
    }

    fn finish(mut self) -> SeoScoreResult {
        let breakdown = ScoreBreakdown {
            basic: clamp_score(self.basic),
            content: clamp_score(self.content),
            technical: clamp_score(self.technical),
            performance: clamp_score(self.performance),
        };

        let weighted = f64::from(breakdown.basic) * BASIC_WEIGHT
            + f64::from(breakdown.content) * CONTENT_WEIGHT
            + f64::from(breakdown.technical) * TECHNICAL_WEIGHT
            + f64::from(breakdown.performance) * PERFORMANCE_WEIGHT;
        let score = weighted.round().clamp(0.0, 100.0) as u8;

        // Stable: keeps rule order within a priority tier
        self.recommendations.sort_by_key(|r| r.priority);

        SeoScoreResult {
            score,
            grade: grade_for(score),
            breakdown,
            recommendations: self.recommendations,
        }
    }
}

fn clamp_score(value: i32) -> u8 {
    value.clamp(0, 100) as u8
}

pub fn grade_for(score: u8) -> Grade {
    match score {
        90.. => Grade::A,
        75..=89 => Grade::B,
        60..=74 => Grade::C,
        40..=59 => Grade::D,
        _ => Grade::F,
    }
}

/// Weighted 0-100 SEO score. Pure: same inputs, same result.
pub struct ScoreEngine;

impl ScoreEngine {
    pub fn score(
        page: &PageResult,
        content: Option<&ContentMetrics>,
        performance: Option<&PerformanceMetrics>,
    ) -> SeoScoreResult {
        let mut card = Scorecard::new();

        score_basic(&mut card, page);
        score_content(&mut card, page, content);
        score_technical(&mut card, page);
        score_performance(&mut card, page, performance);

        card.finish()
    }
}

fn score_basic(card: &mut Scorecard, page: &PageResult) {
    use ScoreCategory::Basic;

    match page.title.as_deref().map(|t| t.chars().count()) {
        None => card.penalize(
            Basic,
            10,
            Priority::High,
            "Missing title tag",
            "Add a unique, descriptive <title> of 50-60 characters",
            "The title is the strongest on-page ranking signal and the search result headline",
        ),
        Some(len) if !(30..=70).contains(&len) => card.penalize(
            Basic,
            5,
            Priority::Medium,
            format!("Title length far from optimal ({} chars)", len),
            "Rewrite the title to 50-60 characters",
            "Titles this short or long are rewritten or truncated in search results",
        ),
        Some(len) if !(50..=60).contains(&len) => card.penalize(
            Basic,
            3,
            Priority::Low,
            format!("Title length not optimal ({} chars)", len),
            "Adjust the title to 50-60 characters",
            "Slightly better click-through from search results",
        ),
        Some(_) => {}
    }

    match page.meta_description.as_deref().map(|d| d.chars().count()) {
        None => card.penalize(
            Basic,
            10,
            Priority::High,
            "Missing meta description",
            "Add a meta description of 150-160 characters summarising the page",
            "Search engines show an arbitrary snippet instead of your pitch",
        ),
        Some(len) if !(120..=200).contains(&len) => card.penalize(
            Basic,
            5,
            Priority::Medium,
            format!("Meta description length far from optimal ({} chars)", len),
            "Rewrite the description to 150-160 characters",
            "The snippet will be truncated or padded by the search engine",
        ),
        Some(len) if !(150..=160).contains(&len) => card.penalize(
            Basic,
            3,
            Priority::Low,
            format!("Meta description length not optimal ({} chars)", len),
            "Adjust the description to 150-160 characters",
            "Slightly better snippet presentation",
        ),
        Some(_) => {}
    }

    if page.h1.is_none() {
        card.penalize(
            Basic,
            5,
            Priority::High,
            "Missing H1 heading",
            "Add one H1 that states the page topic",
            "Helps search engines and readers understand the page structure",
        );
    }

    if page.canonical.is_none() {
        card.penalize(
            Basic,
            3,
            Priority::Medium,
            "Missing canonical URL",
            "Add <link rel=\"canonical\"> pointing at the preferred URL",
            "Prevents duplicate-content dilution across URL variants",
        );
    }

    if !page.https {
        card.penalize(
            Basic,
            5,
            Priority::High,
            "Page is not served over HTTPS",
            "Serve the page over HTTPS and redirect HTTP to it",
            "HTTPS is a ranking signal and browsers flag HTTP pages as insecure",
        );
    }

    if page.images_total > 0 && page.images_without_alt > 0 {
        let ratio = page.images_without_alt as f64 / page.images_total as f64;
        let issue = format!(
            "{} of {} images have no alt text",
            page.images_without_alt, page.images_total
        );
        if ratio > 0.5 {
            card.penalize(
                Basic,
                5,
                Priority::Medium,
                issue,
                "Describe every meaningful image with an alt attribute",
                "Improves image search visibility and accessibility",
            );
        } else {
            card.penalize(
                Basic,
                2,
                Priority::Low,
                issue,
                "Add alt text to the remaining images",
                "Improves image search visibility and accessibility",
            );
        }
    }
}

fn score_content(card: &mut Scorecard, page: &PageResult, content: Option<&ContentMetrics>) {
    use ScoreCategory::Content;

    if let Some(metrics) = content {
        if metrics.word_count < 300 {
            card.penalize(
                Content,
                10,
                Priority::High,
                format!("Thin content ({} words)", metrics.word_count),
                "Expand the page to at least 500 words of useful content",
                "Thin pages rarely rank for competitive queries",
            );
        } else if metrics.word_count < 500 {
            card.penalize(
                Content,
                5,
                Priority::Medium,
                format!("Short content ({} words)", metrics.word_count),
                "Consider expanding the page beyond 500 words",
                "Longer, thorough pages tend to rank for more queries",
            );
        }

        if metrics.word_count > 0 {
            if metrics.readability_score < 30.0 {
                card.penalize(
                    Content,
                    10,
                    Priority::Medium,
                    format!("Very hard to read (Flesch {:.1})", metrics.readability_score),
                    "Use shorter sentences and simpler words",
                    "Readers leave pages they struggle to read",
                );
            } else if metrics.readability_score < 50.0 {
                card.penalize(
                    Content,
                    5,
                    Priority::Low,
                    format!("Hard to read (Flesch {:.1})", metrics.readability_score),
                    "Break up long sentences",
                    "Better engagement and time on page",
                );
            }

            if metrics.keyword_density > 3.0 {
                card.penalize(
                    Content,
                    10,
                    Priority::High,
                    format!("Keyword stuffing ({:.2}% density)", metrics.keyword_density),
                    "Reduce repetition of the main keyword below 3%",
                    "Over-optimised pages can be demoted",
                );
            } else if metrics.keyword_density < 0.5 {
                card.penalize(
                    Content,
                    5,
                    Priority::Low,
                    format!("Keyword under-used ({:.2}% density)", metrics.keyword_density),
                    "Mention the main keyword naturally a few more times",
                    "Clearer topical relevance",
                );
            }
        }
    }

    if page.internal_links_count < 3 {
        card.penalize(
            Content,
            3,
            Priority::Low,
            format!("Few internal links ({})", page.internal_links_count),
            "Link to at least three related pages on the site",
            "Spreads link equity and helps crawlers discover pages",
        );
    }
}

fn score_technical(card: &mut Scorecard, page: &PageResult) {
    use ScoreCategory::Technical;

    if !page.mobile_friendly {
        card.penalize(
            Technical,
            5,
            Priority::High,
            "Not mobile friendly (no viewport meta tag)",
            "Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
            "Mobile-first indexing ranks pages by their mobile rendering",
        );
    }

    if page.structured_data.is_empty() {
        card.penalize(
            Technical,
            5,
            Priority::Medium,
            "No structured data",
            "Describe the page with schema.org JSON-LD",
            "Enables rich results in search",
        );
    } else if page.structured_data.iter().any(|entry| !entry.valid) {
        card.penalize(
            Technical,
            3,
            Priority::Medium,
            "Invalid structured data",
            "Fix JSON syntax and give every item an @type and @context",
            "Invalid markup is ignored by search engines",
        );
    }

    if page.redirect_type == Some(302) {
        card.penalize(
            Technical,
            3,
            Priority::Medium,
            "Temporary (302) redirect",
            "Use a permanent 301 redirect",
            "301 redirects pass ranking signals to the target",
        );
    }

    if page.broken_links_count > 0 {
        let points = page.broken_links_count.min(2) as i32;
        card.penalize(
            Technical,
            points,
            Priority::High,
            format!("{} broken links or images", page.broken_links_count),
            "Fix or remove links and images that return errors",
            "Broken links waste crawl budget and frustrate visitors",
        );
    }
}

fn score_performance(
    card: &mut Scorecard,
    page: &PageResult,
    performance: Option<&PerformanceMetrics>,
) {
    use ScoreCategory::Performance;

    if let Some(size) = page.page_size {
        if size > MAX_PAGE_BYTES {
            card.penalize(
                Performance,
                5,
                Priority::High,
                "Page is larger than 3 MB",
                "Trim inline scripts, styles and embedded data",
                "Large pages load slowly, especially on mobile",
            );
        } else if size > HEAVY_PAGE_BYTES {
            card.penalize(
                Performance,
                2,
                Priority::Medium,
                "Page is larger than 1 MB",
                "Reduce the HTML payload",
                "Faster first render",
            );
        }
    }

    let Some(metrics) = performance else {
        return;
    };

    if !metrics.compression_enabled {
        card.penalize(
            Performance,
            3,
            Priority::Medium,
            "No response compression",
            "Enable gzip or Brotli on the server",
            "Compression typically cuts HTML transfer size by 70%",
        );
    }

    if !metrics.cache_headers_present {
        card.penalize(
            Performance,
            2,
            Priority::Low,
            "No cache headers",
            "Send Cache-Control (or Expires) headers",
            "Repeat visits load faster",
        );
    }

    if !metrics.minified {
        card.penalize(
            Performance,
            2,
            Priority::Low,
            "HTML is not minified",
            "Minify HTML output",
            "Slightly smaller transfer size",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeywordFrequency, StructuredDataEntry, StructuredDataKind};

    fn perfect_page() -> PageResult {
        let mut page = PageResult::new("https://example.com/shop");
        page.title = Some("x".repeat(55));
        page.meta_description = Some("y".repeat(155));
        page.h1 = Some("Oak furniture".to_string());
        page.canonical = Some("https://example.com/shop".to_string());
        page.https = true;
        page.mobile_friendly = true;
        page.viewport = Some("width=device-width".to_string());
        page.images_total = 4;
        page.internal_links_count = 6;
        page.page_size = Some(40_000);
        page.structured_data = vec![StructuredDataEntry {
            kind: StructuredDataKind::JsonLd,
            data: serde_json::json!({"@context": "https://schema.org", "@type": "Product"}),
            valid: true,
            errors: vec![],
        }];
        page
    }

    fn good_content() -> ContentMetrics {
        ContentMetrics {
            word_count: 800,
            readability_score: 65.0,
            keyword_density: 1.5,
            top_keywords: vec![KeywordFrequency {
                keyword: "oak".to_string(),
                count: 12,
                density: 1.5,
            }],
            ..Default::default()
        }
    }

    fn good_performance() -> PerformanceMetrics {
        PerformanceMetrics {
            compression_enabled: true,
            compression_type: Some("br".to_string()),
            cache_headers_present: true,
            cache_control: Some("max-age=600".to_string()),
            minified: true,
            lazy_loading: true,
        }
    }

    #[test]
    fn test_perfect_page_scores_a() {
        let result =
            ScoreEngine::score(&perfect_page(), Some(&good_content()), Some(&good_performance()));
        assert_eq!(result.score, 100);
        assert_eq!(result.grade, Grade::A);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_missing_title_and_http_cost_fifteen_basic_points() {
        let mut page = perfect_page();
        page.title = None;
        page.https = false;

        let result = ScoreEngine::score(&page, Some(&good_content()), Some(&good_performance()));
        assert_eq!(result.breakdown.basic, 85);
        assert_eq!(result.breakdown.content, 100);
        // 85 * 0.4 + 100 * 0.6
        assert_eq!(result.score, 94);
    }

    #[test]
    fn test_title_length_tiers() {
        let mut page = perfect_page();
        page.title = Some("x".repeat(45));
        assert_eq!(ScoreEngine::score(&page, None, None).breakdown.basic, 97);

        page.title = Some("x".repeat(10));
        assert_eq!(ScoreEngine::score(&page, None, None).breakdown.basic, 95);
    }

    #[test]
    fn test_content_penalties() {
        let content = ContentMetrics {
            word_count: 250,
            readability_score: 20.0,
            keyword_density: 4.0,
            ..Default::default()
        };
        let mut page = perfect_page();
        page.internal_links_count = 1;

        let result = ScoreEngine::score(&page, Some(&content), None);
        assert_eq!(result.breakdown.content, 100 - 10 - 10 - 10 - 3);
    }

    #[test]
    fn test_broken_link_penalty_is_capped() {
        let mut page = perfect_page();
        page.broken_links_count = 9;
        assert_eq!(ScoreEngine::score(&page, None, None).breakdown.technical, 98);

        page.broken_links_count = 1;
        assert_eq!(ScoreEngine::score(&page, None, None).breakdown.technical, 99);
    }

    #[test]
    fn test_performance_penalties() {
        let mut page = perfect_page();
        page.page_size = Some(MAX_PAGE_BYTES + 1);

        let result = ScoreEngine::score(&page, None, Some(&PerformanceMetrics::default()));
        assert_eq!(result.breakdown.performance, 100 - 5 - 3 - 2 - 2);
    }

    #[test]
    fn test_recommendations_sorted_by_priority() {
        let page = PageResult::new("http://example.com/");
        let result = ScoreEngine::score(&page, None, Some(&PerformanceMetrics::default()));

        let priorities: Vec<Priority> = result.recommendations.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert_eq!(result.recommendations[0].issue, "Missing title tag");
    }

    #[test]
    fn test_worst_case_stays_in_bounds() {
        let mut page = PageResult::new("http://example.com/");
        page.images_total = 10;
        page.images_without_alt = 10;
        page.broken_links_count = 50;
        page.redirect_type = Some(302);
        page.page_size = Some(MAX_PAGE_BYTES * 10);
        let content = ContentMetrics {
            word_count: 10,
            readability_score: 0.0,
            keyword_density: 50.0,
            ..Default::default()
        };

        let result = ScoreEngine::score(&page, Some(&content), Some(&PerformanceMetrics::default()));
        assert!(result.score <= 100);
        for category in [
            result.breakdown.basic,
            result.breakdown.content,
            result.breakdown.technical,
            result.breakdown.performance,
        ] {
            assert!(category <= 100);
        }
        assert_eq!(result.grade, grade_for(result.score));
    }

    #[test]
    fn test_score_is_deterministic() {
        let page = perfect_page();
        let content = good_content();
        let first = ScoreEngine::score(&page, Some(&content), None);
        let second = ScoreEngine::score(&page, Some(&content), None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(grade_for(100), Grade::A);
        assert_eq!(grade_for(90), Grade::A);
        assert_eq!(grade_for(89), Grade::B);
        assert_eq!(grade_for(75), Grade::B);
        assert_eq!(grade_for(74), Grade::C);
        assert_eq!(grade_for(60), Grade::C);
        assert_eq!(grade_for(59), Grade::D);
        assert_eq!(grade_for(40), Grade::D);
        assert_eq!(grade_for(39), Grade::F);
        assert_eq!(grade_for(0), Grade::F);
    }
}
