use crate::models::{AggregateStatistics, IssueCount, PageResult, PageStatus};
use std::collections::HashMap;

const TOP_ISSUES: usize = 10;

pub const DUPLICATE_TITLE: &str = "duplicate title";
pub const DUPLICATE_DESCRIPTION: &str = "duplicate description";

/// Titles and descriptions shared by two or more pages, in the order they
/// were first seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Duplicates {
    pub titles: Vec<String>,
    pub descriptions: Vec<String>,
}

impl Duplicates {
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.descriptions.is_empty()
    }
}

/// Cross-page post-processing: duplicate detection and run statistics
pub struct Aggregator;

impl Aggregator {
    pub fn detect_duplicates(results: &[PageResult]) -> Duplicates {
        Duplicates {
            titles: repeated(results.iter().filter_map(|p| p.title.as_deref())),
            descriptions: repeated(results.iter().filter_map(|p| p.meta_description.as_deref())),
        }
    }

    /// Adds a duplicate issue to every page sharing a duplicated value. The
    /// page status is raised to at least `warning`, never lowered.
    pub fn annotate_duplicates(results: &mut [PageResult], duplicates: &Duplicates) {
        for page in results.iter_mut() {
            if page
                .title
                .as_ref()
                .is_some_and(|t| duplicates.titles.contains(t))
            {
                page.warn(DUPLICATE_TITLE);
            }
            if page
                .meta_description
                .as_ref()
                .is_some_and(|d| duplicates.descriptions.contains(d))
            {
                page.warn(DUPLICATE_DESCRIPTION);
            }
        }
    }

    pub fn compute_statistics(results: &[PageResult]) -> AggregateStatistics {
        let count_status = |status: PageStatus| results.iter().filter(|p| p.status() == status).count();

        let sizes: Vec<u64> = results.iter().filter_map(|p| p.page_size).collect();
        let average_page_size = if sizes.is_empty() {
            0.0
        } else {
            round_to(sizes.iter().sum::<u64>() as f64 / sizes.len() as f64, 2)
        };

        let scores: Vec<u8> = results
            .iter()
            .filter_map(|p| p.seo_score.as_ref().map(|s| s.score))
            .collect();
        let average_score = (!scores.is_empty()).then(|| {
            round_to(
                scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64,
                1,
            )
        });

        AggregateStatistics {
            total_pages: results.len(),
            error_pages: count_status(PageStatus::Error),
            warning_pages: count_status(PageStatus::Warning),
            ok_pages: count_status(PageStatus::Ok),
            average_page_size,
            total_external_links: results.iter().map(|p| p.external_links_count).sum(),
            total_internal_links: results.iter().map(|p| p.internal_links_count).sum(),
            total_broken_links: results.iter().map(|p| p.broken_links_count).sum(),
            mobile_friendly_pages: results.iter().filter(|p| p.mobile_friendly).count(),
            https_pages: results.iter().filter(|p| p.https).count(),
            average_score,
            top_issues: top_issues(results),
        }
    }
}

/// Non-empty values occurring at least twice, in first-seen order
fn repeated<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for value in values.filter(|v| !v.is_empty()) {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter(|value| counts[value] >= 2)
        .map(str::to_string)
        .collect()
}

fn top_issues(results: &[PageResult]) -> Vec<IssueCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for issue in results.iter().flat_map(|p| p.issues()) {
        let count = counts.entry(issue.as_str()).or_insert(0);
        if *count == 0 {
            order.push(issue.as_str());
        }
        *count += 1;
    }

    let mut ranked: Vec<IssueCount> = order
        .into_iter()
        .map(|issue| IssueCount {
            issue: issue.to_string(),
            count: counts[issue],
        })
        .collect();
    // Stable, so equal counts keep first-seen order
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_ISSUES);
    ranked
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
