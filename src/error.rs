use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run-level failures surfaced at the pipeline boundary.
///
/// Page- and link-level failures never show up here; they end up in the
/// affected page's status and issues instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid URL '{0}': URL must start with http:// or https://")]
    InvalidUrl(String),

    #[error("No sitemap found for {0}")]
    SitemapNotFound(String),

    #[error("Sitemap {url} could not be read: {reason}")]
    SitemapUnreadable { url: String, reason: String },

    #[error("Sitemap {0} does not list any URLs")]
    EmptySitemap(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AnalysisError {
    /// True for errors caused by the caller's input rather than by us.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidUrl(_)
                | AnalysisError::SitemapNotFound(_)
                | AnalysisError::SitemapUnreadable { .. }
                | AnalysisError::EmptySitemap(_)
        )
    }

    pub fn to_response(&self) -> ErrorResponse {
        let detail = match self {
            AnalysisError::Internal(e) if !is_production() => Some(format!("{:?}", e)),
            _ => None,
        };

        ErrorResponse {
            status: if self.is_client_error() { 400 } else { 500 },
            error: self.to_string(),
            detail,
        }
    }
}

/// Structured error returned instead of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn is_production() -> bool {
    std::env::var("SEOSCAN_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}
