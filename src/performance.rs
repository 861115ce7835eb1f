use crate::fetcher::{FetchedPage, HeaderSnapshot};
use crate::models::PerformanceMetrics;
use reqwest::Client;

const COMPRESSION_ENCODINGS: &[&str] = &["gzip", "br", "deflate", "zstd", "compress"];
const LAZY_LOADING_SIGNALS: &[&str] = &[
    "loading=\"lazy\"",
    "loading='lazy'",
    "loading=lazy",
    "data-src=",
    "lazyload",
];

/// Delivery-quality checks: compression, caching, minification, lazy loading
pub struct PerformanceAnalyzer {
    probe_client: Client,
}

impl PerformanceAnalyzer {
    /// `probe_client` must not decompress responses (see `build_probe_client`).
    pub fn new(probe_client: Client) -> Self {
        Self { probe_client }
    }

    /// Re-requests the page to read its delivery headers, falling back to the
    /// headers seen by the page fetch if the probe fails.
    pub async fn headers_for(&self, fetched: &FetchedPage) -> HeaderSnapshot {
        match self.probe_client.get(&fetched.final_url).send().await {
            Ok(response) if response.status().is_success() => {
                HeaderSnapshot::from_headers(response.headers())
            }
            Ok(response) => {
                tracing::debug!(url = %fetched.final_url, status = %response.status(), "Header probe rejected, using fetch headers");
                fetched.headers.clone()
            }
            Err(e) => {
                tracing::debug!(url = %fetched.final_url, error = %e, "Header probe failed, using fetch headers");
                fetched.headers.clone()
            }
        }
    }

    pub fn analyze(html: &str, headers: &HeaderSnapshot) -> PerformanceMetrics {
        let compression_type = headers
            .content_encoding
            .as_deref()
            .map(str::to_lowercase)
            .filter(|encoding| COMPRESSION_ENCODINGS.iter().any(|known| encoding.contains(known)));

        let cache_control = headers
            .cache_control
            .clone()
            .or_else(|| headers.expires.clone());

        PerformanceMetrics {
            compression_enabled: compression_type.is_some(),
            compression_type,
            cache_headers_present: cache_control.is_some(),
            cache_control,
            minified: is_minified(html),
            lazy_loading: has_lazy_loading(html),
        }
    }
}

/// More than half of the tag boundaries (`>` then `<`) have no whitespace between them
pub fn is_minified(html: &str) -> bool {
    let bytes = html.as_bytes();
    let mut boundaries = 0usize;
    let mut tight = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'>' {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'<' {
            boundaries += 1;
            if j == i + 1 {
                tight += 1;
            }
        }
        i = j;
    }

    boundaries > 0 && tight * 2 > boundaries
}

pub fn has_lazy_loading(html: &str) -> bool {
    let lower = html.to_lowercase();
    LAZY_LOADING_SIGNALS.iter().any(|signal| lower.contains(signal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_and_cache_headers() {
        let headers = HeaderSnapshot {
            content_encoding: Some("GZIP".to_string()),
            expires: Some("Thu, 01 Dec 2044 16:00:00 GMT".to_string()),
            ..Default::default()
        };

        let metrics = PerformanceAnalyzer::analyze("<p>hi</p>", &headers);
        assert!(metrics.compression_enabled);
        assert_eq!(metrics.compression_type.as_deref(), Some("gzip"));
        assert!(metrics.cache_headers_present);
        assert_eq!(metrics.cache_control.as_deref(), Some("Thu, 01 Dec 2044 16:00:00 GMT"));
    }

    #[test]
    fn test_identity_encoding_is_not_compression() {
        let headers = HeaderSnapshot {
            content_encoding: Some("identity".to_string()),
            ..Default::default()
        };

        let metrics = PerformanceAnalyzer::analyze("", &headers);
        assert!(!metrics.compression_enabled);
        assert!(metrics.compression_type.is_none());
        assert!(!metrics.cache_headers_present);
    }

    #[test]
    fn test_minification_heuristic() {
        assert!(is_minified("<html><head><title>x</title></head><body><p>a</p></body></html>"));
        assert!(!is_minified("<html>\n  <head>\n    <title>x</title>\n  </head>\n</html>"));
        assert!(!is_minified("plain text"));
    }

    #[test]
    fn test_lazy_loading_signals() {
        assert!(has_lazy_loading(r#"<img src="a.png" LOADING="lazy">"#));
        assert!(has_lazy_loading(r#"<img data-src="a.png" class="lazyload">"#));
        assert!(!has_lazy_loading(r#"<img src="a.png">"#));
    }
}
