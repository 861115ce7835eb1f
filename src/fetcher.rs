use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use reqwest::header::{self, HeaderMap};

/// Delivery-related response headers, kept after the body is consumed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSnapshot {
    pub content_encoding: Option<String>,
    pub cache_control: Option<String>,
    pub expires: Option<String>,
}

impl HeaderSnapshot {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            content_encoding: get(header::CONTENT_ENCODING),
            cache_control: get(header::CACHE_CONTROL),
            expires: get(header::EXPIRES),
        }
    }
}

/// A successfully loaded page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested (as listed in the sitemap)
    pub url: String,
    /// The URL the body was actually read from
    pub final_url: String,
    pub html: String,
    /// Body size in bytes
    pub size: u64,
    /// Status of the redirect that was followed, if any
    pub redirect_type: Option<u16>,
    pub headers: HeaderSnapshot,
}

/// Loads pages, following at most one redirect by hand.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// `client` must not follow redirects on its own.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns `None` on any failure: transport errors, a second redirect or a
    /// non-2xx final status.
    pub async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        match self.try_fetch(url).await {
            Ok(page) => Some(page),
            Err(e) => {
                tracing::warn!(url = %url, error = %format!("{:#}", e), "Page could not be loaded");
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<FetchedPage> {
        let mut response = self.client.get(url).send().await?;
        let mut redirect_type = None;

        if response.status().is_redirection() {
            let status = response.status().as_u16();
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| anyhow!("HTTP {} without a Location header", status))?;
            let target = response
                .url()
                .join(location)
                .with_context(|| format!("Invalid redirect target '{}'", location))?;

            tracing::debug!(url = %url, status, target = %target, "Following redirect");
            redirect_type = Some(status);
            response = self.client.get(target).send().await?;
        }

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {}", status);
        }

        let final_url = response.url().to_string();
        let headers = HeaderSnapshot::from_headers(response.headers());
        let body = response.bytes().await?;

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            html: String::from_utf8_lossy(&body).into_owned(),
            size: body.len() as u64,
            redirect_type,
            headers,
        })
    }
}
