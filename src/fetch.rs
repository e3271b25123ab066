use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info};
use url::Url;

use crate::config::Config;
use crate::error::{OptimizerError, Result, WaitStage};
use crate::listing::Asin;

/// Default page fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Headers sent with every page request so the marketplace serves the
/// regular desktop page
const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Cache-Control", "max-age=0"),
];

/// Source of product page HTML
pub trait PageSource: Send + Sync {
    fn fetch(&self, asin: &Asin) -> Result<String>;
}

/// Fetches live product pages over HTTP
pub struct HttpPageSource {
    agent: ureq::Agent,
    marketplace: Url,
    user_agent: String,
    timeout_secs: u64,
}

impl HttpPageSource {
    pub fn new(marketplace: &str, user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();
        Ok(Self {
            agent,
            marketplace: Url::parse(marketplace)?,
            user_agent: user_agent.to_string(),
            timeout_secs,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.marketplace_url, &config.user_agent, config.fetch_timeout_secs)
    }

    /// Product page URL: `<marketplace>/dp/<ASIN>`
    pub fn product_url(&self, asin: &Asin) -> Result<Url> {
        Ok(self.marketplace.join(&format!("/dp/{}", asin))?)
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self, asin: &Asin) -> Result<String> {
        let url = self.product_url(asin)?;
        info!(%url, "fetching product page");

        let mut request = self.agent.get(url.as_str()).header("User-Agent", &self.user_agent);
        for (name, value) in BROWSER_HEADERS {
            request = request.header(*name, *value);
        }

        let response = request
            .call()
            .map_err(|e| OptimizerError::from_transport(e, WaitStage::Fetch, self.timeout_secs))?;

        let status = response.status().as_u16();
        if status != 200 {
            match status {
                503 => error!(%asin, "marketplace returned 503, requests may be blocked"),
                403 => error!(%asin, "marketplace returned 403, this IP may be rate-limited"),
                _ => error!(%asin, status, "unexpected status fetching product page"),
            }
            return Err(OptimizerError::ScrapeFailed {
                asin: asin.to_string(),
                reason: format!("Failed to fetch page. Status: {}", status),
            });
        }

        let html = response
            .into_body()
            .read_to_string()
            .map_err(|e| OptimizerError::from_transport(e, WaitStage::Fetch, self.timeout_secs))?;
        debug!(%asin, bytes = html.len(), "fetched product page");
        Ok(html)
    }
}

/// Serves the same saved page for every ASIN
#[derive(Debug, Clone)]
pub struct StaticPageSource {
    html: String,
}

impl StaticPageSource {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }
}

impl PageSource for StaticPageSource {
    fn fetch(&self, _asin: &Asin) -> Result<String> {
        Ok(self.html.clone())
    }
}
