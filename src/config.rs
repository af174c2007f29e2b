use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Placeholder replaced by the page number in [`HarvestConfig::listing_url`].
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Configuration for one harvesting run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Saved HTML snapshot of the listing pages
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Parse an existing snapshot instead of acquiring a fresh one
    #[serde(default = "default_reuse_snapshot")]
    pub reuse_snapshot: bool,

    /// Listing page URL template, `{page}` is replaced by the page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,

    /// Page numbers to acquire from the listing
    #[serde(default = "default_pages")]
    pub pages: PageRange,

    /// Base URL used to resolve relative document links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Directory receiving the documents
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Document extension, including the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// How long to wait for a download to appear
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Delay between two directory checks while waiting
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,
}

/// Half-open range of listing page numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl From<PageRange> for Range<u32> {
    fn from(pages: PageRange) -> Self {
        pages.start..pages.end
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("snapshot.html")
}

fn default_reuse_snapshot() -> bool {
    true
}

fn default_pages() -> PageRange {
    PageRange { start: 0, end: 7 }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("PDFs")
}

fn default_extension() -> String {
    ".pdf".to_string()
}

fn default_download_timeout_secs() -> u64 {
    3
}

/// Longest accepted wait for one download, a day
pub const MAX_DOWNLOAD_TIMEOUT_SECS: u64 = 24 * 60 * 60;

fn default_poll_interval_ms() -> u64 {
    100
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            reuse_snapshot: default_reuse_snapshot(),
            listing_url: None,
            pages: default_pages(),
            base_url: None,
            output_dir: default_output_dir(),
            extension: default_extension(),
            download_timeout_secs: default_download_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
        }
    }
}

impl HarvestConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| HarvestError::fs(path, e))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| HarvestError::fs(path, e))?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HarvestError::Config(e.to_string()))
    }

    /// Override the WebDriver URL with the `WEBDRIVER_URL` environment variable if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        self
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Listing URLs for every configured page, in page order
    pub fn listing_urls(&self) -> Vec<String> {
        match &self.listing_url {
            Some(template) => Range::from(self.pages)
                .map(|page| template.replace(PAGE_PLACEHOLDER, &page.to_string()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Base for relative links: `base_url`, or the origin of `listing_url`
    pub fn resolved_base_url(&self) -> Result<Option<Url>> {
        if let Some(base) = &self.base_url {
            return Url::parse(base)
                .map(Some)
                .map_err(|e| HarvestError::Config(format!("base_url {base}: {e}")));
        }

        let Some(template) = &self.listing_url else {
            return Ok(None);
        };
        let listing = template.replace(PAGE_PLACEHOLDER, "0");
        let url = Url::parse(&listing)
            .map_err(|e| HarvestError::Config(format!("listing_url {template}: {e}")))?;
        Ok(url.join("/").ok())
    }

    /// Checks the values that would otherwise fail late in the run
    pub fn validate(&self) -> Result<()> {
        if !self.extension.starts_with('.') || self.extension.len() < 2 {
            return Err(HarvestError::Config(format!(
                "extension must start with a dot: {:?}",
                self.extension
            )));
        }
        if self.download_timeout_secs > MAX_DOWNLOAD_TIMEOUT_SECS {
            return Err(HarvestError::Config(format!(
                "download_timeout_secs must be at most {}, got {}",
                MAX_DOWNLOAD_TIMEOUT_SECS, self.download_timeout_secs
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(HarvestError::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.pages.start > self.pages.end {
            return Err(HarvestError::Config(format!(
                "page range {}..{} is reversed",
                self.pages.start, self.pages.end
            )));
        }
        self.resolved_base_url()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = HarvestConfig::from_json("{}").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("PDFs"));
        assert_eq!(config.extension, ".pdf");
        assert_eq!(config.download_timeout(), Duration::from_secs(3));
        assert_eq!(config.pages, PageRange { start: 0, end: 7 });
        assert!(config.reuse_snapshot);
        assert!(config.listing_urls().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_listing_urls_follow_page_range() {
        let config = HarvestConfig::from_json(
            r#"{"listing_url": "https://example.com/sds?page={page}", "pages": {"start": 2, "end": 4}}"#,
        )
        .unwrap();
        assert_eq!(
            config.listing_urls(),
            vec![
                "https://example.com/sds?page=2".to_string(),
                "https://example.com/sds?page=3".to_string(),
            ]
        );
    }

    #[test]
    fn test_base_url_falls_back_to_listing_origin() {
        let mut config = HarvestConfig {
            listing_url: Some("https://example.com/sds?page={page}".to_string()),
            ..HarvestConfig::default()
        };
        assert_eq!(
            config.resolved_base_url().unwrap().unwrap().as_str(),
            "https://example.com/"
        );

        config.base_url = Some("https://cdn.example.org/files/".to_string());
        assert_eq!(
            config.resolved_base_url().unwrap().unwrap().as_str(),
            "https://cdn.example.org/files/"
        );

        config.base_url = Some("not a url".to_string());
        assert!(matches!(
            config.resolved_base_url(),
            Err(HarvestError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = HarvestConfig {
            extension: "pdf".to_string(),
            ..HarvestConfig::default()
        };
        assert!(config.validate().is_err());

        let config = HarvestConfig {
            poll_interval_ms: 0,
            ..HarvestConfig::default()
        };
        assert!(config.validate().is_err());

        let config = HarvestConfig {
            pages: PageRange { start: 5, end: 1 },
            ..HarvestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_timeout_is_rejected() {
        let config = HarvestConfig::from_json(r#"{"download_timeout_secs": 18446744073709551615}"#)
            .unwrap();
        assert!(matches!(config.validate(), Err(HarvestError::Config(_))));

        let config = HarvestConfig {
            download_timeout_secs: MAX_DOWNLOAD_TIMEOUT_SECS,
            ..HarvestConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(
            HarvestConfig::from_json("{not json"),
            Err(HarvestError::Config(_))
        ));
    }
}
