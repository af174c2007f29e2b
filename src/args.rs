use clap::Parser;
use doc_harvest::{HarvestConfig, HarvestError};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "doc-harvest")]
#[command(about = "Downloads, checks, and normalizes the documents linked from listing pages")]
#[command(version)]
pub struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Saved HTML snapshot of the listing pages
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Directory receiving the documents
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Listing page URL template, `{page}` is replaced by the page number
    #[arg(long)]
    pub listing_url: Option<String>,

    /// Base URL for resolving relative document links
    #[arg(long)]
    pub base_url: Option<String>,

    /// Seconds to wait for each download to appear
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// URL for the WebDriver instance
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Acquire a fresh snapshot even if one exists
    #[arg(long)]
    pub refresh_snapshot: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Builds the run configuration: file (or defaults), then environment, then flags
    pub fn into_config(self) -> Result<HarvestConfig, HarvestError> {
        let mut config = match &self.config {
            Some(path) => HarvestConfig::from_file(path)?,
            None => HarvestConfig::default(),
        }
        .with_env_overrides();

        if let Some(snapshot) = self.snapshot {
            config.snapshot_path = snapshot;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(listing_url) = self.listing_url {
            config.listing_url = Some(listing_url);
        }
        if let Some(base_url) = self.base_url {
            config.base_url = Some(base_url);
        }
        if let Some(timeout) = self.timeout {
            config.download_timeout_secs = timeout;
        }
        if let Some(webdriver_url) = self.webdriver_url {
            config.webdriver_url = webdriver_url;
        }
        if self.refresh_snapshot {
            config.reuse_snapshot = false;
        }

        Ok(config)
    }
}
