use crate::browser::BrowserAgent;
use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Reads a saved snapshot, replacing invalid UTF-8 instead of failing
pub fn read_snapshot(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| HarvestError::fs(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Appends `html` to the snapshot file, creating it if needed
pub fn append_snapshot(path: &Path, html: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| HarvestError::fs(path, e))?;
    file.write_all(html.as_bytes())
        .map_err(|e| HarvestError::fs(path, e))
}

/// Whether the run has to render the listing pages before parsing
pub fn needs_acquisition(config: &HarvestConfig) -> bool {
    !(config.reuse_snapshot && config.snapshot_path.is_file())
}

/// Renders every listing page and appends its HTML to the snapshot file
///
/// Each page gets its own session. A page that fails is logged and skipped;
/// the acquisition fails only when no page at all could be saved.
pub async fn acquire<A: BrowserAgent + ?Sized>(agent: &A, config: &HarvestConfig) -> Result<usize> {
    let urls = config.listing_urls();
    if urls.is_empty() {
        return Err(HarvestError::Snapshot(format!(
            "{} not found and no listing_url configured",
            config.snapshot_path.display()
        )));
    }

    let path = &config.snapshot_path;
    if path.exists() {
        // A refresh starts from an empty file instead of appending to the old one
        fs::remove_file(path).map_err(|e| HarvestError::fs(path, e))?;
    }

    let mut saved = 0;
    for url in &urls {
        ::log::info!("Visiting: {}", url);
        match render_page(agent, url).await {
            Ok(html) => {
                append_snapshot(path, &html)?;
                saved += 1;
                ::log::info!("Page {} HTML content saved to {}", url, path.display());
            }
            Err(e) => ::log::error!("Failed to render {}: {}", url, e),
        }
    }

    if saved == 0 {
        return Err(HarvestError::Snapshot(format!(
            "none of the {} listing pages could be rendered",
            urls.len()
        )));
    }
    Ok(saved)
}

async fn render_page<A: BrowserAgent + ?Sized>(agent: &A, url: &str) -> Result<String> {
    let mut session = agent.open_session(None).await?;
    let html = session.navigate(url).await;
    if let Err(e) = session.close().await {
        ::log::warn!("Failed to close browser session for {}: {}", url, e);
    }
    html
}
