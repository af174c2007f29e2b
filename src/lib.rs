// Re-export modules
pub mod browser;
pub mod config;
pub mod corpus;
pub mod download;
pub mod error;
pub mod integrity;
pub mod parsers;
pub mod results;
pub mod snapshot;
pub mod urls;
pub mod utils;

// Re-export commonly used types for convenience
pub use browser::{BrowserAgent, BrowserSession, WebDriverAgent};
pub use config::HarvestConfig;
pub use download::{DownloadCoordinator, DownloadOutcome, DownloadTask, TaskState};
pub use error::{HarvestError, Result};
pub use results::RunReport;

use std::fs;
use std::path::{Path, PathBuf};

/// One batch run: snapshot, links, downloads, integrity pass, lowercase pass
///
/// Every phase finishes before the next one starts and items are handled one
/// at a time. Only setup problems end the run early; anything that goes wrong
/// with a single link or file is logged, counted, and skipped.
pub struct Harvest {
    config: HarvestConfig,
}

impl Harvest {
    pub fn new(config: HarvestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Runs every phase against `agent`
    pub async fn run<A: BrowserAgent + ?Sized>(&self, agent: &A) -> Result<RunReport> {
        self.config.validate()?;
        let output_dir = self.prepare_output_dir()?;
        let mut report = RunReport::default();

        if snapshot::needs_acquisition(&self.config) {
            snapshot::acquire(agent, &self.config).await?;
        } else {
            ::log::info!(
                "Reusing snapshot {}",
                self.config.snapshot_path.display()
            );
        }
        let html = snapshot::read_snapshot(&self.config.snapshot_path)?;

        let links = parsers::parse_link_set(&html, &self.config.extension);
        report.links = links.len();
        self.download_all(agent, &links, &output_dir, &mut report)
            .await?;
        ::log::info!("All {} links have been processed", links.len());

        match integrity::validate_corpus(&output_dir, &self.config.extension) {
            Ok(outcomes) => report.record_validation(outcomes),
            Err(e) => ::log::error!("Integrity pass failed: {}", e),
        }
        match corpus::normalize_names(&output_dir, &self.config.extension) {
            Ok(normalized) => report.record_normalization(&normalized),
            Err(e) => ::log::error!("Lowercase pass failed: {}", e),
        }

        ::log::info!(
            "Run complete: {} relocated, {} skipped, {} timed out, {} failed, {} removed, {} renamed",
            report.relocated,
            report.skipped,
            report.timed_out,
            report.failed,
            report.removed.len(),
            report.renamed
        );
        Ok(report)
    }

    /// Creates the output directory and returns its absolute path
    fn prepare_output_dir(&self) -> Result<PathBuf> {
        let dir = std::path::absolute(&self.config.output_dir)
            .map_err(|e| HarvestError::fs(&self.config.output_dir, e))?;
        fs::create_dir_all(&dir).map_err(|e| HarvestError::fs(&dir, e))?;
        Ok(dir)
    }

    async fn download_all<A: BrowserAgent + ?Sized>(
        &self,
        agent: &A,
        links: &parsers::LinkSet,
        output_dir: &Path,
        report: &mut RunReport,
    ) -> Result<()> {
        let base_url = self.config.resolved_base_url()?;
        let coordinator = DownloadCoordinator::new(agent, output_dir, &self.config.extension)
            .with_timeout(self.config.download_timeout())
            .with_poll_interval(self.config.poll_interval());

        let mut remaining = links.len();
        for href in links.iter() {
            remaining -= 1;

            if let Err(e) = urls::check(href) {
                report.invalid_urls += 1;
                ::log::warn!("{}", e);
            }
            let url = urls::resolve(href, base_url.as_ref());

            ::log::info!("Remaining links: {}", remaining);
            // Named after the href as written; resolution percent-encodes the path
            let filename = match urls::checked_filename(href) {
                Ok(filename) => filename,
                Err(e) => {
                    ::log::error!("Not downloading {}: {}", href, e);
                    report.failed += 1;
                    continue;
                }
            };
            let task = DownloadTask::new(&url, output_dir, &filename);
            let outcome = coordinator.run(&task).await;
            report.record_download(&outcome);
        }
        Ok(())
    }
}
