use crate::corpus::NormalizeReport;
use crate::download::DownloadOutcome;
use crate::integrity::ValidationOutcome;
use serde::Serialize;

/// Counters for one harvesting run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Distinct document links in the snapshot
    pub links: usize,
    /// Links that failed syntactic validation (still attempted)
    pub invalid_urls: usize,
    /// Tasks that reached the browser agent
    pub download_attempts: usize,
    pub relocated: usize,
    pub skipped: usize,
    pub timed_out: usize,
    pub failed: usize,
    /// Documents opened by the integrity pass
    pub checked: usize,
    /// Documents deleted by the integrity pass
    pub removed: Vec<ValidationOutcome>,
    pub renamed: usize,
    pub rename_collisions: usize,
}

impl RunReport {
    /// Counts a finished download task
    pub fn record_download(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Relocated(_) => self.relocated += 1,
            DownloadOutcome::Skipped(_) => self.skipped += 1,
            DownloadOutcome::TimedOut(_) => self.timed_out += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
        if !matches!(outcome, DownloadOutcome::Skipped(_)) {
            self.download_attempts += 1;
        }
    }

    pub fn record_validation(&mut self, outcomes: Vec<ValidationOutcome>) {
        self.checked += outcomes.len();
        self.removed
            .extend(outcomes.into_iter().filter(|outcome| !outcome.valid));
    }

    pub fn record_normalization(&mut self, report: &NormalizeReport) {
        self.renamed += report.renamed.len();
        self.rename_collisions += report.collisions.len();
    }
}
