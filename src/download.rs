use crate::browser::{BrowserAgent, BrowserSession};
use crate::error::{HarvestError, Result};
use crate::utils::poll_until;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One attempt to acquire a single document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub target_path: PathBuf,
}

impl DownloadTask {
    pub fn new(url: &str, output_dir: &Path, filename: &str) -> Self {
        Self {
            url: url.to_string(),
            target_path: output_dir.join(filename),
        }
    }
}

/// Where a task is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    WaitingForFile,
    Relocated,
    TimedOut,
    Skipped,
    Failed,
}

/// How a task ended
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The downloaded file now lives at this path
    Relocated(PathBuf),
    /// The target already existed, nothing was downloaded
    Skipped(PathBuf),
    /// No matching file appeared before the deadline
    TimedOut(Duration),
    /// The agent or the filesystem failed during the task
    Failed(HarvestError),
}

impl DownloadOutcome {
    pub fn state(&self) -> TaskState {
        match self {
            DownloadOutcome::Relocated(_) => TaskState::Relocated,
            DownloadOutcome::Skipped(_) => TaskState::Skipped,
            DownloadOutcome::TimedOut(_) => TaskState::TimedOut,
            DownloadOutcome::Failed(_) => TaskState::Failed,
        }
    }
}

/// Drives one download at a time through a browser agent
///
/// Completion is detected by diffing the output directory against a listing
/// taken before the download starts, so nothing else may write matching files
/// into that directory while a task waits.
pub struct DownloadCoordinator<'a, A: BrowserAgent + ?Sized> {
    agent: &'a A,
    output_dir: PathBuf,
    extension: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl<'a, A: BrowserAgent + ?Sized> DownloadCoordinator<'a, A> {
    pub fn new(agent: &'a A, output_dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            agent,
            output_dir: output_dir.into(),
            extension: extension.to_lowercase(),
            timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Runs a task to completion; failures come back as outcomes, never as errors
    pub async fn run(&self, task: &DownloadTask) -> DownloadOutcome {
        let mut state = TaskState::Pending;

        if task.target_path.exists() {
            transition(task, &mut state, TaskState::Skipped);
            ::log::info!("File already exists: {}", task.target_path.display());
            return DownloadOutcome::Skipped(task.target_path.clone());
        }

        let outcome = match self.acquire(task, &mut state).await {
            Ok(Some(path)) => DownloadOutcome::Relocated(path),
            Ok(None) => DownloadOutcome::TimedOut(self.timeout),
            Err(e) => DownloadOutcome::Failed(e),
        };
        transition(task, &mut state, outcome.state());

        match &outcome {
            DownloadOutcome::Relocated(path) => {
                ::log::info!("Download complete: {}", path.display())
            }
            DownloadOutcome::TimedOut(timeout) => ::log::warn!(
                "Download timed out after {:?}: {}",
                timeout,
                task.url
            ),
            DownloadOutcome::Failed(e) => ::log::error!("Error downloading {}: {}", task.url, e),
            DownloadOutcome::Skipped(_) => {}
        }
        outcome
    }

    /// Opens a session, waits for the file, and always closes the session
    async fn acquire(&self, task: &DownloadTask, state: &mut TaskState) -> Result<Option<PathBuf>> {
        fs::create_dir_all(&self.output_dir).map_err(|e| HarvestError::fs(&self.output_dir, e))?;
        let before = self.list_names()?;

        let mut session = self.agent.open_session(Some(&self.output_dir)).await?;
        let arrived = self
            .await_arrival(session.as_mut(), task, &before, state)
            .await;
        if let Err(e) = session.close().await {
            ::log::warn!("Failed to close browser session for {}: {}", task.url, e);
        }

        match arrived? {
            Some(name) => self.relocate(&name, &task.target_path).map(Some),
            None => Ok(None),
        }
    }

    async fn await_arrival(
        &self,
        session: &mut dyn BrowserSession,
        task: &DownloadTask,
        before: &BTreeSet<String>,
        state: &mut TaskState,
    ) -> Result<Option<String>> {
        ::log::info!("Starting download from: {}", task.url);
        session.download(&task.url).await?;

        transition(task, state, TaskState::WaitingForFile);
        poll_until(self.poll_interval, self.timeout, || self.find_arrival(before)).await
    }

    /// The first new matching name, in sorted order, not present in `before`
    fn find_arrival(&self, before: &BTreeSet<String>) -> Result<Option<String>> {
        let current = self.list_names()?;
        let mut arrivals = current
            .difference(before)
            .filter(|name| name.to_lowercase().ends_with(&self.extension));

        let first = arrivals.next().cloned();
        let others = arrivals.count();
        if others > 0 {
            ::log::warn!(
                "{} more new {} files arrived alongside {:?}, picking the first",
                others,
                self.extension,
                first
            );
        }
        Ok(first)
    }

    fn list_names(&self) -> Result<BTreeSet<String>> {
        let entries =
            fs::read_dir(&self.output_dir).map_err(|e| HarvestError::fs(&self.output_dir, e))?;

        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| HarvestError::fs(&self.output_dir, e))?;
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn relocate(&self, name: &str, target: &Path) -> Result<PathBuf> {
        let source = self.output_dir.join(name);
        if source != target {
            fs::rename(&source, target).map_err(|e| HarvestError::fs(&source, e))?;
        }
        Ok(target.to_path_buf())
    }
}

fn transition(task: &DownloadTask, state: &mut TaskState, next: TaskState) {
    ::log::debug!("{}: {:?} -> {:?}", task.url, state, next);
    *state = next;
}
