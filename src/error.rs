use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the harvester can report.
///
/// Per-item variants (`InvalidUrl`, `Agent`, `CorruptDocument`, and most `Filesystem`
/// errors) are logged at the item boundary and never abort a run. `Config`, `Snapshot`
/// and a `Filesystem` error while preparing the output directory are setup failures
/// returned from [`crate::Harvest::run`].
#[derive(Error, Debug)]
pub enum HarvestError {
    /// The link is not a well-formed absolute URL, or yields no usable filename.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The browser agent failed to start a session, navigate, or download.
    #[error("browser agent failure: {0}")]
    Agent(String),

    /// The document cannot be opened or has no pages.
    #[error("'{}' is corrupt or invalid: {reason}", .path.display())]
    CorruptDocument { path: PathBuf, reason: String },

    /// A filesystem operation failed.
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTML snapshot is missing and cannot be acquired.
    #[error("snapshot unavailable: {0}")]
    Snapshot(String),
}

impl HarvestError {
    /// Wraps an I/O error with the path it happened at.
    pub fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HarvestError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

impl From<fantoccini::error::CmdError> for HarvestError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        HarvestError::Agent(e.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for HarvestError {
    fn from(e: fantoccini::error::NewSessionError) -> Self {
        HarvestError::Agent(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
