pub mod webdriver;

pub use webdriver::WebDriverAgent;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Something that renders pages and saves downloads, one session at a time
///
/// The harvester only relies on two facts: `navigate` returns the rendered
/// HTML, and after `download` a file may eventually appear in the session's
/// download directory.
#[async_trait]
pub trait BrowserAgent: Send + Sync {
    /// Start a session; when `download_dir` is set, files it saves land there
    async fn open_session(&self, download_dir: Option<&Path>) -> Result<Box<dyn BrowserSession>>;
}

/// A live browser session
///
/// Callers must call [`BrowserSession::close`] exactly once, on every path.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and return the rendered page source
    async fn navigate(&mut self, url: &str) -> Result<String>;

    /// Load `url` so that the browser saves it into the download directory
    async fn download(&mut self, url: &str) -> Result<()>;

    /// Release the session
    async fn close(&mut self) -> Result<()>;
}
