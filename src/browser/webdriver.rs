use crate::browser::{BrowserAgent, BrowserSession};
use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use async_trait::async_trait;
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use std::path::Path;

/// Common local WebDriver endpoints tried after the configured one
const FALLBACK_WEBDRIVER_URLS: [&str; 3] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// Chrome arguments used for every session
const CHROME_ARGS: [&str; 7] = [
    "--disable-blink-features=AutomationControlled",
    "--window-size=1920,1080",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-infobars",
];

/// Browser agent driving Chrome through a WebDriver server
#[derive(Debug, Clone)]
pub struct WebDriverAgent {
    webdriver_url: String,
    headless: bool,
}

impl WebDriverAgent {
    pub fn new(webdriver_url: &str) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            headless: true,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(&config.webdriver_url).with_headless(config.headless)
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Chrome capabilities, with download preferences when `download_dir` is set
    pub fn capabilities(&self, download_dir: Option<&Path>) -> Capabilities {
        let mut args: Vec<&str> = CHROME_ARGS.to_vec();
        if self.headless {
            args.insert(0, "--headless=new");
        }

        let mut chrome_options = json!({ "args": args });
        if let Some(dir) = download_dir {
            chrome_options["prefs"] = json!({
                "download.default_directory": dir.to_string_lossy(),
                "download.prompt_for_download": false,
                "plugins.always_open_pdf_externally": true,
            });
        }

        let mut caps = Capabilities::new();
        caps.insert("browserName".to_string(), Value::from("chrome"));
        caps.insert("goog:chromeOptions".to_string(), chrome_options);
        caps
    }

    async fn connect(&self, caps: Capabilities) -> Result<Client> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);

        let first_error = match builder.connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", self.webdriver_url);
                return Ok(client);
            }
            Err(e) => {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    self.webdriver_url,
                    e
                );
                e
            }
        };

        for url in FALLBACK_WEBDRIVER_URLS {
            if url == self.webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = builder.connect(url).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(client);
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(first_error.into())
    }
}

#[async_trait]
impl BrowserAgent for WebDriverAgent {
    async fn open_session(&self, download_dir: Option<&Path>) -> Result<Box<dyn BrowserSession>> {
        let client = self.connect(self.capabilities(download_dir)).await?;
        Ok(Box::new(WebDriverSession {
            client: Some(client),
        }))
    }
}

/// One WebDriver session, ended by [`BrowserSession::close`]
pub struct WebDriverSession {
    client: Option<Client>,
}

impl WebDriverSession {
    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| HarvestError::Agent("session already closed".to_string()))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<String> {
        let client = self.client()?;
        client
            .goto(url)
            .await
            .map_err(|e| navigation_error(e, "accessing", url))?;
        client
            .refresh()
            .await
            .map_err(|e| navigation_error(e, "refreshing", url))?;
        client
            .source()
            .await
            .map_err(|e| navigation_error(e, "getting source for", url))
    }

    async fn download(&mut self, url: &str) -> Result<()> {
        match self.client()?.goto(url).await {
            Ok(()) => Ok(()),
            // Chrome aborts the navigation once it hands the response to the download manager
            Err(e) if e.to_string().contains("ERR_ABORTED") => {
                ::log::debug!("Navigation to {} became a download", url);
                Ok(())
            }
            Err(e) => Err(navigation_error(e, "downloading", url)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.client.take() {
            Some(client) => client.close().await.map_err(HarvestError::from),
            None => Ok(()),
        }
    }
}

/// Logs a navigation failure and turns it into an agent error
fn navigation_error(error: fantoccini::error::CmdError, context: &str, url: &str) -> HarvestError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while {} {}", context, url);
    } else {
        ::log::debug!("Failed {} {}: {}", context, url, error);
    }
    HarvestError::Agent(format!("{context} {url}: {error}"))
}
