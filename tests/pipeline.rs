use async_trait::async_trait;
use doc_harvest::{BrowserAgent, BrowserSession, Harvest, HarvestConfig, HarvestError, Result};
use lopdf::{Document, Object, dictionary};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Writes a PDF with `pages` empty pages
fn write_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Shared record of what the fake browser was asked to do
#[derive(Default)]
struct Calls {
    downloads: Vec<String>,
    navigations: Vec<String>,
    opened: usize,
    closed: usize,
}

/// In-process browser: a download saves a PDF named after the URL's last
/// segment, the way a browser names it, unless the URL is scripted otherwise
#[derive(Clone, Default)]
struct FakeBrowser {
    calls: Arc<Mutex<Calls>>,
    silent: Arc<HashSet<String>>,
    empty: Arc<HashSet<String>>,
    listing_html: String,
}

impl FakeBrowser {
    fn new() -> Self {
        Self::default()
    }

    fn never_saving(mut self, url: &str) -> Self {
        Arc::make_mut(&mut self.silent).insert(url.to_string());
        self
    }

    fn saving_empty(mut self, url: &str) -> Self {
        Arc::make_mut(&mut self.empty).insert(url.to_string());
        self
    }

    fn rendering(mut self, html: &str) -> Self {
        self.listing_html = html.to_string();
        self
    }

    fn downloads(&self) -> Vec<String> {
        self.calls.lock().unwrap().downloads.clone()
    }
}

struct FakeSession {
    browser: FakeBrowser,
    dir: Option<PathBuf>,
}

#[async_trait]
impl BrowserAgent for FakeBrowser {
    async fn open_session(&self, download_dir: Option<&Path>) -> Result<Box<dyn BrowserSession>> {
        self.calls.lock().unwrap().opened += 1;
        Ok(Box::new(FakeSession {
            browser: self.clone(),
            dir: download_dir.map(Path::to_path_buf),
        }))
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<String> {
        self.browser.calls.lock().unwrap().navigations.push(url.to_string());
        Ok(self.browser.listing_html.clone())
    }

    async fn download(&mut self, url: &str) -> Result<()> {
        self.browser.calls.lock().unwrap().downloads.push(url.to_string());
        if self.browser.silent.contains(url) {
            return Ok(());
        }

        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| HarvestError::Agent("no download directory".to_string()))?;
        let saved_as = url.rsplit('/').next().unwrap().replace("%20", " ");
        let pages = if self.browser.empty.contains(url) { 0 } else { 1 };
        write_pdf(&dir.join(saved_as), pages);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.browser.calls.lock().unwrap().closed += 1;
        Ok(())
    }
}

const LISTING: &str = r#"<html><body><table>
    <tr><td><a href="/docs/File%20One.PDF">File One</a></td></tr>
    <tr><td><a href="/docs/file-one.pdf">file one</a></td></tr>
    <tr><td><a href="/docs/file-one.pdf">file one (again)</a></td></tr>
    <tr><td><a href="/docs/readme.txt">readme</a></td></tr>
</table></body></html>"#;

fn config_in(dir: &TempDir) -> HarvestConfig {
    let snapshot_path = dir.path().join("listing.html");
    fs::write(&snapshot_path, LISTING).unwrap();
    HarvestConfig {
        snapshot_path,
        base_url: Some("https://example.com/".to_string()),
        output_dir: dir.path().join("PDFs"),
        download_timeout_secs: 1,
        poll_interval_ms: 10,
        ..HarvestConfig::default()
    }
}

fn output_names(config: &HarvestConfig) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(&config.output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_distinct_hrefs_are_each_downloaded_once() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let browser = FakeBrowser::new();

    let report = Harvest::new(config.clone()).run(&browser).await.unwrap();

    assert_eq!(report.links, 2);
    assert_eq!(report.download_attempts, 2);
    assert_eq!(report.relocated, 2);
    // Both hrefs are relative, which fails syntactic validation but is still attempted
    assert_eq!(report.invalid_urls, 2);
    assert_eq!(
        browser.downloads(),
        vec![
            "https://example.com/docs/File%20One.PDF".to_string(),
            "https://example.com/docs/file-one.pdf".to_string(),
        ]
    );
    assert_eq!(output_names(&config), vec!["file-one.pdf", "file20one.pdf"]);

    let calls = browser.calls.lock().unwrap();
    assert_eq!(calls.opened, calls.closed);
    assert!(calls.navigations.is_empty());
}

#[tokio::test]
async fn test_literal_space_href_is_named_as_written() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    fs::write(
        &config.snapshot_path,
        r#"<a href="/docs/Safety Sheet.PDF">Safety Sheet</a>"#,
    )
    .unwrap();
    let browser = FakeBrowser::new();

    let report = Harvest::new(config.clone()).run(&browser).await.unwrap();

    assert_eq!(report.relocated, 1);
    assert_eq!(
        browser.downloads(),
        vec!["https://example.com/docs/Safety%20Sheet.PDF".to_string()]
    );
    assert_eq!(output_names(&config), vec!["safetysheet.pdf"]);
}

#[tokio::test]
async fn test_second_run_downloads_nothing() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    Harvest::new(config.clone())
        .run(&FakeBrowser::new())
        .await
        .unwrap();
    let browser = FakeBrowser::new();
    let report = Harvest::new(config.clone()).run(&browser).await.unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.download_attempts, 0);
    assert!(browser.downloads().is_empty());
    assert_eq!(browser.calls.lock().unwrap().opened, 0);
    assert_eq!(output_names(&config).len(), 2);
}

#[tokio::test]
async fn test_timeout_and_empty_document_do_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let browser = FakeBrowser::new()
        .never_saving("https://example.com/docs/File%20One.PDF")
        .saving_empty("https://example.com/docs/file-one.pdf");

    let report = Harvest::new(config.clone()).run(&browser).await.unwrap();

    assert_eq!(report.timed_out, 1);
    assert_eq!(report.relocated, 1);
    assert_eq!(report.checked, 1);
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.removed[0].reason.as_deref(), Some("No pages"));
    assert!(output_names(&config).is_empty());

    let calls = browser.calls.lock().unwrap();
    assert_eq!(calls.opened, 2);
    assert_eq!(calls.closed, 2);
}

#[tokio::test]
async fn test_existing_corpus_is_checked_and_lowercased() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    fs::create_dir_all(&config.output_dir).unwrap();
    write_pdf(&config.output_dir.join("Report-ABC.pdf"), 3);
    write_pdf(&config.output_dir.join("report.pdf"), 1);
    fs::write(config.output_dir.join("Broken.PDF"), b"<html>404</html>").unwrap();

    let report = Harvest::new(config.clone())
        .run(&FakeBrowser::new())
        .await
        .unwrap();

    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.renamed, 1);
    assert_eq!(
        output_names(&config),
        vec!["file-one.pdf", "file20one.pdf", "report-abc.pdf", "report.pdf"]
    );
}

#[tokio::test]
async fn test_missing_snapshot_is_acquired_through_the_browser() {
    let dir = TempDir::new().unwrap();
    let config = HarvestConfig {
        snapshot_path: dir.path().join("fresh.html"),
        listing_url: Some("https://example.com/sds?page={page}".to_string()),
        output_dir: dir.path().join("PDFs"),
        download_timeout_secs: 1,
        poll_interval_ms: 10,
        ..HarvestConfig::default()
    };
    let browser = FakeBrowser::new().rendering(LISTING);

    let report = Harvest::new(config.clone()).run(&browser).await.unwrap();

    // Seven pages of the same listing still give two distinct links
    assert_eq!(browser.calls.lock().unwrap().navigations.len(), 7);
    assert_eq!(report.links, 2);
    assert_eq!(report.relocated, 2);
    assert!(config.snapshot_path.is_file());
}

#[tokio::test]
async fn test_missing_snapshot_without_listing_url_aborts() {
    let dir = TempDir::new().unwrap();
    let config = HarvestConfig {
        snapshot_path: dir.path().join("absent.html"),
        output_dir: dir.path().join("PDFs"),
        ..HarvestConfig::default()
    };

    let result = Harvest::new(config).run(&FakeBrowser::new()).await;

    assert!(matches!(result, Err(HarvestError::Snapshot(_))));
}
