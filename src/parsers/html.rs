use scraper::{Html, Selector};
use std::sync::LazyLock;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector is valid"));

/// An anchor href as written in the markup, next to its percent-decoded form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub raw_href: String,
    pub decoded_href: String,
}

impl LinkRecord {
    pub fn new(raw_href: &str) -> Self {
        Self {
            raw_href: raw_href.to_string(),
            decoded_href: percent_decode(raw_href),
        }
    }

    /// Whether the decoded href ends with `extension`, ignoring case
    pub fn has_extension(&self, extension: &str) -> bool {
        self.decoded_href
            .to_lowercase()
            .ends_with(&extension.to_lowercase())
    }
}

/// Percent-decodes `href`, replacing invalid UTF-8 sequences
pub fn percent_decode(href: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(href.as_bytes())).into_owned()
}

/// Extracts the anchors of `html` whose decoded href ends with `extension`
///
/// Hrefs are returned as written, in document order, duplicates included.
/// Broken markup never fails: html5ever builds a best-effort tree and whatever
/// anchors it recovers are considered.
pub fn extract_links(html: &str, extension: &str) -> Vec<LinkRecord> {
    let doc = Html::parse_document(html);

    let links = doc
        .select(&ANCHOR_SELECTOR)
        .filter_map(|e| e.value().attr("href"))
        .map(LinkRecord::new)
        .filter(|link| link.has_extension(extension))
        .collect::<Vec<_>>();

    ::log::debug!("HTML parser found {} {} links", links.len(), extension);
    if !links.is_empty() {
        ::log::debug!(
            "First few links: {:?}",
            links.iter().take(5).map(|l| &l.raw_href).collect::<Vec<_>>()
        );
    }

    links
}
