pub mod html;


pub use html::{LinkRecord, extract_links};

use std::collections::BTreeSet;

/// Distinct raw hrefs, each processed at most once per run
///
/// Identity is the raw href: two hrefs that decode or normalize to the same
/// filename are still two members. Iteration is sorted so that runs over the
/// same snapshot process links in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    hrefs: BTreeSet<String>,
}

impl LinkSet {
    /// Deduplicates a sequence of hrefs
    pub fn dedupe<I, S>(hrefs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hrefs: hrefs.into_iter().map(Into::into).collect(),
        }
    }

    /// Deduplicates the raw hrefs of extracted links
    pub fn from_records(records: Vec<LinkRecord>) -> Self {
        Self::dedupe(records.into_iter().map(|r| r.raw_href))
    }

    pub fn len(&self) -> usize {
        self.hrefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hrefs.is_empty()
    }

    pub fn contains(&self, href: &str) -> bool {
        self.hrefs.contains(href)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hrefs.iter().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.hrefs.iter()
    }
}

/// Extracts and deduplicates the document links of a snapshot
pub fn parse_link_set(html: &str, extension: &str) -> LinkSet {
    let records = extract_links(html, extension);
    let found = records.len();
    let set = LinkSet::from_records(records);
    ::log::info!(
        "Found {} {} links ({} distinct)",
        found,
        extension,
        set.len()
    );
    set
}
