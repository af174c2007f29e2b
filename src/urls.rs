use crate::error::{HarvestError, Result};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Characters removed from a derived filename
static DISALLOWED_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9._-]").expect("static pattern is valid"));

/// A leading URL scheme, e.g. `https:`
static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("static pattern is valid"));

/// Syntactic validation: an absolute http(s) URL with a host
///
/// Reachability is never probed.
pub fn validate(url: &str) -> bool {
    check(url).is_ok()
}

/// Like [`validate`], with the reason for rejection
pub fn check(url: &str) -> Result<Url> {
    let invalid = |reason: &str| HarvestError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if url.trim() != url || url.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }
    let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme is not http or https"));
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(invalid("missing host")),
    }
}

/// Resolves `href` against `base` when it is relative
///
/// Absolute hrefs, and every href when no base is known, are returned as is.
pub fn resolve(href: &str, base: Option<&Url>) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    match base.map(|b| b.join(href)) {
        Some(Ok(resolved)) => resolved.to_string(),
        _ => href.to_string(),
    }
}

/// Derives a filesystem-safe filename from the last path segment of `url`
///
/// The segment is taken from the text as written, without re-encoding, then
/// lowercased, and every character outside `[a-z0-9._-]` is removed, so the
/// result never contains a path separator. Distinct URLs can collide: only the
/// final segment survives, and stripped characters are lost.
pub fn to_filename(url: &str) -> String {
    let path = url_path(url);
    let segment = path.rsplit('/').next().unwrap_or_default().to_lowercase();
    DISALLOWED_FILENAME_CHARS
        .replace_all(&segment, "")
        .into_owned()
}

/// Like [`to_filename`], rejecting URLs that leave nothing to name a file with
pub fn checked_filename(url: &str) -> Result<String> {
    let filename = to_filename(url);
    if filename.is_empty() || filename.chars().all(|c| c == '.') {
        return Err(HarvestError::InvalidUrl {
            url: url.to_string(),
            reason: "no usable filename in path".to_string(),
        });
    }
    Ok(filename)
}

/// The path component of `url` as written, absolute or relative, without query or fragment
fn url_path(url: &str) -> &str {
    let url = strip_query_and_fragment(url);
    let rest = match SCHEME.find(url) {
        Some(scheme) => &url[scheme.end()..],
        None => url,
    };
    match rest.strip_prefix("//") {
        Some(authority_and_path) => authority_and_path
            .find('/')
            .map_or("", |slash| &authority_and_path[slash..]),
        None => rest,
    }
}

fn strip_query_and_fragment(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or_default()
}
