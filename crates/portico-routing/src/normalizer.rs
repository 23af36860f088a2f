//! Path normalization
//!
//! Turns the raw request URI into the canonical form the rest of the
//! pipeline matches against. Total functions: any input produces a usable
//! path, nothing here can fail.

use http::Method;
use percent_encoding::percent_decode_str;

/// Normalize a raw request URI.
///
/// Drops the query string, percent-decodes (lossily for invalid UTF-8),
/// strips the hosting sub-directory prefix at a segment boundary, collapses
/// repeated and trailing slashes, and guarantees a leading "/". Empty input
/// maps to "/".
pub fn normalize_path(raw_uri: &str, mount_prefix: &str) -> String {
    let path = raw_uri.split(['?', '#']).next().unwrap_or("");
    let mut path = percent_decode_str(path).decode_utf8_lossy().into_owned();

    let prefix = mount_prefix.trim_end_matches('/');
    if !prefix.is_empty()
        && let Some(rest) = path.strip_prefix(prefix)
        && (rest.is_empty() || rest.starts_with('/'))
    {
        path = rest.to_string();
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(path.len() + 1);
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Canonical request method: HEAD is served as GET, everything else is
/// left alone.
pub fn canonical_method(method: &Method) -> Method {
    if *method == Method::HEAD {
        Method::GET
    } else {
        method.clone()
    }
}
