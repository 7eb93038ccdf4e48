//! Opaque entry addressing and path safety.
//!
//! Entries are exposed to MCP clients as `journal://{project|user}/{token}`
//! URIs, where the token is the unpadded URL-safe base64 encoding of the
//! storage path. Grammar validity is necessary but not sufficient: every
//! decoded path must also pass [`is_path_safe`] before any disk access, and
//! the same predicate gates raw paths supplied directly by callers.

use std::path::{Component, Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::error::{JournalError, Result};
use crate::journal::types::Locality;

pub const SCHEME: &str = "journal";

/// Normalized path prefixes that are never legitimate journal roots.
const DENIED_ROOTS: [&str; 5] = ["/etc", "/root", "/proc", "/sys", "/dev"];

/// Encode a storage path as an opaque `journal://` URI.
pub fn encode(path: &Path, locality: Locality) -> String {
    let token = URL_SAFE_NO_PAD.encode(path.to_string_lossy().as_bytes());
    format!("{SCHEME}://{locality}/{token}")
}

/// Decode a `journal://` URI back to `(locality, path)`.
///
/// Rejects anything [`is_valid_uri`] rejects. The returned path has only been
/// grammar-checked — callers must still apply [`is_path_safe`].
pub fn decode(uri: &str) -> Result<(Locality, PathBuf)> {
    if !is_valid_uri(uri) {
        return Err(JournalError::usage(format!("invalid journal URI: {uri}")));
    }
    let rest = uri.strip_prefix(&format!("{SCHEME}://")).expect("validated");
    let (locality, token) = rest.split_once('/').expect("validated");
    let locality: Locality = locality.parse().expect("validated");

    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| JournalError::usage(format!("invalid URI token: {e}")))?;
    let path = String::from_utf8(bytes)
        .map_err(|_| JournalError::usage("URI token is not valid UTF-8"))?;
    Ok((locality, PathBuf::from(path)))
}

/// True iff `uri` matches exactly `journal://(project|user)/[A-Za-z0-9_-]+`.
///
/// No query string, fragment, empty token, extra path segment, or character
/// outside the token alphabet is permitted.
pub fn is_valid_uri(uri: &str) -> bool {
    let Some(rest) = uri.strip_prefix("journal://") else {
        return false;
    };
    let Some((locality, token)) = rest.split_once('/') else {
        return false;
    };
    if locality.parse::<Locality>().is_err() {
        return false;
    }
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Path-safety predicate applied to decoded URIs and to raw caller paths.
///
/// Passing means "not obviously unsafe" — it is not a proof the path lies
/// within an intended journal root, and callers must still scope reads.
pub fn is_path_safe(path: &str) -> bool {
    // Absolute paths only.
    if !path.starts_with('/') {
        return false;
    }
    // Literal traversal, checked on the raw string before any normalization.
    if path.contains("..") {
        return false;
    }
    // Encoded traversal: any percent-escape at all means the caller is trying
    // to smuggle something past the raw check.
    match percent_decode(path) {
        Some(decoded) => {
            if decoded != path || decoded.contains("..") {
                return false;
            }
            // Windows-style traversal hidden behind backslashes.
            if decoded.contains('\\') && decoded.replace('\\', "/").contains("..") {
                return false;
            }
        }
        None => return false,
    }
    // Sensitive system roots, checked after normalization.
    // Path::starts_with compares whole components, so `/etcetera` does not
    // match the `/etc` root.
    let normalized = normalize(path);
    !DENIED_ROOTS.iter().any(|root| normalized.starts_with(root))
}

/// Decode `%XX` escapes. Returns `None` on a malformed escape.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = char::from(*bytes.get(i + 1)?).to_digit(16)?;
            let lo = char::from(*bytes.get(i + 2)?).to_digit(16)?;
            out.push((hi * 16 + lo) as u8);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Collapse `.` segments and duplicate separators without touching the
/// filesystem. `..` never survives to this point.
fn normalize(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
