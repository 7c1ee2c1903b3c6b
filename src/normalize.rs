// src/normalize.rs
//! Canonical comparison keys for relayed text.
//!
//! Both platforms re-case, re-wrap and re-link the same post, so the key is
//! computed over a folded form of the text rather than the raw bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;

/// Cap applied after folding, measured in code points.
pub const MAX_COMPARE_CHARS: usize = 280;

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// SHA-256 digest of normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form; this is the comparison key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Fold text into its comparison form:
/// lowercase, newlines to spaces, URLs removed, whitespace collapsed,
/// capped at [`MAX_COMPARE_CHARS`] code points.
pub fn normalize(text: &str) -> String {
    // 1) Case fold
    let mut out = text.to_lowercase();

    // 2) Line endings
    out = out.replace("\r\n", " ").replace(['\r', '\n'], " ");

    // 3) Link shorteners rewrite URLs per post
    out = RE_URL.replace_all(&out, "").into_owned();

    // 4) Collapse whitespace
    out = RE_WS.replace_all(&out, " ").trim().to_string();

    // 5) Length cap; a cut can land just after a space
    let mut capped = truncate_chars(&out, MAX_COMPARE_CHARS);
    capped.truncate(capped.trim_end().len());
    capped
}

/// Fingerprint of `normalize(text)`.
pub fn fingerprint(text: &str) -> Fingerprint {
    let digest = Sha256::digest(normalize(text).as_bytes());
    Fingerprint(digest.into())
}

/// Hex comparison key for `text`.
pub fn comparison_key(text: &str) -> String {
    fingerprint(text).to_hex()
}

/// Keep at most `max` code points of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
