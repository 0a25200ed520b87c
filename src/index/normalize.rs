//! Key normalization and partitioning.
//!
//! Keys in the generated tables are the lowercased symbol name with every
//! ASCII character outside `[a-z0-9]` escaped as `_` plus two hex digits, so
//! `RANDS_H` becomes `rands_5fh` and `rands.h` becomes `rands_2eh`. Queries go
//! through the same function so they compare byte-for-byte with keys.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::sync::LazyLock;

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|(amp|lt|gt|quot|apos|nbsp));")
        .expect("entity pattern is valid")
});

/// Builds the match key for a symbol name or query.
///
/// Non-ASCII characters are kept as-is after lowercasing.
pub fn normalize_key(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || !c.is_ascii() {
            key.push(c);
        } else {
            // Infallible for String
            let _ = write!(key, "_{:02x}", u32::from(c));
        }
    }
    key
}

/// Builds the label form used for label matching: lowercase, whitespace
/// (including no-break space) collapsed to single spaces, trimmed.
pub fn normalize_label(text: &str) -> String {
    let mut label = String::with_capacity(text.len());
    for word in text.split(char::is_whitespace).filter(|w| !w.is_empty()) {
        if !label.is_empty() {
            label.push(' ');
        }
        label.extend(word.chars().flat_map(char::to_lowercase));
    }
    label
}

/// Maps a normalized key to its partition id.
///
/// The partition is the first character of the key, except that a leading
/// `_hh` escape stands for the escaped character itself: `_5fhumidity` lives
/// in partition `_`, `_2eprofile` in partition `.`. Returns `None` for an
/// empty key.
pub fn partition_of(key: &str) -> Option<char> {
    let first = key.chars().next()?;
    if first == '_'
        && let Some(hex) = key.get(1..3)
        && hex.bytes().all(|b| b.is_ascii_hexdigit())
        && let Ok(code) = u8::from_str_radix(hex, 16)
    {
        return Some(char::from(code));
    }
    Some(first)
}

/// Decodes the HTML entities the generator leaves in labels and containers.
///
/// Unknown or invalid entities are left untouched.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY.replace_all(text, |caps: &Captures<'_>| {
        let decoded = if let Some(dec) = caps.get(1) {
            dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
        } else if let Some(hex) = caps.get(2) {
            u32::from_str_radix(hex.as_str(), 16)
                .ok()
                .and_then(char::from_u32)
        } else {
            match caps.get(3).map(|m| m.as_str()) {
                Some("amp") => Some('&'),
                Some("lt") => Some('<'),
                Some("gt") => Some('>'),
                Some("quot") => Some('"'),
                Some("apos") => Some('\''),
                Some("nbsp") => Some('\u{a0}'),
                _ => None,
            }
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
}

/// Whether `key` contains `needle` as a run of whole key characters.
///
/// An occurrence must start and end on escape boundaries, so `5f` or `fh`
/// never match inside the escape of `rands_5fh`.
pub fn key_contains(key: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    let bytes = key.as_bytes();
    let mut boundaries = Vec::with_capacity(bytes.len() + 1);
    let mut pos = 0;
    while pos < bytes.len() {
        boundaries.push(pos);
        pos += match bytes[pos..] {
            [b'_', hi, lo, ..] if is_key_hex(hi) && is_key_hex(lo) => 3,
            _ => key[pos..].chars().next().map_or(1, char::len_utf8),
        };
    }
    boundaries.push(bytes.len());

    boundaries.iter().any(|&start| {
        key[start..].starts_with(needle)
            && boundaries.binary_search(&(start + needle.len())).is_ok()
    })
}

const fn is_key_hex(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'a'..=b'f')
}

/// Finds `needle` in `haystack` ignoring ASCII case, returning the byte range.
///
/// ASCII-only folding keeps byte offsets valid for the original string.
pub fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<std::ops::Range<usize>> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    (0..=hay.len() - pat.len())
        .filter(|&start| haystack.is_char_boundary(start))
        .find(|&start| hay[start..start + pat.len()].eq_ignore_ascii_case(pat))
        .map(|start| start..start + pat.len())
}
