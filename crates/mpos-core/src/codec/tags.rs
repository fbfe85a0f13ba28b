//! The `key:value,key:value` tag mini-language.
//!
//! Tags are free-form annotations attached to a transaction (or to a single
//! split-transfer leg) for downstream reporting.  Users type them as text:
//!
//! ```text
//! order:1234, lane:3
//! ```
//!
//! # Two entry points, two policies
//!
//! | Function                 | Used by                      | Malformed pair        |
//! |--------------------------|------------------------------|-----------------------|
//! | [`validate_tags_format`] | explicit "save" of settings  | whole input invalid   |
//! | [`parse_tags`]           | transaction submission       | pair silently dropped |
//!
//! The strict validator splits each pair on *every* `:` and requires exactly
//! two non-blank parts.  The lenient parser splits on the *first* `:` only, so
//! a value such as `url:http://x` survives submission even though the
//! validator rejects it.
//!
//! Empty segments produced by stray commas (`a:1,,b:2` or a trailing `,`)
//! are skipped by both entry points.

use std::collections::BTreeMap;

/// Parsed tags.  Ordered by key so that formatting is deterministic.
pub type Tags = BTreeMap<String, String>;

const PAIR_SEPARATOR: char = ',';
const KEY_VALUE_SEPARATOR: char = ':';

/// Iterates the non-empty, trimmed pairs of `text`.
fn pairs(text: &str) -> impl Iterator<Item = &str> {
    text.split(PAIR_SEPARATOR)
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
}

/// Leniently parses `text` into a tag map.
///
/// Returns `None` for empty or whitespace-only input ("no tags").  Otherwise
/// returns the pairs that split on their first `:` into a non-blank key and a
/// non-blank value; every other pair is dropped.  When a key repeats, the
/// last occurrence wins.
///
/// # Example
///
/// ```rust
/// use mpos_core::parse_tags;
///
/// let tags = parse_tags("a:1,bad").unwrap();
/// assert_eq!(tags.len(), 1);
/// assert_eq!(tags["a"], "1");
/// assert!(parse_tags("   ").is_none());
/// ```
pub fn parse_tags(text: &str) -> Option<Tags> {
    if text.trim().is_empty() {
        return None;
    }

    let mut tags = Tags::new();
    for pair in pairs(text) {
        let Some((key, value)) = pair.split_once(KEY_VALUE_SEPARATOR) else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        tags.insert(key.to_string(), value.to_string());
    }
    Some(tags)
}

/// Strictly checks that `text` is well-formed.
///
/// Empty or whitespace-only input is valid.  Otherwise every pair must split
/// on `:` into exactly two parts, both non-blank after trimming.
pub fn validate_tags_format(text: &str) -> bool {
    pairs(text).all(|pair| {
        let parts: Vec<&str> = pair.split(KEY_VALUE_SEPARATOR).map(str::trim).collect();
        parts.len() == 2 && parts.iter().all(|part| !part.is_empty())
    })
}

/// Renders tags back into the mini-language (`key:value` joined by `,`).
///
/// Display only: the output is ordered by key, so it does not necessarily
/// reproduce the user's original text byte-for-byte.
pub fn format_tags(tags: &Tags) -> String {
    tags.iter()
        .map(|(key, value)| format!("{key}{KEY_VALUE_SEPARATOR}{value}"))
        .collect::<Vec<_>>()
        .join(&PAIR_SEPARATOR.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
