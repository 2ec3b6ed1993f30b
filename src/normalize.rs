//! Text normalization for catalog matching
//!
//! Folds an utterance (or a catalog name) into the canonical form every other
//! stage works on:
//! - Lowercase conversion
//! - Unicode NFKD decomposition with combining marks dropped ("salmão" → "salmao")
//! - Anything outside `[a-z0-9 ]` replaced with a space
//! - Whitespace collapsing and trimming
//!
//! The output alphabet is ASCII, so byte offsets and char offsets coincide.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize free text for matching. Total and idempotent.
///
/// # Examples
///
/// ```
/// use comanda::normalize::normalize_text;
///
/// assert_eq!(normalize_text("Hambúrguer  Artesanal!"), "hamburguer artesanal");
/// assert_eq!(normalize_text("Coca-Cola 350ml"), "coca cola 350ml");
/// assert_eq!(normalize_text("  "), "");
/// ```
pub fn normalize_text(s: &str) -> String {
    let folded: String = s
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split already-normalized text into words.
pub fn words(normalized: &str) -> Vec<&str> {
    normalized.split(' ').filter(|w| !w.is_empty()).collect()
}

/// Words of normalized text together with their byte offsets.
pub fn words_with_offsets(normalized: &str) -> Vec<(usize, &str)> {
    let mut result = Vec::new();
    let mut offset = 0;
    for word in normalized.split(' ') {
        if !word.is_empty() {
            result.push((offset, word));
        }
        offset += word.len() + 1;
    }
    result
}

/// Byte offset of the first space-bounded occurrence of `phrase` in `text`.
pub(crate) fn find_phrase(text: &str, phrase: &str) -> Option<usize> {
    if phrase.is_empty() {
        return None;
    }
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(pos) = text[from..].find(phrase) {
        let start = from + pos;
        let end = start + phrase.len();
        let left_ok = start == 0 || bytes[start - 1] == b' ';
        let right_ok = end == text.len() || bytes[end] == b' ';
        if left_ok && right_ok {
            return Some(start);
        }
        from = start + text[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}
