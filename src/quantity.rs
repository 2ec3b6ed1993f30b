//! Quantity resolution for item mentions
//!
//! Looks for a quantity token near a mention in the normalized utterance:
//! bare digits ("2"), multiplier forms ("2x", "x2"), or a cardinal word
//! ("duas"). Tokens inside the window before the mention and the word right
//! after it are candidates; the nearest wins, the one before on a tie. The
//! caller can stop the look-back at the end of an earlier mention.
//! Mentions without a span fall back to the first token in the utterance.
//! Numbers that belong to table/party phrases ("mesa 5", "3 pessoas") are skipped.

use crate::catalog::MatchSpan;
use crate::config::QuantityConfig;
use crate::normalize::words_with_offsets;

/// Canonical cardinal words, one through ten
const NUMBER_WORDS: &[(&str, u32)] = &[
    ("um", 1),
    ("uma", 1),
    ("dois", 2),
    ("duas", 2),
    ("tres", 3),
    ("quatro", 4),
    ("cinco", 5),
    ("seis", 6),
    ("sete", 7),
    ("oito", 8),
    ("nove", 9),
    ("dez", 10),
];

const TABLE_MARKERS_BEFORE: &[&str] = &["mesa", "somos"];
const PARTY_MARKERS_AFTER: &[&str] = &["pessoa", "pessoas"];

#[derive(Debug, Clone)]
pub struct QuantityResolver {
    window_chars: usize,
}

impl Default for QuantityResolver {
    fn default() -> Self {
        Self::new(&QuantityConfig::default())
    }
}

impl QuantityResolver {
    pub fn new(config: &QuantityConfig) -> Self {
        Self {
            window_chars: config.window_chars,
        }
    }

    /// Quantity for a mention; always at least 1.
    pub fn quantity_for(&self, text: &str, span: Option<MatchSpan>) -> u32 {
        self.stated_quantity(text, span).unwrap_or(1)
    }

    /// The quantity the utterance states for a mention, if any.
    pub fn stated_quantity(&self, text: &str, span: Option<MatchSpan>) -> Option<u32> {
        self.stated_quantity_after(text, span, 0)
    }

    /// Like [`stated_quantity`](Self::stated_quantity), but the look-back
    /// window never reaches before byte `floor` (the end of an earlier mention).
    pub fn stated_quantity_after(
        &self,
        text: &str,
        span: Option<MatchSpan>,
        floor: usize,
    ) -> Option<u32> {
        let words = words_with_offsets(text);
        let tokens: Vec<QuantityToken> = words
            .iter()
            .enumerate()
            .filter_map(|(i, (offset, word))| {
                let value = parse_quantity(word)?;
                if is_table_or_party_number(&words, i) {
                    return None;
                }
                Some(QuantityToken {
                    start: *offset,
                    end: offset + word.len(),
                    value,
                })
            })
            .collect();

        let found = match span {
            Some(span) => self.nearest(&tokens, &words, span, floor),
            None => tokens.first().map(|t| t.value),
        };

        found.filter(|v| *v > 0)
    }

    fn nearest(
        &self,
        tokens: &[QuantityToken],
        words: &[(usize, &str)],
        span: MatchSpan,
        floor: usize,
    ) -> Option<u32> {
        let window_start = span.start.saturating_sub(self.window_chars).max(floor);
        let before = tokens
            .iter()
            .filter(|t| t.end <= span.start && t.start >= window_start)
            .max_by_key(|t| t.end)
            .map(|t| (span.start - t.end, t.value));

        // Only the word immediately after the mention ("caipirinha 2")
        let after = words
            .iter()
            .find(|(offset, _)| *offset > span.end)
            .and_then(|(offset, _)| tokens.iter().find(|t| t.start == *offset))
            .map(|t| (t.start - span.end, t.value));

        match (before, after) {
            (Some((db, vb)), Some((da, va))) => Some(if db <= da { vb } else { va }),
            (Some((_, v)), None) | (None, Some((_, v))) => Some(v),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QuantityToken {
    start: usize,
    end: usize,
    value: u32,
}

/// Value of a bare number: digits or a cardinal word. Zero and overflow are rejected.
pub(crate) fn cardinal(word: &str) -> Option<u32> {
    if let Some((_, value)) = NUMBER_WORDS.iter().find(|(w, _)| *w == word) {
        return Some(*value);
    }
    if word.is_empty() || !word.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    word.parse::<u32>().ok().filter(|v| *v > 0)
}

/// Parse one normalized word as a quantity, accepting "2x" and "x2".
fn parse_quantity(word: &str) -> Option<u32> {
    cardinal(word).or_else(|| {
        let digits = word.strip_suffix('x').or_else(|| word.strip_prefix('x'))?;
        if digits.bytes().all(|b| b.is_ascii_digit()) {
            cardinal(digits)
        } else {
            None
        }
    })
}

fn is_table_or_party_number(words: &[(usize, &str)], index: usize) -> bool {
    let prev = index.checked_sub(1).map(|i| words[i].1);
    let next = words.get(index + 1).map(|(_, w)| *w);

    prev.is_some_and(|p| TABLE_MARKERS_BEFORE.contains(&p))
        || next.is_some_and(|n| PARTY_MARKERS_AFTER.contains(&n))
}
