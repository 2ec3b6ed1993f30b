//! "Did you mean" ranking for utterances that matched nothing
//!
//! Word-overlap similarity (overlapping words / larger word count), ties broken
//! by Jaro-Winkler over the whole strings.

use comanda_types::MenuItem;
use serde::Serialize;

use crate::config::MatchingConfig;
use crate::normalize::{normalize_text, words};

use super::matcher::words_overlap;

/// A catalog item resembling the utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub item: MenuItem,
    pub similarity: f64,
}

pub(super) fn rank(text: &str, catalog: &[MenuItem], config: &MatchingConfig) -> Vec<Suggestion> {
    let text_words = words(text);
    if text_words.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(Suggestion, f64)> = catalog
        .iter()
        .filter_map(|item| {
            let name = normalize_text(&item.name);
            let name_words = words(&name);
            if name_words.is_empty() {
                return None;
            }

            let matches = text_words
                .iter()
                .filter(|tw| {
                    name_words
                        .iter()
                        .any(|nw| words_overlap(tw, nw, config.min_fragment_len))
                })
                .count();
            let similarity = matches as f64 / text_words.len().max(name_words.len()) as f64;
            if similarity <= config.suggestion_threshold {
                return None;
            }

            let tie_break = strsim::jaro_winkler(text, &name);
            Some((
                Suggestion {
                    item: item.clone(),
                    similarity,
                },
                tie_break,
            ))
        })
        .collect();

    scored.sort_by(|(a, a_tie), (b, b_tie)| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b_tie.partial_cmp(a_tie).unwrap_or(std::cmp::Ordering::Equal))
    });
    scored.truncate(config.max_suggestions);
    scored.into_iter().map(|(s, _)| s).collect()
}
