//! Mention extraction from normalized utterances
//!
//! Each catalog item is tried against the utterance with three tiers, first
//! success wins for that item:
//!
//! 1. exact substring of the normalized item name (strength 1.0)
//! 2. partial-word overlap, accepted when overlapping / item words reaches the
//!    configured threshold (strength = ratio)
//! 3. synonym table: an alternate for a fragment of the item name occurs in the
//!    utterance (fixed strength)
//!
//! Several items may match one utterance; all are returned, ordered by where
//! they were mentioned. Negation ("sem coca") is not detected.

use comanda_types::MenuItem;
use serde::Serialize;

use crate::config::{EngineConfig, MatchingConfig};
use crate::normalize::{find_phrase, normalize_text, words_with_offsets};

use super::suggest::{self, Suggestion};

/// Which tier produced a mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    Exact,
    PartialWord,
    Synonym,
}

/// Byte range of a mention inside the normalized utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

/// A catalog item detected in free text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mention {
    /// Snapshot of the item at match time
    pub item: MenuItem,
    pub strength: f64,
    pub rule: MatchRule,
    pub span: Option<MatchSpan>,
}

/// Catalog matcher with its thresholds and normalized synonym table
#[derive(Debug, Clone)]
pub struct CatalogMatcher {
    config: MatchingConfig,
    /// (normalized fragment, normalized alternates)
    synonyms: Vec<(String, Vec<String>)>,
}

impl Default for CatalogMatcher {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl CatalogMatcher {
    pub fn from_config(config: &EngineConfig) -> Self {
        let synonyms = config
            .synonyms
            .iter()
            .map(|(fragment, alternates)| {
                (
                    normalize_text(fragment),
                    alternates
                        .iter()
                        .map(|a| normalize_text(a))
                        .filter(|a| !a.is_empty())
                        .collect(),
                )
            })
            .filter(|(fragment, _)| !fragment.is_empty())
            .collect();

        Self {
            config: config.matching.clone(),
            synonyms,
        }
    }

    /// Find every catalog item mentioned in `text` (already normalized).
    pub fn find_mentions(&self, text: &str, catalog: &[MenuItem]) -> Vec<Mention> {
        if text.is_empty() {
            return Vec::new();
        }

        let text_words = words_with_offsets(text);
        let mut mentions: Vec<(usize, Mention)> = catalog
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                let name = normalize_text(&item.name);
                if name.is_empty() {
                    return None;
                }
                self.match_item(text, &text_words, &name)
                    .map(|(rule, strength, span)| {
                        (
                            idx,
                            Mention {
                                item: item.clone(),
                                strength,
                                rule,
                                span,
                            },
                        )
                    })
            })
            .collect();

        // Mention order, catalog order for ties and span-less matches
        mentions.sort_by_key(|(idx, m)| (m.span.map_or(usize::MAX, |s| s.start), *idx));
        mentions.into_iter().map(|(_, m)| m).collect()
    }

    /// Rank catalog items by rough similarity, for "did you mean" prompts.
    pub fn suggest_similar(&self, text: &str, catalog: &[MenuItem]) -> Vec<Suggestion> {
        suggest::rank(text, catalog, &self.config)
    }

    fn match_item(
        &self,
        text: &str,
        text_words: &[(usize, &str)],
        name: &str,
    ) -> Option<(MatchRule, f64, Option<MatchSpan>)> {
        if let Some(start) = text.find(name) {
            let span = MatchSpan {
                start,
                end: start + name.len(),
            };
            return Some((MatchRule::Exact, 1.0, Some(span)));
        }

        if let Some((ratio, span)) = self.partial_overlap(text_words, name) {
            if ratio >= self.config.partial_overlap_threshold {
                return Some((MatchRule::PartialWord, ratio, span));
            }
        }

        for (fragment, alternates) in &self.synonyms {
            if !name.contains(fragment.as_str()) {
                continue;
            }
            for alternate in alternates {
                if let Some(start) = find_phrase(text, alternate) {
                    let span = MatchSpan {
                        start,
                        end: start + alternate.len(),
                    };
                    return Some((MatchRule::Synonym, self.config.synonym_strength, Some(span)));
                }
            }
        }

        None
    }

    /// Ratio of item-name words overlapping some utterance word, with the
    /// span of the earliest and latest overlapping utterance words.
    fn partial_overlap(
        &self,
        text_words: &[(usize, &str)],
        name: &str,
    ) -> Option<(f64, Option<MatchSpan>)> {
        let item_words: Vec<&str> = name.split(' ').collect();
        if item_words.is_empty() || text_words.is_empty() {
            return None;
        }

        let mut overlapping = 0usize;
        let mut span: Option<MatchSpan> = None;
        for item_word in &item_words {
            let hit = text_words
                .iter()
                .find(|(_, w)| words_overlap(w, item_word, self.config.min_fragment_len));
            if let Some((offset, word)) = hit {
                overlapping += 1;
                let (start, end) = (*offset, offset + word.len());
                span = Some(match span {
                    None => MatchSpan { start, end },
                    Some(s) => MatchSpan {
                        start: s.start.min(start),
                        end: s.end.max(end),
                    },
                });
            }
        }

        if overlapping == 0 {
            return None;
        }
        Some((overlapping as f64 / item_words.len() as f64, span))
    }
}

/// Substring overlap either way; the contained side must be at least
/// `min_len` bytes unless the words are equal.
pub(crate) fn words_overlap(a: &str, b: &str, min_len: usize) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= min_len && long.contains(short)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn menu() -> Vec<MenuItem> {
        vec![
            MenuItem::new(3, "Hambúrguer Artesanal", Decimal::new(3290, 2), "Pratos Principais"),
            MenuItem::new(4, "Salmão Grelhado", Decimal::new(4590, 2), "Pratos Principais"),
            MenuItem::new(5, "Risotto de Camarão", Decimal::new(3890, 2), "Pratos Principais"),
            MenuItem::new(6, "Coca-Cola 350ml", Decimal::new(690, 2), "Bebidas"),
            MenuItem::new(7, "Suco Natural de Laranja", Decimal::new(890, 2), "Bebidas"),
            MenuItem::new(8, "Caipirinha", Decimal::new(1490, 2), "Bebidas"),
        ]
    }

    fn find(text: &str) -> Vec<Mention> {
        CatalogMatcher::default().find_mentions(&normalize_text(text), &menu())
    }

    #[test]
    fn exact_name_has_full_strength() {
        let mentions = find("quero 2 hamburguer artesanal");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].item.name, "Hambúrguer Artesanal");
        assert_eq!(mentions[0].rule, MatchRule::Exact);
        assert_eq!(mentions[0].strength, 1.0);
        assert_eq!(mentions[0].span, Some(MatchSpan { start: 8, end: 28 }));
    }

    #[test]
    fn plural_still_matches_as_substring() {
        let mentions = find("duas caipirinhas por favor");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].item.name, "Caipirinha");
        assert_eq!(mentions[0].rule, MatchRule::Exact);
    }

    #[test]
    fn partial_word_overlap_above_threshold() {
        // "risotto" and "camarao" overlap, "de" is absent: 2/3 < 0.7
        assert!(find("um risotto com camarao").is_empty());
        // 3 of 4 words: 0.75
        let mentions = find("um suco natural laranja");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].rule, MatchRule::PartialWord);
        assert!((mentions[0].strength - 0.75).abs() < 1e-9);
        assert_eq!(mentions[0].span, Some(MatchSpan { start: 3, end: 23 }));
    }

    #[test]
    fn short_words_do_not_count_as_fragments() {
        assert!(!words_overlap("de", "delicia", 3));
        assert!(words_overlap("de", "de", 3));
        assert!(words_overlap("salmao", "salmaozinho", 3));
    }

    #[test]
    fn synonym_matches_colloquial_name() {
        let mentions = find("quero uma coca");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].item.name, "Coca-Cola 350ml");
        assert_eq!(mentions[0].rule, MatchRule::Synonym);
        assert_eq!(mentions[0].strength, 0.6);
    }

    #[test]
    fn synonym_needs_word_boundary() {
        assert!(find("uma cocada").is_empty());
    }

    #[test]
    fn multiple_items_in_mention_order() {
        let mentions = find("uma caipirinha e 1 salmão grelhado");
        let names: Vec<_> = mentions.iter().map(|m| m.item.name.as_str()).collect();
        assert_eq!(names, vec!["Caipirinha", "Salmão Grelhado"]);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        let matcher = CatalogMatcher::default();
        assert!(matcher.find_mentions("", &menu()).is_empty());
        assert!(matcher.find_mentions("quero uma coca", &[]).is_empty());
    }
}
