//! Classifier rules
//!
//! Each rule is a predicate plus an effect on the classification being built.
//! Cumulative rules always run; the first exclusive rule that fires sets the
//! intent and later exclusive rules are skipped.

use std::sync::LazyLock;

use regex::Regex;

use super::{Classification, Intent};
use crate::quantity::cardinal;

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bmesa (\w+)\b").unwrap());

static PARTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\w+) pessoas?\b|\bsomos (\w+)\b").unwrap()
});

/// Whether a rule participates in first-match-wins intent selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Cumulative,
    Exclusive,
}

/// One step of the classifier's ordered rule chain
pub trait IntentRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> RuleKind;

    /// Apply the rule to normalized `text`; returns whether it fired.
    fn apply(&self, text: &str, words: &[&str], classification: &mut Classification) -> bool;
}

// =============================================================================
// Cumulative extractors
// =============================================================================

/// "mesa 5" → table number
pub struct TableNumberRule;

impl IntentRule for TableNumberRule {
    fn name(&self) -> &'static str {
        "table_number"
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Cumulative
    }

    fn apply(&self, text: &str, _words: &[&str], classification: &mut Classification) -> bool {
        let found = TABLE_RE
            .captures_iter(text)
            .find_map(|caps| caps.get(1).and_then(|m| cardinal(m.as_str())));
        match found {
            Some(table) => {
                classification.fields.table_number = Some(table);
                true
            }
            None => false,
        }
    }
}

/// "3 pessoas" / "somos 3" → party size
pub struct PartySizeRule;

impl IntentRule for PartySizeRule {
    fn name(&self) -> &'static str {
        "party_size"
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Cumulative
    }

    fn apply(&self, text: &str, _words: &[&str], classification: &mut Classification) -> bool {
        let found = PARTY_RE.captures_iter(text).find_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .and_then(|m| cardinal(m.as_str()))
        });
        match found {
            Some(size) => {
                classification.fields.party_size = Some(size);
                true
            }
            None => false,
        }
    }
}

/// Verbs that turn item mentions into removals
pub struct RemovalMarkerRule {
    markers: &'static [&'static str],
}

impl Default for RemovalMarkerRule {
    fn default() -> Self {
        Self {
            markers: &[
                "tirar", "tira", "remover", "remove", "retirar", "retira", "cancelar", "cancela",
            ],
        }
    }
}

impl IntentRule for RemovalMarkerRule {
    fn name(&self) -> &'static str {
        "removal_marker"
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Cumulative
    }

    fn apply(&self, _text: &str, words: &[&str], classification: &mut Classification) -> bool {
        let fired = words.iter().any(|w| self.markers.contains(w));
        if fired {
            classification.fields.removal = true;
        }
        fired
    }
}

// =============================================================================
// Exclusive keyword rules
// =============================================================================

/// Sets `intent` when any keyword occurs as a word. Keywords of five or more
/// letters also match as prefixes ("confirma" → "confirmar").
pub struct KeywordRule {
    name: &'static str,
    intent: Intent,
    keywords: &'static [&'static str],
}

impl KeywordRule {
    pub const fn new(name: &'static str, intent: Intent, keywords: &'static [&'static str]) -> Self {
        Self {
            name,
            intent,
            keywords,
        }
    }

    pub fn ordering() -> Self {
        Self::new(
            "ordering_keywords",
            Intent::Ordering,
            &["quero", "gostaria", "pedido", "pedir"],
        )
    }

    pub fn confirmation() -> Self {
        Self::new(
            "confirmation_keywords",
            Intent::Confirmation,
            &["sim", "confirma", "ok", "certo"],
        )
    }

    pub fn payment() -> Self {
        Self::new(
            "payment_keywords",
            Intent::Payment,
            &["pix", "pagar", "pagamento"],
        )
    }

    fn matches_word(&self, word: &str) -> bool {
        self.keywords
            .iter()
            .any(|kw| word == *kw || (kw.len() >= 5 && word.starts_with(kw)))
    }
}

impl IntentRule for KeywordRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Exclusive
    }

    fn apply(&self, _text: &str, words: &[&str], classification: &mut Classification) -> bool {
        let fired = words.iter().any(|w| self.matches_word(w));
        if fired {
            classification.intent = self.intent;
        }
        fired
    }
}
