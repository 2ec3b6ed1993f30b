//! Intent classification over normalized utterances
//!
//! Deterministic ordered rule chain, no learned model:
//!
//! ```text
//! table number ─┐
//! party size   ─┼─ cumulative: always run, fill ExtractedFields
//! removal verb ─┘
//! ordering     ─┐
//! confirmation ─┼─ exclusive: first match sets the intent
//! payment      ─┘
//! fallback: people_count / table_info / general
//! ```
//!
//! Classification never fails; empty text yields `General` with no fields.

mod rules;

pub use rules::{
    IntentRule, KeywordRule, PartySizeRule, RemovalMarkerRule, RuleKind, TableNumberRule,
};

use serde::Serialize;

use comanda_types::MenuItemId;
use rust_decimal::Decimal;

use crate::normalize::words;

/// Dialogue intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Ordering,
    Confirmation,
    Payment,
    TableInfo,
    PeopleCount,
    #[default]
    General,
}

/// Structured values pulled from one utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedFields {
    pub table_number: Option<u32>,
    pub party_size: Option<u32>,
    /// A removal verb was present; mentions subtract instead of add
    pub removal: bool,
    pub items: Vec<ExtractedItem>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.table_number.is_none() && self.party_size.is_none() && self.items.is_empty()
    }
}

/// A matched catalog item with its resolved quantity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedItem {
    pub item_id: MenuItemId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    /// The utterance gave an explicit quantity rather than the default of one
    pub quantity_stated: bool,
    pub strength: f64,
}

/// Result of running the rule chain
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    pub fields: ExtractedFields,
    /// Names of the rules that fired, in evaluation order
    pub fired_rules: Vec<&'static str>,
}

/// Ordered rule chain
pub struct IntentClassifier {
    rules: Vec<Box<dyn IntentRule>>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::with_rules(vec![
            Box::new(TableNumberRule),
            Box::new(PartySizeRule),
            Box::new(RemovalMarkerRule::default()),
            Box::new(KeywordRule::ordering()),
            Box::new(KeywordRule::confirmation()),
            Box::new(KeywordRule::payment()),
        ])
    }
}

impl IntentClassifier {
    pub fn with_rules(rules: Vec<Box<dyn IntentRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Classify normalized text.
    pub fn classify(&self, text: &str) -> Classification {
        let words = words(text);
        let mut classification = Classification::default();
        let mut intent_set = false;

        for rule in &self.rules {
            if rule.kind() == RuleKind::Exclusive && intent_set {
                continue;
            }
            if rule.apply(text, &words, &mut classification) {
                classification.fired_rules.push(rule.name());
                if rule.kind() == RuleKind::Exclusive {
                    intent_set = true;
                }
            }
        }

        if !intent_set {
            classification.intent = if classification.fields.party_size.is_some() {
                Intent::PeopleCount
            } else if classification.fields.table_number.is_some() {
                Intent::TableInfo
            } else {
                Intent::General
            };
        }

        classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_text;

    fn classify(raw: &str) -> Classification {
        IntentClassifier::default().classify(&normalize_text(raw))
    }

    #[test]
    fn table_and_party_without_keywords() {
        let c = classify("mesa 5, somos 3 pessoas");
        assert_eq!(c.intent, Intent::PeopleCount);
        assert_eq!(c.fields.table_number, Some(5));
        assert_eq!(c.fields.party_size, Some(3));

        let c = classify("mesa 7");
        assert_eq!(c.intent, Intent::TableInfo);
    }

    #[test]
    fn fields_are_extracted_alongside_intent() {
        let c = classify("mesa 2, quero uma caipirinha");
        assert_eq!(c.intent, Intent::Ordering);
        assert_eq!(c.fields.table_number, Some(2));
    }

    #[test]
    fn first_exclusive_rule_wins() {
        // ordering is checked before confirmation
        let c = classify("sim, quero mais uma coca");
        assert_eq!(c.intent, Intent::Ordering);
        assert!(!c.fired_rules.contains(&"confirmation_keywords"));

        // confirmation is checked before payment
        let c = classify("ok, pode ser no pix");
        assert_eq!(c.intent, Intent::Confirmation);
    }

    #[test]
    fn each_keyword_family() {
        assert_eq!(classify("gostaria de pedir").intent, Intent::Ordering);
        assert_eq!(classify("Confirma!").intent, Intent::Confirmation);
        assert_eq!(classify("como faço o pagamento?").intent, Intent::Payment);
        assert_eq!(classify("qual o horario?").intent, Intent::General);
    }

    #[test]
    fn empty_utterance_is_general() {
        let c = classify("");
        assert_eq!(c.intent, Intent::General);
        assert!(c.fields.is_empty());
        assert!(c.fired_rules.is_empty());
    }

    #[test]
    fn rule_order_is_explicit() {
        assert_eq!(
            IntentClassifier::default().rule_names(),
            vec![
                "table_number",
                "party_size",
                "removal_marker",
                "ordering_keywords",
                "confirmation_keywords",
                "payment_keywords",
            ]
        );
    }
}
