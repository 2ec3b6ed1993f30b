//! Engine Configuration
//!
//! Thresholds, windows and the synonym table used by the extraction pipeline,
//! plus the session inactivity window. Loaded from YAML; every field has a
//! default so an empty document is a valid configuration.
//!
//! ```yaml
//! matching:
//!   partial_overlap_threshold: 0.7
//! session:
//!   max_idle_minutes: 30
//! synonyms:
//!   hamburguer: [burger, sanduiche]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub quantity: QuantityConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Item-name fragment → colloquial alternates
    #[serde(default = "default_synonyms")]
    pub synonyms: BTreeMap<String, Vec<String>>,
}

/// Catalog matcher thresholds, one per match tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum overlapping-words / item-words ratio for a partial match
    pub partial_overlap_threshold: f64,
    /// Strength reported for synonym matches
    pub synonym_strength: f64,
    /// Shortest fragment allowed to count as a substring overlap
    pub min_fragment_len: usize,
    /// Minimum similarity for a "did you mean" suggestion
    pub suggestion_threshold: f64,
    pub max_suggestions: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            partial_overlap_threshold: 0.7,
            synonym_strength: 0.6,
            min_fragment_len: 3,
            suggestion_threshold: 0.3,
            max_suggestions: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantityConfig {
    /// Characters scanned before a mention for its quantity
    pub window_chars: usize,
}

impl Default for QuantityConfig {
    fn default() -> Self {
        Self { window_chars: 20 }
    }
}

/// Longest accepted inactivity window, one year
pub const MAX_IDLE_MINUTES_LIMIT: i64 = 525_600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity after which a session is swept
    pub max_idle_minutes: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_idle_minutes: 60,
        }
    }
}

impl SessionConfig {
    /// Idle window, clamped to `1..=MAX_IDLE_MINUTES_LIMIT` minutes.
    pub fn max_idle(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.max_idle_minutes.clamp(1, MAX_IDLE_MINUTES_LIMIT))
    }
}

fn default_synonyms() -> BTreeMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        ("hamburguer", &["burger", "sanduiche", "hamburgao", "lanche"]),
        ("refrigerante", &["refri", "pepsi", "guarana"]),
        ("coca cola", &["coca", "coke", "refri", "refrigerante"]),
        ("batata", &["fritas", "batatas"]),
        ("agua", &["agua mineral", "aguinha"]),
        ("cerveja", &["breja", "cervejinha"]),
        ("camarao", &["camaroes"]),
        ("salmao", &["salmon"]),
        ("frango", &["galinha", "chicken"]),
        ("suco", &["suquinho"]),
    ];
    table
        .iter()
        .map(|(fragment, alternates)| {
            (
                fragment.to_string(),
                alternates.iter().map(|a| a.to_string()).collect(),
            )
        })
        .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matching: MatchingConfig::default(),
            quantity: QuantityConfig::default(),
            session: SessionConfig::default(),
            synonyms: default_synonyms(),
        }
    }
}

impl EngineConfig {
    /// Load from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::load_from_str(&content)
    }

    /// Load from a YAML string
    pub fn load_from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply `COMANDA_*` environment overrides on top of the loaded values.
    ///
    /// - `COMANDA_SESSION_MAX_IDLE_MINUTES`
    /// - `COMANDA_PARTIAL_OVERLAP_THRESHOLD`
    /// - `COMANDA_QUANTITY_WINDOW_CHARS`
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_value("COMANDA_SESSION_MAX_IDLE_MINUTES")? {
            self.session.max_idle_minutes = v;
        }
        if let Some(v) = env_value("COMANDA_PARTIAL_OVERLAP_THRESHOLD")? {
            self.matching.partial_overlap_threshold = v;
        }
        if let Some(v) = env_value("COMANDA_QUANTITY_WINDOW_CHARS")? {
            self.quantity.window_chars = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratios = [
            (
                "matching.partial_overlap_threshold",
                self.matching.partial_overlap_threshold,
            ),
            ("matching.synonym_strength", self.matching.synonym_strength),
            (
                "matching.suggestion_threshold",
                self.matching.suggestion_threshold,
            ),
        ];
        for (key, value) in ratios {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("expected a ratio in (0, 1], got {}", value),
                });
            }
        }
        if !(1..=MAX_IDLE_MINUTES_LIMIT).contains(&self.session.max_idle_minutes) {
            return Err(ConfigError::InvalidValue {
                key: "session.max_idle_minutes".to_string(),
                reason: format!(
                    "expected 1..={} minutes, got {}",
                    MAX_IDLE_MINUTES_LIMIT, self.session.max_idle_minutes
                ),
            });
        }
        if self.quantity.window_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "quantity.window_chars".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn env_value<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: name.to_string(),
                reason: format!("cannot parse '{}'", raw),
            }),
        Err(_) => Ok(None),
    }
}
