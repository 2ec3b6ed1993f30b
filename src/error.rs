//! Error handling for the ordering core
//!
//! Extraction ambiguity and rejected transitions are not errors: they surface as
//! due actions. What remains here are configuration/catalog loading failures
//! ([`ComandaError`]) and the typed failures of caller-executed actions
//! ([`ActionError`]), which are returned on their own.

use comanda_types::{ConversationKey, OrderId};
use thiserror::Error;

use crate::order::OrderIssue;
use crate::session::Stage;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum ComandaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Engine configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Static catalog loading errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read menu file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse menu: {0}")]
    Parse(String),

    #[error("Duplicate menu item id {0}")]
    DuplicateId(i64),
}

/// Failure reported by the order persistence collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Order storage unavailable: {0}")]
    Unavailable(String),

    #[error("Order storage rejected the write: {0}")]
    Rejected(String),
}

/// Failure of a due action executed through the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Order is not valid: {}", format_issues(.0))]
    InvalidOrder(Vec<OrderIssue>),

    #[error("No session for conversation '{0}'")]
    UnknownSession(ConversationKey),

    #[error("Action requires stage {expected:?}, session is in {actual:?}")]
    WrongStage { expected: Stage, actual: Stage },

    #[error("Order changed while it was being recorded; stored order {order_id} is outdated")]
    StaleOrder { order_id: OrderId },
}

fn format_issues(issues: &[OrderIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, ComandaError>;
