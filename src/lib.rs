//! comanda - conversational order extraction and session state engine
//!
//! Turns free-form restaurant chat messages into structured order edits,
//! keeps per-conversation state across turns, and decides which workflow
//! actions are due next. Language-model replies, chat transports and order
//! storage stay outside; the core talks to them through narrow traits.
//!
//! ## Pipeline
//! raw utterance -> normalize -> {intent rules, catalog matcher + quantity}
//! -> order aggregator -> session state machine -> due actions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use comanda::{EngineConfig, OrderingEngine, SessionStore, StaticCatalog, SystemClock};
//! use comanda_types::{ConversationKey, Platform};
//!
//! let config = EngineConfig::default();
//! let catalog = StaticCatalog::load_from_file("config/menu.yaml".as_ref()).unwrap();
//! let store = SessionStore::new(Arc::new(SystemClock), config.session.max_idle());
//! let engine = OrderingEngine::new(&config, Arc::new(catalog), Arc::new(store));
//!
//! let key = ConversationKey::new("telegram:42");
//! let outcome = engine.process_turn(&key, Platform::Telegram, "mesa 5, somos 3 pessoas", None);
//! println!("{:?} {:?}", outcome.stage, outcome.due_actions);
//! ```

// Core error handling
pub mod error;

// Engine configuration (YAML + environment)
pub mod config;

// Text pipeline
pub mod normalize;
pub mod catalog;
pub mod quantity;
pub mod intent;

// Order and session state
pub mod order;
pub mod session;

// Collaborator seams
pub mod persistence;
pub mod reply;

// Turn processing
pub mod engine;

pub use catalog::{CatalogMatcher, CatalogProvider, Mention, StaticCatalog, Suggestion};
pub use config::EngineConfig;
pub use engine::{IntentAnalysis, OrderingEngine, TurnOutcome};
pub use error::{ActionError, ComandaError, ConfigError, PersistenceError, Result};
pub use intent::{ExtractedFields, ExtractedItem, Intent, IntentClassifier};
pub use order::{Order, OrderIssue, OrderLineItem};
pub use persistence::{InMemoryOrderLedger, OrderDraft, OrderPersistence};
pub use reply::{DialogueGenerator, ReplyContext};
pub use session::{
    Clock, CompletedOrder, DueAction, ManualClock, Session, SessionStore, Stage, SystemClock,
};
