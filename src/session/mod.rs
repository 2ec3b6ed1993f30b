//! Per-conversation state
//!
//! A [`Session`] owns the conversation's order and dialogue stage. Stage
//! changes happen only in [`state_machine`]; order changes only through
//! [`crate::order::aggregator`]. Sessions live in a [`SessionStore`] and
//! expire passively after a period of inactivity.

mod clock;
pub mod state_machine;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use state_machine::{DueAction, TurnSignals};
pub use store::SessionStore;

use std::fmt;

use chrono::{DateTime, Utc};
use comanda_types::{ConversationKey, CustomerInfo, OrderId, Platform};
use serde::Serialize;

use crate::order::Order;

/// Dialogue workflow stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Greeting,
    Ordering,
    Confirming,
    Payment,
    Completed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Greeting => "greeting",
            Stage::Ordering => "ordering",
            Stage::Confirming => "confirming",
            Stage::Payment => "payment",
            Stage::Completed => "completed",
        }
    }

    /// Whether the current order may still change
    pub fn accepts_order_changes(&self) -> bool {
        !matches!(self, Stage::Completed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order whose payment was confirmed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedOrder {
    pub order_id: OrderId,
    pub order: Order,
    pub completed_at: DateTime<Utc>,
}

/// State of one conversation
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub key: ConversationKey,
    pub platform: Platform,
    pub table_number: Option<u32>,
    pub party_size: Option<u32>,
    pub customer: CustomerInfo,
    order: Order,
    stage: Stage,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Storage id once the current order has been recorded
    pub persisted_order_id: Option<OrderId>,
    pub completed_orders: Vec<CompletedOrder>,
}

impl Session {
    pub fn new(key: ConversationKey, platform: Platform, now: DateTime<Utc>) -> Self {
        Self {
            key,
            platform,
            table_number: None,
            party_size: None,
            customer: CustomerInfo::default(),
            order: Order::new(),
            stage: Stage::Greeting,
            created_at: now,
            last_activity: now,
            persisted_order_id: None,
            completed_orders: Vec::new(),
        }
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    /// Mutable order access for the aggregator functions.
    pub(crate) fn order_mut(&mut self) -> &mut Order {
        &mut self.order
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Table or party size is known
    pub fn has_table_context(&self) -> bool {
        self.table_number.is_some() || self.party_size.is_some()
    }
}
