//! Order storage collaborator
//!
//! The core never writes orders itself. When a turn schedules
//! [`DueAction::PersistOrder`](crate::session::DueAction::PersistOrder) the
//! caller hands an [`OrderPersistence`] to
//! [`OrderingEngine::persist_order`](crate::engine::OrderingEngine::persist_order).

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comanda_types::{ConversationKey, CustomerInfo, OrderId, Platform};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::PersistenceError;
use crate::order::OrderLineItem;

/// Order header handed to storage; lines follow through `add_line_item`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDraft {
    pub conversation: ConversationKey,
    pub platform: Platform,
    pub table_number: Option<u32>,
    pub party_size: Option<u32>,
    pub customer: CustomerInfo,
    pub total: Decimal,
    pub special_instructions: Option<String>,
    pub estimated_minutes: u32,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait OrderPersistence: Send + Sync {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderId, PersistenceError>;

    async fn add_line_item(
        &self,
        order_id: OrderId,
        line: &OrderLineItem,
    ) -> Result<(), PersistenceError>;
}

/// A recorded order as held by [`InMemoryOrderLedger`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerOrder {
    pub id: OrderId,
    pub draft: OrderDraft,
    pub lines: Vec<OrderLineItem>,
}

/// Process-local order storage with sequential ids.
#[derive(Debug, Default)]
pub struct InMemoryOrderLedger {
    orders: Mutex<Vec<LedgerOrder>>,
}

impl InMemoryOrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<LedgerOrder> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: OrderId) -> Option<LedgerOrder> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|o| o.id == id)
            .cloned()
    }
}

#[async_trait]
impl OrderPersistence for InMemoryOrderLedger {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderId, PersistenceError> {
        let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        let id = OrderId(orders.len() as i64 + 1);
        orders.push(LedgerOrder {
            id,
            draft: draft.clone(),
            lines: Vec::new(),
        });
        Ok(id)
    }

    async fn add_line_item(
        &self,
        order_id: OrderId,
        line: &OrderLineItem,
    ) -> Result<(), PersistenceError> {
        let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        let order = orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| PersistenceError::Rejected(format!("unknown order {}", order_id)))?;
        order.lines.push(line.clone());
        Ok(())
    }
}
