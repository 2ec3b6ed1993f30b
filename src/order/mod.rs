//! Orders and line items
//!
//! An [`Order`] keeps its lines in mention order and carries a total that is
//! derived from them. Fields are private: every mutation goes through the
//! functions in [`aggregator`], which recompute the total from scratch.

pub mod aggregator;
mod validation;

pub use aggregator::{apply_mention, remove_mention, set_special_instructions, LineChange};
pub use validation::{estimate_preparation_minutes, validate_order, OrderIssue};

use std::fmt;

use comanda_types::MenuItemId;
use rust_decimal::Decimal;
use serde::Serialize;

/// One catalog item plus quantity, with name and price captured when it was
/// first mentioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineItem {
    pub item_id: MenuItemId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderLineItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl fmt::Display for OrderLineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x {} - R$ {:.2}",
            self.quantity,
            self.name,
            self.subtotal()
        )
    }
}

/// A customer's running order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Order {
    lines: Vec<OrderLineItem>,
    total: Decimal,
    special_instructions: Option<String>,
    /// Bumped by every aggregator mutation
    #[serde(skip)]
    revision: u64,
}

impl Order {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[OrderLineItem] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn special_instructions(&self) -> Option<&str> {
        self.special_instructions.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Changes whenever lines or instructions change. Used to detect edits
    /// made while a snapshot of the order was being recorded.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Sum of quantities across all lines
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}
