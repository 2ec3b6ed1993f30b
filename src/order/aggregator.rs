//! The only mutation path for [`Order`]
//!
//! Repeated mentions of the same item merge into one line. The total is
//! rebuilt from the lines after every change and is never adjusted in place,
//! and every change bumps the order's revision.

use comanda_types::{MenuItem, MenuItemId};
use rust_decimal::Decimal;

use super::{Order, OrderLineItem};

/// What a single aggregator call did to the order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    Added { item_id: MenuItemId, quantity: u32 },
    Increased { item_id: MenuItemId, quantity: u32 },
    Decreased { item_id: MenuItemId, quantity: u32 },
    Removed { item_id: MenuItemId },
    NotInOrder { item_id: MenuItemId },
}

impl LineChange {
    pub fn item_id(&self) -> MenuItemId {
        match self {
            LineChange::Added { item_id, .. }
            | LineChange::Increased { item_id, .. }
            | LineChange::Decreased { item_id, .. }
            | LineChange::Removed { item_id }
            | LineChange::NotInOrder { item_id } => *item_id,
        }
    }

    /// Whether the order's lines changed
    pub fn is_mutation(&self) -> bool {
        !matches!(self, LineChange::NotInOrder { .. })
    }
}

/// Add `quantity` of `item`, merging into an existing line for the same id.
///
/// The name and price snapshot of an existing line are kept; later catalog
/// changes do not reprice what the customer already ordered.
pub fn apply_mention(order: &mut Order, item: &MenuItem, quantity: u32) -> LineChange {
    let quantity = quantity.max(1);
    let change = match order.lines.iter_mut().find(|l| l.item_id == item.id) {
        Some(line) => {
            line.quantity = line.quantity.saturating_add(quantity);
            LineChange::Increased {
                item_id: item.id,
                quantity: line.quantity,
            }
        }
        None => {
            order.lines.push(OrderLineItem {
                item_id: item.id,
                name: item.name.clone(),
                unit_price: item.price.round_dp(2),
                quantity,
            });
            LineChange::Added {
                item_id: item.id,
                quantity,
            }
        }
    };
    recompute_total(order);
    change
}

/// Decrement a line by `quantity`, or drop it when `quantity` is `None` or
/// the line would reach zero.
pub fn remove_mention(order: &mut Order, item_id: MenuItemId, quantity: Option<u32>) -> LineChange {
    let Some(index) = order.lines.iter().position(|l| l.item_id == item_id) else {
        return LineChange::NotInOrder { item_id };
    };

    let remaining = match quantity {
        Some(q) => order.lines[index].quantity.saturating_sub(q.max(1)),
        None => 0,
    };

    let change = if remaining == 0 {
        order.lines.remove(index);
        LineChange::Removed { item_id }
    } else {
        order.lines[index].quantity = remaining;
        LineChange::Decreased {
            item_id,
            quantity: remaining,
        }
    };
    recompute_total(order);
    change
}

/// Replace the free-text instructions; blank text clears them.
pub fn set_special_instructions(order: &mut Order, text: &str) {
    let trimmed = text.trim();
    order.special_instructions = if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    };
    order.revision += 1;
}

fn recompute_total(order: &mut Order) {
    order.total = order
        .lines
        .iter()
        .map(OrderLineItem::subtotal)
        .sum::<Decimal>()
        .round_dp(2);
    order.revision += 1;
}
