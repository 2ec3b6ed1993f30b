//! Pre-persistence checks and kitchen time estimate

use std::fmt;

use comanda_types::MenuItemId;
use rust_decimal::Decimal;
use serde::Serialize;

use super::Order;
use crate::catalog::CatalogProvider;

const BASE_MINUTES: u32 = 5;
const PER_EXTRA_LINE_MINUTES: u32 = 2;
const MIN_ESTIMATE_MINUTES: u32 = 15;

/// Reason an order cannot be recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderIssue {
    Empty,
    NonPositiveTotal,
    UnknownItem { item_id: MenuItemId, name: String },
    Unavailable { item_id: MenuItemId, name: String },
}

impl fmt::Display for OrderIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderIssue::Empty => write!(f, "order is empty"),
            OrderIssue::NonPositiveTotal => write!(f, "order total is not positive"),
            OrderIssue::UnknownItem { name, item_id } => {
                write!(f, "item '{}' ({}) is not on the menu", name, item_id)
            }
            OrderIssue::Unavailable { name, item_id } => {
                write!(f, "item '{}' ({}) is not available", name, item_id)
            }
        }
    }
}

/// Check an order against the current catalog. An empty result means valid.
pub fn validate_order(order: &Order, catalog: &dyn CatalogProvider) -> Vec<OrderIssue> {
    let mut issues = Vec::new();

    if order.is_empty() {
        issues.push(OrderIssue::Empty);
        return issues;
    }
    if order.total() <= Decimal::ZERO {
        issues.push(OrderIssue::NonPositiveTotal);
    }

    for line in order.lines() {
        match catalog.get_item(line.item_id) {
            None => issues.push(OrderIssue::UnknownItem {
                item_id: line.item_id,
                name: line.name.clone(),
            }),
            Some(item) if !item.available => issues.push(OrderIssue::Unavailable {
                item_id: line.item_id,
                name: line.name.clone(),
            }),
            Some(_) => {}
        }
    }

    issues
}

/// Longest preparation time among the ordered items, plus a base allowance
/// and two minutes per extra line. Never below 15 minutes.
pub fn estimate_preparation_minutes(order: &Order, catalog: &dyn CatalogProvider) -> u32 {
    if order.is_empty() {
        return MIN_ESTIMATE_MINUTES;
    }

    let longest = order
        .lines()
        .iter()
        .filter_map(|l| catalog.get_item(l.item_id))
        .filter_map(|item| item.preparation_minutes)
        .max()
        .unwrap_or(0);
    let extra_lines = order.lines().len() as u32 - 1;

    (longest + BASE_MINUTES + PER_EXTRA_LINE_MINUTES * extra_lines).max(MIN_ESTIMATE_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::order::apply_mention;
    use comanda_types::MenuItem;

    fn catalog() -> StaticCatalog {
        StaticCatalog::from_items(vec![
            MenuItem::new(4, "Salmão Grelhado", Decimal::new(4590, 2), "Pratos Principais")
                .with_preparation_minutes(25),
            MenuItem::new(8, "Caipirinha", Decimal::new(1490, 2), "Bebidas")
                .with_preparation_minutes(5),
            MenuItem::new(10, "Petit Gateau", Decimal::new(1690, 2), "Sobremesas").unavailable(),
        ])
        .unwrap()
    }

    #[test]
    fn empty_order_reports_only_empty() {
        assert_eq!(validate_order(&Order::new(), &catalog()), vec![OrderIssue::Empty]);
    }

    #[test]
    fn unknown_and_unavailable_items() {
        let mut order = Order::new();
        apply_mention(
            &mut order,
            &MenuItem::new(10, "Petit Gateau", Decimal::new(1690, 2), "Sobremesas"),
            1,
        );
        apply_mention(
            &mut order,
            &MenuItem::new(42, "Pizza", Decimal::new(5000, 2), "Pratos Principais"),
            1,
        );
        let issues = validate_order(&order, &catalog());
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], OrderIssue::Unavailable { .. }));
        assert!(matches!(issues[1], OrderIssue::UnknownItem { .. }));
        assert!(issues[1].to_string().contains("Pizza"));
    }

    #[test]
    fn valid_order_has_no_issues() {
        let catalog = catalog();
        let mut order = Order::new();
        apply_mention(&mut order, &catalog.get_item(MenuItemId(4)).unwrap(), 1);
        assert!(validate_order(&order, &catalog).is_empty());
    }

    #[test]
    fn estimate_uses_longest_item_and_line_count() {
        let catalog = catalog();
        let mut order = Order::new();
        assert_eq!(estimate_preparation_minutes(&order, &catalog), 15);

        apply_mention(&mut order, &catalog.get_item(MenuItemId(8)).unwrap(), 2);
        // 5 + 5, raised to the floor
        assert_eq!(estimate_preparation_minutes(&order, &catalog), 15);

        apply_mention(&mut order, &catalog.get_item(MenuItemId(4)).unwrap(), 1);
        // 25 + 5 + 2
        assert_eq!(estimate_preparation_minutes(&order, &catalog), 32);
    }
}
