//! Stage transitions and due actions
//!
//! ```text
//! greeting ──(table/party known)──▶ ordering ◀──(items merged)── any but completed
//! ordering ──(confirmation, order non-empty)──▶ confirming
//! confirming ──(order recorded)──▶ payment ──(payment confirmed)──▶ completed
//! confirming ──(recording failed)──▶ ordering
//! ```
//!
//! The machine performs no I/O. Side effects come back as [`DueAction`]s for
//! the caller to execute; the outcome of persistence is reported back through
//! [`acknowledge_persisted`] or [`rollback_to_ordering`].

use chrono::{DateTime, Utc};
use comanda_types::OrderId;
use serde::Serialize;
use tracing::debug;

use super::{CompletedOrder, Session, Stage};
use crate::catalog::Suggestion;
use crate::error::ActionError;
use crate::intent::Intent;

/// Something the caller should do after a turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "suggestions", rename_all = "snake_case")]
pub enum DueAction {
    /// Record the current order through the persistence collaborator
    PersistOrder,
    /// Ask how the customer wants to pay
    RequestPaymentMethod,
    /// Confirmation was requested with nothing ordered
    RequestItems,
    /// Ask for table number or party size
    RequestTableInfo,
    /// Show the menu
    PresentMenu,
    /// Nothing matched; offer these instead
    SuggestSimilarItems(Vec<Suggestion>),
    /// Payment asked for before the order was confirmed
    RequestConfirmation,
    /// Show payment options for the recorded order
    PresentPaymentOptions,
}

/// What the turn's analysis and order edits produced
#[derive(Debug, Clone, Default)]
pub struct TurnSignals {
    pub intent: Intent,
    /// Table number or party size became known on this turn
    pub context_established: bool,
    /// The aggregator changed the order's lines
    pub order_changed: bool,
    /// Catalog items mentioned, matched or not merged
    pub mentions_found: usize,
    /// Ranked alternatives, used only when nothing was mentioned
    pub suggestions: Vec<Suggestion>,
}

/// Apply one turn's signals to the session stage.
pub fn advance(session: &mut Session, signals: TurnSignals) -> Vec<DueAction> {
    let from = session.stage;
    let mut actions = Vec::new();

    if from == Stage::Completed {
        return actions;
    }

    if session.stage == Stage::Greeting && signals.context_established {
        session.stage = Stage::Ordering;
        actions.push(DueAction::PresentMenu);
    }

    if signals.order_changed {
        session.stage = Stage::Ordering;
        session.persisted_order_id = None;
    }

    match signals.intent {
        Intent::Confirmation => confirm(session, &mut actions),
        Intent::Payment => match session.stage {
            Stage::Confirming | Stage::Payment => actions.push(DueAction::PresentPaymentOptions),
            _ if session.order().is_empty() => actions.push(DueAction::RequestItems),
            _ => actions.push(DueAction::RequestConfirmation),
        },
        Intent::Ordering if signals.mentions_found == 0 => {
            if signals.suggestions.is_empty() {
                if !actions.contains(&DueAction::PresentMenu) {
                    actions.push(DueAction::PresentMenu);
                }
            } else {
                actions.push(DueAction::SuggestSimilarItems(signals.suggestions));
            }
        }
        _ => {}
    }

    if session.stage == Stage::Greeting && !session.has_table_context() {
        actions.push(DueAction::RequestTableInfo);
    }

    if session.stage != from {
        debug!(
            conversation = %session.key,
            from = %from,
            to = %session.stage,
            "stage transition"
        );
    }

    actions
}

fn confirm(session: &mut Session, actions: &mut Vec<DueAction>) {
    match session.stage {
        Stage::Payment | Stage::Completed => {}
        _ if session.order().is_empty() => {
            // Rejected: stay put and ask for items
            if session.stage != Stage::Greeting {
                session.stage = Stage::Ordering;
            }
            actions.push(DueAction::RequestItems);
        }
        _ => {
            session.stage = Stage::Confirming;
            actions.push(DueAction::PersistOrder);
            actions.push(DueAction::RequestPaymentMethod);
        }
    }
}

/// `confirming → payment` once storage has acknowledged the order.
pub fn acknowledge_persisted(session: &mut Session, order_id: OrderId) -> Result<(), ActionError> {
    expect_stage(session, Stage::Confirming)?;
    session.persisted_order_id = Some(order_id);
    session.stage = Stage::Payment;
    debug!(conversation = %session.key, order_id = %order_id, "order recorded");
    Ok(())
}

/// Return to `ordering` after a failed persistence attempt so the next
/// confirmation retries it.
pub fn rollback_to_ordering(session: &mut Session) {
    if session.stage == Stage::Confirming {
        session.stage = Stage::Ordering;
        debug!(conversation = %session.key, "rolled back to ordering");
    }
}

/// `payment → completed`, recording the order in the session history.
pub fn complete_payment(
    session: &mut Session,
    now: DateTime<Utc>,
) -> Result<CompletedOrder, ActionError> {
    expect_stage(session, Stage::Payment)?;
    let order_id = session.persisted_order_id.ok_or(ActionError::WrongStage {
        expected: Stage::Payment,
        actual: session.stage,
    })?;

    let completed = CompletedOrder {
        order_id,
        order: session.order().clone(),
        completed_at: now,
    };
    session.completed_orders.push(completed.clone());
    session.stage = Stage::Completed;
    Ok(completed)
}

fn expect_stage(session: &Session, expected: Stage) -> Result<(), ActionError> {
    if session.stage == expected {
        Ok(())
    } else {
        Err(ActionError::WrongStage {
            expected,
            actual: session.stage,
        })
    }
}
