//! Turn processing
//!
//! [`OrderingEngine`] wires the pipeline for one inbound utterance:
//!
//! ```text
//! raw ─▶ normalize ─┬─▶ IntentClassifier ─────────────────────┐
//!                   └─▶ CatalogMatcher ─▶ QuantityResolver ───┤
//!                                                             ▼
//!                        Order aggregator ─▶ state machine ─▶ TurnOutcome
//! ```
//!
//! The engine is constructed once per process around a shared
//! [`SessionStore`]. Turns for the same conversation are expected to be
//! serialized by the caller; turns for different conversations may run in
//! parallel.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use comanda_types::{ConversationKey, CustomerInfo, MenuItem, OrderId, Platform};
use serde::Serialize;

use crate::catalog::{CatalogMatcher, CatalogProvider, StaticCatalog, Suggestion};
use crate::config::EngineConfig;
use crate::error::{ActionError, PersistenceError};
use crate::intent::{ExtractedFields, ExtractedItem, Intent, IntentClassifier};
use crate::normalize::normalize_text;
use crate::order::{self, Order, OrderLineItem};
use crate::persistence::{OrderDraft, OrderPersistence};
use crate::quantity::QuantityResolver;
use crate::reply::ReplyContext;
use crate::session::state_machine::{self, DueAction, TurnSignals};
use crate::session::{Clock, CompletedOrder, Session, SessionStore, Stage};

/// Per-turn analysis, before any session state is touched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntentAnalysis {
    pub intent: Intent,
    pub fields: ExtractedFields,
    /// Alternatives when an ordering turn matched nothing
    pub suggestions: Vec<Suggestion>,
}

/// Everything the caller needs to respond to a turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub conversation: ConversationKey,
    pub intent: Intent,
    pub fields: ExtractedFields,
    pub order: Order,
    pub stage: Stage,
    pub due_actions: Vec<DueAction>,
    pub reply_context: ReplyContext,
}

pub struct OrderingEngine {
    catalog: Arc<dyn CatalogProvider>,
    store: Arc<SessionStore>,
    matcher: CatalogMatcher,
    classifier: IntentClassifier,
    quantity: QuantityResolver,
}

impl OrderingEngine {
    pub fn new(
        config: &EngineConfig,
        catalog: Arc<dyn CatalogProvider>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            catalog,
            store,
            matcher: CatalogMatcher::from_config(config),
            classifier: IntentClassifier::default(),
            quantity: QuantityResolver::new(&config.quantity),
        }
    }

    /// Engine over a YAML menu, with an optional YAML config. Environment
    /// overrides are applied on top of the file (or the defaults).
    pub fn from_files(
        config_path: Option<&Path>,
        menu_path: &Path,
        clock: Arc<dyn Clock>,
    ) -> crate::Result<Self> {
        let config = match config_path {
            Some(path) => EngineConfig::load_from_file(path)?,
            None => EngineConfig::default(),
        }
        .apply_env_overrides()?;

        let catalog = StaticCatalog::load_from_file(menu_path)?;
        tracing::info!(items = catalog.len(), menu = %menu_path.display(), "catalog loaded");

        let store = SessionStore::new(clock, config.session.max_idle());
        Ok(Self::new(&config, Arc::new(catalog), Arc::new(store)))
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogProvider> {
        &self.catalog
    }

    // =========================================================================
    // Analysis
    // =========================================================================

    /// Classify a raw utterance and extract item mentions against `menu`.
    pub fn analyze(&self, raw: &str, menu: &[MenuItem]) -> IntentAnalysis {
        let text = normalize_text(raw);
        let classification = self.classifier.classify(&text);
        let mut fields = classification.fields;

        // Quantities are not looked for behind the end of an earlier mention
        let mut previous_end = 0;
        fields.items = self
            .matcher
            .find_mentions(&text, menu)
            .into_iter()
            .map(|mention| {
                let stated = self
                    .quantity
                    .stated_quantity_after(&text, mention.span, previous_end);
                if let Some(span) = mention.span {
                    previous_end = previous_end.max(span.end);
                }
                ExtractedItem {
                    item_id: mention.item.id,
                    name: mention.item.name.clone(),
                    unit_price: mention.item.price,
                    quantity: stated.unwrap_or(1),
                    quantity_stated: stated.is_some(),
                    strength: mention.strength,
                }
            })
            .collect();

        let suggestions = if classification.intent == Intent::Ordering && fields.items.is_empty() {
            self.matcher.suggest_similar(&text, menu)
        } else {
            Vec::new()
        };

        IntentAnalysis {
            intent: classification.intent,
            fields,
            suggestions,
        }
    }

    // =========================================================================
    // Turns
    // =========================================================================

    /// Process one inbound utterance for a conversation.
    pub fn process_turn(
        &self,
        key: &ConversationKey,
        platform: Platform,
        raw: &str,
        customer: Option<&CustomerInfo>,
    ) -> TurnOutcome {
        let menu = self.catalog.list_available_items();
        let analysis = self.analyze(raw, &menu);

        let handle = self.store.get_or_create(key, &platform);
        let mut session = lock(&handle);
        if let Some(now) = self.store.touch(key) {
            session.last_activity = now;
        }
        if let Some(info) = customer {
            session.customer.merge_from(info);
        }

        let mut signals = TurnSignals {
            intent: analysis.intent,
            mentions_found: analysis.fields.items.len(),
            suggestions: analysis.suggestions,
            ..TurnSignals::default()
        };

        if session.stage().accepts_order_changes() {
            signals.context_established = apply_table_context(&mut session, &analysis.fields);
            signals.order_changed = apply_items(&mut session, &menu, &analysis.fields);
        } else if !analysis.fields.is_empty() {
            tracing::debug!(conversation = %key, "session completed, ignoring extracted fields");
        }

        let due_actions = state_machine::advance(&mut session, signals);

        tracing::info!(
            conversation = %key,
            intent = ?analysis.intent,
            items = analysis.fields.items.len(),
            stage = %session.stage(),
            actions = due_actions.len(),
            "turn processed"
        );

        TurnOutcome {
            conversation: key.clone(),
            intent: analysis.intent,
            order: session.order().clone(),
            stage: session.stage(),
            reply_context: ReplyContext::build(&session, analysis.intent, raw, &menu),
            fields: analysis.fields,
            due_actions,
        }
    }

    /// Copy of the current session state
    pub fn session_snapshot(&self, key: &ConversationKey) -> Option<Session> {
        self.store.get(key).map(|handle| lock(&handle).clone())
    }

    // =========================================================================
    // Caller-executed actions
    // =========================================================================

    /// Execute [`DueAction::PersistOrder`]: validate, write through
    /// `persistence`, then move to `payment`. A validation or storage failure
    /// rolls the session back to `ordering`.
    ///
    /// The session is not locked while storage is awaited. If the order is
    /// edited in the meantime the write is reported as
    /// [`ActionError::StaleOrder`] and the stage is left alone, so a
    /// re-confirmation's own `PersistOrder` records the current order.
    ///
    /// Writes are not compensated. When `add_line_item` fails after
    /// `create_order` succeeded, or the write turns out stale, storage keeps
    /// an order that the session never acknowledges; cleaning it up is the
    /// caller's job.
    pub async fn persist_order(
        &self,
        key: &ConversationKey,
        persistence: &dyn OrderPersistence,
    ) -> Result<OrderId, ActionError> {
        let handle = self
            .store
            .get(key)
            .ok_or_else(|| ActionError::UnknownSession(key.clone()))?;

        let (draft, lines, revision) = {
            let mut session = lock(&handle);
            if session.stage() != Stage::Confirming {
                return Err(ActionError::WrongStage {
                    expected: Stage::Confirming,
                    actual: session.stage(),
                });
            }

            let issues = order::validate_order(session.order(), self.catalog.as_ref());
            if !issues.is_empty() {
                state_machine::rollback_to_ordering(&mut session);
                tracing::warn!(conversation = %key, issues = issues.len(), "order failed validation");
                return Err(ActionError::InvalidOrder(issues));
            }

            (
                self.draft_for(&session),
                session.order().lines().to_vec(),
                session.order().revision(),
            )
        };

        let written = write_order(persistence, &draft, &lines).await;

        let mut session = lock(&handle);
        if session.order().revision() != revision {
            tracing::warn!(
                conversation = %key,
                stage = %session.stage(),
                "order changed while being recorded"
            );
            return match written {
                Ok(order_id) => Err(ActionError::StaleOrder { order_id }),
                Err(e) => Err(e.into()),
            };
        }
        match written {
            Ok(order_id) => {
                state_machine::acknowledge_persisted(&mut session, order_id)?;
                tracing::info!(conversation = %key, order_id = %order_id, total = %draft.total, "order recorded");
                Ok(order_id)
            }
            Err(e) => {
                state_machine::rollback_to_ordering(&mut session);
                tracing::warn!(conversation = %key, error = %e, "order persistence failed");
                Err(e.into())
            }
        }
    }

    /// Payment receipt hook: `payment → completed`.
    pub fn confirm_payment(&self, key: &ConversationKey) -> Result<CompletedOrder, ActionError> {
        let handle = self
            .store
            .get(key)
            .ok_or_else(|| ActionError::UnknownSession(key.clone()))?;
        let mut session = lock(&handle);
        let completed = state_machine::complete_payment(&mut session, self.store.clock().now())?;
        tracing::info!(conversation = %key, order_id = %completed.order_id, "payment confirmed");
        Ok(completed)
    }

    /// Replace the order's free-text notes. Not allowed once the order has
    /// been recorded.
    pub fn set_special_instructions(
        &self,
        key: &ConversationKey,
        text: &str,
    ) -> Result<(), ActionError> {
        let handle = self
            .store
            .get(key)
            .ok_or_else(|| ActionError::UnknownSession(key.clone()))?;
        let mut session = lock(&handle);
        if matches!(session.stage(), Stage::Payment | Stage::Completed) {
            return Err(ActionError::WrongStage {
                expected: Stage::Ordering,
                actual: session.stage(),
            });
        }
        order::set_special_instructions(session.order_mut(), text);
        Ok(())
    }

    fn draft_for(&self, session: &Session) -> OrderDraft {
        OrderDraft {
            conversation: session.key.clone(),
            platform: session.platform.clone(),
            table_number: session.table_number,
            party_size: session.party_size,
            customer: session.customer.clone(),
            total: session.order().total(),
            special_instructions: session.order().special_instructions().map(str::to_string),
            estimated_minutes: order::estimate_preparation_minutes(
                session.order(),
                self.catalog.as_ref(),
            ),
            created_at: self.store.clock().now(),
        }
    }
}

async fn write_order(
    persistence: &dyn OrderPersistence,
    draft: &OrderDraft,
    lines: &[OrderLineItem],
) -> Result<OrderId, PersistenceError> {
    let order_id = persistence.create_order(draft).await?;
    for line in lines {
        persistence.add_line_item(order_id, line).await?;
    }
    Ok(order_id)
}

/// Returns true when table or party size became known on this turn.
fn apply_table_context(session: &mut Session, fields: &ExtractedFields) -> bool {
    let had_context = session.has_table_context();
    if let Some(table) = fields.table_number {
        session.table_number = Some(table);
    }
    if let Some(party) = fields.party_size {
        session.party_size = Some(party);
    }
    !had_context && session.has_table_context()
}

/// Returns true when the order's lines changed.
fn apply_items(session: &mut Session, menu: &[MenuItem], fields: &ExtractedFields) -> bool {
    let mut changed = false;
    for extracted in &fields.items {
        let change = if fields.removal {
            let quantity = extracted.quantity_stated.then_some(extracted.quantity);
            order::remove_mention(session.order_mut(), extracted.item_id, quantity)
        } else {
            match menu.iter().find(|m| m.id == extracted.item_id) {
                Some(item) => order::apply_mention(session.order_mut(), item, extracted.quantity),
                None => continue,
            }
        };
        tracing::debug!(
            conversation = %session.key,
            item_id = %change.item_id(),
            change = ?change,
            "order updated"
        );
        changed |= change.is_mutation();
    }
    changed
}

fn lock(handle: &Mutex<Session>) -> MutexGuard<'_, Session> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
