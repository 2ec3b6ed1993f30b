//! Integration tests for order recording
//!
//! Persistence is a caller-executed action: failures come back as typed
//! errors and roll the session back to `ordering` so that the next
//! confirmation retries.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Duration;
use comanda::order::OrderIssue;
use comanda::persistence::{OrderDraft, OrderPersistence};
use comanda::{
    ActionError, CatalogProvider, DueAction, EngineConfig, InMemoryOrderLedger, ManualClock,
    OrderLineItem, OrderingEngine, PersistenceError, SessionStore, Stage,
};
use comanda_types::{ConversationKey, MenuItem, MenuItemId, OrderId, Platform};
use rust_decimal::Decimal;
use tokio::sync::Notify;

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// Catalog whose availability can change between turns
struct MutableCatalog {
    items: RwLock<Vec<MenuItem>>,
}

impl MutableCatalog {
    fn new() -> Self {
        Self {
            items: RwLock::new(vec![
                MenuItem::new(4, "Salmão Grelhado", Decimal::new(4590, 2), "Pratos Principais")
                    .with_preparation_minutes(25),
                MenuItem::new(8, "Caipirinha", Decimal::new(1490, 2), "Bebidas")
                    .with_preparation_minutes(5),
            ]),
        }
    }

    fn mark_unavailable(&self, id: MenuItemId) {
        for item in self.items.write().unwrap().iter_mut() {
            if item.id == id {
                item.available = false;
            }
        }
    }
}

impl CatalogProvider for MutableCatalog {
    fn list_available_items(&self) -> Vec<MenuItem> {
        self.items
            .read()
            .unwrap()
            .iter()
            .filter(|i| i.available)
            .cloned()
            .collect()
    }

    fn get_item(&self, id: MenuItemId) -> Option<MenuItem> {
        self.items.read().unwrap().iter().find(|i| i.id == id).cloned()
    }
}

/// Storage that fails on the n-th call (0-based), counting both operations
struct FlakyStorage {
    fail_at: usize,
    calls: AtomicUsize,
    inner: InMemoryOrderLedger,
}

impl FlakyStorage {
    fn failing_at(fail_at: usize) -> Self {
        Self {
            fail_at,
            calls: AtomicUsize::new(0),
            inner: InMemoryOrderLedger::new(),
        }
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_at {
            Err(PersistenceError::Unavailable("connection reset".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrderPersistence for FlakyStorage {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderId, PersistenceError> {
        self.check()?;
        self.inner.create_order(draft).await
    }

    async fn add_line_item(
        &self,
        order_id: OrderId,
        line: &OrderLineItem,
    ) -> Result<(), PersistenceError> {
        self.check()?;
        self.inner.add_line_item(order_id, line).await
    }
}

/// Storage whose first `create_order` waits until released
struct GatedStorage {
    gated: AtomicBool,
    entered: Notify,
    release: Notify,
    inner: InMemoryOrderLedger,
}

impl GatedStorage {
    fn new() -> Self {
        Self {
            gated: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
            inner: InMemoryOrderLedger::new(),
        }
    }
}

#[async_trait]
impl OrderPersistence for GatedStorage {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderId, PersistenceError> {
        if self.gated.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.create_order(draft).await
    }

    async fn add_line_item(
        &self,
        order_id: OrderId,
        line: &OrderLineItem,
    ) -> Result<(), PersistenceError> {
        self.inner.add_line_item(order_id, line).await
    }
}

fn engine_with(catalog: Arc<MutableCatalog>) -> OrderingEngine {
    let store = SessionStore::new(Arc::new(ManualClock::default()), Duration::minutes(60));
    OrderingEngine::new(&EngineConfig::default(), catalog, Arc::new(store))
}

/// Session with two lines, waiting in `confirming`
fn confirmed_session(engine: &OrderingEngine, key: &ConversationKey) {
    engine.process_turn(key, Platform::Telegram, "mesa 5, somos 2 pessoas", None);
    engine.process_turn(
        key,
        Platform::Telegram,
        "quero 1 salmão grelhado e duas caipirinhas",
        None,
    );
    let outcome = engine.process_turn(key, Platform::Telegram, "confirma", None);
    assert_eq!(outcome.stage, Stage::Confirming);
    assert!(outcome.due_actions.contains(&DueAction::PersistOrder));
}

fn stage_of(engine: &OrderingEngine, key: &ConversationKey) -> Stage {
    engine.session_snapshot(key).unwrap().stage()
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn failed_create_rolls_back_then_retry_succeeds() {
    let engine = engine_with(Arc::new(MutableCatalog::new()));
    let key = ConversationKey::new("tg-1");
    confirmed_session(&engine, &key);

    let storage = FlakyStorage::failing_at(0);
    let err = engine.persist_order(&key, &storage).await.unwrap_err();
    assert_eq!(
        err,
        ActionError::Persistence(PersistenceError::Unavailable("connection reset".into()))
    );
    assert_eq!(stage_of(&engine, &key), Stage::Ordering);

    // Order is untouched; confirming again schedules another attempt
    let outcome = engine.process_turn(&key, Platform::Telegram, "sim", None);
    assert_eq!(outcome.order.total(), Decimal::new(7570, 2));
    assert_eq!(outcome.stage, Stage::Confirming);

    let order_id = engine.persist_order(&key, &storage).await.unwrap();
    assert_eq!(stage_of(&engine, &key), Stage::Payment);
    assert_eq!(storage.inner.get(order_id).unwrap().lines.len(), 2);
}

#[tokio::test]
async fn failed_line_write_also_rolls_back() {
    let engine = engine_with(Arc::new(MutableCatalog::new()));
    let key = ConversationKey::new("tg-2");
    confirmed_session(&engine, &key);

    // create succeeds, second line fails
    let storage = FlakyStorage::failing_at(2);
    assert!(matches!(
        engine.persist_order(&key, &storage).await,
        Err(ActionError::Persistence(_))
    ));
    assert_eq!(stage_of(&engine, &key), Stage::Ordering);
    assert!(engine.session_snapshot(&key).unwrap().persisted_order_id.is_none());

    // The header and first line stay in storage, unacknowledged
    let orphans = storage.inner.orders();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].lines.len(), 1);
}

#[tokio::test]
async fn unavailable_item_fails_validation_before_storage() {
    let catalog = Arc::new(MutableCatalog::new());
    let engine = engine_with(catalog.clone());
    let key = ConversationKey::new("tg-3");
    confirmed_session(&engine, &key);

    catalog.mark_unavailable(MenuItemId(8));
    let ledger = InMemoryOrderLedger::new();
    let err = engine.persist_order(&key, &ledger).await.unwrap_err();
    match err {
        ActionError::InvalidOrder(issues) => {
            assert_eq!(issues.len(), 1);
            assert!(matches!(
                issues[0],
                OrderIssue::Unavailable {
                    item_id: MenuItemId(8),
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(ledger.orders().is_empty());
    assert_eq!(stage_of(&engine, &key), Stage::Ordering);
}

#[tokio::test]
async fn persist_requires_confirming_stage() {
    let engine = engine_with(Arc::new(MutableCatalog::new()));
    let key = ConversationKey::new("tg-4");
    let ledger = InMemoryOrderLedger::new();

    assert!(matches!(
        engine.persist_order(&key, &ledger).await,
        Err(ActionError::UnknownSession(_))
    ));

    engine.process_turn(&key, Platform::Telegram, "quero uma caipirinha", None);
    assert_eq!(
        engine.persist_order(&key, &ledger).await,
        Err(ActionError::WrongStage {
            expected: Stage::Confirming,
            actual: Stage::Ordering,
        })
    );
}

#[tokio::test]
async fn payment_confirmation_requires_recorded_order() {
    let engine = engine_with(Arc::new(MutableCatalog::new()));
    let key = ConversationKey::new("tg-5");
    confirmed_session(&engine, &key);

    assert!(matches!(
        engine.confirm_payment(&key),
        Err(ActionError::WrongStage {
            expected: Stage::Payment,
            actual: Stage::Confirming,
        })
    ));

    let ledger = InMemoryOrderLedger::new();
    engine.set_special_instructions(&key, "salmão ao ponto").unwrap();
    let order_id = engine.persist_order(&key, &ledger).await.unwrap();
    assert_eq!(
        ledger.get(order_id).unwrap().draft.special_instructions.as_deref(),
        Some("salmão ao ponto")
    );

    let completed = engine.confirm_payment(&key).unwrap();
    assert_eq!(completed.order.item_count(), 3);
    assert_eq!(stage_of(&engine, &key), Stage::Completed);
    assert!(engine.set_special_instructions(&key, "mais gelo").is_err());
}

#[tokio::test]
async fn edits_during_recording_make_the_write_stale() {
    let engine = engine_with(Arc::new(MutableCatalog::new()));
    let key = ConversationKey::new("tg-6");
    confirmed_session(&engine, &key);

    let storage = GatedStorage::new();
    let (first, ()) = tokio::join!(engine.persist_order(&key, &storage), async {
        storage.entered.notified().await;
        let outcome =
            engine.process_turn(&key, Platform::Telegram, "mais um salmão grelhado", None);
        assert_eq!(outcome.stage, Stage::Ordering);
        let outcome = engine.process_turn(&key, Platform::Telegram, "sim", None);
        assert_eq!(outcome.stage, Stage::Confirming);
        storage.release.notify_one();
    });

    let stale_id = match first {
        Err(ActionError::StaleOrder { order_id }) => order_id,
        other => panic!("unexpected result: {:?}", other),
    };
    let session = engine.session_snapshot(&key).unwrap();
    assert_eq!(session.stage(), Stage::Confirming);
    assert!(session.persisted_order_id.is_none());

    // The pending re-confirmation records the edited order
    let order_id = engine.persist_order(&key, &storage).await.unwrap();
    assert_ne!(order_id, stale_id);
    assert_eq!(stage_of(&engine, &key), Stage::Payment);

    let recorded = storage.inner.get(order_id).unwrap();
    let salmon = recorded
        .lines
        .iter()
        .find(|l| l.item_id == MenuItemId(4))
        .unwrap();
    assert_eq!(salmon.quantity, 2);
    assert_eq!(recorded.draft.total, Decimal::new(12160, 2));
    assert_eq!(storage.inner.get(stale_id).unwrap().draft.total, Decimal::new(7570, 2));
}
