//! Keyed session container with passive expiry
//!
//! Map-level structure sits behind an `RwLock`; each session has its own
//! `Mutex`. The last-activity timestamp used for expiry is kept next to the
//! session as an atomic so that [`SessionStore::sweep`] never has to lock an
//! individual session that a turn may be mutating.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use comanda_types::{ConversationKey, Platform};
use tracing::{debug, info};

use super::{Clock, Session};

struct Entry {
    session: Arc<Mutex<Session>>,
    last_activity_ms: AtomicI64,
}

/// All live sessions of one process.
pub struct SessionStore {
    sessions: RwLock<HashMap<ConversationKey, Entry>>,
    clock: Arc<dyn Clock>,
    max_idle: Duration,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>, max_idle: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            max_idle,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Session for `key`, created in `greeting` on first contact. Counts as activity.
    pub fn get_or_create(&self, key: &ConversationKey, platform: &Platform) -> Arc<Mutex<Session>> {
        let now = self.clock.now();

        if let Some(entry) = self.read().get(key) {
            entry
                .last_activity_ms
                .store(now.timestamp_millis(), Ordering::Relaxed);
            return Arc::clone(&entry.session);
        }

        let mut sessions = self.write();
        let entry = sessions.entry(key.clone()).or_insert_with(|| {
            debug!(conversation = %key, platform = %platform, "new session");
            Entry {
                session: Arc::new(Mutex::new(Session::new(key.clone(), platform.clone(), now))),
                last_activity_ms: AtomicI64::new(now.timestamp_millis()),
            }
        });
        entry
            .last_activity_ms
            .store(now.timestamp_millis(), Ordering::Relaxed);
        Arc::clone(&entry.session)
    }

    pub fn get(&self, key: &ConversationKey) -> Option<Arc<Mutex<Session>>> {
        self.read().get(key).map(|e| Arc::clone(&e.session))
    }

    /// Record activity for `key`. Returns the timestamp used, or `None` for
    /// an unknown key.
    pub fn touch(&self, key: &ConversationKey) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        let sessions = self.read();
        let entry = sessions.get(key)?;
        entry
            .last_activity_ms
            .store(now.timestamp_millis(), Ordering::Relaxed);
        Some(now)
    }

    /// Remove sessions idle for longer than `max_age`. Returns how many were removed.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let cutoff = self
            .clock
            .now()
            .timestamp_millis()
            .saturating_sub(max_age.num_milliseconds());
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_activity_ms.load(Ordering::Relaxed) >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "swept idle sessions");
        }
        removed
    }

    /// [`sweep`](Self::sweep) with the configured idle window
    pub fn sweep_expired(&self) -> usize {
        self.sweep(self.max_idle)
    }

    pub fn contains(&self, key: &ConversationKey) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ConversationKey, Entry>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ConversationKey, Entry>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ManualClock, Stage};

    fn store() -> (Arc<ManualClock>, SessionStore) {
        let clock = Arc::new(ManualClock::default());
        let store = SessionStore::new(clock.clone(), Duration::minutes(60));
        (clock, store)
    }

    #[test]
    fn get_or_create_returns_the_same_session() {
        let (_, store) = store();
        let key = ConversationKey::new("tg-1");
        let first = store.get_or_create(&key, &Platform::Telegram);
        first.lock().unwrap().table_number = Some(4);

        let second = store.get_or_create(&key, &Platform::Telegram);
        assert_eq!(second.lock().unwrap().table_number, Some(4));
        assert_eq!(second.lock().unwrap().stage(), Stage::Greeting);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sweep_removes_only_idle_sessions() {
        let (clock, store) = store();
        let idle = ConversationKey::new("idle");
        let active = ConversationKey::new("active");
        store.get_or_create(&idle, &Platform::Whatsapp);
        store.get_or_create(&active, &Platform::Whatsapp);

        clock.advance(Duration::minutes(45));
        assert!(store.touch(&active).is_some());
        clock.advance(Duration::minutes(30));

        assert_eq!(store.sweep_expired(), 1);
        assert!(!store.contains(&idle));
        assert!(store.contains(&active));
    }

    #[test]
    fn age_equal_to_limit_is_kept() {
        let (clock, store) = store();
        let key = ConversationKey::new("edge");
        store.get_or_create(&key, &Platform::Web);
        clock.advance(Duration::minutes(10));
        assert_eq!(store.sweep(Duration::minutes(10)), 0);
        clock.advance(Duration::milliseconds(1));
        assert_eq!(store.sweep(Duration::minutes(10)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn touch_unknown_key() {
        let (_, store) = store();
        assert!(store.touch(&ConversationKey::new("nobody")).is_none());
    }

    #[test]
    fn sweep_does_not_block_on_a_locked_session() {
        let (clock, store) = store();
        let key = ConversationKey::new("busy");
        let handle = store.get_or_create(&key, &Platform::Telegram);
        let _guard = handle.lock().unwrap();
        clock.advance(Duration::minutes(61));
        assert_eq!(store.sweep_expired(), 1);
    }
}
