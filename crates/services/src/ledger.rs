use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use course_core::model::{ModuleId, ModuleProgress, Percentage};
use storage::repository::ProgressStore;

use crate::events::ProgressBus;

#[derive(Default)]
struct LedgerState {
    /// Mapping known to match the store. `None` until a read succeeds.
    loaded: Option<ModuleProgress>,
    /// Updates made while the store could not be read. Never written on their own.
    pending: ModuleProgress,
}

/// Persisted module id → percentage mapping, stored as one JSON entry.
///
/// Every write publishes the new snapshot on the bus. The store is only written once the
/// stored mapping has been read, so a failed or garbled read never overwrites other
/// modules' progress. Until then updates are kept in memory and merged over the stored
/// mapping on the next successful read.
pub struct ModuleLedger {
    store: Arc<dyn ProgressStore>,
    key: String,
    bus: Arc<ProgressBus>,
    state: Mutex<LedgerState>,
}

impl ModuleLedger {
    #[must_use]
    pub fn new(
        store: Arc<dyn ProgressStore>,
        key: impl Into<String>,
        bus: Arc<ProgressBus>,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            bus,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Current ledger. Unreadable entries are dropped; an unreadable store yields the
    /// updates made in this session only.
    pub async fn read_all(&self) -> ModuleProgress {
        let loaded = self.lock().loaded.clone();
        if let Some(loaded) = loaded {
            return loaded;
        }

        let Some(mut stored) = self.load().await else {
            return self.lock().pending.clone();
        };

        let mut state = self.lock();
        stored.overlay(&std::mem::take(&mut state.pending));
        state.loaded.get_or_insert(stored).clone()
    }

    /// Record a recomputed percentage for `module_id`.
    pub async fn upsert(&self, module_id: ModuleId, percentage: Percentage) -> ModuleProgress {
        let mut ledger = self.read_all().await;
        ledger.upsert(module_id, percentage);
        self.write(ledger).await
    }

    /// Force `module_id` to 100%, whatever its items say.
    pub async fn complete(&self, module_id: ModuleId) -> ModuleProgress {
        let mut ledger = self.read_all().await;
        ledger.complete(module_id);
        self.write(ledger).await
    }

    /// Drop the loaded mapping so the next read goes back to the store.
    pub fn reload(&self) {
        self.lock().loaded = None;
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the stored mapping. `None` when the store or the document is unreadable.
    async fn load(&self) -> Option<ModuleProgress> {
        let json = match self.store.get(&self.key).await {
            Ok(Some(json)) => json,
            Ok(None) => return Some(ModuleProgress::new()),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "could not load progress ledger");
                return None;
            }
        };

        match ModuleProgress::from_json_lenient(&json) {
            Ok(parsed) => {
                if !parsed.rejected.is_empty() {
                    tracing::warn!(
                        key = %self.key,
                        rejected = ?parsed.rejected,
                        "dropping unreadable progress ledger entries"
                    );
                }
                Some(parsed.progress)
            }
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "progress ledger is unreadable, leaving it untouched"
                );
                None
            }
        }
    }

    async fn write(&self, ledger: ModuleProgress) -> ModuleProgress {
        let persist = {
            let mut state = self.lock();
            if state.loaded.is_some() {
                state.loaded = Some(ledger.clone());
                true
            } else {
                state.pending = ledger.clone();
                false
            }
        };

        if persist {
            self.persist(&ledger).await;
        } else {
            tracing::warn!(
                key = %self.key,
                "progress ledger not loaded, keeping update in memory"
            );
        }

        self.bus.publish(&ledger);
        ledger
    }

    async fn persist(&self, ledger: &ModuleProgress) {
        match serde_json::to_string(ledger) {
            Ok(json) => {
                if let Err(err) = self.store.set(&self.key, &json).await {
                    tracing::warn!(
                        key = %self.key,
                        error = %err,
                        "could not persist progress ledger"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not serialize progress ledger");
            }
        }
    }
}
