use std::sync::Arc;

use course_core::model::{ItemId, ProgressSettings, Scope, TrackableItem};
use storage::repository::ProgressStore;

use crate::error::TrackerError;

const CHECKED: &str = "true";
const UNCHECKED: &str = "false";

/// Binds trackable items to their store keys.
///
/// Persistence is best-effort: a store failure is logged and the in-memory flag keeps
/// driving the current page.
#[derive(Clone)]
pub struct ItemStateTracker {
    store: Arc<dyn ProgressStore>,
    settings: Arc<ProgressSettings>,
}

impl ItemStateTracker {
    #[must_use]
    pub fn new(store: Arc<dyn ProgressStore>, settings: Arc<ProgressSettings>) -> Self {
        Self { store, settings }
    }

    /// Restore the persisted checked flag. Only an exact `"true"` counts as checked.
    pub async fn bind(&self, mut item: TrackableItem) -> TrackableItem {
        let key = self.settings.item_key(item.kind(), item.id());
        match self.store.get(&key).await {
            Ok(value) => item.set_checked(value.as_deref() == Some(CHECKED)),
            Err(err) => {
                tracing::warn!(%key, error = %err, "could not restore item state");
                item.set_checked(false);
            }
        }
        item
    }

    /// Bind every item of one scope.
    pub async fn bind_scope(&self, scope: Scope, items: Vec<TrackableItem>) -> BoundScope {
        let mut bound = Vec::with_capacity(items.len());
        for item in items {
            bound.push(self.bind(item).await);
        }
        tracing::debug!(
            ?scope,
            total = bound.len(),
            checked = bound.iter().filter(|item| item.is_checked()).count(),
            "bound scope"
        );
        BoundScope { scope, items: bound }
    }

    /// Write the item's current flag. Exactly one store write per call.
    pub async fn persist(&self, item: &TrackableItem) {
        let key = self.settings.item_key(item.kind(), item.id());
        let value = if item.is_checked() { CHECKED } else { UNCHECKED };
        if let Err(err) = self.store.set(&key, value).await {
            tracing::warn!(%key, error = %err, "could not persist item state");
        }
    }

    /// Apply a user toggle and persist it before returning.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownItem` if `id` is not bound in `scope`.
    pub async fn toggle(
        &self,
        scope: &mut BoundScope,
        id: &ItemId,
        checked: bool,
    ) -> Result<(), TrackerError> {
        let item = scope
            .items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| TrackerError::UnknownItem(id.clone()))?;
        item.set_checked(checked);
        self.persist(item).await;
        Ok(())
    }
}

/// The bound items of one scope, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundScope {
    scope: Scope,
    items: Vec<TrackableItem>,
}

impl BoundScope {
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn items(&self) -> &[TrackableItem] {
        &self.items
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
