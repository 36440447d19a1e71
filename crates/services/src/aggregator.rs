use std::sync::Arc;

use course_core::model::{ModuleId, ScopeProgress};

use crate::ledger::ModuleLedger;
use crate::observers::{ModuleProgressBar, ValidationProgressBar};
use crate::tracker::BoundScope;

/// Count the scope's items as they are right now.
///
/// Returns `None` for an empty scope.
#[must_use]
pub fn recompute(scope: &BoundScope) -> Option<ScopeProgress> {
    ScopeProgress::from_items(scope.items())
}

/// Aggregator for an exercise's validation checklist. Renders into its own bar only.
#[derive(Clone)]
pub struct ValidationAggregator {
    bar: ValidationProgressBar,
}

impl ValidationAggregator {
    #[must_use]
    pub fn new(bar: ValidationProgressBar) -> Self {
        Self { bar }
    }

    /// Recompute and render. An empty checklist leaves the display untouched.
    pub fn recompute(&self, scope: &BoundScope) -> Option<ScopeProgress> {
        let progress = recompute(scope)?;
        if let Err(err) = self.bar.render(&progress) {
            tracing::warn!(error = %err, "validation progress bar failed to render");
        }
        Some(progress)
    }
}

/// Aggregator for a whole module page. Renders locally, then records the result in
/// the ledger (which publishes it).
#[derive(Clone)]
pub struct ModuleAggregator {
    module_id: ModuleId,
    bar: ModuleProgressBar,
    ledger: Arc<ModuleLedger>,
}

impl ModuleAggregator {
    #[must_use]
    pub fn new(module_id: ModuleId, bar: ModuleProgressBar, ledger: Arc<ModuleLedger>) -> Self {
        Self {
            module_id,
            bar,
            ledger,
        }
    }

    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    /// Recompute, render, upsert. An empty module page is a no-op.
    pub async fn recompute(&self, scope: &BoundScope) -> Option<ScopeProgress> {
        let progress = recompute(scope)?;
        if let Err(err) = self.bar.render(&progress) {
            tracing::warn!(
                module = %self.module_id,
                error = %err,
                "module progress bar failed to render"
            );
        }
        self.ledger
            .upsert(self.module_id.clone(), progress.percentage())
            .await;
        Some(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ProgressBus;
    use crate::observers::{MountPoint, memory_mounts};
    use crate::tracker::ItemStateTracker;
    use course_core::model::{
        ItemId, ItemKind, Percentage, ProgressSettings, Scope, TrackableItem,
    };
    use storage::repository::InMemoryStore;

    struct Fixture {
        tracker: ItemStateTracker,
        ledger: Arc<ModuleLedger>,
        aggregator: ModuleAggregator,
        memory: Arc<crate::observers::MemoryMount>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(ProgressBus::new());
        let ledger = Arc::new(ModuleLedger::new(store.clone(), "ledger", bus));
        let (mounts, memory) = memory_mounts();
        let aggregator = ModuleAggregator::new(
            ModuleId::new("m1"),
            ModuleProgressBar::new(mounts),
            Arc::clone(&ledger),
        );
        Fixture {
            tracker: ItemStateTracker::new(store, Arc::new(ProgressSettings::default())),
            ledger,
            aggregator,
            memory,
        }
    }

    async fn module_scope(tracker: &ItemStateTracker, n: usize) -> BoundScope {
        let items = (0..n)
            .map(|i| {
                TrackableItem::new(ItemId::new(format!("section_{i}")), "S", ItemKind::Section)
            })
            .collect();
        tracker.bind_scope(Scope::Module(ModuleId::new("m1")), items).await
    }

    #[tokio::test]
    async fn four_item_scenario() {
        let fx = fixture();
        let mut scope = module_scope(&fx.tracker, 4).await;
        for id in ["section_0", "section_1"] {
            fx.tracker
                .toggle(&mut scope, &ItemId::new(id), true)
                .await
                .unwrap();
        }
        let progress = fx.aggregator.recompute(&scope).await.unwrap();
        assert_eq!(progress.percentage().value(), 50);

        fx.tracker
            .toggle(&mut scope, &ItemId::new("section_2"), true)
            .await
            .unwrap();
        let progress = fx.aggregator.recompute(&scope).await.unwrap();
        assert_eq!(progress.percentage().value(), 75);

        for i in 0..4 {
            fx.tracker
                .toggle(&mut scope, &ItemId::new(format!("section_{i}")), false)
                .await
                .unwrap();
        }
        let progress = fx.aggregator.recompute(&scope).await.unwrap();
        assert_eq!(progress.percentage(), Percentage::ZERO);
        assert_eq!(
            fx.ledger.read_all().await.get(&ModuleId::new("m1")),
            Some(Percentage::ZERO)
        );
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let fx = fixture();
        let mut scope = module_scope(&fx.tracker, 3).await;
        fx.tracker
            .toggle(&mut scope, &ItemId::new("section_1"), true)
            .await
            .unwrap();

        let first = fx.aggregator.recompute(&scope).await;
        let second = fx.aggregator.recompute(&scope).await;
        assert_eq!(first, second);
        assert_eq!(first.unwrap().percentage().value(), 33);
    }

    #[tokio::test]
    async fn empty_scope_is_a_no_op() {
        let fx = fixture();
        let scope = module_scope(&fx.tracker, 0).await;

        assert!(fx.aggregator.recompute(&scope).await.is_none());
        assert!(fx.ledger.read_all().await.is_empty());
        assert_eq!(fx.memory.count(MountPoint::ModulePercentage), 0);
    }

    #[tokio::test]
    async fn validation_aggregator_never_touches_ledger() {
        let fx = fixture();
        let (mounts, memory) = memory_mounts();
        let aggregator = ValidationAggregator::new(ValidationProgressBar::new(mounts, "done"));
        let items = vec![TrackableItem::new(
            ItemId::new("check"),
            "Check",
            ItemKind::ValidationStep,
        )];
        let mut scope = fx.tracker.bind_scope(Scope::Validation, items).await;
        fx.tracker
            .toggle(&mut scope, &ItemId::new("check"), true)
            .await
            .unwrap();

        let progress = aggregator.recompute(&scope).unwrap();

        assert!(progress.is_complete());
        assert_eq!(
            memory.last_text(MountPoint::ValidationLabel).as_deref(),
            Some("done")
        );
        assert!(fx.ledger.read_all().await.is_empty());
    }
}
