use std::sync::{Arc, Mutex, PoisonError};

use course_core::model::{ModuleId, ModuleMetadata, PageOutline, ProgressSettings};
use course_core::registry::{IdStrategy, ItemRegistry, OrdinalIds};
use storage::repository::{ProgressStore, Storage};

use crate::Clock;
use crate::aggregator::ValidationAggregator;
use crate::error::CourseServicesError;
use crate::events::{ProgressBus, SubscriptionId};
use crate::ledger::ModuleLedger;
use crate::notifier::{Banner, CompletionNotifier};
use crate::observers::{
    BadgeCount, ModuleProgressBar, MountPoints, NavigationBadge, ValidationProgressBar,
};
use crate::page::{self, PageDeps, PageProgress};
use crate::tracker::ItemStateTracker;

/// Assembles the progress engine for one course session.
///
/// The store, bus and ledger are owned here and handed to each page; nothing is global.
pub struct CourseServices {
    settings: Arc<ProgressSettings>,
    store: Arc<dyn ProgressStore>,
    bus: Arc<ProgressBus>,
    ledger: Arc<ModuleLedger>,
    badge: Arc<NavigationBadge>,
    notifier: Arc<CompletionNotifier>,
    registry: ItemRegistry,
    mounts: MountPoints,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl CourseServices {
    /// Wire services over an existing storage bundle, with ordinal item ids.
    #[must_use]
    pub fn new(
        storage: &Storage,
        settings: ProgressSettings,
        clock: Clock,
        modules: Vec<ModuleMetadata>,
        mounts: MountPoints,
    ) -> Self {
        let registry = ItemRegistry::new(Arc::new(OrdinalIds), &settings);
        Self::assemble(storage, settings, clock, modules, mounts, registry)
    }

    /// Like [`CourseServices::new`], but with a custom item id scheme.
    #[must_use]
    pub fn with_id_strategy(
        storage: &Storage,
        settings: ProgressSettings,
        clock: Clock,
        modules: Vec<ModuleMetadata>,
        mounts: MountPoints,
        ids: Arc<dyn IdStrategy>,
    ) -> Self {
        let registry = ItemRegistry::new(ids, &settings);
        Self::assemble(storage, settings, clock, modules, mounts, registry)
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `CourseServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        settings: ProgressSettings,
        clock: Clock,
        modules: Vec<ModuleMetadata>,
        mounts: MountPoints,
    ) -> Result<Self, CourseServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, settings, clock, modules, mounts))
    }

    /// Services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(
        settings: ProgressSettings,
        clock: Clock,
        modules: Vec<ModuleMetadata>,
        mounts: MountPoints,
    ) -> Self {
        Self::new(&Storage::in_memory(), settings, clock, modules, mounts)
    }

    fn assemble(
        storage: &Storage,
        settings: ProgressSettings,
        clock: Clock,
        modules: Vec<ModuleMetadata>,
        mounts: MountPoints,
        registry: ItemRegistry,
    ) -> Self {
        let store = Arc::clone(&storage.progress);
        let bus = Arc::new(ProgressBus::new());
        let ledger = Arc::new(ModuleLedger::new(
            Arc::clone(&store),
            settings.ledger_key(),
            Arc::clone(&bus),
        ));
        let badge = Arc::new(NavigationBadge::new(modules, mounts.clone()));
        let badge_subscription = badge.attach(&bus);
        let notifier = Arc::new(CompletionNotifier::new(
            clock,
            settings.notification_dismiss_secs(),
        ));

        Self {
            settings: Arc::new(settings),
            store,
            bus,
            ledger,
            badge,
            notifier,
            registry,
            mounts,
            subscriptions: Mutex::new(vec![badge_subscription]),
        }
    }

    /// Load a page: render the badge from the stored ledger, then bind and recompute.
    pub async fn open_page(&self, page: &PageOutline) -> PageProgress {
        self.render_badge().await;
        PageProgress::open(page, self.page_deps()).await
    }

    /// Force a module to 100% and raise a completion banner.
    pub async fn complete_module(&self, module_id: ModuleId) -> Banner {
        page::complete_module(&self.ledger, &self.notifier, module_id).await
    }

    /// Recount the badge from the current ledger. Render failures are logged.
    pub async fn render_badge(&self) -> BadgeCount {
        let ledger = self.ledger.read_all().await;
        match self.badge.render(&ledger) {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(error = %err, "navigation badge failed to render");
                self.badge.count(&ledger)
            }
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ProgressSettings {
        &self.settings
    }

    #[must_use]
    pub fn ledger(&self) -> Arc<ModuleLedger> {
        Arc::clone(&self.ledger)
    }

    #[must_use]
    pub fn notifier(&self) -> Arc<CompletionNotifier> {
        Arc::clone(&self.notifier)
    }

    #[must_use]
    pub fn bus(&self) -> Arc<ProgressBus> {
        Arc::clone(&self.bus)
    }

    #[must_use]
    pub fn modules(&self) -> &[ModuleMetadata] {
        self.badge.modules()
    }

    /// Detach the observers this session subscribed. Later ledger writes still persist
    /// but no longer re-render the badge.
    pub fn shutdown(&self) {
        let ids: Vec<_> = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for id in ids {
            self.bus.unsubscribe(id);
        }
        tracing::debug!("course services shut down");
    }

    fn page_deps(&self) -> PageDeps {
        PageDeps {
            registry: self.registry.clone(),
            tracker: ItemStateTracker::new(Arc::clone(&self.store), Arc::clone(&self.settings)),
            validation: ValidationAggregator::new(ValidationProgressBar::new(
                self.mounts.clone(),
                self.settings.validation_done_label(),
            )),
            module_bar: ModuleProgressBar::new(self.mounts.clone()),
            ledger: Arc::clone(&self.ledger),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::{MountPoint, memory_mounts};
    use course_core::time::fixed_clock;

    fn catalog() -> Vec<ModuleMetadata> {
        ["m1", "m2", "m3"]
            .into_iter()
            .map(|id| ModuleMetadata::new(ModuleId::new(id), id.to_uppercase()))
            .collect()
    }

    #[tokio::test]
    async fn complete_module_updates_badge_and_raises_banner() {
        let (mounts, memory) = memory_mounts();
        let services = CourseServices::in_memory(
            ProgressSettings::default(),
            fixed_clock(),
            catalog(),
            mounts,
        );

        let banner = services.complete_module(ModuleId::new("m2")).await;

        assert_eq!(banner.module_id, ModuleId::new("m2"));
        assert_eq!(services.notifier().active().len(), 1);
        assert_eq!(
            memory.last_text(MountPoint::NavigationBadge).as_deref(),
            Some("1/3")
        );
    }

    #[tokio::test]
    async fn shutdown_detaches_badge() {
        let (mounts, memory) = memory_mounts();
        let services = CourseServices::in_memory(
            ProgressSettings::default(),
            fixed_clock(),
            catalog(),
            mounts,
        );
        assert_eq!(services.bus().subscriber_count(), 1);

        services.shutdown();
        services.complete_module(ModuleId::new("m1")).await;

        assert_eq!(services.bus().subscriber_count(), 0);
        assert_eq!(memory.count(MountPoint::NavigationBadge), 0);
        assert_eq!(services.render_badge().await.completed, 1);
    }
}
