use std::sync::Arc;

use course_core::model::{
    ItemId, ModuleId, PageOutline, Scope, ScopeKind, ScopeProgress, TrackableItem,
};
use course_core::registry::ItemRegistry;

use crate::aggregator::{ModuleAggregator, ValidationAggregator};
use crate::error::TrackerError;
use crate::ledger::ModuleLedger;
use crate::notifier::{Banner, CompletionNotifier};
use crate::observers::ModuleProgressBar;
use crate::tracker::{BoundScope, ItemStateTracker};

/// Everything a page needs from the surrounding course session.
#[derive(Clone)]
pub struct PageDeps {
    pub registry: ItemRegistry,
    pub tracker: ItemStateTracker,
    pub validation: ValidationAggregator,
    pub module_bar: ModuleProgressBar,
    pub ledger: Arc<ModuleLedger>,
    pub notifier: Arc<CompletionNotifier>,
}

struct ModuleScope {
    items: BoundScope,
    aggregator: ModuleAggregator,
}

/// Progress state of one loaded page.
pub struct PageProgress {
    tracker: ItemStateTracker,
    validation_items: BoundScope,
    validation: ValidationAggregator,
    module: Option<ModuleScope>,
    ledger: Arc<ModuleLedger>,
    notifier: Arc<CompletionNotifier>,
    last_validation: Option<ScopeProgress>,
    last_module: Option<ScopeProgress>,
}

impl PageProgress {
    /// Load flow: discover items, restore their state, recompute both scopes.
    ///
    /// On a module page with at least one item this upserts the ledger, which publishes
    /// to the bus.
    pub async fn open(page: &PageOutline, deps: PageDeps) -> Self {
        let validation_items = deps
            .tracker
            .bind_scope(
                Scope::Validation,
                deps.registry.discover(page, ScopeKind::Validation),
            )
            .await;

        let module = match &page.module_id {
            Some(module_id) => {
                let items = deps
                    .tracker
                    .bind_scope(
                        Scope::Module(module_id.clone()),
                        deps.registry.discover(page, ScopeKind::Module),
                    )
                    .await;
                let aggregator = ModuleAggregator::new(
                    module_id.clone(),
                    deps.module_bar.clone(),
                    Arc::clone(&deps.ledger),
                );
                Some(ModuleScope { items, aggregator })
            }
            None => None,
        };

        let mut progress = Self {
            tracker: deps.tracker,
            validation_items,
            validation: deps.validation,
            module,
            ledger: deps.ledger,
            notifier: deps.notifier,
            last_validation: None,
            last_module: None,
        };
        progress.recompute_validation();
        progress.recompute_current_module().await;
        progress
    }

    /// The current module id, if this is a module page.
    #[must_use]
    pub fn module_id(&self) -> Option<&ModuleId> {
        self.module.as_ref().map(|m| m.aggregator.module_id())
    }

    /// Apply a user toggle: persist, then recompute the scope the item belongs to.
    ///
    /// Returns the fresh progress of that scope (`None` only if it is empty, which
    /// cannot happen for a scope that contains the item).
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownItem` if no scope on this page has `item_id`.
    pub async fn toggle(
        &mut self,
        item_id: &ItemId,
        checked: bool,
    ) -> Result<Option<ScopeProgress>, TrackerError> {
        if self.validation_items.contains(item_id) {
            self.tracker
                .toggle(&mut self.validation_items, item_id, checked)
                .await?;
            return Ok(self.recompute_validation());
        }

        match self.module.as_mut() {
            Some(module) if module.items.contains(item_id) => {
                self.tracker
                    .toggle(&mut module.items, item_id, checked)
                    .await?;
                Ok(self.recompute_current_module().await)
            }
            _ => Err(TrackerError::UnknownItem(item_id.clone())),
        }
    }

    /// Recompute the validation checklist and refresh its bar.
    pub fn recompute_validation(&mut self) -> Option<ScopeProgress> {
        if let Some(progress) = self.validation.recompute(&self.validation_items) {
            self.last_validation = Some(progress);
        }
        self.last_validation
    }

    /// Recompute the module scope, refresh its bar and record it in the ledger.
    ///
    /// No-op outside module pages and on module pages without items.
    pub async fn recompute_current_module(&mut self) -> Option<ScopeProgress> {
        let module = self.module.as_ref()?;
        if let Some(progress) = module.aggregator.recompute(&module.items).await {
            self.last_module = Some(progress);
        }
        self.last_module
    }

    /// Mark `module_id` complete regardless of its items and raise a banner.
    pub async fn complete_module(&self, module_id: ModuleId) -> Banner {
        complete_module(&self.ledger, &self.notifier, module_id).await
    }

    #[must_use]
    pub fn validation_progress(&self) -> Option<ScopeProgress> {
        self.last_validation
    }

    #[must_use]
    pub fn module_progress(&self) -> Option<ScopeProgress> {
        self.last_module
    }

    /// Every bound item: validation steps first, then module items.
    pub fn items(&self) -> impl Iterator<Item = &TrackableItem> {
        self.validation_items.items().iter().chain(
            self.module
                .iter()
                .flat_map(|module| module.items.items().iter()),
        )
    }
}

pub(crate) async fn complete_module(
    ledger: &ModuleLedger,
    notifier: &CompletionNotifier,
    module_id: ModuleId,
) -> Banner {
    ledger.complete(module_id.clone()).await;
    tracing::info!(module = %module_id, "module marked complete");
    notifier.notify(module_id)
}
