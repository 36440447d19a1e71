use std::fmt;
use std::sync::Arc;

use course_core::model::{ModuleMetadata, ModuleProgress};

use super::mount::{MountPoint, MountPoints, Rendered};
use crate::error::ObserverError;
use crate::events::{ProgressBus, SubscriptionId};

/// `<completed>/<total>` modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeCount {
    pub completed: usize,
    pub total: usize,
}

impl fmt::Display for BadgeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

/// Navigation badge counting fully completed modules.
///
/// Holds no state of its own: every render recounts from the ledger snapshot and the
/// module catalog.
pub struct NavigationBadge {
    modules: Vec<ModuleMetadata>,
    mounts: MountPoints,
}

impl NavigationBadge {
    #[must_use]
    pub fn new(modules: Vec<ModuleMetadata>, mounts: MountPoints) -> Self {
        Self { modules, mounts }
    }

    #[must_use]
    pub fn modules(&self) -> &[ModuleMetadata] {
        &self.modules
    }

    #[must_use]
    pub fn count(&self, ledger: &ModuleProgress) -> BadgeCount {
        BadgeCount {
            completed: ledger.completed_count(&self.modules),
            total: self.modules.len(),
        }
    }

    /// Recount and render.
    ///
    /// # Errors
    ///
    /// Returns the mount's error if the badge target rejects the update.
    pub fn render(&self, ledger: &ModuleProgress) -> Result<BadgeCount, ObserverError> {
        let count = self.count(ledger);
        self.mounts
            .render(MountPoint::NavigationBadge, Rendered::text(count.to_string()))?;
        Ok(count)
    }

    /// Re-render on every ledger update.
    pub fn attach(self: &Arc<Self>, bus: &ProgressBus) -> SubscriptionId {
        let badge = Arc::clone(self);
        bus.subscribe("navigation-badge", move |ledger| {
            badge.render(ledger).map(|_| ())
        })
    }
}
