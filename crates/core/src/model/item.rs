use serde::{Deserialize, Serialize};

use crate::model::ids::{ItemId, ModuleId};
use crate::model::percentage::Percentage;

/// What a trackable item stands for on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A checkbox inside an exercise's validation section.
    ValidationStep,
    /// A structural heading of a module page.
    Section,
    /// An exercise block of a module page.
    Exercise,
}

impl ItemKind {
    /// Which family of scopes this kind of item belongs to.
    #[must_use]
    pub fn scope_kind(self) -> ScopeKind {
        match self {
            ItemKind::ValidationStep => ScopeKind::Validation,
            ItemKind::Section | ItemKind::Exercise => ScopeKind::Module,
        }
    }
}

/// A checkable unit of progress.
///
/// Lives only as long as the page it was discovered on; the checked flag is the only
/// part that is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackableItem {
    id: ItemId,
    label: String,
    kind: ItemKind,
    checked: bool,
}

impl TrackableItem {
    #[must_use]
    pub fn new(id: ItemId, label: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id,
            label: label.into().trim().to_owned(),
            kind,
            checked: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Validation,
    Module,
}

/// The set of items one percentage is computed over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The validation checklist of the current exercise page.
    Validation,
    /// Every section and exercise of one module page.
    Module(ModuleId),
}

impl Scope {
    #[must_use]
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Validation => ScopeKind::Validation,
            Scope::Module(_) => ScopeKind::Module,
        }
    }

    #[must_use]
    pub fn module_id(&self) -> Option<&ModuleId> {
        match self {
            Scope::Validation => None,
            Scope::Module(id) => Some(id),
        }
    }
}

/// Result of one recompute over a non-empty scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeProgress {
    checked: usize,
    total: usize,
    percentage: Percentage,
}

impl ScopeProgress {
    /// Counts the checked items. Returns `None` when `items` is empty.
    #[must_use]
    pub fn from_items(items: &[TrackableItem]) -> Option<Self> {
        let total = items.len();
        let checked = items.iter().filter(|item| item.is_checked()).count();
        Percentage::from_counts(checked, total).map(|percentage| Self {
            checked,
            total,
            percentage,
        })
    }

    #[must_use]
    pub fn checked(&self) -> usize {
        self.checked
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn percentage(&self) -> Percentage {
        self.percentage
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percentage.is_complete()
    }
}
