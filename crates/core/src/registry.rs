//! Discovery of the trackable items on a page.
//!
//! Module-page items get synthetic ids from an [`IdStrategy`]. The default
//! [`OrdinalIds`] derives them from document position, so they are stable across reloads
//! of an unchanged page. Inserting or reordering headings shifts the ids, and state
//! persisted under the old ids is silently left behind.

use std::sync::Arc;

use crate::model::{ItemId, ItemKind, PageOutline, ProgressSettings, ScopeKind, TrackableItem};

/// Policy for naming module-page items.
pub trait IdStrategy: Send + Sync {
    fn section_id(&self, index: usize, label: &str) -> ItemId;
    fn exercise_id(&self, index: usize) -> ItemId;
}

/// `section_<index>` / `exercise_<index>`, counted separately in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdinalIds;

impl IdStrategy for OrdinalIds {
    fn section_id(&self, index: usize, _label: &str) -> ItemId {
        ItemId::new(format!("section_{index}"))
    }

    fn exercise_id(&self, index: usize) -> ItemId {
        ItemId::new(format!("exercise_{index}"))
    }
}

#[derive(Clone)]
pub struct ItemRegistry {
    ids: Arc<dyn IdStrategy>,
    exercise_label: String,
}

impl ItemRegistry {
    #[must_use]
    pub fn new(ids: Arc<dyn IdStrategy>, settings: &ProgressSettings) -> Self {
        Self {
            ids,
            exercise_label: settings.exercise_label().to_owned(),
        }
    }

    /// Registry with ordinal ids and default labels.
    #[must_use]
    pub fn ordinal() -> Self {
        Self::new(Arc::new(OrdinalIds), &ProgressSettings::default())
    }

    /// Enumerate the items of one scope, all unchecked.
    #[must_use]
    pub fn discover(&self, page: &PageOutline, scope: ScopeKind) -> Vec<TrackableItem> {
        match scope {
            ScopeKind::Validation => page
                .validation
                .iter()
                .flatten()
                .map(|step| {
                    TrackableItem::new(step.id.clone(), &step.label, ItemKind::ValidationStep)
                })
                .collect(),
            ScopeKind::Module => {
                let sections = page.sections.iter().enumerate().map(|(idx, label)| {
                    TrackableItem::new(self.ids.section_id(idx, label), label, ItemKind::Section)
                });
                let exercises = (0..page.exercises).map(|idx| {
                    TrackableItem::new(
                        self.ids.exercise_id(idx),
                        &self.exercise_label,
                        ItemKind::Exercise,
                    )
                });
                sections.chain(exercises).collect()
            }
        }
    }
}
