use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::ModuleId;
use crate::model::module::ModuleMetadata;
use crate::model::percentage::Percentage;

/// Last-computed completion percentage per module.
///
/// Grows by upsert and never shrinks. Serialized as a flat JSON object
/// `{ "<moduleId>": <number> }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleProgress {
    entries: BTreeMap<ModuleId, Percentage>,
}

/// A stored ledger read entry by entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LenientLedger {
    pub progress: ModuleProgress,
    /// Keys whose entry could not be read, in key order.
    pub rejected: Vec<String>,
}

impl ModuleProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a stored ledger, keeping every readable entry.
    ///
    /// Entries with a blank key, a non-numeric value or a value outside `0..=100` are
    /// reported in `rejected` instead of failing the whole document.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when `json` is not an object.
    pub fn from_json_lenient(json: &str) -> Result<LenientLedger, serde_json::Error> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut parsed = LenientLedger::default();
        for (key, value) in raw {
            let percentage = value
                .as_f64()
                .and_then(|number| Percentage::try_from(number).ok());
            match (key.parse::<ModuleId>(), percentage) {
                (Ok(module_id), Some(percentage)) => {
                    parsed.progress.upsert(module_id, percentage);
                }
                _ => parsed.rejected.push(key),
            }
        }
        Ok(parsed)
    }

    /// Copies every entry of `newer` over this mapping.
    pub fn overlay(&mut self, newer: &ModuleProgress) {
        for (module_id, percentage) in newer.iter() {
            self.upsert(module_id.clone(), percentage);
        }
    }

    /// Insert or replace the percentage for `module_id`.
    pub fn upsert(&mut self, module_id: ModuleId, percentage: Percentage) {
        self.entries.insert(module_id, percentage);
    }

    /// Marks the module as fully complete.
    pub fn complete(&mut self, module_id: ModuleId) {
        self.upsert(module_id, Percentage::COMPLETE);
    }

    #[must_use]
    pub fn get(&self, module_id: &ModuleId) -> Option<Percentage> {
        self.entries.get(module_id).copied()
    }

    /// Percentage for `module_id`, treating unknown modules as 0%.
    #[must_use]
    pub fn percentage_or_zero(&self, module_id: &ModuleId) -> Percentage {
        self.get(module_id).unwrap_or(Percentage::ZERO)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, Percentage)> {
        self.entries.iter().map(|(id, pct)| (id, *pct))
    }

    /// How many of the listed modules are at exactly 100%.
    ///
    /// Ledger entries for modules missing from `modules` are ignored.
    #[must_use]
    pub fn completed_count(&self, modules: &[ModuleMetadata]) -> usize {
        modules
            .iter()
            .filter(|module| self.percentage_or_zero(module.id()).is_complete())
            .count()
    }
}
