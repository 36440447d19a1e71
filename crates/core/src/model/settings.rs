use thiserror::Error;

use crate::model::ids::ItemId;
use crate::model::item::ItemKind;

pub const DEFAULT_LEDGER_KEY: &str = "devops_course_progress";
pub const DEFAULT_VALIDATION_PREFIX: &str = "validation_";
pub const DEFAULT_PROGRESS_PREFIX: &str = "progress_";
pub const DEFAULT_NOTIFICATION_DISMISS_SECS: u32 = 5;

/// Store layout and presentation knobs for the progress engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressSettings {
    ledger_key: String,
    validation_prefix: String,
    progress_prefix: String,
    notification_dismiss_secs: u32,
    exercise_label: String,
    validation_done_label: String,
}

#[derive(Clone, Debug, Default)]
pub struct ProgressSettingsDraft {
    pub ledger_key: Option<String>,
    pub validation_prefix: Option<String>,
    pub progress_prefix: Option<String>,
    pub notification_dismiss_secs: Option<u32>,
    pub exercise_label: Option<String>,
    pub validation_done_label: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("key prefixes must differ")]
    CollidingPrefixes,

    #[error("ledger key `{0}` would collide with item keys")]
    LedgerKeyCollides(String),

    #[error("notification dismiss delay must be between 1 and 3600 seconds")]
    InvalidDismissDelay,
}

impl ProgressSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft, filling blanks with defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the key layout could mix up item and ledger entries
    /// or the dismiss delay is out of range.
    pub fn validate(self) -> Result<ProgressSettings, SettingsError> {
        let ledger_key = normalize_or(self.ledger_key, DEFAULT_LEDGER_KEY);
        let validation_prefix = normalize_or(self.validation_prefix, DEFAULT_VALIDATION_PREFIX);
        let progress_prefix = normalize_or(self.progress_prefix, DEFAULT_PROGRESS_PREFIX);
        let notification_dismiss_secs = self
            .notification_dismiss_secs
            .unwrap_or(DEFAULT_NOTIFICATION_DISMISS_SECS);

        if validation_prefix == progress_prefix {
            return Err(SettingsError::CollidingPrefixes);
        }
        if ledger_key.starts_with(&validation_prefix) || ledger_key.starts_with(&progress_prefix)
        {
            return Err(SettingsError::LedgerKeyCollides(ledger_key));
        }
        if !(1..=3600).contains(&notification_dismiss_secs) {
            return Err(SettingsError::InvalidDismissDelay);
        }

        Ok(ProgressSettings {
            ledger_key,
            validation_prefix,
            progress_prefix,
            notification_dismiss_secs,
            exercise_label: normalize_or(self.exercise_label, "Exercise complete"),
            validation_done_label: normalize_or(
                self.validation_done_label,
                "✅ Exercise complete!",
            ),
        })
    }
}

impl ProgressSettings {
    #[must_use]
    pub fn ledger_key(&self) -> &str {
        &self.ledger_key
    }

    #[must_use]
    pub fn validation_prefix(&self) -> &str {
        &self.validation_prefix
    }

    #[must_use]
    pub fn progress_prefix(&self) -> &str {
        &self.progress_prefix
    }

    #[must_use]
    pub fn notification_dismiss_secs(&self) -> u32 {
        self.notification_dismiss_secs
    }

    /// Label given to exercise-block items.
    #[must_use]
    pub fn exercise_label(&self) -> &str {
        &self.exercise_label
    }

    /// Label shown by a validation progress bar at 100%.
    #[must_use]
    pub fn validation_done_label(&self) -> &str {
        &self.validation_done_label
    }

    /// Store key holding the checked flag of an item.
    #[must_use]
    pub fn item_key(&self, kind: ItemKind, id: &ItemId) -> String {
        let prefix = match kind {
            ItemKind::ValidationStep => &self.validation_prefix,
            ItemKind::Section | ItemKind::Exercise => &self.progress_prefix,
        };
        format!("{prefix}{id}")
    }
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            ledger_key: DEFAULT_LEDGER_KEY.to_owned(),
            validation_prefix: DEFAULT_VALIDATION_PREFIX.to_owned(),
            progress_prefix: DEFAULT_PROGRESS_PREFIX.to_owned(),
            notification_dismiss_secs: DEFAULT_NOTIFICATION_DISMISS_SECS,
            exercise_label: "Exercise complete".to_owned(),
            validation_done_label: "✅ Exercise complete!".to_owned(),
        }
    }
}

fn normalize_or(value: Option<String>, fallback: &str) -> String {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}
