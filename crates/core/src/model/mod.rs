mod ids;
mod item;
mod ledger;
mod module;
mod page;
mod percentage;
mod settings;

pub use ids::{ItemId, ModuleId, ParseIdError};
pub use item::{ItemKind, Scope, ScopeKind, ScopeProgress, TrackableItem};
pub use ledger::{LenientLedger, ModuleProgress};
pub use module::{ModuleMetadata, parse_module_catalog};
pub use page::{EXERCISE_BLOCK_CLASS, PageError, PageOutline, ValidationCheckbox};
pub use percentage::{Percentage, PercentageError};
pub use settings::{
    DEFAULT_LEDGER_KEY, DEFAULT_NOTIFICATION_DISMISS_SECS, ProgressSettings,
    ProgressSettingsDraft, SettingsError,
};
