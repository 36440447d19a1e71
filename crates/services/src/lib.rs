#![forbid(unsafe_code)]

pub mod aggregator;
pub mod app_services;
pub mod error;
pub mod events;
pub mod ledger;
pub mod notifier;
pub mod observers;
pub mod page;
pub mod tracker;

pub use course_core::Clock;

pub use app_services::CourseServices;
pub use error::{CourseServicesError, ObserverError, TrackerError};
pub use events::{DeliveryReport, EventBus, ProgressBus, SubscriptionId};
pub use ledger::ModuleLedger;
pub use notifier::{Banner, BannerId, CompletionNotifier};
pub use page::{PageDeps, PageProgress};
pub use tracker::{BoundScope, ItemStateTracker};
