//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{ItemId, SettingsError};
use storage::sqlite::SqliteInitError;

use crate::observers::MountPoint;

/// Errors emitted by the item state tracker.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("no trackable item `{0}` on this page")]
    UnknownItem(ItemId),
}

/// Errors raised while an observer renders.
///
/// These never travel past the observer that raised them: the event bus and the
/// aggregators log them and move on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ObserverError {
    #[error("mount {mount:?} rejected the update: {reason}")]
    Render { mount: MountPoint, reason: String },
    #[error("subscriber failed: {0}")]
    Subscriber(String),
}

/// Errors emitted while bootstrapping course services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
