use course_core::model::ScopeProgress;

use super::mount::{MountPoint, MountPoints, Rendered};
use crate::error::ObserverError;

/// Renders every `(point, content)` pair, even after a failure, and reports the
/// first error.
fn render_all(
    mounts: &MountPoints,
    updates: impl IntoIterator<Item = (MountPoint, Rendered)>,
) -> Result<(), ObserverError> {
    let mut first_err = None;
    for (point, content) in updates {
        if let Err(err) = mounts.render(point, content) {
            first_err.get_or_insert(err);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Module-page bar: fill, `N%` label and `<checked>/<total> sections` counter.
#[derive(Clone)]
pub struct ModuleProgressBar {
    mounts: MountPoints,
}

impl ModuleProgressBar {
    #[must_use]
    pub fn new(mounts: MountPoints) -> Self {
        Self { mounts }
    }

    /// # Errors
    ///
    /// Returns the first mount error; the other mounts are still updated.
    pub fn render(&self, progress: &ScopeProgress) -> Result<(), ObserverError> {
        render_all(
            &self.mounts,
            [
                (MountPoint::ModuleFill, Rendered::Fill(progress.percentage())),
                (
                    MountPoint::ModulePercentage,
                    Rendered::text(progress.percentage().to_string()),
                ),
                (
                    MountPoint::ModuleItems,
                    Rendered::text(format!(
                        "{}/{} sections",
                        progress.checked(),
                        progress.total()
                    )),
                ),
            ],
        )
    }
}

/// Progress bar of an exercise's validation checklist.
///
/// At 100% the label switches to the completion message in the success tone. This is
/// recomputed every time, so unchecking a step brings the plain label back.
#[derive(Clone)]
pub struct ValidationProgressBar {
    mounts: MountPoints,
    done_label: String,
}

impl ValidationProgressBar {
    #[must_use]
    pub fn new(mounts: MountPoints, done_label: impl Into<String>) -> Self {
        Self {
            mounts,
            done_label: done_label.into(),
        }
    }

    /// # Errors
    ///
    /// Returns the first mount error; the other mounts are still updated.
    pub fn render(&self, progress: &ScopeProgress) -> Result<(), ObserverError> {
        let label = if progress.is_complete() {
            Rendered::success(self.done_label.clone())
        } else {
            Rendered::text(format!("Progress: {}", progress.percentage()))
        };
        render_all(
            &self.mounts,
            [
                (MountPoint::ValidationFill, Rendered::Fill(progress.percentage())),
                (MountPoint::ValidationLabel, label),
            ],
        )
    }
}
