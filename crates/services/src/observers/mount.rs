use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use course_core::model::Percentage;

use crate::error::ObserverError;

/// Named render targets the host page may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountPoint {
    ModuleFill,
    ModulePercentage,
    ModuleItems,
    ValidationFill,
    ValidationLabel,
    NavigationBadge,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tone {
    #[default]
    Neutral,
    Success,
}

/// What an observer pushes into a mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Text { text: String, tone: Tone },
    Fill(Percentage),
}

impl Rendered {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            tone: Tone::Neutral,
        }
    }

    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            tone: Tone::Success,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Rendered::Text { text, .. } => Some(text),
            Rendered::Fill(_) => None,
        }
    }
}

/// A render target. Implementations adapt to whatever UI hosts the course.
pub trait Mount: Send + Sync {
    /// # Errors
    ///
    /// Returns `ObserverError::Render` when the target cannot show `content`.
    fn render(&self, point: MountPoint, content: &Rendered) -> Result<(), ObserverError>;
}

/// The mounts present on the current page. Absent ones are simply skipped.
#[derive(Clone, Default)]
pub struct MountPoints {
    mounts: HashMap<MountPoint, Arc<dyn Mount>>,
}

impl MountPoints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, point: MountPoint, mount: Arc<dyn Mount>) -> Self {
        self.insert(point, mount);
        self
    }

    pub fn insert(&mut self, point: MountPoint, mount: Arc<dyn Mount>) {
        self.mounts.insert(point, mount);
    }

    #[must_use]
    pub fn contains(&self, point: MountPoint) -> bool {
        self.mounts.contains_key(&point)
    }

    /// Render into `point` if the page has it. Returns whether anything was rendered.
    ///
    /// # Errors
    ///
    /// Propagates the mount's own render error.
    pub fn render(&self, point: MountPoint, content: Rendered) -> Result<bool, ObserverError> {
        let Some(mount) = self.mounts.get(&point) else {
            tracing::debug!(?point, "mount point missing, skipping render");
            return Ok(false);
        };
        mount.render(point, &content)?;
        Ok(true)
    }
}

/// Mount that remembers what it was given. Useful for tests and headless hosts.
#[derive(Default)]
pub struct MemoryMount {
    renders: Mutex<Vec<(MountPoint, Rendered)>>,
}

impl MemoryMount {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest content rendered into `point`.
    #[must_use]
    pub fn last(&self, point: MountPoint) -> Option<Rendered> {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(p, _)| *p == point)
            .map(|(_, content)| content.clone())
    }

    /// Latest text rendered into `point`.
    #[must_use]
    pub fn last_text(&self, point: MountPoint) -> Option<String> {
        self.last(point)
            .and_then(|content| content.as_text().map(str::to_owned))
    }

    /// How many renders `point` has received.
    #[must_use]
    pub fn count(&self, point: MountPoint) -> usize {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(p, _)| *p == point)
            .count()
    }
}

impl Mount for MemoryMount {
    fn render(&self, point: MountPoint, content: &Rendered) -> Result<(), ObserverError> {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((point, content.clone()));
        Ok(())
    }
}

/// A `MountPoints` where every point is backed by the same `MemoryMount`.
#[must_use]
pub fn memory_mounts() -> (MountPoints, Arc<MemoryMount>) {
    let memory = Arc::new(MemoryMount::new());
    let mut mounts = MountPoints::new();
    for point in [
        MountPoint::ModuleFill,
        MountPoint::ModulePercentage,
        MountPoint::ModuleItems,
        MountPoint::ValidationFill,
        MountPoint::ValidationLabel,
        MountPoint::NavigationBadge,
    ] {
        let mount: Arc<dyn Mount> = memory.clone();
        mounts.insert(point, mount);
    }
    (mounts, memory)
}
