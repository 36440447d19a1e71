//! Display surfaces driven by progress updates.

mod badge;
mod mount;
mod progress_bar;

pub use badge::{BadgeCount, NavigationBadge};
pub use mount::{MemoryMount, Mount, MountPoint, MountPoints, Rendered, Tone, memory_mounts};
pub use progress_bar::{ModuleProgressBar, ValidationProgressBar};
