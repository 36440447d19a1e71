use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use course_core::Clock;
use course_core::model::ModuleId;
use uuid::Uuid;

pub const BANNER_TITLE: &str = "Congratulations!";
pub const BANNER_MESSAGE: &str = "You have completed this module.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BannerId(Uuid);

impl BannerId {
    fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A dismissible "module completed" banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub id: BannerId,
    pub module_id: ModuleId,
    pub title: String,
    pub message: String,
    pub shown_at: DateTime<Utc>,
    pub dismiss_at: DateTime<Utc>,
}

/// Stack of completion banners. Each one goes away on its own after the configured
/// delay, or earlier through `dismiss`. Repeated completions stack.
pub struct CompletionNotifier {
    clock: Clock,
    dismiss_after_secs: u32,
    banners: Mutex<Vec<Banner>>,
}

impl CompletionNotifier {
    #[must_use]
    pub fn new(clock: Clock, dismiss_after_secs: u32) -> Self {
        Self {
            clock,
            dismiss_after_secs,
            banners: Mutex::new(Vec::new()),
        }
    }

    pub fn notify(&self, module_id: ModuleId) -> Banner {
        let shown_at = self.clock.now();
        let banner = Banner {
            id: BannerId::random(),
            module_id,
            title: BANNER_TITLE.to_owned(),
            message: BANNER_MESSAGE.to_owned(),
            shown_at,
            dismiss_at: self.clock.deadline_in(self.dismiss_after_secs),
        };
        self.banners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(banner.clone());
        banner
    }

    /// Close a banner. Returns `false` if it was already gone.
    pub fn dismiss(&self, id: BannerId) -> bool {
        let mut banners = self.banners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = banners.len();
        banners.retain(|banner| banner.id != id);
        banners.len() != before
    }

    /// Banners still showing now, oldest first.
    #[must_use]
    pub fn active(&self) -> Vec<Banner> {
        self.active_at(self.clock.now())
    }

    /// Banners still showing at `now`; expired ones are dropped for good.
    #[must_use]
    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Banner> {
        let mut banners = self.banners.lock().unwrap_or_else(PoisonError::into_inner);
        banners.retain(|banner| banner.dismiss_at > now);
        banners.clone()
    }
}
