//! Shared state every pack reads while resolving icons

use crate::config::IconPreferences;
use crate::platform::PackageManager;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Handle to the package manager, the current preferences and the tracked
/// day of month
///
/// Cloning is cheap; all clones observe the same preferences and day.
#[derive(Debug, Clone)]
pub struct PackEnvironment {
    package_manager: Arc<dyn PackageManager>,
    preferences: Arc<RwLock<IconPreferences>>,
    day_of_month: Arc<AtomicU32>,
}

impl PackEnvironment {
    /// Environment with initial preferences and day
    pub fn new(
        package_manager: Arc<dyn PackageManager>,
        preferences: IconPreferences,
        day_of_month: u32,
    ) -> Self {
        Self {
            package_manager,
            preferences: Arc::new(RwLock::new(preferences)),
            day_of_month: Arc::new(AtomicU32::new(day_of_month)),
        }
    }

    /// Installed packages
    pub fn package_manager(&self) -> &Arc<dyn PackageManager> {
        &self.package_manager
    }

    /// Snapshot of the current preferences
    pub fn preferences(&self) -> IconPreferences {
        *self.preferences.read()
    }

    /// Replace the preferences
    pub fn set_preferences(&self, preferences: IconPreferences) {
        *self.preferences.write() = preferences;
    }

    /// Day of month used for calendar icons
    pub fn day_of_month(&self) -> u32 {
        self.day_of_month.load(Ordering::Acquire)
    }

    /// Update the tracked day, returning whether it changed
    pub fn set_day_of_month(&self, day: u32) -> bool {
        self.day_of_month.swap(day, Ordering::AcqRel) != day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPackageManager;

    #[test]
    fn clones_share_state() {
        let env = PackEnvironment::new(
            Arc::new(MemoryPackageManager::new()),
            IconPreferences::default(),
            1,
        );
        let other = env.clone();
        assert!(other.set_day_of_month(17));
        assert!(!env.set_day_of_month(17));
        assert_eq!(env.day_of_month(), 17);

        let mut prefs = env.preferences();
        prefs.adaptify_icon_packs = true;
        other.set_preferences(prefs);
        assert!(env.preferences().adaptify_icon_packs);
    }
}
