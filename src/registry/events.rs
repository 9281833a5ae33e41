//! Messages flowing into and out of the registry

use crate::model::UserHandle;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

/// What happened to an installed package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAction {
    /// Components enabled or disabled
    Changed,
    /// Updated in place
    Replaced,
    /// Newly installed
    Added,
    /// Uninstalled
    Removed,
}

/// Input to the registry's event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A package was installed, updated or removed
    Package {
        /// Package name
        package: String,
        /// What happened
        action: PackageAction,
    },
    /// The date changed
    DateChanged,
    /// Minute tick
    TimeTick,
    /// The time zone changed
    TimezoneChanged,
    /// Persisted preferences changed on disk
    ReloadPreferences,
}

/// Output of the registry for whoever displays icons
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryNotification {
    /// The set or contents of applied packs changed; all icons are stale
    PacksChanged,
    /// Icons of these packages, per user, are stale
    ReloadIcons(Vec<(String, UserHandle)>),
    /// Message for the user
    Notice(String),
}

/// Fan-out of notifications to subscribers
///
/// Subscribers whose receiver has been dropped are pruned on the next send.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    subscribers: Arc<Mutex<Vec<Sender<RegistryNotification>>>>,
}

impl Notifier {
    /// New subscription
    pub fn subscribe(&self) -> Receiver<RegistryNotification> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Deliver to every live subscriber
    pub fn send(&self, notification: &RegistryNotification) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(notification.clone()).is_ok());
    }
}
