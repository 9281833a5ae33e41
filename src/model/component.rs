//! Component addressing types
//!
//! A launchable target is addressed by its component name (package + activity
//! class) together with the user profile it belongs to.

use crate::error::{IconPackError, Result};
use std::fmt;
use std::str::FromStr;

/// User profile a component is installed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UserHandle(pub u32);

impl fmt::Display for UserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Package + class pair identifying one activity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentName {
    package: String,
    class: String,
}

impl ComponentName {
    /// Create a component name. A class starting with `.` is relative to the package.
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        let package = package.into();
        let class = class.into();
        let class = if class.starts_with('.') {
            format!("{package}{class}")
        } else {
            class
        };
        Self { package, class }
    }

    /// Parse the flattened `package/class` form
    ///
    /// Returns `None` when either half is missing.
    pub fn unflatten(flat: &str) -> Option<Self> {
        let (package, class) = flat.split_once('/')?;
        if package.is_empty() || class.is_empty() {
            return None;
        }
        Some(Self::new(package, class))
    }

    /// Package name
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Fully qualified class name
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Flattened `package/class` form
    pub fn flatten(&self) -> String {
        format!("{}/{}", self.package, self.class)
    }

    /// Hash that is stable across runs and platforms
    ///
    /// Used to pick mask layers so that the same app always receives the same
    /// variant. 32-bit FNV-1a over the flattened name.
    pub fn stable_hash(&self) -> i32 {
        const OFFSET: u32 = 0x811c_9dc5;
        const PRIME: u32 = 0x0100_0193;

        let mut hash = OFFSET;
        for byte in self
            .package
            .bytes()
            .chain(std::iter::once(b'/'))
            .chain(self.class.bytes())
        {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(PRIME);
        }
        i32::from_ne_bytes(hash.to_ne_bytes())
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.class)
    }
}

impl FromStr for ComponentName {
    type Err = IconPackError;

    fn from_str(s: &str) -> Result<Self> {
        Self::unflatten(s).ok_or_else(|| IconPackError::InvalidComponent(s.to_string()))
    }
}

/// (component, user) pair addressing one launchable thing
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey {
    /// Component name
    pub component: ComponentName,
    /// Owning user profile
    pub user: UserHandle,
}

impl ComponentKey {
    /// Create a key
    pub fn new(component: ComponentName, user: UserHandle) -> Self {
        Self { component, user }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.component, self.user)
    }
}

impl FromStr for ComponentKey {
    type Err = IconPackError;

    /// Parses `package/class#user`; a missing user suffix means user 0.
    fn from_str(s: &str) -> Result<Self> {
        let (component, user) = match s.rsplit_once('#') {
            Some((component, user)) => {
                let user = user
                    .parse::<u32>()
                    .map_err(|_| IconPackError::InvalidComponent(s.to_string()))?;
                (component, UserHandle(user))
            }
            None => (s, UserHandle::default()),
        };
        Ok(Self::new(component.parse()?, user))
    }
}

/// A pinned or dynamic shortcut published by an app
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortcutInfo {
    /// Publishing package
    pub package: String,
    /// Shortcut id within the package
    pub id: String,
    /// Activity the shortcut is attached to, if any
    pub activity: Option<ComponentName>,
    /// Owning user profile
    pub user: UserHandle,
}

/// Kind of workspace item an already-rasterized icon belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    /// An application launcher item
    Application,
    /// A deep shortcut
    DeepShortcut,
    /// Anything else (folders, widgets)
    Other,
}

/// Minimal description of a workspace item for icon redressing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfo {
    /// Item kind
    pub item_type: ItemType,
    /// Target activity, when the item launches one
    pub target_component: Option<ComponentName>,
    /// Owning user profile
    pub user: UserHandle,
}
