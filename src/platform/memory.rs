//! In-memory platform implementations
//!
//! Used for previews of packs that are not installed yet and throughout the
//! test suite.

use super::{LauncherActivity, PackResources, PackageManager, ResourceId, ResourceKind};
use crate::error::{IconPackError, Result};
use crate::graphics::Drawable;
use crate::model::{ComponentKey, ShortcutInfo, UserHandle};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Value {
    Drawable(Drawable),
    Xml(String),
    Dimen(f32),
    /// Declared but cannot be decoded
    Undecodable,
    /// Id handed out but no longer backed by a resource
    Dangling,
}

#[derive(Debug, Clone)]
struct Stored {
    name: String,
    value: Value,
}

/// Resource space held entirely in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryResources {
    ids: HashMap<(ResourceKind, String), ResourceId>,
    values: HashMap<ResourceId, Stored>,
    counters: HashMap<ResourceKind, u32>,
    assets: HashMap<String, String>,
}

impl MemoryResources {
    /// Empty resource space
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(mut self, kind: ResourceKind, name: &str, value: Value) -> Self {
        let id = match self.ids.get(&(kind, name.to_string())) {
            Some(id) => *id,
            None => {
                let counter = self.counters.entry(kind).or_insert(0);
                *counter += 1;
                let id = kind.id_base() + *counter;
                self.ids.insert((kind, name.to_string()), id);
                id
            }
        };
        self.values.insert(
            id,
            Stored {
                name: name.to_string(),
                value,
            },
        );
        self
    }

    /// Add a drawable
    #[must_use]
    pub fn with_drawable(self, name: &str, drawable: Drawable) -> Self {
        self.insert(ResourceKind::Drawable, name, Value::Drawable(drawable))
    }

    /// Add a launcher icon
    #[must_use]
    pub fn with_mipmap(self, name: &str, drawable: Drawable) -> Self {
        self.insert(ResourceKind::Mipmap, name, Value::Drawable(drawable))
    }

    /// Add a drawable name that resolves to an id but fails to decode
    #[must_use]
    pub fn with_undecodable_drawable(self, name: &str) -> Self {
        self.insert(ResourceKind::Drawable, name, Value::Undecodable)
    }

    /// Add a drawable name whose id no longer maps to a resource
    #[must_use]
    pub fn with_dangling_drawable(self, name: &str) -> Self {
        self.insert(ResourceKind::Drawable, name, Value::Dangling)
    }

    /// Add a packaged XML document
    #[must_use]
    pub fn with_xml(self, name: &str, document: &str) -> Self {
        self.insert(ResourceKind::Xml, name, Value::Xml(document.to_string()))
    }

    /// Add a dimension value
    #[must_use]
    pub fn with_dimen(self, name: &str, value: f32) -> Self {
        self.insert(ResourceKind::Dimen, name, Value::Dimen(value))
    }

    /// Add a raw asset
    #[must_use]
    pub fn with_asset(mut self, path: &str, contents: &str) -> Self {
        self.assets.insert(path.to_string(), contents.to_string());
        self
    }

    fn stored(&self, id: ResourceId, kind: ResourceKind) -> Result<&Stored> {
        self.values
            .get(&id)
            .filter(|stored| !matches!(stored.value, Value::Dangling))
            .ok_or_else(|| IconPackError::id_not_found(kind, id))
    }
}

impl PackResources for MemoryResources {
    fn identifier(&self, name: &str, kind: ResourceKind) -> Option<ResourceId> {
        self.ids.get(&(kind, name.to_string())).copied()
    }

    fn resource_name(&self, id: ResourceId) -> Option<String> {
        match self.values.get(&id) {
            Some(Stored {
                value: Value::Dangling,
                ..
            })
            | None => None,
            Some(stored) => Some(stored.name.clone()),
        }
    }

    fn drawable(&self, id: ResourceId, _density: u32) -> Result<Drawable> {
        match &self.stored(id, ResourceKind::Drawable)?.value {
            Value::Drawable(drawable) => Ok(drawable.clone()),
            _ => Err(IconPackError::id_not_found(ResourceKind::Drawable, id)),
        }
    }

    fn dimension(&self, id: ResourceId) -> Result<f32> {
        match self.stored(id, ResourceKind::Dimen)?.value {
            Value::Dimen(value) => Ok(value),
            _ => Err(IconPackError::id_not_found(ResourceKind::Dimen, id)),
        }
    }

    fn xml(&self, id: ResourceId) -> Result<String> {
        match &self.stored(id, ResourceKind::Xml)?.value {
            Value::Xml(document) => Ok(document.clone()),
            _ => Err(IconPackError::id_not_found(ResourceKind::Xml, id)),
        }
    }

    fn asset(&self, path: &str) -> Result<String> {
        self.assets.get(path).cloned().ok_or_else(|| {
            IconPackError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("asset {path} not found"),
            ))
        })
    }
}

#[derive(Debug, Default)]
struct PackageState {
    activities: Vec<(LauncherActivity, Option<Drawable>)>,
    shortcut_icons: HashMap<(String, String), Drawable>,
    resources: HashMap<String, Arc<dyn PackResources>>,
    manifests: HashMap<String, String>,
}

/// Package manager held in memory; packages can be installed and removed at runtime
#[derive(Debug, Default)]
pub struct MemoryPackageManager {
    state: RwLock<PackageState>,
}

impl MemoryPackageManager {
    /// Empty package manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a launchable activity with its platform icon
    pub fn add_activity(&self, key: ComponentKey, label: &str, icon: Option<Drawable>) {
        let activity = LauncherActivity {
            key,
            label: label.to_string(),
        };
        self.state.write().activities.push((activity, icon));
    }

    /// Register the platform icon of a shortcut
    pub fn add_shortcut_icon(&self, package: &str, id: &str, icon: Drawable) {
        self.state
            .write()
            .shortcut_icons
            .insert((package.to_string(), id.to_string()), icon);
    }

    /// Install (or replace) a package's resources
    pub fn install_package(&self, package: &str, resources: Arc<dyn PackResources>) {
        self.state
            .write()
            .resources
            .insert(package.to_string(), resources);
    }

    /// Set a package's manifest document
    pub fn set_manifest(&self, package: &str, manifest: &str) {
        self.state
            .write()
            .manifests
            .insert(package.to_string(), manifest.to_string());
    }

    /// Remove a package and its activities
    pub fn remove_package(&self, package: &str) {
        let mut state = self.state.write();
        state.resources.remove(package);
        state.manifests.remove(package);
        state
            .activities
            .retain(|(activity, _)| activity.key.component.package() != package);
    }
}

impl PackageManager for MemoryPackageManager {
    fn user_profiles(&self) -> Vec<UserHandle> {
        let users: BTreeSet<UserHandle> = self
            .state
            .read()
            .activities
            .iter()
            .map(|(activity, _)| activity.key.user)
            .collect();
        if users.is_empty() {
            vec![UserHandle::default()]
        } else {
            users.into_iter().collect()
        }
    }

    fn launchable_activities(&self, user: UserHandle) -> Vec<LauncherActivity> {
        self.state
            .read()
            .activities
            .iter()
            .filter(|(activity, _)| activity.key.user == user)
            .map(|(activity, _)| activity.clone())
            .collect()
    }

    fn activity_icon(&self, key: &ComponentKey, _density: u32) -> Option<Drawable> {
        self.state
            .read()
            .activities
            .iter()
            .find(|(activity, _)| &activity.key == key)
            .and_then(|(_, icon)| icon.clone())
    }

    fn shortcut_icon(&self, shortcut: &ShortcutInfo, _density: u32) -> Option<Drawable> {
        self.state
            .read()
            .shortcut_icons
            .get(&(shortcut.package.clone(), shortcut.id.clone()))
            .cloned()
    }

    fn resources_for(&self, package: &str) -> Option<Arc<dyn PackResources>> {
        self.state.read().resources.get(package).cloned()
    }

    fn manifest(&self, package: &str) -> Option<String> {
        self.state.read().manifests.get(package).cloned()
    }
}
