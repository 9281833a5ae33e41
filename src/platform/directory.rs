//! Directory-backed platform implementations
//!
//! A package is a directory laid out like an unpacked resource tree:
//!
//! ```text
//! <package>/
//!   AndroidManifest.xml
//!   xml/appfilter.xml               packaged XML documents
//!   assets/appfilter.xml            raw assets
//!   drawable/app_icon.png           drawables
//!   drawable-xxhdpi/app_icon.png    density-specific drawables
//!   drawable/clock_bg/{background,foreground}.png   adaptive drawables
//!   mipmap/ic_launcher.png          launcher icons
//!   values/dimens.json              {"name": 0.8}
//! ```
//!
//! A package root holds `launcher.json` (launchable activities and shortcuts)
//! and a `packages/` directory with one subdirectory per package.

use super::{
    LauncherActivity, PackResources, PackageManager, ResourceId, ResourceKind, parse_reference,
};
use crate::error::{IconPackError, Result};
use crate::graphics::Drawable;
use crate::model::{ComponentKey, ShortcutInfo, UserHandle};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Density buckets from highest to lowest
const DENSITY_BUCKETS: [(u32, &str); 5] = [
    (640, "xxxhdpi"),
    (480, "xxhdpi"),
    (320, "xhdpi"),
    (240, "hdpi"),
    (160, "mdpi"),
];

/// Resource space read from an unpacked package directory
#[derive(Debug)]
pub struct DirectoryResources {
    root: PathBuf,
    ids: HashMap<(ResourceKind, String), ResourceId>,
    names: HashMap<ResourceId, (ResourceKind, String)>,
    dimens: HashMap<String, f32>,
    cache: Mutex<HashMap<(ResourceId, u32), Drawable>>,
}

impl DirectoryResources {
    /// Scan a package directory and assign resource ids
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(IconPackError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("package directory {} not found", root.display()),
            )));
        }

        let dimens_path = root.join("values").join("dimens.json");
        let dimens: HashMap<String, f32> = if dimens_path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&dimens_path)?)?
        } else {
            HashMap::new()
        };

        let mut by_kind: HashMap<ResourceKind, BTreeSet<String>> = HashMap::new();
        by_kind.insert(ResourceKind::Dimen, dimens.keys().cloned().collect());
        by_kind.insert(ResourceKind::Xml, scan_names(&root.join("xml"), "xml")?);
        by_kind.insert(ResourceKind::Mipmap, scan_names(&root.join("mipmap"), "png")?);

        let mut drawables = BTreeSet::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            if dir_name == "drawable" || dir_name.starts_with("drawable-") {
                drawables.extend(scan_names(&entry.path(), "png")?);
            }
        }
        by_kind.insert(ResourceKind::Drawable, drawables);

        let mut ids = HashMap::new();
        let mut names = HashMap::new();
        for (kind, kind_names) in by_kind {
            for (offset, name) in (1..).zip(kind_names) {
                let id = kind.id_base() + offset;
                ids.insert((kind, name.clone()), id);
                names.insert(id, (kind, name));
            }
        }

        debug!("Opened {} with {} resources", root.display(), ids.len());
        Ok(Self {
            root,
            ids,
            names,
            dimens,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn decode_drawable(&self, name: &str, kind: ResourceKind, density: u32) -> Result<Drawable> {
        let base = kind.type_name();
        for (bucket_density, bucket) in DENSITY_BUCKETS {
            if bucket_density > density {
                continue;
            }
            let path = self.root.join(format!("{base}-{bucket}")).join(format!("{name}.png"));
            if path.exists() {
                return decode_png(&path);
            }
        }

        let path = self.root.join(base).join(format!("{name}.png"));
        if path.exists() {
            return decode_png(&path);
        }

        let adaptive_dir = self.root.join(base).join(name);
        if adaptive_dir.is_dir() {
            let background = decode_png(&adaptive_dir.join("background.png"))?;
            let foreground = decode_png(&adaptive_dir.join("foreground.png"))?;
            return Ok(Drawable::adaptive(background, foreground));
        }

        // Fall back to any density, highest first
        for (_, bucket) in DENSITY_BUCKETS {
            let path = self.root.join(format!("{base}-{bucket}")).join(format!("{name}.png"));
            if path.exists() {
                return decode_png(&path);
            }
        }
        Err(IconPackError::not_found(kind, name))
    }
}

fn decode_png(path: &Path) -> Result<Drawable> {
    Ok(Drawable::bitmap(image::open(path)?.to_rgba8()))
}

/// Names of files with `extension`, plus subdirectories (adaptive drawables)
fn scan_names(dir: &Path, extension: &str) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if let Some(name) = path.file_name() {
                names.insert(name.to_string_lossy().into_owned());
            }
        } else if path.extension().is_some_and(|ext| ext == extension) {
            if let Some(stem) = path.file_stem() {
                names.insert(stem.to_string_lossy().into_owned());
            }
        }
    }
    Ok(names)
}

impl PackResources for DirectoryResources {
    fn identifier(&self, name: &str, kind: ResourceKind) -> Option<ResourceId> {
        self.ids.get(&(kind, name.to_string())).copied()
    }

    fn resource_name(&self, id: ResourceId) -> Option<String> {
        self.names.get(&id).map(|(_, name)| name.clone())
    }

    fn drawable(&self, id: ResourceId, density: u32) -> Result<Drawable> {
        if let Some(cached) = self.cache.lock().get(&(id, density)) {
            return Ok(cached.clone());
        }
        let (kind, name) = self
            .names
            .get(&id)
            .filter(|(kind, _)| matches!(kind, ResourceKind::Drawable | ResourceKind::Mipmap))
            .ok_or_else(|| IconPackError::id_not_found(ResourceKind::Drawable, id))?;
        let drawable = self.decode_drawable(name, *kind, density)?;
        self.cache.lock().insert((id, density), drawable.clone());
        Ok(drawable)
    }

    fn dimension(&self, id: ResourceId) -> Result<f32> {
        self.names
            .get(&id)
            .filter(|(kind, _)| *kind == ResourceKind::Dimen)
            .and_then(|(_, name)| self.dimens.get(name).copied())
            .ok_or_else(|| IconPackError::id_not_found(ResourceKind::Dimen, id))
    }

    fn xml(&self, id: ResourceId) -> Result<String> {
        let (_, name) = self
            .names
            .get(&id)
            .filter(|(kind, _)| *kind == ResourceKind::Xml)
            .ok_or_else(|| IconPackError::id_not_found(ResourceKind::Xml, id))?;
        Ok(std::fs::read_to_string(
            self.root.join("xml").join(format!("{name}.xml")),
        )?)
    }

    fn asset(&self, path: &str) -> Result<String> {
        if path.split('/').any(|segment| segment == "..") {
            return Err(IconPackError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("asset path {path} escapes the package"),
            )));
        }
        Ok(std::fs::read_to_string(self.root.join("assets").join(path))?)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LauncherManifest {
    activities: Vec<ActivityRecord>,
    shortcuts: Vec<ShortcutRecord>,
}

#[derive(Debug, Deserialize)]
struct ActivityRecord {
    component: String,
    #[serde(default)]
    user: u32,
    #[serde(default)]
    label: String,
    /// `@mipmap/name` or `@drawable/name` inside the activity's package
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShortcutRecord {
    package: String,
    id: String,
    icon: String,
}

/// Package manager over a directory of unpacked packages
#[derive(Debug)]
pub struct DirectoryPackageManager {
    packages_dir: PathBuf,
    manifest: LauncherManifest,
    resources: Mutex<HashMap<String, Arc<DirectoryResources>>>,
}

impl DirectoryPackageManager {
    /// Open a package root
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let launcher_path = root.join("launcher.json");
        let manifest = if launcher_path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&launcher_path)?)?
        } else {
            warn!("{} not found, no launchable activities", launcher_path.display());
            LauncherManifest::default()
        };
        Ok(Self {
            packages_dir: root.join("packages"),
            manifest,
            resources: Mutex::new(HashMap::new()),
        })
    }

    /// Forget cached resources of a package so the next lookup rescans it
    pub fn invalidate(&self, package: &str) {
        self.resources.lock().remove(package);
    }

    fn package_resources(&self, package: &str) -> Option<Arc<DirectoryResources>> {
        if let Some(resources) = self.resources.lock().get(package) {
            return Some(Arc::clone(resources));
        }
        let dir = self.packages_dir.join(package);
        if !dir.is_dir() {
            return None;
        }
        match DirectoryResources::open(dir) {
            Ok(resources) => {
                let resources = Arc::new(resources);
                self.resources
                    .lock()
                    .insert(package.to_string(), Arc::clone(&resources));
                Some(resources)
            }
            Err(e) => {
                warn!("Failed to open resources of {package}: {e}");
                None
            }
        }
    }

    fn icon_reference(&self, package: &str, reference: &str, density: u32) -> Option<Drawable> {
        let (kind, name) = parse_reference(reference)?;
        let resources = self.package_resources(package)?;
        let id = resources.identifier(name, kind)?;
        match resources.drawable(id, density) {
            Ok(drawable) => Some(drawable),
            Err(e) => {
                warn!("Failed to decode {reference} in {package}: {e}");
                None
            }
        }
    }
}

impl PackageManager for DirectoryPackageManager {
    fn user_profiles(&self) -> Vec<UserHandle> {
        let users: BTreeSet<u32> = self.manifest.activities.iter().map(|a| a.user).collect();
        if users.is_empty() {
            vec![UserHandle::default()]
        } else {
            users.into_iter().map(UserHandle).collect()
        }
    }

    fn launchable_activities(&self, user: UserHandle) -> Vec<LauncherActivity> {
        self.manifest
            .activities
            .iter()
            .filter(|record| record.user == user.0)
            .filter_map(|record| {
                let Ok(component) = record.component.parse() else {
                    warn!("Skipping invalid component {}", record.component);
                    return None;
                };
                Some(LauncherActivity {
                    key: ComponentKey::new(component, user),
                    label: record.label.clone(),
                })
            })
            .collect()
    }

    fn activity_icon(&self, key: &ComponentKey, density: u32) -> Option<Drawable> {
        let record = self.manifest.activities.iter().find(|record| {
            record.user == key.user.0
                && record
                    .component
                    .parse::<crate::model::ComponentName>()
                    .is_ok_and(|component| component == key.component)
        })?;
        let reference = record.icon.as_deref()?;
        self.icon_reference(key.component.package(), reference, density)
    }

    fn shortcut_icon(&self, shortcut: &ShortcutInfo, density: u32) -> Option<Drawable> {
        let record = self
            .manifest
            .shortcuts
            .iter()
            .find(|record| record.package == shortcut.package && record.id == shortcut.id)?;
        self.icon_reference(&shortcut.package, &record.icon, density)
    }

    fn resources_for(&self, package: &str) -> Option<Arc<dyn PackResources>> {
        self.package_resources(package)
            .map(|resources| resources as Arc<dyn PackResources>)
    }

    fn manifest(&self, package: &str) -> Option<String> {
        std::fs::read_to_string(self.packages_dir.join(package).join("AndroidManifest.xml")).ok()
    }
}
