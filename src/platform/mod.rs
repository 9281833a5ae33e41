//! Seams to the host platform
//!
//! The engine never talks to a package manager or decodes files on its own
//! terms; it goes through these traits:
//!
//! - `PackResources`: the resource space of one installed package
//! - `PackageManager`: installed apps, their icons and their resources
//! - `UriLoader`: decoding of arbitrary user-picked images
//!
//! In-memory implementations (`memory`) back previews and tests; the
//! directory-backed ones (`directory`) back the command line tool.

pub mod directory;
pub mod memory;

use crate::error::{IconPackError, Result};
use crate::graphics::Drawable;
use crate::model::{ComponentKey, ShortcutInfo, UserHandle};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use directory::{DirectoryPackageManager, DirectoryResources};
pub use memory::{MemoryPackageManager, MemoryResources};

/// Numeric resource id inside one package, 0 is never valid
pub type ResourceId = u32;

/// Resource type namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Drawable images
    Drawable,
    /// Launcher icons
    Mipmap,
    /// Compiled XML documents
    Xml,
    /// Dimension values
    Dimen,
}

impl ResourceKind {
    /// Base of the id range assigned to this kind
    pub const fn id_base(self) -> ResourceId {
        match self {
            Self::Drawable => 0x7f02_0000,
            Self::Dimen => 0x7f07_0000,
            Self::Xml => 0x7f0c_0000,
            Self::Mipmap => 0x7f0d_0000,
        }
    }

    /// Parse the type segment of an `@type/name` reference
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "drawable" => Some(Self::Drawable),
            "mipmap" => Some(Self::Mipmap),
            "xml" => Some(Self::Xml),
            "dimen" => Some(Self::Dimen),
            _ => None,
        }
    }

    /// Type segment used in references and directory names
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Drawable => "drawable",
            Self::Mipmap => "mipmap",
            Self::Xml => "xml",
            Self::Dimen => "dimen",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Parse an `@type/name` resource reference
pub fn parse_reference(value: &str) -> Option<(ResourceKind, &str)> {
    let (kind, name) = value.strip_prefix('@')?.split_once('/')?;
    Some((ResourceKind::from_type_name(kind)?, name))
}

/// Resource space of one installed package
pub trait PackResources: Send + Sync + fmt::Debug {
    /// Id of a named resource
    fn identifier(&self, name: &str, kind: ResourceKind) -> Option<ResourceId>;

    /// Entry name of a resource id
    fn resource_name(&self, id: ResourceId) -> Option<String>;

    /// Decode a drawable for a screen density
    fn drawable(&self, id: ResourceId, density: u32) -> Result<Drawable>;

    /// Dimension value
    fn dimension(&self, id: ResourceId) -> Result<f32>;

    /// Packaged XML document
    fn xml(&self, id: ResourceId) -> Result<String>;

    /// Raw asset by path
    fn asset(&self, path: &str) -> Result<String>;

    /// Drawable looked up by name
    fn drawable_named(&self, name: &str, density: u32) -> Result<Drawable> {
        let id = self
            .identifier(name, ResourceKind::Drawable)
            .ok_or_else(|| IconPackError::not_found(ResourceKind::Drawable, name))?;
        self.drawable(id, density)
    }
}

/// A launchable activity as enumerated by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherActivity {
    /// Addressing key
    pub key: ComponentKey,
    /// User-visible label
    pub label: String,
}

/// Installed packages and their launchable activities
pub trait PackageManager: Send + Sync + fmt::Debug {
    /// All user profiles on the device
    fn user_profiles(&self) -> Vec<UserHandle>;

    /// Launchable activities of one user
    fn launchable_activities(&self, user: UserHandle) -> Vec<LauncherActivity>;

    /// The platform's own icon for an activity
    fn activity_icon(&self, key: &ComponentKey, density: u32) -> Option<Drawable>;

    /// The platform's own icon for a shortcut
    fn shortcut_icon(&self, shortcut: &ShortcutInfo, density: u32) -> Option<Drawable>;

    /// Resource space of an installed package
    fn resources_for(&self, package: &str) -> Option<Arc<dyn PackResources>>;

    /// Manifest document of an installed package
    fn manifest(&self, package: &str) -> Option<String>;

    /// Whether the package has launchable activities for `user`
    fn has_activities(&self, package: &str, user: UserHandle) -> bool {
        self.launchable_activities(user)
            .iter()
            .any(|activity| activity.key.component.package() == package)
    }
}

/// Decoder for user-picked external images
pub trait UriLoader: Send + Sync + fmt::Debug {
    /// Decode the image behind `uri`
    fn load(&self, uri: &str) -> Result<Drawable>;
}

/// Loads `file://` URIs and plain paths with the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct FileUriLoader;

impl UriLoader for FileUriLoader {
    fn load(&self, uri: &str) -> Result<Drawable> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        let image = image::open(Path::new(path))?;
        Ok(Drawable::bitmap(image.to_rgba8()))
    }
}
