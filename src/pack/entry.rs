//! Addressable icons inside a pack
//!
//! `IconEntry` is what catalog listings and exact component lookups hand out.
//! Each kind knows how to materialize its image and how to turn itself into a
//! persisted `CustomIconEntry`.

use crate::error::{IconPackError, Result};
use crate::graphics::Drawable;
use crate::model::{ComponentKey, CustomIconEntry, MASK_ARG, URI_PACK_NAME};
use crate::pack::default_pack::DefaultPack;
use crate::pack::pack_impl::PackImpl;
use crate::pack::uri_pack::UriPack;
use crate::platform::{PackResources, ResourceId, ResourceKind};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A named drawable inside a third-party pack
///
/// The resource id and availability are resolved on first use and cached.
pub struct PackEntry {
    package: Arc<str>,
    resources: Arc<dyn PackResources>,
    drawable_name: String,
    id: OnceLock<Option<ResourceId>>,
    available: OnceLock<bool>,
}

impl PackEntry {
    /// Entry for a drawable name, id resolved lazily
    pub fn new(
        package: Arc<str>,
        resources: Arc<dyn PackResources>,
        drawable_name: impl Into<String>,
    ) -> Self {
        Self {
            package,
            resources,
            drawable_name: drawable_name.into(),
            id: OnceLock::new(),
            available: OnceLock::new(),
        }
    }

    /// Entry whose id is already known
    pub fn with_id(
        package: Arc<str>,
        resources: Arc<dyn PackResources>,
        drawable_name: impl Into<String>,
        id: ResourceId,
    ) -> Self {
        let entry = Self::new(package, resources, drawable_name);
        let _ = entry.id.set(Some(id));
        entry
    }

    /// Raw drawable name
    pub fn drawable_name(&self) -> &str {
        &self.drawable_name
    }

    /// Resolved drawable id, `None` if the name is unknown to the pack
    pub fn drawable_id(&self) -> Option<ResourceId> {
        *self.id.get_or_init(|| {
            self.resources
                .identifier(&self.drawable_name, ResourceKind::Drawable)
        })
    }

    /// Whether the drawable still resolves
    pub fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            self.drawable_id()
                .is_some_and(|id| self.resources.resource_name(id).is_some())
        })
    }

    /// Human readable name derived from the drawable name
    pub fn display_name(&self) -> String {
        display_name_for(&self.drawable_name)
    }

    /// `name in package`, for diagnostics
    pub fn debug_name(&self) -> String {
        format!("{} in {}", self.drawable_name, self.package)
    }

    /// Decode the drawable for a density
    ///
    /// Fails with `EntryUnavailable` when called on an entry that is not
    /// available; callers are expected to filter first.
    pub fn drawable_for_density(&self, density: u32) -> Result<Drawable> {
        match self.drawable_id() {
            Some(id) if self.is_available() => self.resources.drawable(id, density),
            _ => Err(IconPackError::EntryUnavailable(self.debug_name())),
        }
    }

    /// Persisted form: `package|name|`
    pub fn to_custom_entry(&self) -> CustomIconEntry {
        CustomIconEntry::new(
            self.package.as_ref(),
            Some(self.drawable_name.clone()),
            None,
        )
    }
}

impl fmt::Debug for PackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackEntry")
            .field("package", &self.package)
            .field("drawable_name", &self.drawable_name)
            .finish_non_exhaustive()
    }
}

/// `some__icon_name` -> `Some Icon Name`
pub fn display_name_for(raw: &str) -> String {
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mask-only entry: the default icon composited through a pack's layers
#[derive(Debug, Clone)]
pub struct MaskEntry {
    pack: Arc<PackImpl>,
    key: ComponentKey,
    identifier: String,
}

impl MaskEntry {
    pub(crate) fn new(pack: Arc<PackImpl>, key: ComponentKey) -> Self {
        let identifier = key.to_string();
        Self {
            pack,
            key,
            identifier,
        }
    }
}

/// Entry for an installed app's own icon
#[derive(Debug, Clone)]
pub struct DefaultEntry {
    pack: Arc<DefaultPack>,
    key: ComponentKey,
    label: String,
    identifier: String,
}

impl DefaultEntry {
    pub(crate) fn new(pack: Arc<DefaultPack>, key: ComponentKey, label: String) -> Self {
        let identifier = key.to_string();
        Self {
            pack,
            key,
            label,
            identifier,
        }
    }
}

/// Entry for a user-picked external image
#[derive(Debug, Clone)]
pub struct UriEntry {
    pack: Arc<UriPack>,
    uri: String,
    arg: Option<String>,
}

impl UriEntry {
    pub(crate) fn new(pack: Arc<UriPack>, uri: String, arg: Option<String>) -> Self {
        Self { pack, uri, arg }
    }
}

/// One addressable icon
#[derive(Debug, Clone)]
pub enum IconEntry {
    /// Drawable resident in a third-party pack
    Pack(Arc<PackEntry>),
    /// An app's own icon
    Default(DefaultEntry),
    /// Default icon composited through a pack's mask
    Mask(MaskEntry),
    /// External image
    Uri(UriEntry),
}

impl IconEntry {
    /// Stable raw name used for sorting and deduplication
    pub fn identifier_name(&self) -> &str {
        match self {
            Self::Pack(entry) => entry.drawable_name(),
            Self::Default(entry) => &entry.identifier,
            Self::Mask(entry) => &entry.identifier,
            Self::Uri(entry) => &entry.uri,
        }
    }

    /// Name shown to users
    pub fn display_name(&self) -> String {
        match self {
            Self::Pack(entry) => entry.display_name(),
            Self::Default(entry) => entry.label.clone(),
            Self::Mask(entry) => entry.identifier.clone(),
            Self::Uri(entry) => entry.uri.clone(),
        }
    }

    /// Whether the image can be materialized
    pub fn is_available(&self) -> bool {
        match self {
            Self::Pack(entry) => entry.is_available(),
            Self::Default(_) | Self::Mask(_) => true,
            Self::Uri(entry) => entry.pack.load(&entry.uri).is_ok(),
        }
    }

    /// Materialize the image for a density
    pub fn drawable_for_density(&self, density: u32) -> Result<Drawable> {
        match self {
            Self::Pack(entry) => entry.drawable_for_density(density),
            Self::Default(entry) => entry
                .pack
                .get_icon(&entry.key, density, false, None)
                .ok_or_else(|| IconPackError::EntryUnavailable(entry.identifier.clone())),
            Self::Mask(entry) => entry.pack.mask_icon(&entry.key, density),
            Self::Uri(entry) => entry.pack.load(&entry.uri),
        }
    }

    /// Persisted reference to this entry
    pub fn to_custom_entry(&self) -> CustomIconEntry {
        match self {
            Self::Pack(entry) => entry.to_custom_entry(),
            Self::Default(entry) => CustomIconEntry::new("", Some(entry.identifier.clone()), None),
            Self::Mask(entry) => CustomIconEntry::new(
                entry.pack.package(),
                Some(entry.identifier.clone()),
                Some(MASK_ARG.to_string()),
            ),
            Self::Uri(entry) => {
                CustomIconEntry::new(URI_PACK_NAME, Some(entry.uri.clone()), entry.arg.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryResources;
    use image::{Rgba, RgbaImage};

    fn resources() -> Arc<dyn PackResources> {
        Arc::new(
            MemoryResources::new()
                .with_drawable("app_icon", Drawable::bitmap(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]))))
                .with_dangling_drawable("gone"),
        )
    }

    #[test]
    fn display_names_are_title_cased() {
        assert_eq!(display_name_for("google_chrome"), "Google Chrome");
        assert_eq!(display_name_for("__weird___name_"), "Weird Name");
        assert_eq!(display_name_for("x"), "X");
    }

    #[test]
    fn available_entry_decodes() {
        let entry = PackEntry::new("com.pack".into(), resources(), "app_icon");
        assert!(entry.is_available());
        assert!(entry.drawable_for_density(480).is_ok());
        assert_eq!(entry.to_custom_entry().to_string(), "com.pack|app_icon|");
    }

    #[test]
    fn unavailable_entry_refuses_to_decode() {
        let missing = PackEntry::new("com.pack".into(), resources(), "missing");
        assert!(!missing.is_available());
        assert!(matches!(
            missing.drawable_for_density(480),
            Err(IconPackError::EntryUnavailable(name)) if name == "missing in com.pack"
        ));

        let dangling = PackEntry::new("com.pack".into(), resources(), "gone");
        assert!(dangling.drawable_id().is_some());
        assert!(!dangling.is_available());
    }
}
