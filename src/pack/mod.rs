//! Icon packs
//!
//! Three kinds of pack can resolve icons:
//!
//! - `DefaultPack`: the installed apps' own icons, always last in the chain
//! - `PackImpl`: an installed third-party pack described by an appfilter
//! - `UriPack`: arbitrary external images chosen by the user
//!
//! `IconPack` is the closed set of these, dispatched by `match`.

pub mod catalog;
pub mod config_parser;
pub mod default_pack;
pub mod dynamic;
pub mod entry;
pub mod environment;
pub mod mask;
pub mod pack_impl;
pub mod uri_pack;
pub mod xml;

pub use catalog::CatalogItem;
pub use default_pack::DefaultPack;
pub use dynamic::{ClockDrawer, StaticClockDrawer};
pub use entry::{IconEntry, PackEntry};
pub use environment::PackEnvironment;
pub use mask::IconMask;
pub use pack_impl::PackImpl;
pub use uri_pack::UriPack;

use crate::graphics::Drawable;
use crate::model::{ComponentKey, CustomIconEntry, ItemInfo, ShortcutInfo, URI_PACK_NAME, UserHandle};
use image::RgbaImage;
use std::sync::Arc;

/// Any icon provider
#[derive(Debug, Clone)]
pub enum IconPack {
    /// App-native icons
    Default(Arc<DefaultPack>),
    /// Third-party pack
    Impl(Arc<PackImpl>),
    /// External images
    Uri(Arc<UriPack>),
}

impl IconPack {
    /// Identifier used in custom overrides: `""`, the package name, or the URI pack name
    pub fn package(&self) -> &str {
        match self {
            Self::Default(_) => "",
            Self::Impl(pack) => pack.package(),
            Self::Uri(_) => URI_PACK_NAME,
        }
    }

    /// Block until the pack's tables are loaded; immediate for packs without tables
    pub fn ensure_initial_load_complete(&self) {
        if let Self::Impl(pack) = self {
            pack.ensure_initial_load_complete();
        }
    }

    /// Exact entry for a component; never available from the URI pack
    pub fn entry_for_component(&self, key: &ComponentKey) -> Option<IconEntry> {
        match self {
            Self::Default(pack) => pack.entry_for_component(key),
            Self::Impl(pack) => pack.entry_for_component(key),
            Self::Uri(_) => None,
        }
    }

    /// Icon for a component, `None` to let the next pack try
    pub fn get_icon(
        &self,
        key: &ComponentKey,
        density: u32,
        flatten: bool,
        custom: Option<&CustomIconEntry>,
    ) -> Option<Drawable> {
        match self {
            Self::Default(pack) => pack.get_icon(key, density, flatten, custom),
            Self::Impl(pack) => pack.get_icon(key, density, flatten, custom),
            Self::Uri(pack) => pack.get_icon(custom),
        }
    }

    /// Icon for a shortcut
    pub fn get_shortcut_icon(&self, shortcut: &ShortcutInfo, density: u32) -> Option<Drawable> {
        match self {
            Self::Default(pack) => pack.get_shortcut_icon(shortcut, density),
            Self::Impl(pack) => pack.get_shortcut_icon(shortcut, density),
            Self::Uri(_) => None,
        }
    }

    /// Redress a rasterized icon; only third-party packs do anything here
    pub fn new_icon(
        &self,
        icon: &RgbaImage,
        item: &ItemInfo,
        custom: Option<&CustomIconEntry>,
        drawer: &dyn ClockDrawer,
    ) -> Option<Drawable> {
        match self {
            Self::Impl(pack) => pack.new_icon(icon, item, custom, drawer),
            Self::Default(_) | Self::Uri(_) => None,
        }
    }

    /// Whether the pack can composite unthemed icons
    pub fn supports_masking(&self) -> bool {
        match self {
            Self::Impl(pack) => pack.supports_masking(),
            Self::Default(_) | Self::Uri(_) => false,
        }
    }

    /// Enumerable entries
    pub fn entries(&self) -> Vec<IconEntry> {
        match self {
            Self::Default(pack) => pack.entries(),
            Self::Impl(pack) => pack.entries(),
            Self::Uri(_) => Vec::new(),
        }
    }

    /// Stream the catalog to `callback`
    pub fn get_all_icons(
        &self,
        callback: &mut dyn FnMut(Vec<CatalogItem>),
        cancel: &dyn Fn() -> bool,
        filter: &(dyn Fn(&str) -> bool + Sync),
    ) {
        match self {
            Self::Default(pack) => pack.get_all_icons(callback, cancel, filter),
            Self::Impl(pack) => pack.get_all_icons(callback, cancel, filter),
            Self::Uri(_) => callback(Vec::new()),
        }
    }

    /// Packages whose calendar icons must be reloaded after a date change
    pub fn on_date_changed(&self) -> Vec<(String, UserHandle)> {
        match self {
            Self::Impl(pack) => pack.on_date_changed(),
            Self::Default(_) | Self::Uri(_) => Vec::new(),
        }
    }
}
