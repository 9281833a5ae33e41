//! The pack made of the installed apps' own icons
//!
//! Nothing is parsed up front; entries come straight from the package
//! manager's activity list. Icons prefer the app's declared round icon and are
//! always wrapped into adaptive icons unless a flat drawable is requested.

use crate::graphics::{Drawable, adaptive};
use crate::model::{ComponentKey, CustomIconEntry, ShortcutInfo};
use crate::pack::catalog::{Batcher, CatalogItem, list_by_index};
use crate::pack::entry::{DefaultEntry, IconEntry};
use crate::pack::environment::PackEnvironment;
use crate::pack::xml::TagReader;
use crate::platform::parse_reference;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Round icon references declared in one manifest
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct RoundIcons {
    application: Option<String>,
    activities: HashMap<String, String>,
}

impl RoundIcons {
    fn parse(package: &str, manifest: &str) -> Self {
        let mut icons = Self::default();
        let mut reader = TagReader::new(manifest);
        loop {
            match reader.next_start() {
                Ok(Some(tag)) => {
                    let Some(round_icon) = tag.attr("roundIcon") else {
                        continue;
                    };
                    match tag.name() {
                        "application" => {
                            icons.application.get_or_insert_with(|| round_icon.to_string());
                        }
                        "activity" | "activity-alias" => {
                            if let Some(name) = tag.attr("name") {
                                icons
                                    .activities
                                    .entry(qualify_class(package, name))
                                    .or_insert_with(|| round_icon.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("Stopped reading manifest of {package}: {e}");
                    break;
                }
            }
        }
        icons
    }

    /// Activity-level value, else the application-level one
    fn for_class(&self, class: &str) -> Option<&str> {
        self.activities
            .get(class)
            .or(self.application.as_ref())
            .map(String::as_str)
    }
}

/// Fully qualify a manifest class name
fn qualify_class(package: &str, name: &str) -> String {
    if name.starts_with('.') {
        format!("{package}{name}")
    } else if name.contains('.') {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

/// Pack backed by the installed apps themselves
#[derive(Debug)]
pub struct DefaultPack {
    env: PackEnvironment,
    round_icons: Mutex<HashMap<String, Arc<RoundIcons>>>,
}

impl DefaultPack {
    /// Default pack over `env`'s package manager
    pub fn new(env: PackEnvironment) -> Self {
        Self {
            env,
            round_icons: Mutex::new(HashMap::new()),
        }
    }

    /// Forget cached manifest data of a package
    pub fn invalidate(&self, package: &str) {
        self.round_icons.lock().remove(package);
    }

    fn round_icons(&self, package: &str) -> Arc<RoundIcons> {
        if let Some(icons) = self.round_icons.lock().get(package) {
            return Arc::clone(icons);
        }
        let icons = Arc::new(
            self.env
                .package_manager()
                .manifest(package)
                .map(|manifest| RoundIcons::parse(package, &manifest))
                .unwrap_or_default(),
        );
        self.round_icons
            .lock()
            .insert(package.to_string(), Arc::clone(&icons));
        icons
    }

    fn round_icon(&self, key: &ComponentKey, density: u32) -> Option<Drawable> {
        let package = key.component.package();
        let icons = self.round_icons(package);
        let reference = icons.for_class(key.component.class())?;
        let (kind, name) = parse_reference(reference)?;
        let resources = self.env.package_manager().resources_for(package)?;
        let id = resources.identifier(name, kind)?;
        match resources.drawable(id, density) {
            Ok(drawable) => Some(drawable),
            Err(e) => {
                debug!("Round icon {reference} of {package} unusable: {e}");
                None
            }
        }
    }

    fn wrap(&self, icon: Drawable, flatten: bool) -> Drawable {
        if flatten {
            icon
        } else {
            adaptive::generate(&icon, self.env.preferences().icon_bitmap_size)
        }
    }

    /// The app's own icon
    ///
    /// A default-pack override names another component whose icon is used
    /// instead.
    pub fn get_icon(
        &self,
        key: &ComponentKey,
        density: u32,
        flatten: bool,
        custom: Option<&CustomIconEntry>,
    ) -> Option<Drawable> {
        let target = custom
            .and_then(|entry| entry.icon.as_deref())
            .and_then(|icon| icon.parse::<ComponentKey>().ok());
        let key = target.as_ref().unwrap_or(key);
        let icon = self
            .round_icon(key, density)
            .or_else(|| self.env.package_manager().activity_icon(key, density))?;
        Some(self.wrap(icon, flatten))
    }

    /// A shortcut's own icon
    pub fn get_shortcut_icon(&self, shortcut: &ShortcutInfo, density: u32) -> Option<Drawable> {
        let icon = self
            .env
            .package_manager()
            .shortcut_icon(shortcut, density)?;
        Some(self.wrap(icon, false))
    }

    /// One entry per launchable activity of every user
    pub fn entries(self: &Arc<Self>) -> Vec<IconEntry> {
        let package_manager = self.env.package_manager();
        package_manager
            .user_profiles()
            .into_iter()
            .flat_map(|user| package_manager.launchable_activities(user))
            .map(|activity| {
                IconEntry::Default(DefaultEntry::new(
                    Arc::clone(self),
                    activity.key,
                    activity.label,
                ))
            })
            .collect()
    }

    /// Entry for a launchable component
    pub fn entry_for_component(self: &Arc<Self>, key: &ComponentKey) -> Option<IconEntry> {
        self.env
            .package_manager()
            .launchable_activities(key.user)
            .into_iter()
            .find(|activity| activity.key == *key)
            .map(|activity| {
                IconEntry::Default(DefaultEntry::new(
                    Arc::clone(self),
                    activity.key,
                    activity.label,
                ))
            })
    }

    /// Stream all entries grouped by alphabetic index
    pub fn get_all_icons(
        self: &Arc<Self>,
        callback: &mut dyn FnMut(Vec<CatalogItem>),
        cancel: &dyn Fn() -> bool,
        filter: &(dyn Fn(&str) -> bool + Sync),
    ) {
        let mut batcher = Batcher::new(callback);
        list_by_index(self.entries(), &mut batcher, cancel, filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IconPreferences;
    use crate::model::{ComponentName, UserHandle};
    use crate::platform::{MemoryPackageManager, MemoryResources};
    use image::{Rgba, RgbaImage};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

    fn key(class: &str) -> ComponentKey {
        ComponentKey::new(ComponentName::new("com.app", class), UserHandle(0))
    }

    fn setup() -> (Arc<MemoryPackageManager>, Arc<DefaultPack>) {
        let pm = Arc::new(MemoryPackageManager::new());
        pm.add_activity(key(".Main"), "App", Some(Drawable::bitmap(RgbaImage::from_pixel(4, 4, RED))));
        pm.add_activity(key(".Second"), "Second", Some(Drawable::bitmap(RgbaImage::from_pixel(4, 4, RED))));
        let env = PackEnvironment::new(pm.clone(), IconPreferences::default(), 1);
        (pm, Arc::new(DefaultPack::new(env)))
    }

    #[test]
    fn manifest_scan_prefers_activity_level_icons() {
        let icons = RoundIcons::parse(
            "com.app",
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
                <application android:roundIcon="@mipmap/app_round">
                    <activity android:name=".Main" android:roundIcon="@mipmap/main_round"/>
                    <activity android:name=".Main" android:roundIcon="@mipmap/ignored"/>
                    <activity-alias android:name="Alias" android:roundIcon="@mipmap/alias_round"/>
                </application>
            </manifest>"#,
        );
        assert_eq!(icons.for_class("com.app.Main"), Some("@mipmap/main_round"));
        assert_eq!(icons.for_class("com.app.Alias"), Some("@mipmap/alias_round"));
        assert_eq!(icons.for_class("com.app.Other"), Some("@mipmap/app_round"));
    }

    #[test]
    fn uses_round_icon_when_declared() {
        let (pm, pack) = setup();
        pm.install_package(
            "com.app",
            Arc::new(MemoryResources::new().with_mipmap("round", Drawable::Color(GREEN))),
        );
        pm.set_manifest(
            "com.app",
            r#"<manifest><application roundIcon="@mipmap/round"/></manifest>"#,
        );
        let icon = pack.get_icon(&key(".Main"), 480, true, None).unwrap();
        assert!(matches!(icon, Drawable::Color(c) if c == GREEN));
    }

    #[test]
    fn wraps_platform_icon_adaptively() {
        let (_pm, pack) = setup();
        let icon = pack.get_icon(&key(".Main"), 480, false, None).unwrap();
        assert!(icon.is_adaptive());
        let flat = pack.get_icon(&key(".Main"), 480, true, None).unwrap();
        assert!(!flat.is_adaptive());
        assert!(pack.get_icon(&key(".Missing"), 480, false, None).is_none());
    }

    #[test]
    fn entries_cover_all_activities() {
        let (_pm, pack) = setup();
        assert_eq!(pack.entries().len(), 2);
        let entry = pack.entry_for_component(&key(".Main")).unwrap();
        assert_eq!(entry.display_name(), "App");
        assert_eq!(entry.to_custom_entry().to_string(), "|com.app/com.app.Main#0|");
        assert!(entry.drawable_for_density(480).is_ok());
    }

    #[test]
    fn custom_entry_redirects_to_other_component() {
        let (pm, pack) = setup();
        pm.add_activity(key(".Green"), "Green", Some(Drawable::Color(GREEN)));
        let custom = CustomIconEntry::parse("|com.app/com.app.Green#0|");
        let icon = pack.get_icon(&key(".Main"), 480, true, Some(&custom)).unwrap();
        assert!(matches!(icon, Drawable::Color(c) if c == GREEN));
    }
}
