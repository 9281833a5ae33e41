//! Pack resolving user-picked external images

use crate::error::Result;
use crate::graphics::{Drawable, adaptive};
use crate::model::{CustomIconEntry, URI_PACK_NAME};
use crate::pack::entry::{IconEntry, UriEntry};
use crate::pack::environment::PackEnvironment;
use crate::platform::UriLoader;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Decodes images by URI and caches them by URI string
///
/// Nothing is enumerable; icons are only reachable through a custom override.
#[derive(Debug)]
pub struct UriPack {
    env: PackEnvironment,
    loader: Arc<dyn UriLoader>,
    cache: Mutex<HashMap<String, Drawable>>,
}

impl UriPack {
    /// Pack decoding through `loader`
    pub fn new(env: PackEnvironment, loader: Arc<dyn UriLoader>) -> Self {
        Self {
            env,
            loader,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Decoded image for `uri`, cached after the first success
    pub fn load(&self, uri: &str) -> Result<Drawable> {
        if let Some(drawable) = self.cache.lock().get(uri) {
            return Ok(drawable.clone());
        }
        // Decode outside the lock; concurrent first loads may both decode
        let drawable = self.loader.load(uri)?;
        self.cache
            .lock()
            .entry(uri.to_string())
            .or_insert_with(|| drawable.clone());
        Ok(drawable)
    }

    /// Icon referenced by a URI-pack override
    pub fn get_icon(&self, custom: Option<&CustomIconEntry>) -> Option<Drawable> {
        let custom = custom.filter(|entry| entry.pack == URI_PACK_NAME)?;
        let uri = custom.icon.as_deref()?;
        match self.load(uri) {
            Ok(drawable) => {
                if self.env.preferences().adaptify_icon_packs {
                    Some(adaptive::generate(&drawable, self.env.preferences().icon_bitmap_size))
                } else {
                    Some(drawable)
                }
            }
            Err(e) => {
                warn!("Failed to load icon {uri}: {e}");
                None
            }
        }
    }

    /// Entry for a URI, e.g. after a user picked a file
    pub fn create_entry(self: &Arc<Self>, uri: impl Into<String>, arg: Option<String>) -> IconEntry {
        IconEntry::Uri(UriEntry::new(Arc::clone(self), uri.into(), arg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IconPreferences;
    use crate::error::IconPackError;
    use crate::platform::MemoryPackageManager;
    use image::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingLoader {
        loads: AtomicUsize,
    }

    impl UriLoader for CountingLoader {
        fn load(&self, uri: &str) -> Result<Drawable> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if uri.starts_with("content://ok") {
                Ok(Drawable::Color(Rgba([1, 2, 3, 255])))
            } else {
                Err(IconPackError::EntryUnavailable(uri.to_string()))
            }
        }
    }

    fn pack() -> (Arc<CountingLoader>, Arc<UriPack>) {
        let loader = Arc::new(CountingLoader::default());
        let env = PackEnvironment::new(
            Arc::new(MemoryPackageManager::new()),
            IconPreferences::default(),
            1,
        );
        (loader.clone(), Arc::new(UriPack::new(env, loader)))
    }

    #[test]
    fn decodes_once_per_uri() {
        let (loader, pack) = pack();
        let custom = CustomIconEntry::parse("lawnchairUriPack|content://ok/1|");
        assert!(pack.get_icon(Some(&custom)).is_some());
        assert!(pack.get_icon(Some(&custom)).is_some());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ignores_other_packs_and_failures() {
        let (_, pack) = pack();
        assert!(pack.get_icon(None).is_none());
        assert!(pack.get_icon(Some(&CustomIconEntry::parse("com.pack|content://ok|"))).is_none());
        assert!(pack.get_icon(Some(&CustomIconEntry::parse("lawnchairUriPack|content://bad|"))).is_none());
    }

    #[test]
    fn entries_check_availability() {
        let (_, pack) = pack();
        let good = pack.create_entry("content://ok/2", Some("flag".into()));
        assert!(good.is_available());
        assert_eq!(good.to_custom_entry().to_string(), "lawnchairUriPack|content://ok/2|flag");
        assert!(!pack.create_entry("content://bad", None).is_available());
    }
}
