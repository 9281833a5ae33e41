//! Ordered fallback chain over the applied icon packs

use crate::config::{ConfigManager, EngineConfig};
use crate::error::{IconPackError, Result, StringError};
use crate::graphics::Drawable;
use crate::model::{ComponentKey, CustomIconEntry, ItemInfo, ShortcutInfo, URI_PACK_NAME};
use crate::pack::{
    CatalogItem, ClockDrawer, DefaultPack, IconEntry, IconPack, PackEnvironment, PackImpl, UriPack,
};
use crate::platform::{PackageManager, UriLoader};
use crate::registry::date::DateSource;
use crate::registry::events::{Notifier, PackageAction, RegistryEvent, RegistryNotification};
use crate::utils::WorkQueue;
use image::RgbaImage;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Resolves icons through custom overrides, the applied packs and the default pack
///
/// Mutations (applying packs, reloading one pack) are serialized on the
/// `loaded` map's lock and publish a fresh snapshot of the applied list.
/// Walking the applied chain only clones the current snapshot, so it never
/// waits on a mutation; it may wait on a pack's load gate.
#[derive(Debug)]
pub struct IconPackRegistry {
    env: PackEnvironment,
    config: ConfigManager,
    settings: RwLock<Arc<EngineConfig>>,
    date: Arc<dyn DateSource>,
    default_pack: Arc<DefaultPack>,
    uri_pack: Arc<UriPack>,
    load_queue: WorkQueue,
    catalog_queue: WorkQueue,
    applied: RwLock<Arc<Vec<Arc<PackImpl>>>>,
    loaded: Mutex<HashMap<String, Arc<PackImpl>>>,
    /// Installed packs referenced by overrides or previews but not applied
    transient: Mutex<HashMap<String, Arc<PackImpl>>>,
    notifier: Notifier,
    event_sender: Sender<RegistryEvent>,
    event_receiver: Mutex<Option<Receiver<RegistryEvent>>>,
}

impl IconPackRegistry {
    /// Build a registry from persisted settings and start loading the applied packs
    pub fn new(
        package_manager: Arc<dyn PackageManager>,
        uri_loader: Arc<dyn UriLoader>,
        config: ConfigManager,
        date: Arc<dyn DateSource>,
    ) -> Result<Self> {
        let registry = Self::build(package_manager, uri_loader, config, date)?;
        registry.apply_persisted_packs();
        Ok(registry)
    }

    /// Like [`IconPackRegistry::new`], subscribing before any pack starts loading
    ///
    /// The receiver sees every notice, including failures of the initial loads.
    pub fn with_subscription(
        package_manager: Arc<dyn PackageManager>,
        uri_loader: Arc<dyn UriLoader>,
        config: ConfigManager,
        date: Arc<dyn DateSource>,
    ) -> Result<(Self, Receiver<RegistryNotification>)> {
        let registry = Self::build(package_manager, uri_loader, config, date)?;
        let notifications = registry.subscribe();
        registry.apply_persisted_packs();
        Ok((registry, notifications))
    }

    fn build(
        package_manager: Arc<dyn PackageManager>,
        uri_loader: Arc<dyn UriLoader>,
        config: ConfigManager,
        date: Arc<dyn DateSource>,
    ) -> Result<Self> {
        let settings = config.load()?;
        let env = PackEnvironment::new(package_manager, settings.preferences, date.day_of_month());
        let default_pack = Arc::new(DefaultPack::new(env.clone()));
        let uri_pack = Arc::new(UriPack::new(env.clone(), uri_loader));
        let (event_sender, event_receiver) = mpsc::channel();

        Ok(Self {
            env,
            config,
            settings: RwLock::new(Arc::new(settings)),
            date,
            default_pack,
            uri_pack,
            load_queue: WorkQueue::new("iconpack-loader")?,
            catalog_queue: WorkQueue::new("iconpack-catalog")?,
            applied: RwLock::new(Arc::new(Vec::new())),
            loaded: Mutex::new(HashMap::new()),
            transient: Mutex::new(HashMap::new()),
            notifier: Notifier::default(),
            event_sender,
            event_receiver: Mutex::new(Some(event_receiver)),
        })
    }

    fn apply_persisted_packs(&self) {
        let applied = self.settings.read().applied_packs.clone();
        self.set_applied_packs(&applied);
    }

    /// Create a pack on the load queue and route its failure notice to subscribers
    fn spawn_pack(&self, package: &str) -> Arc<PackImpl> {
        let pack = PackImpl::spawn(
            package,
            self.env.clone(),
            Arc::clone(&self.default_pack),
            &self.load_queue,
        );
        let notifier = self.notifier.clone();
        let watched = Arc::downgrade(&pack);
        pack.on_load_complete(move || {
            if let Some(notice) = watched.upgrade().and_then(|pack| pack.load_failure()) {
                notifier.send(&RegistryNotification::Notice(notice));
            }
        });
        pack
    }

    fn is_installed(&self, package: &str) -> bool {
        self.env.package_manager().resources_for(package).is_some()
    }

    /// Replace the applied packs, highest priority first
    ///
    /// Packs still in `packages` keep their loaded instance; the others are
    /// dropped. Packages that are not installed are skipped.
    pub fn set_applied_packs(&self, packages: &[String]) {
        let mut loaded = self.loaded.lock();
        loaded.retain(|package, _| {
            let keep = packages.contains(package);
            if !keep {
                info!("Unloading icon pack {package}");
            }
            keep
        });

        let mut applied = Vec::with_capacity(packages.len());
        for package in packages {
            if package.is_empty() || package == URI_PACK_NAME {
                continue;
            }
            if let Some(pack) = loaded.get(package) {
                applied.push(Arc::clone(pack));
            } else if let Some(pack) = self.transient.lock().remove(package) {
                debug!("Applying already loaded icon pack {package}");
                loaded.insert(package.clone(), Arc::clone(&pack));
                applied.push(pack);
            } else if self.is_installed(package) {
                info!("Loading icon pack {package}");
                let pack = self.spawn_pack(package);
                loaded.insert(package.clone(), Arc::clone(&pack));
                applied.push(pack);
            } else {
                warn!("Icon pack {package} is not installed, skipping");
            }
        }
        *self.applied.write() = Arc::new(applied);
        drop(loaded);

        self.notifier.send(&RegistryNotification::PacksChanged);
    }

    /// Persist a new applied-pack order and apply it
    pub fn save_applied_packs(&self, packages: Vec<String>) -> Result<()> {
        {
            let mut settings = self.settings.write();
            let mut updated = EngineConfig::clone(&settings);
            updated.applied_packs = packages.clone();
            self.config.save(&updated)?;
            *settings = Arc::new(updated);
        }
        self.set_applied_packs(&packages);
        Ok(())
    }

    /// Persist (or clear, with `None`) the custom icon of one component
    pub fn set_custom_icon(&self, key: &ComponentKey, entry: Option<&CustomIconEntry>) -> Result<()> {
        {
            let mut settings = self.settings.write();
            let mut updated = EngineConfig::clone(&settings);
            updated.set_custom_icon(key, entry);
            self.config.save(&updated)?;
            *settings = Arc::new(updated);
        }
        self.notifier.send(&RegistryNotification::ReloadIcons(vec![(
            key.component.package().to_string(),
            key.user,
        )]));
        Ok(())
    }

    /// Re-read persisted settings and re-apply the pack list from them
    pub fn reload_preferences(&self) -> Result<()> {
        let settings = self.config.load()?;
        self.env.set_preferences(settings.preferences);
        let applied = settings.applied_packs.clone();
        *self.settings.write() = Arc::new(settings);
        self.set_applied_packs(&applied);
        Ok(())
    }

    /// Swap a loaded pack for a freshly loading instance
    ///
    /// Readers holding the old snapshot finish against the old tables; new
    /// lookups wait for the new instance's load.
    fn reload_pack(&self, package: &str) {
        let mut loaded = self.loaded.lock();
        if !loaded.contains_key(package) {
            return;
        }
        info!("Reloading icon pack {package}");
        let fresh = self.spawn_pack(package);
        loaded.insert(package.to_string(), Arc::clone(&fresh));

        let applied: Vec<_> = self
            .applied
            .read()
            .iter()
            .map(|pack| {
                if pack.package() == package {
                    Arc::clone(&fresh)
                } else {
                    Arc::clone(pack)
                }
            })
            .collect();
        *self.applied.write() = Arc::new(applied);
        drop(loaded);

        let notifier = self.notifier.clone();
        fresh.on_load_complete(move || notifier.send(&RegistryNotification::PacksChanged));
    }

    /// Provider for a pack identifier: `""` is the default pack
    ///
    /// Packages that are installed but not applied are loaded on first
    /// reference and kept until that package changes.
    pub fn pack_for(&self, package: &str) -> Option<IconPack> {
        match package {
            "" => Some(IconPack::Default(Arc::clone(&self.default_pack))),
            URI_PACK_NAME => Some(IconPack::Uri(Arc::clone(&self.uri_pack))),
            _ => {
                if let Some(pack) = self.loaded.lock().get(package) {
                    return Some(IconPack::Impl(Arc::clone(pack)));
                }
                let mut transient = self.transient.lock();
                if let Some(pack) = transient.get(package) {
                    return Some(IconPack::Impl(Arc::clone(pack)));
                }
                if !self.is_installed(package) {
                    return None;
                }
                debug!("Loading unapplied icon pack {package}");
                let pack = self.spawn_pack(package);
                transient.insert(package.to_string(), Arc::clone(&pack));
                Some(IconPack::Impl(pack))
            }
        }
    }

    /// Snapshot of the applied packs, highest priority first
    fn applied_snapshot(&self) -> Arc<Vec<Arc<PackImpl>>> {
        Arc::clone(&self.applied.read())
    }

    /// Package names of the applied packs in priority order
    pub fn applied_packs(&self) -> Vec<String> {
        self.applied_snapshot()
            .iter()
            .map(|pack| pack.package().to_string())
            .collect()
    }

    /// Custom override of a component, if one is persisted
    pub fn custom_icon(&self, key: &ComponentKey) -> Option<CustomIconEntry> {
        self.settings.read().custom_icon(key)
    }

    /// The always present default pack
    pub fn default_pack(&self) -> &Arc<DefaultPack> {
        &self.default_pack
    }

    /// The always present pack for user-picked images
    pub fn uri_pack(&self) -> &Arc<UriPack> {
        &self.uri_pack
    }

    /// Icon for a component
    ///
    /// Tries the custom override's pack, then each applied pack in order, then
    /// the default pack. `None` only when even the app's own icon is missing.
    pub fn get_icon(&self, key: &ComponentKey, density: u32, flatten: bool) -> Option<Drawable> {
        if let Some(custom) = self.custom_icon(key) {
            match self.pack_for(&custom.pack) {
                Some(pack) => {
                    if let Some(icon) = pack.get_icon(key, density, flatten, Some(&custom)) {
                        return Some(icon);
                    }
                    debug!("Custom icon {custom} for {key} did not resolve");
                }
                None => debug!("Custom icon pack {} for {key} is unavailable", custom.pack),
            }
        }

        for pack in self.applied_snapshot().iter() {
            if let Some(icon) = pack.get_icon(key, density, flatten, None) {
                return Some(icon);
            }
        }
        self.default_pack.get_icon(key, density, flatten, None)
    }

    /// Icon for a shortcut, from the first applied pack that has one
    pub fn get_shortcut_icon(&self, shortcut: &ShortcutInfo, density: u32) -> Option<Drawable> {
        for pack in self.applied_snapshot().iter() {
            if let Some(icon) = pack.get_shortcut_icon(shortcut, density) {
                return Some(icon);
            }
        }
        self.default_pack.get_shortcut_icon(shortcut, density)
    }

    /// Redress an already rasterized icon, e.g. to animate a clock
    pub fn new_icon(&self, icon: &RgbaImage, item: &ItemInfo, drawer: &dyn ClockDrawer) -> Option<Drawable> {
        let key = item
            .target_component
            .as_ref()
            .map(|component| ComponentKey::new(component.clone(), item.user));
        if let Some(custom) = key.as_ref().and_then(|key| self.custom_icon(key)) {
            if let Some(pack) = self.pack_for(&custom.pack) {
                if let Some(drawn) = pack.new_icon(icon, item, Some(&custom), drawer) {
                    return Some(drawn);
                }
            }
        }
        self.applied_snapshot()
            .iter()
            .find_map(|pack| pack.new_icon(icon, item, None, drawer))
    }

    /// Entry that `get_icon` would use for a component without overrides
    pub fn get_entry_for_component(&self, key: &ComponentKey) -> Option<IconEntry> {
        self.applied_snapshot()
            .iter()
            .find_map(|pack| pack.entry_for_component(key))
            .or_else(|| self.default_pack.entry_for_component(key))
    }

    /// Whether any applied pack can composite unthemed icons
    pub fn mask_supported(&self) -> bool {
        self.applied_snapshot()
            .iter()
            .any(|pack| pack.supports_masking())
    }

    /// Stream the catalog of `package` on the catalog queue
    ///
    /// `callback` receives batches on the catalog thread. Returns `false` when
    /// the pack cannot be resolved or the queue has stopped.
    pub fn get_all_icons<F, C, P>(&self, package: &str, mut callback: F, cancel: C, filter: P) -> bool
    where
        F: FnMut(Vec<CatalogItem>) + Send + 'static,
        C: Fn() -> bool + Send + 'static,
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let Some(pack) = self.pack_for(package) else {
            warn!("Cannot list icons of unknown pack {package}");
            return false;
        };
        self.catalog_queue
            .execute(move || pack.get_all_icons(&mut callback, &cancel, &filter))
    }

    /// Re-read the date and report calendar icons that went stale
    fn on_date_tick(&self) {
        let day = self.date.day_of_month();
        if !self.env.set_day_of_month(day) {
            return;
        }
        info!("Day of month changed to {day}");
        let mut stale: Vec<_> = self
            .applied_snapshot()
            .iter()
            .flat_map(|pack| pack.on_date_changed())
            .collect();
        stale.sort();
        stale.dedup();
        if !stale.is_empty() {
            self.notifier.send(&RegistryNotification::ReloadIcons(stale));
        }
    }

    /// Apply one event synchronously
    pub fn handle_event(&self, event: RegistryEvent) {
        match event {
            RegistryEvent::Package { package, action } => {
                self.default_pack.invalidate(&package);
                if self.transient.lock().remove(&package).is_some() {
                    debug!("Dropped unapplied icon pack {package} after {action:?}");
                }
                if !self.loaded.lock().contains_key(&package) {
                    debug!("Ignoring {action:?} of {package}, not an applied pack");
                    return;
                }
                match action {
                    PackageAction::Changed | PackageAction::Replaced => self.reload_pack(&package),
                    PackageAction::Added | PackageAction::Removed => {
                        if let Err(e) = self.reload_preferences() {
                            error!("Failed to reload applied packs: {e}");
                        }
                    }
                }
            }
            RegistryEvent::DateChanged | RegistryEvent::TimeTick | RegistryEvent::TimezoneChanged => {
                self.on_date_tick();
            }
            RegistryEvent::ReloadPreferences => {
                if let Err(e) = self.reload_preferences() {
                    error!("Failed to reload preferences: {e}");
                }
            }
        }
    }

    /// Channel for feeding events to the event loop
    pub fn event_sender(&self) -> Sender<RegistryEvent> {
        self.event_sender.clone()
    }

    /// Receive notifications about stale icons and load failures
    pub fn subscribe(&self) -> Receiver<RegistryNotification> {
        self.notifier.subscribe()
    }

    /// Spawn the event loop in a background thread
    ///
    /// The thread only holds a weak handle and exits once the registry is dropped.
    pub fn spawn_event_loop(registry: &Arc<Self>) -> Result<JoinHandle<()>> {
        let event_receiver = registry.event_receiver.lock().take().ok_or_else(|| {
            IconPackError::ConfigError(StringError::new("Registry event loop already running"))
        })?;
        let registry: Weak<Self> = Arc::downgrade(registry);

        let handle = std::thread::Builder::new()
            .name("iconpack-events".to_string())
            .spawn(move || {
                info!("Entering registry event loop");
                loop {
                    match event_receiver.recv_timeout(Duration::from_millis(100)) {
                        Ok(event) => {
                            let Some(registry) = registry.upgrade() else {
                                break;
                            };
                            registry.handle_event(event);
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if registry.strong_count() == 0 {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            warn!("Registry event channel disconnected. Exiting event loop.");
                            break;
                        }
                    }
                }
                info!("Registry event loop exited");
            })?;
        Ok(handle)
    }
}
