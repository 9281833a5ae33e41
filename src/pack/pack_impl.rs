//! Third-party icon pack backed by an appfilter document
//!
//! A `PackImpl` parses its documents exactly once, on the load queue, and
//! publishes the resulting tables through a `LoadGate`. Every lookup first
//! waits for the gate, so callers always see complete tables. A pack whose
//! documents cannot be read still opens the gate, with empty tables, and
//! remembers a user-facing notice.

use crate::error::{IconPackError, Result, StringError, get_user_friendly_error};
use crate::graphics::{Drawable, adaptive};
use crate::model::{ComponentKey, CustomIconEntry, ItemInfo, ItemType, ShortcutInfo, UserHandle};
use crate::pack::catalog::{Batcher, CatalogItem, list_by_index};
use crate::pack::config_parser::{DRAWABLE_CATALOG, PackTables, parse_pack, read_document};
use crate::pack::default_pack::DefaultPack;
use crate::pack::dynamic::{self, ClockDrawer};
use crate::pack::entry::{IconEntry, MaskEntry, PackEntry};
use crate::pack::environment::PackEnvironment;
use crate::pack::xml::TagReader;
use crate::platform::{MemoryResources, PackResources, ResourceId, ResourceKind};
use crate::utils::{LoadGate, WorkQueue};
use image::RgbaImage;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// An installed third-party icon pack
pub struct PackImpl {
    package: Arc<str>,
    resources: Arc<dyn PackResources>,
    env: PackEnvironment,
    default_pack: Arc<DefaultPack>,
    tables: LoadGate<PackTables>,
    failure: Mutex<Option<String>>,
}

impl fmt::Debug for PackImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackImpl")
            .field("package", &self.package)
            .field("loaded", &self.tables.is_complete())
            .finish_non_exhaustive()
    }
}

impl PackImpl {
    fn new(package: &str, env: PackEnvironment, default_pack: Arc<DefaultPack>) -> Self {
        let resources = env.package_manager().resources_for(package);
        let installed = resources.is_some();
        let resources: Arc<dyn PackResources> =
            resources.unwrap_or_else(|| Arc::new(MemoryResources::new()));
        let pack = Self {
            package: Arc::from(package),
            resources,
            env,
            default_pack,
            tables: LoadGate::new(),
            failure: Mutex::new(None),
        };
        if !installed {
            pack.fail(IconPackError::PackLoadFailed {
                package: package.to_string(),
                source: StringError::new("package is not installed"),
            });
        }
        pack
    }

    /// Record a load failure and open the gate with empty tables
    fn fail(&self, e: IconPackError) {
        error!("{e}");
        *self.failure.lock() = Some(get_user_friendly_error(&e));
        self.tables.complete(PackTables::default());
    }

    /// Create a pack and queue its load on `queue`
    ///
    /// If the queue has stopped the load runs on the calling thread.
    pub fn spawn(
        package: &str,
        env: PackEnvironment,
        default_pack: Arc<DefaultPack>,
        queue: &WorkQueue,
    ) -> Arc<Self> {
        let pack = Arc::new(Self::new(package, env, default_pack));
        if !pack.tables.is_complete() {
            let loader = Arc::clone(&pack);
            if !queue.execute(move || loader.load()) {
                warn!("Load queue {} stopped, loading {package} inline", queue.name());
                pack.load();
            }
        }
        pack
    }

    /// Create a pack and load it on the calling thread, e.g. for previews
    pub fn load_now(package: &str, env: PackEnvironment, default_pack: Arc<DefaultPack>) -> Arc<Self> {
        let pack = Arc::new(Self::new(package, env, default_pack));
        if !pack.tables.is_complete() {
            pack.load();
        }
        pack
    }

    /// Parse the documents and open the gate, whatever the outcome
    fn load(&self) {
        let started = Instant::now();
        let parsed = catch_unwind(AssertUnwindSafe(|| parse_pack(&self.package, &self.resources)))
            .unwrap_or_else(|payload| {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(IconPackError::PackLoadFailed {
                    package: self.package.to_string(),
                    source: StringError::new(format!("parser panicked: {reason}")),
                })
            });
        match parsed {
            Ok(tables) => {
                info!(
                    "Completed parsing pack {} in {}ms ({} components)",
                    self.package,
                    started.elapsed().as_millis(),
                    tables.components.len()
                );
                if !self.tables.complete(tables) {
                    debug!("Pack {} was already loaded", self.package);
                }
            }
            Err(e @ IconPackError::PackLoadFailed { .. }) => self.fail(e),
            Err(other) => self.fail(IconPackError::PackLoadFailed {
                package: self.package.to_string(),
                source: Box::new(other),
            }),
        }
    }

    /// Package name of the pack
    pub fn package(&self) -> &str {
        &self.package
    }

    /// User-facing notice if loading failed
    pub fn load_failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// Whether the load has finished
    pub fn is_loaded(&self) -> bool {
        self.tables.is_complete()
    }

    /// Block until the tables are loaded
    pub fn ensure_initial_load_complete(&self) -> Arc<PackTables> {
        self.tables.wait()
    }

    /// Run `listener` once loaded, immediately if already loaded
    pub fn on_load_complete(&self, listener: impl FnOnce() + Send + 'static) {
        self.tables.on_complete(move |_| listener());
    }

    fn drawable_id(&self, name: &str) -> Option<ResourceId> {
        self.resources.identifier(name, ResourceKind::Drawable)
    }

    /// Named drawable for a density, `None` when unknown or undecodable
    pub fn drawable(&self, name: &str, density: u32) -> Option<Drawable> {
        dynamic::resource_drawable(self.resources.as_ref(), &self.package, name, density)
    }

    /// Entry for a resource name such as `com.pack:drawable/name`,
    /// `@drawable/name` or a bare drawable name
    pub fn create_entry(&self, resource_name: &str) -> Option<IconEntry> {
        let reference = resource_name
            .split_once(':')
            .map_or(resource_name, |(_, rest)| rest)
            .trim_start_matches('@');
        let (kind, name) = match reference.split_once('/') {
            Some((kind, name)) => (ResourceKind::from_type_name(kind)?, name),
            None => (ResourceKind::Drawable, reference),
        };
        let id = self.resources.identifier(name, kind)?;
        let simple_name = self.resources.resource_name(id)?;
        Some(IconEntry::Pack(Arc::new(PackEntry::with_id(
            Arc::clone(&self.package),
            Arc::clone(&self.resources),
            simple_name,
            id,
        ))))
    }

    fn adaptify(&self, drawable: Drawable) -> Drawable {
        let preferences = self.env.preferences();
        if preferences.adaptify_icon_packs {
            adaptive::generate(&drawable, preferences.icon_bitmap_size)
        } else {
            drawable
        }
    }

    /// Attach clock or dynamic behaviour to a resolved drawable
    fn decorate(&self, tables: &PackTables, id: ResourceId, drawable: Drawable, density: u32) -> Drawable {
        if let Some(metadata) = tables.clocks.get(&id) {
            dynamic::clock_from_metadata(drawable, *metadata)
        } else if let Some(metadata) = tables.dynamic_drawables.get(&id) {
            dynamic::dynamic_icon(drawable, metadata, self.resources.as_ref(), &self.package, density)
        } else {
            drawable
        }
    }

    /// Drawable id bound to a component, honoring overrides and calendars
    fn resolve_id(
        &self,
        tables: &PackTables,
        key: &ComponentKey,
        custom: Option<&CustomIconEntry>,
        with_calendar: bool,
    ) -> Option<ResourceId> {
        if let Some(custom) = custom.filter(|c| !c.is_mask()) {
            if let Some(icon) = custom.icon.as_deref() {
                return self.drawable_id(icon);
            }
        }
        if with_calendar {
            if let Some(prefix) = tables.calendars.get(&key.component) {
                return self.drawable_id(&format!("{prefix}{}", self.env.day_of_month()));
            }
        }
        tables
            .components
            .get(&key.component)
            .and_then(|entry| entry.drawable_id())
    }

    /// Icon for a component
    ///
    /// Resolves an override's icon, then a calendar binding, then the direct
    /// binding. Without a hit, the default icon is composited through the
    /// mask when masking is enabled or the override asks for this pack's mask.
    pub fn get_icon(
        &self,
        key: &ComponentKey,
        density: u32,
        flatten: bool,
        custom: Option<&CustomIconEntry>,
    ) -> Option<Drawable> {
        let tables = self.ensure_initial_load_complete();

        if let Some(id) = self.resolve_id(&tables, key, custom, true) {
            match self.resources.drawable(id, density) {
                Ok(drawable) => {
                    let drawable = self.decorate(&tables, id, drawable, density);
                    return Some(self.adaptify(drawable));
                }
                Err(e) => error!("Can't get drawable for {} (0x{id:08x}): {e}", key.component),
            }
        }

        let forced = custom.is_some_and(|c| {
            c.pack == self.package.as_ref() && (c.icon.is_none() || c.is_mask())
        });
        if (self.env.preferences().icon_pack_masking || forced) && tables.mask.has_mask() {
            let base = self.default_pack.get_icon(key, density, flatten, None)?;
            return Some(self.composite(&tables, &base, key, density));
        }
        None
    }

    fn composite(&self, tables: &PackTables, base: &Drawable, key: &ComponentKey, density: u32) -> Drawable {
        let size = self.env.preferences().icon_bitmap_size;
        let icon = tables.mask.get_icon(base, Some(&key.component), size, density);
        self.adaptify(icon)
    }

    /// Icon of a mask entry
    pub(crate) fn mask_icon(&self, key: &ComponentKey, density: u32) -> Result<Drawable> {
        let tables = self.ensure_initial_load_complete();
        let base = self
            .default_pack
            .get_icon(key, density, false, None)
            .ok_or_else(|| IconPackError::EntryUnavailable(key.to_string()))?;
        Ok(self.composite(&tables, &base, key, density))
    }

    /// Icon for a shortcut; only masking applies
    pub fn get_shortcut_icon(&self, shortcut: &ShortcutInfo, density: u32) -> Option<Drawable> {
        let tables = self.ensure_initial_load_complete();
        if !(self.env.preferences().icon_pack_masking && tables.mask.has_mask()) {
            return None;
        }
        let base = self.default_pack.get_shortcut_icon(shortcut, density)?;
        let size = self.env.preferences().icon_bitmap_size;
        let icon = tables.mask.get_icon(&base, shortcut.activity.as_ref(), size, density);
        Some(self.adaptify(icon))
    }

    /// Redress an already rasterized application icon
    ///
    /// Clock bindings are redrawn through `drawer`; other bound items keep the
    /// raster as is. `None` means the pack has nothing to say about the item.
    pub fn new_icon(
        &self,
        icon: &RgbaImage,
        item: &ItemInfo,
        custom: Option<&CustomIconEntry>,
        drawer: &dyn ClockDrawer,
    ) -> Option<Drawable> {
        let tables = self.ensure_initial_load_complete();
        if item.item_type != ItemType::Application {
            return None;
        }
        let component = item.target_component.as_ref()?;
        let key = ComponentKey::new(component.clone(), item.user);
        let id = self.resolve_id(&tables, &key, custom, false)?;
        let density = self.env.preferences().icon_dpi;

        if let Some(metadata) = tables.clocks.get(&id) {
            match self.resources.drawable(id, density) {
                Ok(face) => return Some(drawer.draw_icon(icon, &face, *metadata)),
                Err(e) => warn!("Clock face 0x{id:08x} of {} unusable: {e}", self.package),
            }
        } else if let Some(metadata) = tables.dynamic_drawables.get(&id) {
            if let Some(drawn) = dynamic::draw_dynamic_icon(
                icon,
                metadata,
                self.resources.as_ref(),
                &self.package,
                drawer,
                density,
            ) {
                return Some(drawn);
            }
        }
        Some(Drawable::bitmap(icon.clone()))
    }

    /// Whether the pack declares usable mask layers
    pub fn supports_masking(&self) -> bool {
        self.ensure_initial_load_complete().mask.has_mask()
    }

    /// Direct binding for a component, if available
    pub fn entry_for_component(&self, key: &ComponentKey) -> Option<IconEntry> {
        let tables = self.ensure_initial_load_complete();
        let entry = tables.components.get(&key.component)?;
        entry
            .is_available()
            .then(|| IconEntry::Pack(Arc::clone(entry)))
    }

    /// Mask-only entry for a component when the pack supports masking
    pub fn mask_entry_for_component(self: &Arc<Self>, key: &ComponentKey) -> Option<IconEntry> {
        self.supports_masking()
            .then(|| IconEntry::Mask(MaskEntry::new(Arc::clone(self), key.clone())))
    }

    /// All directly bound entries
    pub fn entries(&self) -> Vec<IconEntry> {
        self.ensure_initial_load_complete()
            .components
            .values()
            .map(|entry| IconEntry::Pack(Arc::clone(entry)))
            .collect()
    }

    /// Stream the pack's catalog
    ///
    /// Reads the drawable catalog document when present and delivers its
    /// categories and items in document order. If it yields no usable item the
    /// bound entries are listed under alphabetic index headers instead.
    /// Cancellation is checked between tags.
    pub fn get_all_icons(
        &self,
        callback: &mut dyn FnMut(Vec<CatalogItem>),
        cancel: &dyn Fn() -> bool,
        filter: &(dyn Fn(&str) -> bool + Sync),
    ) {
        let mut batcher = Batcher::new(callback);
        let started = Instant::now();
        match self.stream_catalog(&mut batcher, cancel, filter) {
            Ok(CatalogOutcome::Found | CatalogOutcome::Cancelled) => return,
            Ok(CatalogOutcome::Empty) => {}
            Err(e) => warn!("Failed to read catalog of {}: {}", self.package, e),
        }
        debug!(
            "Catalog of {} empty after {}ms, listing bound entries",
            self.package,
            started.elapsed().as_millis()
        );
        list_by_index(self.entries(), &mut batcher, cancel, filter);
    }

    fn stream_catalog(
        &self,
        batcher: &mut Batcher<'_>,
        cancel: &dyn Fn() -> bool,
        filter: &(dyn Fn(&str) -> bool + Sync),
    ) -> Result<CatalogOutcome> {
        let Some(document) = read_document(self.resources.as_ref(), DRAWABLE_CATALOG) else {
            return Ok(CatalogOutcome::Empty);
        };
        let mut reader = TagReader::new(&document);
        let mut seen = HashSet::new();
        let mut found = false;
        while let Some(tag) = reader.next_start()? {
            if cancel() {
                return Ok(CatalogOutcome::Cancelled);
            }
            match (tag.name(), tag.attr("title"), tag.attr("drawable")) {
                ("category", Some(title), _) => batcher.push(CatalogItem::Category(title.to_string())),
                ("item", _, Some(name)) if filter(name) && !seen.contains(name) => {
                    if let Some(id) = self.drawable_id(name) {
                        seen.insert(name.to_string());
                        batcher.push(CatalogItem::Icon(IconEntry::Pack(Arc::new(PackEntry::with_id(
                            Arc::clone(&self.package),
                            Arc::clone(&self.resources),
                            name,
                            id,
                        )))));
                        found = true;
                    }
                }
                _ => {}
            }
        }
        batcher.flush(true);
        Ok(if found {
            CatalogOutcome::Found
        } else {
            CatalogOutcome::Empty
        })
    }

    /// Components whose calendar icons changed with the date, per user
    ///
    /// Only packages with launchable activities for the user are reported.
    pub fn on_date_changed(&self) -> Vec<(String, UserHandle)> {
        let Some(tables) = self.tables.get() else {
            return Vec::new();
        };
        let packages: BTreeSet<&str> = tables
            .calendars
            .keys()
            .map(|component| component.package())
            .collect();
        let package_manager = self.env.package_manager();
        package_manager
            .user_profiles()
            .into_iter()
            .flat_map(|user| {
                packages
                    .iter()
                    .filter(move |package| package_manager.has_activities(package, user))
                    .map(move |package| ((*package).to_string(), user))
            })
            .collect()
    }
}

enum CatalogOutcome {
    Found,
    Empty,
    Cancelled,
}
