//! Integration tests for icon resolution through the registry
//!
//! Covers the fallback chain, custom overrides, calendar substitution, masked
//! compositing, catalog listing and concurrent first loads, using the in-memory
//! platform implementations.

use crossbeam_channel::unbounded;
use iconpack_engine::{
    ComponentKey, ComponentName, CustomIconEntry, IconPackRegistry, UserHandle,
    config::{ConfigManager, EngineConfig},
    error::Result,
    graphics::Drawable,
    pack::{CatalogItem, DefaultPack, PackEnvironment, PackImpl},
    platform::{FileUriLoader, MemoryPackageManager, MemoryResources, PackResources, ResourceId, ResourceKind},
    registry::{DateSource, PackageAction, RegistryEvent, RegistryNotification},
};
use image::Rgba;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug)]
struct FixedDate(AtomicU32);

impl DateSource for FixedDate {
    fn day_of_month(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

fn app() -> ComponentKey {
    ComponentKey::new(ComponentName::new("com.app", "com.app.Main"), UserHandle(0))
}

fn binding(drawable: &str) -> String {
    format!(
        r#"<resources><item component="ComponentInfo{{com.app/com.app.Main}}" drawable="{drawable}"/></resources>"#
    )
}

struct Fixture {
    dir: tempfile::TempDir,
    pm: Arc<MemoryPackageManager>,
    date: Arc<FixedDate>,
    registry: IconPackRegistry,
}

/// Registry whose persisted settings apply `applied`, in order
fn fixture(applied: &[&str], install: impl FnOnce(&MemoryPackageManager)) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let pm = Arc::new(MemoryPackageManager::new());
    pm.add_activity(app(), "App", Some(Drawable::Color(RED)));
    install(&pm);

    let config = ConfigManager::new(dir.path().join("iconpack").join("config.json"));
    config
        .save(&EngineConfig {
            applied_packs: applied.iter().map(ToString::to_string).collect(),
            ..EngineConfig::default()
        })
        .unwrap();

    let date = Arc::new(FixedDate(AtomicU32::new(17)));
    let registry = IconPackRegistry::new(pm.clone(), Arc::new(FileUriLoader), config, date.clone()).unwrap();
    Fixture {
        dir,
        pm,
        date,
        registry,
    }
}

#[test]
fn first_applied_pack_with_a_binding_wins() {
    let f = fixture(&["com.a", "com.b"], |pm| {
        pm.install_package("com.a", Arc::new(MemoryResources::new().with_xml("appfilter", "<resources/>")));
        pm.install_package(
            "com.b",
            Arc::new(
                MemoryResources::new()
                    .with_xml("appfilter", &binding("b_icon"))
                    .with_drawable("b_icon", Drawable::Color(GREEN)),
            ),
        );
    });

    assert_eq!(f.registry.applied_packs(), vec!["com.a".to_string(), "com.b".to_string()]);
    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(GREEN)));

    let entry = f.registry.get_entry_for_component(&app()).unwrap();
    assert_eq!(entry.identifier_name(), "b_icon");
    assert_eq!(entry.to_custom_entry().to_string(), "com.b|b_icon|");
}

#[test]
fn custom_override_beats_applied_packs() {
    let f = fixture(&["com.b"], |pm| {
        pm.install_package(
            "com.b",
            Arc::new(
                MemoryResources::new()
                    .with_xml("appfilter", &binding("b_icon"))
                    .with_drawable("b_icon", Drawable::Color(GREEN)),
            ),
        );
        pm.install_package(
            "com.z",
            Arc::new(
                MemoryResources::new()
                    .with_xml("appfilter", &binding("z_icon"))
                    .with_drawable("z_icon", Drawable::Color(BLUE)),
            ),
        );
    });

    // Legacy slash format still resolves
    f.registry
        .set_custom_icon(&app(), Some(&CustomIconEntry::parse("com.z/z_icon")))
        .unwrap();
    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(BLUE)));
    assert_eq!(f.registry.custom_icon(&app()).unwrap().to_string(), "com.z|z_icon|");
}

#[test]
fn override_to_uninstalled_pack_falls_through() {
    let f = fixture(&[], |_| {});
    f.registry
        .set_custom_icon(&app(), Some(&CustomIconEntry::parse("com.gone|icon|")))
        .unwrap();
    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(RED)));
}

#[test]
fn calendar_follows_the_date() {
    let f = fixture(&["com.cal"], |pm| {
        pm.install_package(
            "com.cal",
            Arc::new(
                MemoryResources::new()
                    .with_xml(
                        "appfilter",
                        r#"<resources><calendar component="ComponentInfo{com.app/com.app.Main}" prefix="cal_"/></resources>"#,
                    )
                    .with_drawable("cal_17", Drawable::Color(GREEN))
                    .with_drawable("cal_18", Drawable::Color(BLUE)),
            ),
        );
    });
    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(GREEN)));

    let notifications = f.registry.subscribe();
    f.date.0.store(18, Ordering::SeqCst);
    f.registry.handle_event(RegistryEvent::DateChanged);
    assert_eq!(
        notifications.try_recv().unwrap(),
        RegistryNotification::ReloadIcons(vec![("com.app".to_string(), UserHandle(0))])
    );
    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(BLUE)));
}

#[test]
fn unbound_component_is_masked_through_back_and_mask() {
    let f = fixture(&["com.theme"], |pm| {
        pm.install_package(
            "com.theme",
            Arc::new(
                MemoryResources::new()
                    .with_xml(
                        "appfilter",
                        r#"<resources><iconback img1="back1"/><iconmask img1="mask1"/></resources>"#,
                    )
                    .with_drawable("back1", Drawable::Color(BLUE))
                    .with_drawable("mask1", Drawable::Color(BLACK)),
            ),
        );
    });
    assert!(f.registry.mask_supported());

    let icon = f.registry.get_icon(&app(), 480, true).unwrap();
    let raster = icon.bitmap_image().unwrap();
    let (w, h) = raster.dimensions();
    // The opaque mask erases the base entirely and the back fills the hole
    assert_eq!(raster.get_pixel(w / 2, h / 2), &BLUE);
}

#[test]
fn masking_preference_off_falls_back_to_app_icon() {
    let f = fixture(&["com.theme"], |pm| {
        pm.install_package(
            "com.theme",
            Arc::new(
                MemoryResources::new()
                    .with_xml("appfilter", r#"<resources><iconback img1="back1"/></resources>"#)
                    .with_drawable("back1", Drawable::Color(BLUE)),
            ),
        );
    });
    let config = ConfigManager::new(f.dir.path().join("iconpack").join("config.json"));
    let mut settings = config.load().unwrap();
    settings.preferences.icon_pack_masking = false;
    config.save(&settings).unwrap();
    f.registry.handle_event(RegistryEvent::ReloadPreferences);

    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(RED)));

    // A mask override forces compositing anyway
    f.registry
        .set_custom_icon(&app(), Some(&CustomIconEntry::parse("com.theme||mask")))
        .unwrap();
    let forced = f.registry.get_icon(&app(), 480, true).unwrap();
    assert_ne!(forced, Drawable::Color(RED));
}

#[test]
fn catalog_collapses_duplicate_items() {
    let f = fixture(&[], |pm| {
        pm.install_package(
            "com.cat",
            Arc::new(
                MemoryResources::new()
                    .with_xml("appfilter", "<resources/>")
                    .with_xml(
                        "drawable",
                        r#"<resources>
                            <category title="Apps"/>
                            <item drawable="camera"/>
                            <item drawable="camera"/>
                            <item drawable="missing"/>
                            <item drawable="clock"/>
                        </resources>"#,
                    )
                    .with_drawable("camera", Drawable::Color(RED))
                    .with_drawable("clock", Drawable::Color(GREEN)),
            ),
        );
    });

    let (sender, receiver) = unbounded();
    assert!(f.registry.get_all_icons(
        "com.cat",
        move |batch| sender.send(batch).unwrap(),
        || false,
        |_| true,
    ));
    let items: Vec<CatalogItem> = receiver.iter().flatten().collect();
    let names: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            CatalogItem::Icon(entry) => Some(entry.identifier_name().to_string()),
            CatalogItem::Category(_) => None,
        })
        .collect();
    assert_eq!(names, vec!["camera".to_string(), "clock".to_string()]);
    assert!(matches!(&items[0], CatalogItem::Category(title) if title == "Apps"));
}

#[test]
fn package_removal_reloads_applied_list() {
    let f = fixture(&["com.b"], |pm| {
        pm.install_package(
            "com.b",
            Arc::new(
                MemoryResources::new()
                    .with_xml("appfilter", &binding("b_icon"))
                    .with_drawable("b_icon", Drawable::Color(GREEN)),
            ),
        );
    });
    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(GREEN)));

    f.pm.remove_package("com.b");
    f.registry.handle_event(RegistryEvent::Package {
        package: "com.b".to_string(),
        action: PackageAction::Removed,
    });
    assert!(f.registry.applied_packs().is_empty());
    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(RED)));
}

#[test]
fn broken_pack_reports_a_notice() {
    let f = fixture(&[], |pm| {
        pm.install_package("com.broken", Arc::new(MemoryResources::new()));
    });
    let notifications = f.registry.subscribe();
    f.registry.set_applied_packs(&["com.broken".to_string()]);

    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(RED)));
    // The notice is sent from the loader thread once the gate has opened
    let notice = (0..3).find_map(|_| match notifications.recv_timeout(Duration::from_secs(5)) {
        Ok(RegistryNotification::Notice(notice)) => Some(notice),
        _ => None,
    });
    assert!(notice.unwrap().contains("com.broken"));
}

/// Resources counting how often the appfilter is read
#[derive(Debug)]
struct CountingResources {
    inner: MemoryResources,
    xml_reads: AtomicUsize,
}

impl PackResources for CountingResources {
    fn identifier(&self, name: &str, kind: ResourceKind) -> Option<ResourceId> {
        self.inner.identifier(name, kind)
    }

    fn resource_name(&self, id: ResourceId) -> Option<String> {
        self.inner.resource_name(id)
    }

    fn drawable(&self, id: ResourceId, density: u32) -> Result<Drawable> {
        self.inner.drawable(id, density)
    }

    fn dimension(&self, id: ResourceId) -> Result<f32> {
        self.inner.dimension(id)
    }

    fn xml(&self, id: ResourceId) -> Result<String> {
        self.xml_reads.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which concurrent callers wait on the gate
        thread::sleep(Duration::from_millis(20));
        self.inner.xml(id)
    }

    fn asset(&self, path: &str) -> Result<String> {
        self.inner.asset(path)
    }
}

#[test]
fn concurrent_callers_share_one_load() {
    let pm = Arc::new(MemoryPackageManager::new());
    pm.add_activity(app(), "App", Some(Drawable::Color(RED)));
    let resources = Arc::new(CountingResources {
        inner: MemoryResources::new()
            .with_xml("appfilter", &binding("icon"))
            .with_drawable("icon", Drawable::Color(GREEN)),
        xml_reads: AtomicUsize::new(0),
    });
    pm.install_package("com.pack", resources.clone());

    let env = PackEnvironment::new(pm, Default::default(), 1);
    let default_pack = Arc::new(DefaultPack::new(env.clone()));
    let queue = iconpack_engine::utils::WorkQueue::new("test-loader").unwrap();
    let pack = PackImpl::spawn("com.pack", env, default_pack, &queue);

    let (sender, receiver) = unbounded();
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pack = Arc::clone(&pack);
            let sender = sender.clone();
            thread::spawn(move || {
                let tables = pack.ensure_initial_load_complete();
                sender.send(tables.components.len()).unwrap();
                sender.send(usize::from(pack.get_icon(&app(), 480, true, None).is_some())).unwrap();
            })
        })
        .collect();
    drop(sender);
    for worker in workers {
        worker.join().unwrap();
    }

    let results: Vec<usize> = receiver.iter().collect();
    assert_eq!(results.len(), 16);
    assert!(results.iter().all(|&n| n == 1));
    // The pack declares no drawable catalog, so only the appfilter is read
    assert_eq!(resources.xml_reads.load(Ordering::SeqCst), 1);
    assert!(pack.is_loaded());
}

#[test]
fn unapplied_override_pack_is_loaded_once() {
    let f = fixture(&[], |_| {});
    let resources = Arc::new(CountingResources {
        inner: MemoryResources::new()
            .with_xml("appfilter", &binding("z_icon"))
            .with_drawable("z", Drawable::Color(BLUE)),
        xml_reads: AtomicUsize::new(0),
    });
    f.pm.install_package("com.z", resources.clone());
    f.registry
        .set_custom_icon(&app(), Some(&CustomIconEntry::parse("com.z|z|")))
        .unwrap();

    for _ in 0..5 {
        assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(BLUE)));
    }
    assert_eq!(resources.xml_reads.load(Ordering::SeqCst), 1);

    // An update drops the cached instance and the next lookup reloads it
    f.registry.handle_event(RegistryEvent::Package {
        package: "com.z".to_string(),
        action: PackageAction::Replaced,
    });
    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(BLUE)));
    assert_eq!(resources.xml_reads.load(Ordering::SeqCst), 2);

    // Applying it reuses the instance the override already loaded
    f.registry.set_applied_packs(&["com.z".to_string()]);
    assert_eq!(f.registry.get_icon(&app(), 480, true), Some(Drawable::Color(BLUE)));
    assert_eq!(resources.xml_reads.load(Ordering::SeqCst), 2);
}

#[test]
fn unbounded_scale_factor_composites_at_default_scale() {
    let f = fixture(&["com.theme"], |pm| {
        pm.install_package(
            "com.theme",
            Arc::new(
                MemoryResources::new()
                    .with_xml(
                        "appfilter",
                        r#"<resources><scale factor="-100000000"/><iconback img1="b"/></resources>"#,
                    )
                    .with_drawable("b", Drawable::Color(BLUE)),
            ),
        );
    });
    let icon = f.registry.get_icon(&app(), 480, true).unwrap();
    let raster = icon.bitmap_image().unwrap();
    let (w, h) = raster.dimensions();
    // Falls back to scale 1: base and back cover a canvas twice the icon size
    assert_eq!((w, h), (2 * 192, 2 * 192));
    assert_eq!(raster.get_pixel(w / 2, h / 2), &RED);
}

#[test]
fn subscription_sees_initial_load_failures() {
    let dir = tempfile::tempdir().unwrap();
    let pm = Arc::new(MemoryPackageManager::new());
    pm.add_activity(app(), "App", Some(Drawable::Color(RED)));
    pm.install_package("com.broken", Arc::new(MemoryResources::new()));
    let config = ConfigManager::new(dir.path().join("config.json"));
    config
        .save(&EngineConfig {
            applied_packs: vec!["com.broken".to_string()],
            ..EngineConfig::default()
        })
        .unwrap();

    let (registry, notifications) = IconPackRegistry::with_subscription(
        pm,
        Arc::new(FileUriLoader),
        config,
        Arc::new(FixedDate(AtomicU32::new(1))),
    )
    .unwrap();
    assert_eq!(registry.applied_packs(), vec!["com.broken".to_string()]);
    let notice = (0..3).find_map(|_| match notifications.recv_timeout(Duration::from_secs(5)) {
        Ok(RegistryNotification::Notice(notice)) => Some(notice),
        _ => None,
    });
    assert!(notice.unwrap().contains("com.broken"));
}
