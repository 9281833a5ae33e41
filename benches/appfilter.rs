#![allow(clippy::unwrap_used)]
//! Benchmarks for appfilter parsing and component lookup

#![allow(missing_docs)]

use criterion::{Criterion, criterion_group, criterion_main};
use iconpack_engine::config::IconPreferences;
use iconpack_engine::graphics::Drawable;
use iconpack_engine::model::{ComponentKey, ComponentName, UserHandle};
use iconpack_engine::pack::config_parser::parse_pack;
use iconpack_engine::pack::{DefaultPack, PackEnvironment, PackImpl};
use iconpack_engine::platform::{MemoryPackageManager, MemoryResources, PackResources};
use image::Rgba;
use std::fmt::Write;
use std::hint::black_box;
use std::sync::Arc;

const COMPONENTS: usize = 2000;

/// Pack with one binding per component plus calendar and mask declarations
fn create_large_pack() -> MemoryResources {
    let mut appfilter = String::from(r#"<?xml version="1.0" encoding="utf-8"?><resources>"#);
    appfilter.push_str(r#"<iconback img1="back1" img2="back2"/><iconmask img1="mask1"/><scale factor="0.8"/>"#);
    let mut resources = MemoryResources::new()
        .with_drawable("back1", Drawable::Color(Rgba([0, 0, 0, 255])))
        .with_drawable("back2", Drawable::Color(Rgba([40, 40, 40, 255])))
        .with_drawable("mask1", Drawable::Color(Rgba([0, 0, 0, 128])));
    for i in 0..COMPONENTS {
        write!(
            appfilter,
            r#"<item component="ComponentInfo{{com.app{i}/com.app{i}.Main}}" drawable="icon_{i}"/>"#
        )
        .unwrap();
        resources = resources.with_drawable(&format!("icon_{i}"), Drawable::Color(Rgba([0, 0, 255, 255])));
    }
    appfilter.push_str(r#"<calendar component="ComponentInfo{com.cal/com.cal.Main}" prefix="cal_"/>"#);
    appfilter.push_str("</resources>");
    resources.with_xml("appfilter", &appfilter)
}

fn bench_parse(c: &mut Criterion) {
    let resources: Arc<dyn PackResources> = Arc::new(create_large_pack());

    c.bench_function("appfilter_parse", |b| {
        b.iter(|| {
            let tables = parse_pack(black_box("com.pack"), &resources).unwrap();
            black_box(tables);
        });
    });
}

fn bench_lookup(c: &mut Criterion) {
    let pm = Arc::new(MemoryPackageManager::new());
    pm.install_package("com.pack", Arc::new(create_large_pack()));
    let env = PackEnvironment::new(pm, IconPreferences::default(), 1);
    let default_pack = Arc::new(DefaultPack::new(env.clone()));
    let pack = PackImpl::load_now("com.pack", env, default_pack);
    let key = ComponentKey::new(ComponentName::new("com.app1000", "com.app1000.Main"), UserHandle(0));

    c.bench_function("appfilter_lookup", |b| {
        b.iter(|| {
            let icon = pack.get_icon(black_box(&key), 480, true, None);
            black_box(icon);
        });
    });
}

criterion_group!(benches, bench_parse, bench_lookup);
criterion_main!(benches);
