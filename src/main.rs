//! `iconpack-resolve` - resolve one component's icon through the applied packs
//!
//! ```text
//! iconpack-resolve <package-root> <package/class[#user]> [out.png]
//! ```
//!
//! Reads persisted settings from `$ICONPACK_HOME/iconpack/config.json`, builds a
//! registry over the unpacked packages under `<package-root>`, and writes the
//! rasterized icon as PNG (default `icon.png`).

use anyhow::{Context, Result, bail};
use iconpack_engine::{
    ComponentKey, IconPackRegistry,
    config::ConfigManager,
    platform::{DirectoryPackageManager, FileUriLoader},
    registry::SystemDate,
    utils,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(root), Some(component)) = (args.next(), args.next()) else {
        bail!("usage: iconpack-resolve <package-root> <package/class[#user]> [out.png]");
    };
    let output = PathBuf::from(args.next().unwrap_or_else(|| "icon.png".to_string()));

    let config = ConfigManager::new(ConfigManager::default_path());
    if let Some(dir) = config.path().parent() {
        utils::init_logging(&dir.join("logs")).context("Failed to initialize logging system")?;
    }

    let key: ComponentKey = component
        .parse()
        .with_context(|| format!("Invalid component {component}"))?;
    let package_manager =
        DirectoryPackageManager::open(&root).with_context(|| format!("Failed to open package root {root}"))?;

    let (registry, notices) = IconPackRegistry::with_subscription(
        Arc::new(package_manager),
        Arc::new(FileUriLoader),
        config.clone(),
        Arc::new(SystemDate),
    )
    .context("Failed to create icon pack registry")?;

    let settings = config.load().context("Failed to load configuration")?;
    let size = settings.preferences.icon_bitmap_size;
    let density = settings.preferences.icon_dpi;

    let Some(icon) = registry.get_icon(&key, density, false) else {
        bail!("No icon found for {key}");
    };
    for notice in notices.try_iter() {
        warn!("{notice:?}");
    }
    if let Some(entry) = registry.get_entry_for_component(&key) {
        info!("Resolved {key} to {}", entry.display_name());
    }

    icon.rasterize(size)
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{}", output.display());
    Ok(())
}
