//! `iconpack-engine` - icon pack resolution and compositing for launchers
//!
//! Given an application component, decides which icon image to show: a user's
//! custom choice, an entry from one of the applied third-party icon packs, or
//! the app's own icon, optionally composited through a pack's mask/back/upon
//! layers. Calendar and clock icons are resolved against the current date.
//!
//! # Architecture
//!
//! - `pack::config_parser`: streams a pack's appfilter document into lookup tables
//! - `pack`: the three pack variants (`DefaultPack`, `PackImpl`, `UriPack`) behind
//!   one `IconPack` enum
//! - `pack::mask`: the compositing engine for masked icons
//! - `pack::dynamic`: clock and dynamic drawable rendering
//! - `registry`: the ordered fallback chain and its event loop
//! - `platform`: seams to the host (resources, installed apps, URI decoding)

// Module declarations
pub mod config;
pub mod error;
pub mod graphics;
pub mod model;
pub mod pack;
pub mod platform;
pub mod registry;
pub mod utils;

// Re-export commonly used types
pub use error::{IconPackError, Result};
pub use model::{ComponentKey, ComponentName, CustomIconEntry, UserHandle};
pub use registry::IconPackRegistry;
