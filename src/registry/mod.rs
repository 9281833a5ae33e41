//! Icon pack registry
//!
//! Owns the applied packs in priority order and resolves icons through them.
//! Package and date events arrive over a channel and are applied on the
//! registry's event loop thread.

pub mod date;
pub mod events;
pub mod icon_pack_registry;

pub use date::{DateSource, SystemDate};
pub use events::{PackageAction, RegistryEvent, RegistryNotification};
pub use icon_pack_registry::IconPackRegistry;
