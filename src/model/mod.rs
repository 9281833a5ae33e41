//! Identity and addressing types
//!
//! - `ComponentKey`: (component, user) pair addressing one launchable target
//! - `CustomIconEntry`: persisted `pack|icon|arg` reference to a chosen icon

pub mod component;
pub mod custom_entry;

pub use component::{ComponentKey, ComponentName, ItemInfo, ItemType, ShortcutInfo, UserHandle};
pub use custom_entry::{CustomIconEntry, MASK_ARG, URI_PACK_NAME};
