//! Image model and compositing primitives
//!
//! Platform resources decode into `Drawable` trees; the mask compositor and the
//! adaptive wrapper work on `image::RgbaImage` buffers with the blend modes in
//! `compose`.

pub mod adaptive;
pub mod compose;
pub mod drawable;

pub use compose::BlendMode;
pub use drawable::{ClockMetadata, Drawable};
