//! Drawable image model
//!
//! A `Drawable` is what a pack hands back for an icon. It stays a tree (adaptive
//! layers, rotating clock hands) until a caller asks for pixels via
//! `Drawable::rasterize`.

use crate::graphics::adaptive::EXTRA_INSET_FRACTION;
use crate::graphics::compose::{self, BlendMode};
use image::{Rgba, RgbaImage, imageops::FilterType};
use std::sync::Arc;

/// Layer indices and resting time for an animated clock icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockMetadata {
    /// Layer holding the hour hand, -1 when absent
    pub hour_layer: i32,
    /// Layer holding the minute hand, -1 when absent
    pub minute_layer: i32,
    /// Layer holding the second hand, -1 when absent
    pub second_layer: i32,
    /// Hour shown by the unrotated artwork
    pub default_hour: i32,
    /// Minute shown by the unrotated artwork
    pub default_minute: i32,
    /// Second shown by the unrotated artwork
    pub default_second: i32,
}

impl ClockMetadata {
    /// Metadata with the given layer indices and a zero default time
    pub fn with_layers(hour: i32, minute: i32, second: i32) -> Self {
        Self {
            hour_layer: hour,
            minute_layer: minute,
            second_layer: second,
            ..Self::default()
        }
    }
}

/// Decoded icon artwork
#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    /// Plain raster image
    Bitmap(Arc<RgbaImage>),
    /// Solid color filling the bounds
    Color(Rgba<u8>),
    /// Adaptive icon with independent background and foreground layers
    Adaptive {
        /// Background layer
        background: Arc<Drawable>,
        /// Foreground layer
        foreground: Arc<Drawable>,
    },
    /// Stack of layers drawn bottom to top
    Layers(Vec<Drawable>),
    /// Layer that a live renderer rotates; `full_rotation` is its level-to-degree contract
    Rotate {
        /// Rotated content
        inner: Arc<Drawable>,
        /// Rotation reached at full level
        full_rotation: f32,
    },
    /// Clock face whose hands are animated by the live renderer
    Clock {
        /// Layered clock artwork
        face: Arc<Drawable>,
        /// Which layers are hands
        metadata: ClockMetadata,
    },
}

impl Drawable {
    /// Wrap a raster image
    pub fn bitmap(image: RgbaImage) -> Self {
        Self::Bitmap(Arc::new(image))
    }

    /// Pair a background and a foreground into an adaptive drawable
    pub fn adaptive(background: Drawable, foreground: Drawable) -> Self {
        Self::Adaptive {
            background: Arc::new(background),
            foreground: Arc::new(foreground),
        }
    }

    /// Backing raster of a plain bitmap drawable
    pub fn bitmap_image(&self) -> Option<&RgbaImage> {
        match self {
            Self::Bitmap(image) => Some(image),
            _ => None,
        }
    }

    /// Whether this drawable is split into adaptive layers
    pub fn is_adaptive(&self) -> bool {
        match self {
            Self::Adaptive { .. } => true,
            Self::Clock { face, .. } => face.is_adaptive(),
            _ => false,
        }
    }

    /// Adaptive background layer, if any
    pub fn adaptive_background(&self) -> Option<&Arc<Drawable>> {
        match self {
            Self::Adaptive { background, .. } => Some(background),
            Self::Clock { face, .. } => face.adaptive_background(),
            _ => None,
        }
    }

    /// Natural pixel size, `None` for size-less drawables such as colors
    pub fn intrinsic_size(&self) -> Option<(u32, u32)> {
        match self {
            Self::Bitmap(image) => Some(image.dimensions()),
            Self::Color(_) => None,
            Self::Adaptive {
                background,
                foreground,
            } => foreground
                .intrinsic_size()
                .or_else(|| background.intrinsic_size()),
            Self::Layers(layers) => layers
                .iter()
                .filter_map(Drawable::intrinsic_size)
                .reduce(|a, b| (a.0.max(b.0), a.1.max(b.1))),
            Self::Rotate { inner, .. } => inner.intrinsic_size(),
            Self::Clock { face, .. } => face.intrinsic_size(),
        }
    }

    /// Render into a square `size` x `size` buffer
    ///
    /// Rotating layers are drawn at rest; adaptive layers are drawn with their
    /// extra inset cropped away like the platform does.
    pub fn rasterize(&self, size: u32) -> RgbaImage {
        let size = size.max(1);
        match self {
            Self::Bitmap(image) => {
                if image.dimensions() == (size, size) {
                    image.as_ref().clone()
                } else {
                    image::imageops::resize(image.as_ref(), size, size, FilterType::Triangle)
                }
            }
            Self::Color(color) => RgbaImage::from_pixel(size, size, *color),
            Self::Adaptive {
                background,
                foreground,
            } => {
                #[expect(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss,
                    reason = "icon sizes are small positive pixel counts"
                )]
                let full = (size as f32 * (1.0 + 2.0 * EXTRA_INSET_FRACTION)).round() as u32;
                let mut layer = background.rasterize(full);
                compose::blend(&mut layer, &foreground.rasterize(full), BlendMode::SrcOver);
                let offset = (full - size) / 2;
                image::imageops::crop_imm(&layer, offset, offset, size, size).to_image()
            }
            Self::Layers(layers) => {
                let mut canvas = RgbaImage::new(size, size);
                for layer in layers {
                    compose::blend(&mut canvas, &layer.rasterize(size), BlendMode::SrcOver);
                }
                canvas
            }
            Self::Rotate { inner, .. } => inner.rasterize(size),
            Self::Clock { face, .. } => face.rasterize(size),
        }
    }
}
