//! Compositing of unthemed icons through a pack's back/mask/upon layers
//!
//! The base icon is drawn scaled into an oversized transparent canvas, the mask
//! erases where it is opaque, the back layer is drawn underneath and the upon
//! layer on top. An adaptive back layer is not drawn at all; its background
//! becomes the background of an adaptive result instead.

use crate::graphics::adaptive::{EXTRA_INSET_FRACTION, LEGACY_ICON_SCALE};
use crate::graphics::compose::{self, BlendMode};
use crate::graphics::Drawable;
use crate::model::ComponentName;
use crate::pack::entry::PackEntry;
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, warn};

/// Smallest accepted icon scale
pub const MIN_ICON_SCALE: f32 = 0.05;

/// Largest accepted icon scale
pub const MAX_ICON_SCALE: f32 = 2.0;

/// The canvas never grows beyond this multiple of the requested icon size
const MAX_CANVAS_FACTOR: u32 = 4;

/// Whether `scale` is a usable icon scale
pub fn is_valid_scale(scale: f32) -> bool {
    scale.is_finite() && (MIN_ICON_SCALE..=MAX_ICON_SCALE).contains(&scale)
}

/// Layer lists and scale declared by a pack
#[derive(Debug, Clone)]
pub struct IconMask {
    /// Candidates drawn behind the icon
    pub back_entries: Vec<Arc<PackEntry>>,
    /// Candidates erasing parts of the icon
    pub mask_entries: Vec<Arc<PackEntry>>,
    /// Candidates drawn over the icon
    pub upon_entries: Vec<Arc<PackEntry>>,
    /// Size of the base icon relative to the layers
    pub icon_scale: f32,
    /// Leave icons that are already adaptive untouched
    pub only_mask_legacy: bool,
}

impl Default for IconMask {
    fn default() -> Self {
        Self {
            back_entries: Vec::new(),
            mask_entries: Vec::new(),
            upon_entries: Vec::new(),
            icon_scale: 1.0,
            only_mask_legacy: false,
        }
    }
}

/// Pick one available entry for `key`
///
/// The choice is `|hash(key)| mod n` over the available entries, so the same
/// component always receives the same variant. A missing key selects the first.
pub fn select_layer<'a>(
    entries: &'a [Arc<PackEntry>],
    key: Option<&ComponentName>,
) -> Option<&'a Arc<PackEntry>> {
    let available: Vec<&Arc<PackEntry>> = entries.iter().filter(|e| e.is_available()).collect();
    if available.is_empty() {
        return None;
    }
    let hash = key.map_or(0, ComponentName::stable_hash);
    let index = usize::try_from(hash.unsigned_abs()).unwrap_or(0) % available.len();
    available.get(index).copied()
}

impl IconMask {
    /// Whether any layer list has an available entry
    pub fn has_mask(&self) -> bool {
        [&self.back_entries, &self.mask_entries, &self.upon_entries]
            .iter()
            .any(|list| list.iter().any(|e| e.is_available()))
    }

    fn layer(&self, entries: &[Arc<PackEntry>], key: Option<&ComponentName>, density: u32) -> Option<Drawable> {
        let entry = select_layer(entries, key)?;
        match entry.drawable_for_density(density) {
            Ok(drawable) => Some(drawable),
            Err(e) => {
                warn!("Skipping mask layer {}: {}", entry.debug_name(), e);
                None
            }
        }
    }

    /// Composite `base` for component `key` at `icon_size` pixels
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "canvas sizes are small positive pixel counts"
    )]
    pub fn get_icon(
        &self,
        base: &Drawable,
        key: Option<&ComponentName>,
        icon_size: u32,
        density: u32,
    ) -> Drawable {
        let back = self.layer(&self.back_entries, key, density);
        let mask = self.layer(&self.mask_entries, key, density);
        let upon = self.layer(&self.upon_entries, key, density);

        let adaptive_back = back.as_ref().and_then(Drawable::adaptive_background).cloned();
        let mut scale = if is_valid_scale(self.icon_scale) {
            self.icon_scale
        } else {
            warn!("Ignoring icon scale {} outside the supported range", self.icon_scale);
            1.0
        };
        if adaptive_back.is_some() {
            scale -= 1.0 - LEGACY_ICON_SCALE;
        }

        let mut size = (icon_size as f32 * (3.0 - scale)) as u32;
        if adaptive_back.is_some() {
            size += (size as f32 * EXTRA_INSET_FRACTION) as u32;
        }
        let size = size.clamp(1, icon_size.saturating_mul(MAX_CANVAS_FACTOR).max(1));
        debug!("Compositing {:?} on a {size}px canvas at scale {scale}", key);

        let mut canvas = RgbaImage::new(size, size);
        let side = (size as f32 * scale).round().max(1.0) as u32;
        compose::draw_centered(&mut canvas, &base.rasterize(side), side);

        if let Some(mask) = &mask {
            compose::blend_full(&mut canvas, &mask.rasterize(size), BlendMode::DstOut);
        }
        if adaptive_back.is_none() {
            if let Some(back) = &back {
                compose::blend_full(&mut canvas, &back.rasterize(size), BlendMode::DstOver);
            }
        }
        if let Some(upon) = &upon {
            compose::blend_full(&mut canvas, &upon.rasterize(size), BlendMode::SrcOver);
        }

        match adaptive_back {
            Some(_) if self.only_mask_legacy && base.is_adaptive() => base.clone(),
            Some(background) => Drawable::Adaptive {
                background,
                foreground: Arc::new(Drawable::bitmap(canvas)),
            },
            None => Drawable::bitmap(canvas),
        }
    }
}
