//! Adaptive icon constants and the legacy-to-adaptive wrapper

use crate::graphics::compose;
use crate::graphics::drawable::Drawable;
use image::{Rgba, RgbaImage};

/// Extra inset on every side of an adaptive icon's layers, as a fraction of its bounds
pub const EXTRA_INSET_FRACTION: f32 = 0.25;

/// Visible viewport of an adaptive layer relative to the full layer
pub const DEFAULT_VIEWPORT_SCALE: f32 = 1.0 / (1.0 + 2.0 * EXTRA_INSET_FRACTION);

/// Scale at which a legacy icon is placed inside an adaptive wrapper
pub const LEGACY_ICON_SCALE: f32 = 0.7 * DEFAULT_VIEWPORT_SCALE;

/// Alpha above which a border pixel counts as opaque
const OPAQUE_ALPHA: u8 = 250;

/// Wrap a legacy drawable into an adaptive one
///
/// Already adaptive drawables are returned unchanged. Full-bleed icons (opaque
/// border) keep their edge color as background and fill the viewport; other
/// icons sit at legacy scale on a white background.
pub fn generate(drawable: &Drawable, size: u32) -> Drawable {
    if drawable.is_adaptive() {
        return drawable.clone();
    }
    let size = size.max(1);
    let raster = drawable.rasterize(size);
    let (background, scale) = match border_color(&raster) {
        Some(color) => (color, DEFAULT_VIEWPORT_SCALE),
        None => (Rgba([255, 255, 255, 255]), LEGACY_ICON_SCALE),
    };

    let mut foreground = RgbaImage::new(size, size);
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "icon sizes are small positive pixel counts"
    )]
    let side = (size as f32 * scale).round() as u32;
    compose::draw_centered(&mut foreground, &raster, side);
    Drawable::adaptive(Drawable::Color(background), Drawable::bitmap(foreground))
}

/// Average color of the border if every border pixel is opaque
fn border_color(image: &RgbaImage) -> Option<Rgba<u8>> {
    let (width, height) = image.dimensions();
    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for (x, y, pixel) in image.enumerate_pixels() {
        if x != 0 && y != 0 && x + 1 != width && y + 1 != height {
            continue;
        }
        if pixel[3] < OPAQUE_ALPHA {
            return None;
        }
        for (acc, channel) in sum.iter_mut().zip(pixel.0) {
            *acc += u64::from(channel);
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let avg = |c: u64| u8::try_from(c / count).unwrap_or(u8::MAX);
    Some(Rgba([avg(sum[0]), avg(sum[1]), avg(sum[2]), 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_scale_matches_platform() {
        assert!((LEGACY_ICON_SCALE - 0.466_666_7).abs() < 1e-5);
    }

    #[test]
    fn full_bleed_icon_keeps_edge_color() {
        let icon = Drawable::bitmap(RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255])));
        let adaptive = generate(&icon, 8);
        match adaptive {
            Drawable::Adaptive { background, .. } => {
                assert!(matches!(*background, Drawable::Color(Rgba([10, 20, 30, 255]))));
            }
            other => panic!("expected adaptive drawable, got {other:?}"),
        }
    }

    #[test]
    fn transparent_icon_gets_white_background() {
        let mut image = RgbaImage::new(8, 8);
        image.put_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let adaptive = generate(&Drawable::bitmap(image), 8);
        let background = adaptive.adaptive_background().unwrap();
        assert!(matches!(**background, Drawable::Color(Rgba([255, 255, 255, 255]))));
    }

    #[test]
    fn adaptive_input_is_unchanged() {
        let adaptive = Drawable::adaptive(
            Drawable::Color(Rgba([0, 0, 0, 255])),
            Drawable::Color(Rgba([0, 0, 0, 0])),
        );
        let wrapped = generate(&adaptive, 8);
        assert!(wrapped.is_adaptive());
        assert!(matches!(
            wrapped.adaptive_background().map(|b| &**b),
            Some(Drawable::Color(Rgba([0, 0, 0, 255])))
        ));
    }
}
