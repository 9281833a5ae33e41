//! Porter-Duff blending on straight-alpha RGBA buffers

use image::{Rgba, RgbaImage, imageops::FilterType};

/// Compositing operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Source drawn over destination
    SrcOver,
    /// Destination kept only where source is transparent
    DstOut,
    /// Source drawn beneath destination
    DstOver,
}

/// Blend `src` onto `dst` with `mode`. Both buffers must have the same size.
pub fn blend(dst: &mut RgbaImage, src: &RgbaImage, mode: BlendMode) {
    debug_assert_eq!(dst.dimensions(), src.dimensions());
    for (d, s) in dst.pixels_mut().zip(src.pixels()) {
        *d = match mode {
            BlendMode::SrcOver => over(*s, *d),
            BlendMode::DstOver => over(*d, *s),
            BlendMode::DstOut => dst_out(*d, *s),
        };
    }
}

/// Scale `src` to `canvas` size and blend it with `mode`
pub fn blend_full(canvas: &mut RgbaImage, src: &RgbaImage, mode: BlendMode) {
    let (width, height) = canvas.dimensions();
    if src.dimensions() == (width, height) {
        blend(canvas, src, mode);
    } else {
        let scaled = image::imageops::resize(src, width, height, FilterType::Triangle);
        blend(canvas, &scaled, mode);
    }
}

/// Draw `src` scaled to `side` pixels, centered on `canvas`
pub fn draw_centered(canvas: &mut RgbaImage, src: &RgbaImage, side: u32) {
    let side = side.max(1);
    let scaled = if src.dimensions() == (side, side) {
        src.clone()
    } else {
        image::imageops::resize(src, side, side, FilterType::Triangle)
    };
    let x = (i64::from(canvas.width()) - i64::from(side)) / 2;
    let y = (i64::from(canvas.height()) - i64::from(side)) / 2;
    image::imageops::overlay(canvas, &scaled, x, y);
}

fn over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = f32::from(src[3]) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= f32::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let value =
            (f32::from(src[c]) * sa + f32::from(dst[c]) * da * (1.0 - sa)) / out_a;
        out[c] = to_channel(value);
    }
    out[3] = to_channel(out_a * 255.0);
    Rgba(out)
}

fn dst_out(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = f32::from(src[3]) / 255.0;
    let alpha = f32::from(dst[3]) * (1.0 - sa);
    Rgba([dst[0], dst[1], dst[2], to_channel(alpha)])
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to the u8 range first"
)]
fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn src_over_replaces_with_opaque_source() {
        let mut dst = RgbaImage::from_pixel(2, 2, BLUE);
        blend(&mut dst, &RgbaImage::from_pixel(2, 2, RED), BlendMode::SrcOver);
        assert_eq!(dst.get_pixel(0, 0), &RED);
    }

    #[test]
    fn dst_over_only_fills_transparent_pixels() {
        let mut dst = RgbaImage::from_pixel(2, 1, CLEAR);
        dst.put_pixel(0, 0, RED);
        blend(&mut dst, &RgbaImage::from_pixel(2, 1, BLUE), BlendMode::DstOver);
        assert_eq!(dst.get_pixel(0, 0), &RED);
        assert_eq!(dst.get_pixel(1, 0), &BLUE);
    }

    #[test]
    fn dst_out_erases_under_opaque_mask() {
        let mut dst = RgbaImage::from_pixel(2, 1, RED);
        let mut mask = RgbaImage::from_pixel(2, 1, CLEAR);
        mask.put_pixel(1, 0, BLUE);
        blend(&mut dst, &mask, BlendMode::DstOut);
        assert_eq!(dst.get_pixel(0, 0), &RED);
        assert_eq!(dst.get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn draw_centered_leaves_margin_transparent() {
        let mut canvas = RgbaImage::new(6, 6);
        draw_centered(&mut canvas, &RgbaImage::from_pixel(2, 2, RED), 2);
        assert_eq!(canvas.get_pixel(0, 0), &CLEAR);
        assert_eq!(canvas.get_pixel(2, 2), &RED);
        assert_eq!(canvas.get_pixel(3, 3), &RED);
    }
}
