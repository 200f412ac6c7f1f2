//! Rounded-rectangle alpha masks.
//!
//! The glass panel and the album cover are both clipped the same way: rasterize a rounded
//! rectangle into a single-channel coverage image, then install it as the alpha channel of
//! the layer before pasting.

use image::{GrayImage, RgbaImage};
use vello_cpu::kurbo::Shape as _;

use crate::foundation::error::{ThumbError, ThumbResult};

const PATH_TOLERANCE: f64 = 0.1;

/// Anti-aliased coverage mask of a `width`×`height` rounded rectangle.
///
/// `radius` is clamped to half the shorter side.
pub fn rounded_rect_mask(width: u32, height: u32, radius: f64) -> ThumbResult<GrayImage> {
    if width == 0 || height == 0 {
        return Err(ThumbError::render("mask dimensions must be > 0"));
    }
    if !radius.is_finite() || radius < 0.0 {
        return Err(ThumbError::render("mask radius must be finite and >= 0"));
    }
    let w: u16 = width
        .try_into()
        .map_err(|_| ThumbError::render("mask width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ThumbError::render("mask height exceeds u16"))?;

    let (wf, hf) = (f64::from(width), f64::from(height));
    let radius = radius.min(wf.min(hf) / 2.0);
    let shape = vello_cpu::kurbo::RoundedRect::new(0.0, 0.0, wf, hf, radius);

    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
    ctx.fill_path(&shape.to_path(PATH_TOLERANCE));
    ctx.flush();

    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);

    let coverage: Vec<u8> = pixmap
        .data_as_u8_slice()
        .chunks_exact(4)
        .map(|px| px[3])
        .collect();
    GrayImage::from_raw(width, height, coverage)
        .ok_or_else(|| ThumbError::render("mask buffer size mismatch"))
}

/// Replace the alpha channel of `img` with `mask`.
pub fn put_alpha(img: &mut RgbaImage, mask: &GrayImage) -> ThumbResult<()> {
    if img.dimensions() != mask.dimensions() {
        return Err(ThumbError::render(format!(
            "mask is {:?} but layer is {:?}",
            mask.dimensions(),
            img.dimensions()
        )));
    }
    for (px, m) in img.pixels_mut().zip(mask.pixels()) {
        px[3] = m[0];
    }
    Ok(())
}

/// Clip `img` to a rounded rectangle of its own size.
pub fn clip_rounded(img: &mut RgbaImage, radius: f64) -> ThumbResult<()> {
    let mask = rounded_rect_mask(img.width(), img.height(), radius)?;
    put_alpha(img, &mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_clear_and_interior_is_solid() {
        let mask = rounded_rect_mask(220, 220, 25.0).unwrap();
        assert_eq!(mask.dimensions(), (220, 220));

        for (x, y) in [(0, 0), (219, 0), (0, 219), (219, 219), (3, 3)] {
            assert_eq!(mask.get_pixel(x, y)[0], 0, "corner ({x},{y})");
        }
        for (x, y) in [(110, 110), (110, 1), (1, 110), (30, 30)] {
            assert!(mask.get_pixel(x, y)[0] >= 250, "interior ({x},{y})");
        }
    }

    #[test]
    fn zero_radius_is_a_plain_rectangle() {
        let mask = rounded_rect_mask(16, 8, 0.0).unwrap();
        assert!(mask.pixels().all(|p| p[0] >= 250));
    }

    #[test]
    fn oversized_radius_is_clamped() {
        let mask = rounded_rect_mask(40, 20, 500.0).unwrap();
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert!(mask.get_pixel(20, 10)[0] >= 250);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert!(rounded_rect_mask(0, 10, 1.0).is_err());
        assert!(rounded_rect_mask(10, 10, f64::NAN).is_err());
    }

    #[test]
    fn put_alpha_replaces_alpha_only() {
        let mut img = RgbaImage::from_pixel(2, 1, image::Rgba([10, 20, 30, 255]));
        let mask = GrayImage::from_raw(2, 1, vec![0, 128]).unwrap();
        put_alpha(&mut img, &mask).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [10, 20, 30, 128]);

        let wrong = GrayImage::new(3, 1);
        assert!(put_alpha(&mut img, &wrong).is_err());
    }
}
