use image::RgbaImage;
use rayon::prelude::*;

use crate::foundation::error::{ThumbError, ThumbResult};

/// Whole-canvas contrast/saturation boost applied after compositing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToneAdjust {
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for ToneAdjust {
    fn default() -> Self {
        Self {
            contrast: 1.1,
            saturation: 1.2,
        }
    }
}

impl ToneAdjust {
    pub fn apply(self, img: &mut RgbaImage) -> ThumbResult<()> {
        contrast(img, self.contrast)?;
        saturation(img, self.saturation)
    }
}

fn check_factor(factor: f32) -> ThumbResult<()> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(ThumbError::render("tone factor must be finite and >= 0"));
    }
    Ok(())
}

fn luma(px: &[u8]) -> f32 {
    (299.0 * f32::from(px[0]) + 587.0 * f32::from(px[1]) + 114.0 * f32::from(px[2])) / 1000.0
}

fn lerp_u8(base: f32, c: u8, factor: f32) -> u8 {
    (base + (f32::from(c) - base) * factor).round().clamp(0.0, 255.0) as u8
}

/// Scale RGB toward black; alpha is untouched.
pub fn brightness(img: &mut RgbaImage, factor: f32) -> ThumbResult<()> {
    check_factor(factor)?;
    img.par_chunks_exact_mut(4).for_each(|px| {
        for c in &mut px[..3] {
            *c = lerp_u8(0.0, *c, factor);
        }
    });
    Ok(())
}

/// Push RGB away from (or toward) the image's mean luma.
pub fn contrast(img: &mut RgbaImage, factor: f32) -> ThumbResult<()> {
    check_factor(factor)?;
    let n = (img.width() as usize * img.height() as usize).max(1);
    let total: f64 = img.chunks_exact(4).map(|px| f64::from(luma(px))).sum();
    let mean = (total / n as f64).round() as f32;
    img.par_chunks_exact_mut(4).for_each(|px| {
        for c in &mut px[..3] {
            *c = lerp_u8(mean, *c, factor);
        }
    });
    Ok(())
}

/// Push each pixel away from (or toward) its own gray value.
pub fn saturation(img: &mut RgbaImage, factor: f32) -> ThumbResult<()> {
    check_factor(factor)?;
    img.par_chunks_exact_mut(4).for_each(|px| {
        let gray = luma(px);
        for c in &mut px[..3] {
            *c = lerp_u8(gray, *c, factor);
        }
    });
    Ok(())
}
