use image::{RgbaImage, imageops::FilterType};

use crate::foundation::error::{ThumbError, ThumbResult};

/// Scale `img` to cover `width`×`height` and center-crop the overflow (no letterboxing).
pub fn fill(img: &RgbaImage, width: u32, height: u32) -> ThumbResult<RgbaImage> {
    let (iw, ih) = img.dimensions();
    if iw == 0 || ih == 0 || width == 0 || height == 0 {
        return Err(ThumbError::render("cannot fit an empty image"));
    }
    if (iw, ih) == (width, height) {
        return Ok(img.clone());
    }

    let scale = f64::max(
        f64::from(width) / f64::from(iw),
        f64::from(height) / f64::from(ih),
    );
    let crop_w = ((f64::from(width) / scale).round() as u32).clamp(1, iw);
    let crop_h = ((f64::from(height) / scale).round() as u32).clamp(1, ih);
    let x = (iw - crop_w) / 2;
    let y = (ih - crop_h) / 2;

    let cropped = image::imageops::crop_imm(img, x, y, crop_w, crop_h).to_image();
    Ok(image::imageops::resize(
        &cropped,
        width,
        height,
        FilterType::Lanczos3,
    ))
}
