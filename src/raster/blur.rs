use image::{RgbaImage, imageops::FilterType};
use rayon::prelude::*;

use crate::foundation::error::{ThumbError, ThumbResult};

/// Largest sigma blurred at full resolution; larger blurs run on a downscaled copy.
const MAX_DIRECT_SIGMA: f32 = 10.0;

/// Gaussian blur with a Pillow-style radius (treated as sigma).
///
/// Strong blurs are computed on a proportionally downscaled copy and scaled back up, which
/// is visually indistinguishable at these radii and keeps the kernel small.
pub fn gaussian_blur(img: &RgbaImage, sigma: f32) -> ThumbResult<RgbaImage> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(ThumbError::render("blur sigma must be finite and >= 0"));
    }
    let (w, h) = img.dimensions();
    if sigma == 0.0 || w == 0 || h == 0 {
        return Ok(img.clone());
    }

    let factor = (sigma / MAX_DIRECT_SIGMA).ceil().max(1.0) as u32;
    let (sw, sh) = ((w / factor).max(1), (h / factor).max(1));
    let small = if factor > 1 {
        image::imageops::resize(img, sw, sh, FilterType::Triangle)
    } else {
        img.clone()
    };

    let s = sigma / factor as f32;
    let radius = (s * 3.0).ceil() as u32;
    let blurred = blur_rgba8(small.as_raw(), sw, sh, radius, s)?;
    let blurred = RgbaImage::from_raw(sw, sh, blurred)
        .ok_or_else(|| ThumbError::render("blurred buffer size mismatch"))?;

    if factor > 1 {
        Ok(image::imageops::resize(&blurred, w, h, FilterType::Triangle))
    } else {
        Ok(blurred)
    }
}

/// Separable fixed-point Gaussian blur over tightly packed RGBA8 rows.
pub fn blur_rgba8(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> ThumbResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| ThumbError::render("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(ThumbError::render(
            "blur_rgba8 expects src matching width*height*4",
        ));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass(src, &mut tmp, width, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> ThumbResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(ThumbError::render("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = i as f64;
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(ThumbError::render("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Fold rounding drift into the center tap so the kernel sums to exactly 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let row_len = width as usize * 4;
    dst.par_chunks_exact_mut(row_len)
        .zip(src.par_chunks_exact(row_len))
        .for_each(|(dst_row, src_row)| {
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                    let idx = sx as usize * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src_row[idx + c]);
                    }
                }
                let out_idx = x as usize * 4;
                for c in 0..4 {
                    dst_row[out_idx + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let h = height as i32;
    let row_len = width as usize * 4;
    dst.par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(y, dst_row)| {
            for x in 0..width as usize {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1);
                    let idx = sy as usize * row_len + x * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                    }
                }
                for c in 0..4 {
                    dst_row[x * 4 + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}
