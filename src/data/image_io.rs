// ============================================================
// Layer 4 — Image codec
// ============================================================
// Decoding and encoding through the `image` crate. Everything
// is read as 8-bit RGB (greyscale files are expanded) and
// converted to a planar SrImage in [0, 1].

use anyhow::{bail, Context, Result};
use image::{GrayImage, RgbImage};
use std::path::Path;

use crate::domain::image::SrImage;

/// File extensions picked up when scanning dataset folders
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "bmp", "jpg", "jpeg", "tif", "tiff"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn load_image(path: &Path) -> Result<SrImage> {
    let rgb = image::open(path)
        .with_context(|| format!("Cannot decode image '{}'", path.display()))?
        .to_rgb8();
    Ok(from_rgb(&rgb))
}

pub fn save_image(img: &SrImage, path: &Path) -> Result<()> {
    let (w, h) = (img.width as u32, img.height as u32);
    let result = match img.channels {
        1 => GrayImage::from_raw(w, h, img.data.iter().map(|&v| to_u8(v)).collect())
            .context("pixel buffer does not match image size")?
            .save(path),
        3 => to_rgb(img)?.save(path),
        c => bail!("Cannot encode an image with {c} channels"),
    };
    result.with_context(|| format!("Cannot write image '{}'", path.display()))
}

pub fn from_rgb(rgb: &RgbImage) -> SrImage {
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    let mut data = vec![0.0f32; 3 * w * h];
    for (x, y, px) in rgb.enumerate_pixels() {
        let i = y as usize * w + x as usize;
        for c in 0..3 {
            data[c * w * h + i] = px[c] as f32 / 255.0;
        }
    }
    SrImage { width: w, height: h, channels: 3, data }
}

pub fn to_rgb(img: &SrImage) -> Result<RgbImage> {
    if img.channels != 3 {
        bail!("Expected a 3-channel image, got {}", img.channels);
    }
    let plane = img.width * img.height;
    let mut raw = Vec::with_capacity(3 * plane);
    for i in 0..plane {
        for c in 0..3 {
            raw.push(to_u8(img.data[c * plane + i]));
        }
    }
    RgbImage::from_raw(img.width as u32, img.height as u32, raw)
        .context("pixel buffer does not match image size")
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
