// ============================================================
// Layer 3 — SrImage
// ============================================================
// The one image representation every layer agrees on.
//
// Memory layout is planar (CHW), the same order Burn expects
// for a [batch, channels, height, width] tensor, so converting
// to and from tensors is a flat copy:
//
//   data = [ R(0,0) R(0,1) ... | G(0,0) ... | B(0,0) ... ]
//
// Pixel values are f32 in [0.0, 1.0].

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SrImage {
    pub width:    usize,
    pub height:   usize,
    pub channels: usize,
    /// Planar pixel data, length = channels * height * width
    pub data:     Vec<f32>,
}

impl SrImage {
    /// Build an image from a planar buffer, checking the length matches.
    pub fn from_chw(channels: usize, height: usize, width: usize, data: Vec<f32>) -> Result<Self> {
        if channels == 0 || height == 0 || width == 0 {
            bail!("Image dimensions must be non-zero (got {channels}x{height}x{width})");
        }
        if data.len() != channels * height * width {
            bail!(
                "Pixel buffer holds {} values, expected {} for {}x{}x{}",
                data.len(),
                channels * height * width,
                channels, height, width,
            );
        }
        Ok(Self { width, height, channels, data })
    }

    /// A constant-valued image
    #[cfg(test)]
    pub fn filled(channels: usize, height: usize, width: usize, value: f32) -> Self {
        Self { width, height, channels, data: vec![value; channels * height * width] }
    }

    /// "WxH" — the format used in per-sample log lines
    pub fn size_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Value at (channel, y, x)
    pub fn at(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[(c * self.height + y) * self.width + x]
    }

    /// Copy out a rectangular window; the window must fit inside the image.
    pub fn crop(&self, top: usize, left: usize, height: usize, width: usize) -> Result<Self> {
        if top + height > self.height || left + width > self.width {
            bail!(
                "Crop {}x{} at ({}, {}) does not fit in {}",
                width, height, left, top, self.size_label(),
            );
        }
        let mut data = Vec::with_capacity(self.channels * height * width);
        for c in 0..self.channels {
            for y in top..top + height {
                let row = (c * self.height + y) * self.width;
                data.extend_from_slice(&self.data[row + left..row + left + width]);
            }
        }
        Self::from_chw(self.channels, height, width, data)
    }
}
