// ============================================================
// Layer 6 — PSNR / SSIM kernel
// ============================================================
// The scoring convention used by the SR literature for Set5,
// Set14, BSD100 and Urban100:
//
//   1. Convert RGB to the luminance channel (ITU-R BT.601):
//        Y = 16 + 65.481 R + 128.553 G + 24.966 B   (R,G,B in [0,1])
//      Greyscale inputs are simply scaled to [0, 255].
//   2. Crop both images to their common size, then shave
//      `shave` pixels (usually the scale factor) off every border.
//   3. PSNR over a 255 peak; identical images report 100 dB.
//   4. SSIM with an 11x11 Gaussian window (sigma 1.5), shrunk
//      for images smaller than the window.
//
// Reference: Wang et al. (2004) Image Quality Assessment:
//            From Error Visibility to Structural Similarity

use anyhow::{bail, Result};

use crate::domain::{image::SrImage, score::MetricRecord, traits::MetricKernel};

/// Upper bound reported for a perfect reconstruction
pub const MAX_PSNR: f64 = 100.0;

const PEAK:         f64 = 255.0;
const WINDOW:       usize = 11;
const WINDOW_SIGMA: f64 = 1.5;
const K1:           f64 = 0.01;
const K2:           f64 = 0.03;

/// Y-channel PSNR/SSIM with a border shave
#[derive(Debug, Clone, Copy)]
pub struct LumaKernel {
    pub shave: usize,
}

impl LumaKernel {
    pub fn new(shave: usize) -> Self {
        Self { shave }
    }
}

impl MetricKernel for LumaKernel {
    fn score(&self, output: &SrImage, reference: &SrImage) -> Result<MetricRecord> {
        let height = output.height.min(reference.height);
        let width  = output.width.min(reference.width);
        if height <= 2 * self.shave || width <= 2 * self.shave {
            bail!(
                "Images {} / {} are too small for a {}px border shave",
                output.size_label(), reference.size_label(), self.shave,
            );
        }

        let a = Plane::luma(output).window(self.shave, height - self.shave, width - self.shave);
        let b = Plane::luma(reference).window(self.shave, height - self.shave, width - self.shave);

        Ok(MetricRecord::new(psnr(&a, &b), ssim(&a, &b)))
    }
}

/// Single-channel image in [0, 255]
struct Plane {
    width:  usize,
    height: usize,
    data:   Vec<f64>,
}

impl Plane {
    fn luma(img: &SrImage) -> Self {
        let n = img.width * img.height;
        let data = if img.channels >= 3 {
            (0..n)
                .map(|i| {
                    let r = img.data[i] as f64;
                    let g = img.data[n + i] as f64;
                    let b = img.data[2 * n + i] as f64;
                    16.0 + 65.481 * r + 128.553 * g + 24.966 * b
                })
                .collect()
        } else {
            img.data[..n].iter().map(|&v| v as f64 * PEAK).collect()
        };
        Self { width: img.width, height: img.height, data }
    }

    /// Rows/cols [border, end) of the top-left aligned image.
    fn window(&self, border: usize, end_y: usize, end_x: usize) -> Self {
        let mut data = Vec::with_capacity((end_y - border) * (end_x - border));
        for y in border..end_y {
            let row = y * self.width;
            data.extend_from_slice(&self.data[row + border..row + end_x]);
        }
        Self { width: end_x - border, height: end_y - border, data }
    }
}

fn psnr(a: &Plane, b: &Plane) -> f64 {
    let mse = a.data.iter()
        .zip(&b.data)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>() / a.data.len() as f64;
    if mse == 0.0 {
        return MAX_PSNR;
    }
    (10.0 * (PEAK * PEAK / mse).log10()).clamp(0.0, MAX_PSNR)
}

fn gaussian_window(size: usize) -> Vec<f64> {
    let center = (size as f64 - 1.0) / 2.0;
    let mut w: Vec<f64> = (0..size * size)
        .map(|i| {
            let dy = (i / size) as f64 - center;
            let dx = (i % size) as f64 - center;
            (-(dx * dx + dy * dy) / (2.0 * WINDOW_SIGMA * WINDOW_SIGMA)).exp()
        })
        .collect();
    let total: f64 = w.iter().sum();
    w.iter_mut().for_each(|v| *v /= total);
    w
}

fn ssim(a: &Plane, b: &Plane) -> f64 {
    let size = WINDOW.min(a.width).min(a.height);
    let w    = gaussian_window(size);
    let c1   = (K1 * PEAK).powi(2);
    let c2   = (K2 * PEAK).powi(2);

    let mut total = 0.0;
    let mut count = 0usize;
    for top in 0..=a.height - size {
        for left in 0..=a.width - size {
            let (mut mu_a, mut mu_b) = (0.0, 0.0);
            let (mut aa, mut bb, mut ab) = (0.0, 0.0, 0.0);
            for dy in 0..size {
                let row = (top + dy) * a.width + left;
                for dx in 0..size {
                    let k = w[dy * size + dx];
                    let x = a.data[row + dx];
                    let y = b.data[row + dx];
                    mu_a += k * x;
                    mu_b += k * y;
                    aa   += k * x * x;
                    bb   += k * y * y;
                    ab   += k * x * y;
                }
            }
            let var_a = aa - mu_a * mu_a;
            let var_b = bb - mu_b * mu_b;
            let cov   = ab - mu_a * mu_b;
            total += ((2.0 * mu_a * mu_b + c1) * (2.0 * cov + c2))
                / ((mu_a * mu_a + mu_b * mu_b + c1) * (var_a + var_b + c2));
            count += 1;
        }
    }
    (total / count as f64).clamp(0.0, 1.0)
}
