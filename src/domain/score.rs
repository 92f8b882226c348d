// ============================================================
// Layer 3 — Quality scores
// ============================================================

use serde::{Deserialize, Serialize};

/// Scores for one reconstructed image.
/// psnr is in dB (>= 0), ssim in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub psnr: f64,
    pub ssim: f64,
}

impl MetricRecord {
    pub fn new(psnr: f64, ssim: f64) -> Self {
        Self { psnr, ssim }
    }
}
