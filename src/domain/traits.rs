// ============================================================
// Layer 3 — Core Traits
// ============================================================
// The evaluator never computes PSNR/SSIM itself; it asks a
// MetricKernel. The production kernel lives in infra::quality,
// tests plug in scripted kernels.

use anyhow::Result;

use crate::domain::image::SrImage;
use crate::domain::score::MetricRecord;

/// Any component that can score a reconstruction against its reference.
pub trait MetricKernel {
    /// Compare `output` with `reference` and return one metric record.
    fn score(&self, output: &SrImage, reference: &SrImage) -> Result<MetricRecord>;
}
