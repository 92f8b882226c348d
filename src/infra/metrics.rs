// ============================================================
// Layer 6 — Metric Accumulator
// ============================================================
// Running sums of per-image PSNR/SSIM, reduced to dataset means.
//
// The mean divides by the number of records that were actually
// added — i.e. the samples that had ground truth — not by the
// dataset length. A dataset where only some samples ship an HR
// image therefore reports the mean over the scored subset.
//
// Output file: <out_dir>/eval_result.txt
//
//   psnr: 30.250000
//   ssim: 0.902500

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::score::MetricRecord;

/// Name of the two-line report written next to evaluation outputs
pub const EVAL_REPORT_FILE: &str = "eval_result.txt";

#[derive(Debug, Default, Clone)]
pub struct MetricAccumulator {
    psnr_sum: f64,
    ssim_sum: f64,
    count:    usize,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: MetricRecord) {
        self.psnr_sum += record.psnr;
        self.ssim_sum += record.ssim;
        self.count    += 1;
    }

    /// Number of records added so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// Dataset mean, or None when nothing was scored.
    pub fn mean(&self) -> Option<MetricRecord> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(MetricRecord::new(self.psnr_sum / n, self.ssim_sum / n))
    }
}

/// The exact text of eval_result.txt
pub fn format_report(mean: &MetricRecord) -> String {
    format!("psnr: {:.6}\nssim: {:.6}\n", mean.psnr, mean.ssim)
}

/// Write eval_result.txt into `dir` and return its path.
pub fn write_eval_report(dir: &Path, mean: &MetricRecord) -> Result<PathBuf> {
    let path = dir.join(EVAL_REPORT_FILE);
    fs::write(&path, format_report(mean))
        .with_context(|| format!("Cannot write evaluation report '{}'", path.display()))?;
    tracing::debug!("Wrote evaluation report '{}'", path.display());
    Ok(path)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn scores() -> Vec<MetricRecord> {
        vec![
            MetricRecord::new(30.0, 0.90),
            MetricRecord::new(32.0, 0.92),
            MetricRecord::new(28.0, 0.88),
            MetricRecord::new(31.0, 0.91),
        ]
    }

    fn accumulate(records: impl IntoIterator<Item = MetricRecord>) -> MetricAccumulator {
        let mut acc = MetricAccumulator::new();
        records.into_iter().for_each(|r| acc.add(r));
        acc
    }

    #[test]
    fn mean_of_four_scores() {
        let acc  = accumulate(scores());
        let mean = acc.mean().unwrap();
        assert_eq!(acc.count(), 4);
        assert!((mean.psnr - 30.25).abs() < 1e-9);
        assert!((mean.ssim - 0.9025).abs() < 1e-9);
    }

    #[test]
    fn mean_is_order_independent() {
        let forward  = accumulate(scores()).mean().unwrap();
        let backward = accumulate(scores().into_iter().rev()).mean().unwrap();
        assert!((forward.psnr - backward.psnr).abs() < 1e-12);
        assert!((forward.ssim - backward.ssim).abs() < 1e-12);
    }

    #[test]
    fn empty_accumulator_has_no_mean() {
        assert!(MetricAccumulator::new().mean().is_none());
    }

    #[test]
    fn report_format_has_six_decimals() {
        let text = format_report(&MetricRecord::new(30.25, 0.9025));
        assert_eq!(text, "psnr: 30.250000\nssim: 0.902500\n");
    }

    #[test]
    fn report_lands_in_output_dir() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_eval_report(dir.path(), &MetricRecord::new(1.0, 0.5)).unwrap();
        assert_eq!(path, dir.path().join(EVAL_REPORT_FILE));
        assert_eq!(fs::read_to_string(path).unwrap(), "psnr: 1.000000\nssim: 0.500000\n");
    }
}
