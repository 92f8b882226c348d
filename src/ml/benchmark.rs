// ============================================================
// Layer 5 — Benchmark Harness
// ============================================================
// Evaluates a model on the four standard SR test sets, always
// in this order: Set5, Set14, BSD100, Urban100.
//
// Expected layout under the benchmark root:
//
//   <root>/Set5.csv                     ← published results
//   <root>/Set5/image_SRF_2/*_LR.png    ← inputs (+ *_HR.png)
//
// and what a run produces under <out_dir>:
//
//   <out_dir>/Set5/image_SRF_2/*_SR.png
//   <out_dir>/Set5/image_SRF_2/eval_result.txt
//   <out_dir>/Set5.csv                  ← table + one row per run
//
// The benchmark root is never written to. When <out_dir>/Set5.csv
// already exists it is extended, so repeated runs keep history.
// The first failing set aborts the remaining ones.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::{fs, path::{Path, PathBuf}};

use crate::data::dataset::PairedImageDataset;
use crate::domain::{score::MetricRecord, traits::MetricKernel};
use crate::infra::comparison::ComparisonTable;
use crate::ml::{evaluator::Evaluator, model::SrModel};

pub const BENCHMARKS: [&str; 4] = ["Set5", "Set14", "BSD100", "Urban100"];

#[derive(Debug, Clone)]
pub struct BenchmarkEntry {
    pub name:       String,
    /// None when the set ships no ground truth
    pub scores:     Option<MetricRecord>,
    pub output_dir: PathBuf,
    /// Comparison table written for this set, if any
    pub table:      Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct BenchmarkReport {
    pub entries: Vec<BenchmarkEntry>,
}

pub struct BenchmarkHarness<'a, K: MetricKernel> {
    pub evaluator:     &'a Evaluator<K>,
    pub dir_benchmark: &'a Path,
    pub out_dir:       &'a Path,
    pub scale:         usize,
    /// Row label in the comparison tables
    pub method:        &'a str,
    pub is_compare:    bool,
}

impl<K: MetricKernel> BenchmarkHarness<'_, K> {
    pub fn run<B, M>(&self, model: &M, device: &B::Device) -> Result<BenchmarkReport>
    where
        B: Backend,
        M: SrModel<B>,
    {
        fs::create_dir_all(self.out_dir)
            .with_context(|| format!("Cannot create '{}'", self.out_dir.display()))?;

        let scale_dir  = format!("image_SRF_{}", self.scale);
        let mut report = BenchmarkReport::default();

        println!("{:=^40}", " testing benchmarks ");
        for name in BENCHMARKS {
            println!("[{name}]");
            let root     = self.dir_benchmark.join(name).join(&scale_dir);
            let save_dir = self.out_dir.join(name).join(&scale_dir);

            let dataset = PairedImageDataset::benchmark(&root, self.scale)
                .with_context(|| format!("Benchmark {name} is not usable"))?;
            let scores = self
                .evaluator
                .evaluate::<B, M, _>(model, &dataset, Some(&save_dir), true, device)
                .with_context(|| format!("Evaluation of {name} failed"))?;

            let table = match (self.is_compare, scores) {
                (true, Some(s)) => Some(self.append_row(name, s)?),
                (true, None) => {
                    tracing::warn!("{name} has no ground truth; comparison table left untouched");
                    None
                }
                (false, _) => None,
            };

            report.entries.push(BenchmarkEntry {
                name: name.to_string(),
                scores,
                output_dir: save_dir,
                table,
            });
        }
        Ok(report)
    }

    /// Append this run to `<out_dir>/<name>.csv`, seeding it from the
    /// benchmark root's table the first time.
    fn append_row(&self, name: &str, scores: MetricRecord) -> Result<PathBuf> {
        let local     = self.out_dir.join(format!("{name}.csv"));
        let canonical = self.dir_benchmark.join(format!("{name}.csv"));

        let mut table = if local.is_file() {
            ComparisonTable::read(&local)?
        } else if canonical.is_file() {
            ComparisonTable::read(&canonical)?
        } else {
            tracing::warn!("'{}' not found; starting an empty table", canonical.display());
            ComparisonTable::default()
        };

        table.append(self.method, scores);
        table.write(&local)?;
        tracing::info!(
            "{} rows in '{}': {}",
            table.len(), local.display(), table.methods().join(", ")
        );
        Ok(local)
    }
}
