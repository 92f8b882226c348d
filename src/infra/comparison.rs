// ============================================================
// Layer 6 — Benchmark comparison tables
// ============================================================
// Each benchmark ships a CSV of previously published results,
// one row per method:
//
//   method,psnr,ssim
//   Bicubic,33.66,0.9299
//   SRCNN,36.66,0.9542
//
// The harness appends one row for the current experiment and
// writes the result into its own output directory. Extra
// columns in the source file are preserved (left blank for the
// new row); missing method/psnr/ssim columns are added.

use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::score::MetricRecord;

const METHOD: &str = "method";
const PSNR:   &str = "psnr";
const SSIM:   &str = "ssim";

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    headers: Vec<String>,
    rows:    Vec<Vec<String>>,
}

impl Default for ComparisonTable {
    fn default() -> Self {
        Self {
            headers: vec![METHOD.into(), PSNR.into(), SSIM.into()],
            rows:    Vec::new(),
        }
    }
}

impl ComparisonTable {
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Cannot open comparison table '{}'", path.display()))?;
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .with_context(|| format!("Malformed row in '{}'", path.display()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Cannot create comparison table '{}'", path.display()))?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Add one result row for `method`.
    pub fn append(&mut self, method: &str, scores: MetricRecord) {
        let m = self.column(METHOD);
        let p = self.column(PSNR);
        let s = self.column(SSIM);

        let mut row = vec![String::new(); self.headers.len()];
        row[m] = method.to_string();
        row[p] = format!("{:.6}", scores.psnr);
        row[s] = format!("{:.6}", scores.ssim);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Values of the `method` column, in row order
    pub fn methods(&self) -> Vec<&str> {
        match self.headers.iter().position(|h| h == METHOD) {
            Some(i) => self.rows.iter().map(|r| r.get(i).map(String::as_str).unwrap_or("")).collect(),
            None    => Vec::new(),
        }
    }

    /// Index of `name`, adding the column (blank in old rows) if absent.
    fn column(&mut self, name: &str) -> usize {
        if let Some(i) = self.headers.iter().position(|h| h == name) {
            return i;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }
}
