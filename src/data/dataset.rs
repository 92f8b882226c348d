// ============================================================
// Layer 4 — Super-resolution datasets
// ============================================================
// Two folder conventions are supported, both producing the
// same PairedImageDataset:
//
//   Training / testing pairs
//     <lr_dir>/0001.png  ↔  <hr_dir>/0001.png   (matched by file name)
//
//   Benchmark sets  (<root>/<name>/image_SRF_<scale>/)
//     img_001_SRF_2_LR.png  ↔  img_001_SRF_2_HR.png
//     output id: img_001_SRF_2_SR.png
//
// Images are decoded lazily in get(), so loader workers do the
// I/O in parallel. When patches are enabled every get() returns
// a random aligned crop: an lr_size² window of the LR image and
// the matching (lr_size·scale)² window of the HR image.

use anyhow::{bail, Context, Result};
use burn::data::dataset::Dataset;
use rand::Rng;
use std::{fs, path::{Path, PathBuf}};

use crate::data::image_io::{is_image_file, load_image};
use crate::domain::sample::SrSample;

#[derive(Debug, Clone)]
struct ImagePair {
    id: String,
    lr: PathBuf,
    hr: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PairedImageDataset {
    pairs: Vec<ImagePair>,
    scale: usize,
    /// LR patch edge length; None = whole images
    patch: Option<usize>,
}

impl PairedImageDataset {
    /// Pair every image in `lr_dir` with the same file name in `hr_dir`.
    ///
    /// With `require_hr` a missing HR file is a configuration error
    /// (training); otherwise the sample simply has no ground truth.
    pub fn open(lr_dir: &Path, hr_dir: Option<&Path>, scale: usize, require_hr: bool) -> Result<Self> {
        let mut pairs = Vec::new();
        for lr in list_images(lr_dir)? {
            let name = file_name(&lr);
            let hr = hr_dir.map(|d| d.join(&name)).filter(|p| p.is_file());
            if hr.is_none() && require_hr {
                bail!("No ground truth for '{}' (looked in {:?})", lr.display(), hr_dir);
            }
            pairs.push(ImagePair { id: name, lr, hr });
        }
        tracing::info!("Opened {} samples from '{}'", pairs.len(), lr_dir.display());
        Ok(Self { pairs, scale, patch: None })
    }

    /// Open a benchmark folder: *_LR files with optional *_HR partners.
    pub fn benchmark(dir: &Path, scale: usize) -> Result<Self> {
        let mut pairs = Vec::new();
        for path in list_images(dir)? {
            let name = file_name(&path);
            let Some(stem_end) = name.rfind("_LR.") else { continue };
            let (prefix, ext) = (&name[..stem_end], &name[stem_end + 4..]);
            let hr = dir.join(format!("{prefix}_HR.{ext}"));
            pairs.push(ImagePair {
                id: format!("{prefix}_SR.{ext}"),
                lr: path,
                hr: hr.is_file().then_some(hr),
            });
        }
        if pairs.is_empty() {
            bail!("No '*_LR.*' images found in benchmark folder '{}'", dir.display());
        }
        tracing::info!("Opened benchmark '{}' with {} images", dir.display(), pairs.len());
        Ok(Self { pairs, scale, patch: None })
    }

    /// Crop random aligned patches of `lr_size`² in every get().
    pub fn with_patches(mut self, lr_size: usize) -> Self {
        self.patch = Some(lr_size.max(1));
        self
    }

    /// How many samples ship a ground-truth image
    pub fn ground_truth_count(&self) -> usize {
        self.pairs.iter().filter(|p| p.hr.is_some()).count()
    }

    fn load(&self, pair: &ImagePair) -> Result<SrSample> {
        let lr = load_image(&pair.lr)?;
        let hr = pair.hr.as_deref().map(load_image).transpose()?;
        let sample = SrSample::new(pair.id.clone(), lr, hr);
        match self.patch {
            Some(size) => random_patch(sample, size, self.scale),
            None       => Ok(sample),
        }
    }
}

impl Dataset<SrSample> for PairedImageDataset {
    fn get(&self, index: usize) -> Option<SrSample> {
        let pair = self.pairs.get(index)?;
        match self.load(pair) {
            Ok(sample) => Some(sample),
            Err(e) => {
                tracing::warn!("Cannot load sample '{}': {:#}", pair.id, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Aligned random crop of an LR/HR pair.
pub fn random_patch(sample: SrSample, lr_size: usize, scale: usize) -> Result<SrSample> {
    let lr = &sample.lr;
    if lr.width < lr_size || lr.height < lr_size {
        bail!("'{}' ({}) is smaller than the {}px patch", sample.id, lr.size_label(), lr_size);
    }
    let mut rng = rand::thread_rng();
    let top  = rng.gen_range(0..=lr.height - lr_size);
    let left = rng.gen_range(0..=lr.width - lr_size);

    let lr_patch = lr.crop(top, left, lr_size, lr_size)?;
    let hr_patch = match &sample.hr {
        Some(hr) => Some(
            hr.crop(top * scale, left * scale, lr_size * scale, lr_size * scale)
                .with_context(|| format!("HR image of '{}' is not {}x the LR image", sample.id, scale))?,
        ),
        None => None,
    };
    Ok(SrSample::new(sample.id, lr_patch, hr_patch))
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Cannot read dataset directory '{}'", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}
