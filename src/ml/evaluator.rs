// ============================================================
// Layer 5 — Single-Pass Evaluator
// ============================================================
// Runs the model once over every sample, in dataset order and
// one image at a time:
//
//   lr ──forward──▶ clamp[0,1] ──▶ SrImage ──▶ <out_dir>/<id>
//                                    │
//                                    └─ with ground truth ─▶ PSNR / SSIM
//
// Models arrive on the plain (non-autodiff) backend, usually via
// model.valid(), so no gradient graph can be recorded here.
// Scoring is delegated to a MetricKernel.

use anyhow::{anyhow, bail, Context, Result};
use burn::{data::dataset::Dataset, prelude::*};
use std::{fs, path::Path, time::Instant};

use crate::data::{batcher::stack_images, image_io::save_image};
use crate::domain::{image::SrImage, sample::SrSample, score::MetricRecord, traits::MetricKernel};
use crate::infra::metrics::{format_report, write_eval_report, MetricAccumulator};
use crate::ml::{model::SrModel, trainer::format_elapsed};

pub struct Evaluator<K: MetricKernel> {
    kernel: K,
}

impl<K: MetricKernel> Evaluator<K> {
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }

    /// Returns the dataset-mean scores, or None when no sample had
    /// ground truth. With `is_save`, the means are also written to
    /// `<out_dir>/eval_result.txt`.
    pub fn evaluate<B, M, D>(
        &self,
        model:   &M,
        dataset: &D,
        out_dir: Option<&Path>,
        is_save: bool,
        device:  &B::Device,
    ) -> Result<Option<MetricRecord>>
    where
        B: Backend,
        M: SrModel<B>,
        D: Dataset<SrSample>,
    {
        if let Some(dir) = out_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        }

        let num_img   = dataset.len();
        let mut acc   = MetricAccumulator::new();
        let start     = Instant::now();

        println!("{:=^40}", " testing start ");
        for idx in 0..num_img {
            let sample = dataset
                .get(idx)
                .with_context(|| format!("Cannot load evaluation sample {idx}"))?;

            // Only the LR image goes to the device; scoring runs on the host copy of HR.
            let input  = stack_images::<B>(&[&sample.lr], device);
            let output = model.forward(input).clamp(0.0, 1.0);
            let sr     = tensor_to_image(output)?;

            println!("({}/{}) size: {} -> {}", idx, num_img, sample.lr.size_label(), sr.size_label());

            if let Some(dir) = out_dir {
                let path = dir.join(&sample.id);
                println!(" =>  {}", path.display());
                save_image(&sr, &path)?;
            }

            if let Some(hr) = &sample.hr {
                let record = self
                    .kernel
                    .score(&sr, hr)
                    .with_context(|| format!("Cannot score '{}'", sample.id))?;
                println!("    psnr: {:.5}, ssim: {:.5}\n", record.psnr, record.ssim);
                acc.add(record);
            }
        }

        println!("{:=^40}", " Finish ");
        println!("testing time: {}\n", format_elapsed(start.elapsed()));

        let Some(mean) = acc.mean() else {
            tracing::info!("No ground truth in this dataset; skipping metrics");
            return Ok(None);
        };
        if acc.count() < num_img {
            tracing::warn!(
                "Only {} of {} samples have ground truth; means cover those samples",
                acc.count(), num_img
            );
        }
        println!("{}", format_report(&mean));

        if is_save {
            match out_dir {
                Some(dir) => {
                    let path = write_eval_report(dir, &mean)?;
                    tracing::info!("Wrote '{}'", path.display());
                }
                None => tracing::warn!("No output directory; metrics were not written"),
            }
        }
        Ok(Some(mean))
    }
}

/// First image of an [n, c, h, w] tensor.
pub fn tensor_to_image<B: Backend>(tensor: Tensor<B, 4>) -> Result<SrImage> {
    let [n, c, h, w] = tensor.dims();
    if n == 0 {
        bail!("Empty output batch");
    }
    let first = if n > 1 { tensor.slice([0..1, 0..c, 0..h, 0..w]) } else { tensor };
    let data = first
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read model output: {e:?}"))?;
    SrImage::from_chw(c, h, w, data)
}
