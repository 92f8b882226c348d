// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Stacks SrSamples into [N, C, H, W] tensors.
//
// Samples in one batch must share a size. Patch training
// guarantees it; for whole-image batches every sample is
// cropped (top-left anchored) to the smallest size present
// so batch() never has to fail.
//
// Targets are only produced when every sample in the batch
// carries a ground-truth image.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::{image::SrImage, sample::SrSample};

// ─── SrBatch ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SrBatch<B: Backend> {
    /// Sample identifiers, in batch order
    pub ids: Vec<String>,

    /// Low-resolution inputs — shape: [batch, channels, h, w]
    pub inputs: Tensor<B, 4>,

    /// Ground-truth images — shape: [batch, channels, h·scale, w·scale]
    pub targets: Option<Tensor<B, 4>>,
}

impl<B: Backend> SrBatch<B> {
    pub fn from_samples(samples: &[SrSample], device: &B::Device) -> Self {
        let ids    = samples.iter().map(|s| s.id.clone()).collect();
        let lrs: Vec<&SrImage> = samples.iter().map(|s| &s.lr).collect();
        let inputs = stack_images(&lrs, device);

        let hrs: Option<Vec<&SrImage>> = samples.iter().map(|s| s.hr.as_ref()).collect();
        let targets = hrs.filter(|h| !h.is_empty()).map(|h| stack_images(&h, device));

        Self { ids, inputs, targets }
    }
}

/// Copy images into one [N, C, H, W] tensor at their common size.
pub fn stack_images<B: Backend>(images: &[&SrImage], device: &B::Device) -> Tensor<B, 4> {
    let n = images.len();
    let c = images.iter().map(|i| i.channels).min().unwrap_or(0);
    let h = images.iter().map(|i| i.height).min().unwrap_or(0);
    let w = images.iter().map(|i| i.width).min().unwrap_or(0);

    let mut flat = Vec::with_capacity(n * c * h * w);
    for img in images {
        if (img.channels, img.height, img.width) == (c, h, w) {
            flat.extend_from_slice(&img.data);
            continue;
        }
        for ch in 0..c {
            for y in 0..h {
                for x in 0..w {
                    flat.push(img.at(ch, y, x));
                }
            }
        }
    }
    Tensor::from_data(TensorData::new(flat, [n, c, h, w]), device)
}

// ─── SrBatcher ────────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SrBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SrBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

// The loader hands over pre-grouped batches (see sampler.rs),
// one group per call when built with batch_size(1).
impl<B: Backend> Batcher<Vec<SrSample>, SrBatch<B>> for SrBatcher<B> {
    fn batch(&self, items: Vec<Vec<SrSample>>) -> SrBatch<B> {
        let samples: Vec<SrSample> = items.into_iter().flatten().collect();
        SrBatch::from_samples(&samples, &self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn sample(id: &str, w: usize, h: usize, with_hr: bool) -> SrSample {
        let lr = SrImage::filled(3, h, w, 0.25);
        let hr = with_hr.then(|| SrImage::filled(3, h * 2, w * 2, 0.5));
        SrSample::new(id, lr, hr)
    }

    #[test]
    fn stacks_samples_into_nchw() {
        let device = Default::default();
        let batch  = SrBatch::<B>::from_samples(&[sample("a", 4, 3, true), sample("b", 4, 3, true)], &device);

        assert_eq!(batch.ids, vec!["a", "b"]);
        assert_eq!(batch.inputs.dims(), [2, 3, 3, 4]);
        assert_eq!(batch.targets.unwrap().dims(), [2, 3, 6, 8]);
    }

    #[test]
    fn mixed_sizes_are_cropped_to_the_smallest() {
        let device = Default::default();
        let batch  = SrBatch::<B>::from_samples(&[sample("a", 5, 4, true), sample("b", 3, 6, true)], &device);
        assert_eq!(batch.inputs.dims(), [2, 3, 4, 3]);
        assert_eq!(batch.targets.unwrap().dims(), [2, 3, 8, 6]);
    }

    #[test]
    fn no_targets_unless_every_sample_has_ground_truth() {
        let device = Default::default();
        let batch  = SrBatch::<B>::from_samples(&[sample("a", 2, 2, true), sample("b", 2, 2, false)], &device);
        assert!(batch.targets.is_none());
        assert_eq!(batch.ids.len(), 2);
    }

    #[test]
    fn single_image_stacks_to_batch_of_one() {
        let device = Default::default();
        let img    = SrImage::from_chw(1, 1, 2, vec![0.1, 0.9]).unwrap();
        let t      = stack_images::<B>(&[&img], &device);
        assert_eq!(t.dims(), [1, 1, 1, 2]);
        assert_eq!(t.into_data().to_vec::<f32>().unwrap(), vec![0.1, 0.9]);
    }

    #[test]
    fn grouped_batches_are_flattened() {
        let batcher = SrBatcher::<B>::new(Default::default());
        let group   = vec![sample("a", 2, 2, true), sample("b", 2, 2, true)];
        let batch: SrBatch<B> = batcher.batch(vec![group]);
        assert_eq!(batch.inputs.dims()[0], 2);
    }
}
