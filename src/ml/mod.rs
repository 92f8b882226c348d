// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
// All Burn model / optimisation code lives here.
//
//   model.rs     — SrModel trait + ESPCN sub-pixel network
//   init.rs      — Kaiming-normal initialisation of conv weights
//   schedule.rs  — step-decay learning-rate schedule
//   trainer.rs   — epoch/batch loop, L1 loss, Adam, checkpoints
//   evaluator.rs — single pass over a dataset, PSNR/SSIM means
//   benchmark.rs — Set5 / Set14 / BSD100 / Urban100 harness
//
// Training runs on Autodiff<ComputeBackend>; evaluation runs on
// the plain ComputeBackend via model.valid(), so no gradient
// graph exists while testing.

pub mod model;
pub mod init;
pub mod schedule;
pub mod trainer;
pub mod evaluator;
pub mod benchmark;

/// Backend for compute (WGPU by default, NdArray without the `wgpu` feature).
#[cfg(feature = "wgpu")]
pub type ComputeBackend = burn::backend::Wgpu;
#[cfg(not(feature = "wgpu"))]
pub type ComputeBackend = burn::backend::NdArray<f32>;

/// Backend used while training (gradient tracking enabled)
pub type TrainBackend = burn::backend::Autodiff<ComputeBackend>;

pub fn compute_device() -> <ComputeBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}
