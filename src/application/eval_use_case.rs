// ============================================================
// Layer 2 — Test & Benchmark Use Cases
// ============================================================
// Both flows rebuild the network from the experiment's
// config.json, restore the newest checkpoint and evaluate on
// the inference backend:
//
//   config.json ──▶ EspcnConfig ──▶ load_model ──▶ .valid()
//                                                     │
//              TestUseCase       ◀────────────────────┤
//              BenchmarkUseCase  ◀────────────────────┘
//
// The loaded configuration is always turned into its evaluation
// copy first, so patches are never cropped here.

use anyhow::{Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use std::path::PathBuf;

use crate::application::train_use_case::ExperimentConfig;
use crate::domain::score::MetricRecord;
use crate::infra::{checkpoint::CheckpointStore, quality::LumaKernel};
use crate::ml::{
    benchmark::{BenchmarkHarness, BenchmarkReport},
    compute_device,
    evaluator::Evaluator,
    model::Espcn,
    ComputeBackend, TrainBackend,
};

/// Restore the experiment's config (evaluation copy) and newest
/// weights, returned on the inference backend.
fn restore<B: AutodiffBackend>(
    save_dir: &str,
    exp_name: &str,
    device:   &B::Device,
) -> Result<(ExperimentConfig, Espcn<B::InnerBackend>)> {
    let store = CheckpointStore::new(save_dir, exp_name)?;
    let cfg   = store
        .load_config()
        .with_context(|| format!("Experiment '{exp_name}' has no saved configuration"))?
        .for_evaluation();

    let model = cfg.model_config().init::<B>(device);
    let model = store.load_model::<B, _>(model, device)?;
    Ok((cfg, model.valid()))
}

// ─── TestUseCase ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TestRequest {
    pub save_dir: String,
    pub exp_name: String,
    pub lr_dir:   PathBuf,
    pub hr_dir:   Option<PathBuf>,
    /// Defaults to <save_dir>/<exp_name>/testing_result
    pub out_dir:  Option<PathBuf>,
    pub is_save:  bool,
}

pub struct TestUseCase {
    request: TestRequest,
}

impl TestUseCase {
    pub fn new(request: TestRequest) -> Self {
        Self { request }
    }

    pub fn execute(&self) -> Result<Option<MetricRecord>> {
        let req = &self.request;
        let device = compute_device();
        let (cfg, model) = restore::<TrainBackend>(&req.save_dir, &req.exp_name, &device)?;
        let out_dir = req.out_dir.clone().unwrap_or_else(|| cfg.testing_dir());

        let dataset = cfg.open_pairs(&req.lr_dir, req.hr_dir.as_deref(), false)?;
        if req.hr_dir.is_some() && dataset.ground_truth_count() == 0 {
            tracing::warn!("No file in the HR folder matches an LR file name; no metrics will be computed");
        }
        let evaluator = Evaluator::new(LumaKernel::new(cfg.scale));
        evaluator.evaluate::<ComputeBackend, _, _>(
            &model,
            &dataset,
            Some(&out_dir),
            req.is_save,
            &device,
        )
    }
}

// ─── BenchmarkUseCase ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct BenchmarkRequest {
    pub save_dir:      String,
    pub exp_name:      String,
    pub dir_benchmark: PathBuf,
    /// Defaults to <save_dir>/<exp_name>/benchmark_result
    pub out_dir:       Option<PathBuf>,
    pub is_compare:    bool,
}

pub struct BenchmarkUseCase {
    request: BenchmarkRequest,
}

impl BenchmarkUseCase {
    pub fn new(request: BenchmarkRequest) -> Self {
        Self { request }
    }

    pub fn execute(&self) -> Result<BenchmarkReport> {
        let req = &self.request;
        let device = compute_device();
        let (cfg, model) = restore::<TrainBackend>(&req.save_dir, &req.exp_name, &device)?;
        let out_dir = req.out_dir.clone().unwrap_or_else(|| cfg.benchmark_dir());

        let evaluator = Evaluator::new(LumaKernel::new(cfg.scale));
        let harness = BenchmarkHarness {
            evaluator:     &evaluator,
            dir_benchmark: &req.dir_benchmark,
            out_dir:       &out_dir,
            scale:         cfg.scale,
            method:        &cfg.exp_name,
            is_compare:    req.is_compare,
        };
        harness.run::<ComputeBackend, _>(&model, &device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::{Distribution, Tensor};

    use crate::ml::model::SrModel;

    type B = Autodiff<NdArray<f32>>;

    fn experiment(save_dir: &std::path::Path) -> ExperimentConfig {
        ExperimentConfig {
            save_dir:   save_dir.display().to_string(),
            exp_name:   "restore".to_string(),
            features:   4,
            need_patch: true,
            code_dir:   None,
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn restore_rebuilds_the_saved_experiment() {
        let tmp    = tempfile::tempdir().unwrap();
        let cfg    = experiment(tmp.path());
        let store  = CheckpointStore::new(&cfg.save_dir, &cfg.exp_name).unwrap();
        let device = Default::default();

        store.save_config(&cfg).unwrap();
        let trained = cfg.model_config().init::<B>(&device).initialize_weights();
        store.save_model::<B, _>(&trained, 5).unwrap();

        let (loaded, model) = restore::<B>(&cfg.save_dir, &cfg.exp_name, &device).unwrap();
        assert!(!loaded.need_patch);
        assert_eq!(loaded, cfg.for_evaluation());

        let input = Tensor::<NdArray<f32>, 4>::random([1, 3, 4, 4], Distribution::Default, &device);
        let a = trained.valid().forward(input.clone()).into_data().to_vec::<f32>().unwrap();
        let b = model.forward(input).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn restore_without_config_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = experiment(tmp.path());
        let err = restore::<B>(&cfg.save_dir, &cfg.exp_name, &Default::default()).unwrap_err();
        assert!(format!("{err:#}").contains("no saved configuration"));
    }

    #[test]
    fn restore_without_checkpoint_fails() {
        let tmp   = tempfile::tempdir().unwrap();
        let cfg   = experiment(tmp.path());
        let store = CheckpointStore::new(&cfg.save_dir, &cfg.exp_name).unwrap();
        store.save_config(&cfg).unwrap();

        let err = restore::<B>(&cfg.save_dir, &cfg.exp_name, &Default::default()).unwrap_err();
        assert!(format!("{err:#}").contains("No checkpoint found"));
    }
}
