// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run:
//
//   Step 1: Validate the configuration
//   Step 2: Open the experiment directory        (Layer 6 - infra)
//   Step 3: Pair LR/HR training images           (Layer 4 - data)
//   Step 4: Build the network                    (Layer 5 - ml)
//   Step 5: Run the training loop                (Layer 5 - ml)
//
// The loop itself backs up sources, writes config.json and
// restores a checkpoint when fine-tuning.
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::dataset::PairedImageDataset;
use crate::infra::checkpoint::CheckpointStore;
use crate::ml::{
    compute_device,
    model::EspcnConfig,
    trainer::{run_training, TrainReport},
    TrainBackend,
};

// ─── Experiment Configuration ────────────────────────────────────────────────
// Everything a run needs, fixed for its whole lifetime.
// Saved as config.json so test/benchmark can rebuild the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub save_dir:            String,
    pub exp_name:            String,
    pub scale:               usize,
    pub batch_size:          usize,
    pub num_threads:         usize,
    pub epochs:              usize,
    pub lr:                  f64,
    pub scheduler_step_size: usize,
    pub scheduler_gamma:     f64,
    pub step_print_loss:     usize,
    pub step_save:           usize,
    pub is_finetuning:       bool,
    pub need_patch:          bool,
    pub patch_size:          usize,
    pub seed:                u64,
    pub channels:            usize,
    pub features:            usize,
    pub train_lr_dir:        String,
    pub train_hr_dir:        String,
    /// Source tree copied into codes/; None skips the backup
    pub code_dir:            Option<String>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            save_dir:            "experiments".to_string(),
            exp_name:            "espcn_x2".to_string(),
            scale:               2,
            batch_size:          16,
            num_threads:         4,
            epochs:              100,
            lr:                  1e-3,
            scheduler_step_size: 30,
            scheduler_gamma:     0.1,
            step_print_loss:     100,
            step_save:           1000,
            is_finetuning:       false,
            need_patch:          true,
            patch_size:          32,
            seed:                42,
            channels:            3,
            features:            64,
            train_lr_dir:        "data/train/LR".to_string(),
            train_hr_dir:        "data/train/HR".to_string(),
            code_dir:            Some("src".to_string()),
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.exp_name.trim().is_empty() {
            bail!("exp_name must not be empty");
        }
        for (name, value) in [
            ("scale", self.scale),
            ("batch_size", self.batch_size),
            ("step_print_loss", self.step_print_loss),
            ("step_save", self.step_save),
            ("scheduler_step_size", self.scheduler_step_size),
            ("channels", self.channels),
            ("features", self.features),
        ] {
            if value == 0 {
                bail!("{name} must be at least 1");
            }
        }
        if self.need_patch && self.patch_size == 0 {
            bail!("patch_size must be at least 1 when need_patch is set");
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            bail!("lr must be a positive number, got {}", self.lr);
        }
        Ok(())
    }

    /// The same experiment with whole-image evaluation forced on.
    pub fn for_evaluation(&self) -> Self {
        Self { need_patch: false, ..self.clone() }
    }

    pub fn model_config(&self) -> EspcnConfig {
        EspcnConfig::new(self.scale)
            .with_channels(self.channels)
            .with_features(self.features)
    }

    pub fn experiment_dir(&self) -> PathBuf {
        Path::new(&self.save_dir).join(&self.exp_name)
    }

    /// Default output folder of `test`
    pub fn testing_dir(&self) -> PathBuf {
        self.experiment_dir().join("testing_result")
    }

    /// Default output folder of `benchmark`
    pub fn benchmark_dir(&self) -> PathBuf {
        self.experiment_dir().join("benchmark_result")
    }

    /// Pair images in `lr_dir` / `hr_dir`, cropping patches only
    /// when this configuration asks for them.
    pub fn open_pairs(&self, lr_dir: &Path, hr_dir: Option<&Path>, require_hr: bool) -> Result<PairedImageDataset> {
        let dataset = PairedImageDataset::open(lr_dir, hr_dir, self.scale, require_hr)?;
        Ok(if self.need_patch { dataset.with_patches(self.patch_size) } else { dataset })
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: ExperimentConfig,
}

impl TrainUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        cfg.validate()?;

        let store   = CheckpointStore::new(&cfg.save_dir, &cfg.exp_name)?;
        let dataset = cfg.open_pairs(
            Path::new(&cfg.train_lr_dir),
            Some(Path::new(&cfg.train_hr_dir)),
            true,
        )?;
        if cfg.need_patch {
            tracing::info!("Training on random {}px LR patches", cfg.patch_size);
        }

        let device = compute_device();
        tracing::info!("Using device: {:?}", device);
        let model  = cfg.model_config().init::<TrainBackend>(&device);

        let (_, report) = run_training::<TrainBackend, _, _>(cfg, model, dataset, &store, &device)?;
        tracing::info!(
            "Finished {} steps; {} checkpoints in '{}'",
            report.steps, report.checkpoints.len(), store.dir().display()
        );
        Ok(report)
    }
}
