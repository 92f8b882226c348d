// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch/batch loop with L1 loss, Adam and a step-decay schedule.
//
// Per epoch:
//   lr   = schedule.lr_at(epoch)
//   plan = shuffled whole batches, partial batch dropped
//   for every batch:
//       output = model(lr_images)
//       loss   = mean |output − hr_images|
//       Adam step with lr
//
// The global step counter starts at 0. A loss line is printed
// whenever counter % step_print_loss == 0 (the reported loss is
// the sum since the previous line) and a checkpoint is written
// whenever counter % step_save == 0, except at counter 0.
//
// Burn gradients are returned per backward pass, so there is no
// zero_grad step. Training mode is the Autodiff backend itself.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Context, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::application::train_use_case::ExperimentConfig;
use crate::data::{
    batcher::SrBatcher,
    sampler::{batches_per_epoch, DropLastBatches},
};
use crate::domain::sample::SrSample;
use crate::infra::checkpoint::{CheckpointEntry, CheckpointStore};
use crate::ml::{model::SrModel, schedule::StepDecay};

/// What a finished run did, in addition to the files it left behind.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Optimizer steps taken over all epochs
    pub steps: usize,
    pub batches_per_epoch: usize,
    /// Every loss line, exactly as printed and logged
    pub loss_logs: Vec<String>,
    pub checkpoints: Vec<CheckpointEntry>,
    pub elapsed: Duration,
}

pub fn run_training<B, M, D>(
    cfg:     &ExperimentConfig,
    model:   M,
    dataset: D,
    store:   &CheckpointStore,
    device:  &B::Device,
) -> Result<(M, TrainReport)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SrModel<B>,
    D: Dataset<SrSample> + 'static,
{
    cfg.validate()?;
    let schedule = StepDecay::new(cfg.lr, cfg.scheduler_step_size, cfg.scheduler_gamma)?;
    let dataset  = Arc::new(dataset);
    let num_batch = batches_per_epoch(dataset.len(), cfg.batch_size);
    if num_batch == 0 {
        tracing::warn!(
            "{} samples cannot fill one batch of {}; no update will happen",
            dataset.len(), cfg.batch_size
        );
    }

    // ── Run bookkeeping ───────────────────────────────────────────────────────
    if let Some(code_dir) = &cfg.code_dir {
        let copied = store.backup_sources(Path::new(code_dir))?;
        tracing::info!("Backed up {} source files from '{}'", copied, code_dir);
    }
    store.save_config(cfg)?;

    let mut model = model.fork(device);
    let log = format!("num of parameters: {}", group_thousands(model.num_params()));
    store.save_log(&log)?;
    println!("{log}");

    // ── Optimiser and starting weights ────────────────────────────────────────
    let mut optim = AdamConfig::new().init::<B, M>();
    if cfg.is_finetuning {
        model = store.load_model::<B, M>(model, device)?;
        optim = store.load_optimizer::<B, M, _>(optim, device)?;
    } else {
        model = model.initialize_weights();
    }

    let mut report = TrainReport {
        steps: 0,
        batches_per_epoch: num_batch,
        loss_logs: Vec::new(),
        checkpoints: Vec::new(),
        elapsed: Duration::ZERO,
    };
    let start       = Instant::now();
    let mut counter = 0usize;

    println!("{:=^40}", " training start ");
    for epoch in 0..cfg.epochs {
        let lr   = schedule.lr_at(epoch);
        let plan = DropLastBatches::new(Arc::clone(&dataset), cfg.batch_size, cfg.seed, epoch);
        let planned = plan.len();

        // One loader item is one planned batch.
        let loader = DataLoaderBuilder::new(SrBatcher::<B>::new(device.clone()))
            .batch_size(1)
            .num_workers(cfg.num_threads.max(1))
            .build(plan);

        let mut running_loss = 0.0f64;
        let mut consumed     = 0usize;

        for (bidx, batch) in loader.iter().enumerate() {
            consumed += 1;
            let target = batch.targets.with_context(|| {
                format!("Training batch without ground truth: {:?}", batch.ids)
            })?;

            let output = model.forward(batch.inputs);
            if output.dims() != target.dims() {
                bail!(
                    "Model output {:?} does not match target {:?} for {:?}",
                    output.dims(), target.dims(), batch.ids
                );
            }

            let loss     = (output - target).abs().mean();
            let loss_val = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                bail!("Loss diverged ({loss_val}) at epoch {epoch}, step {counter}");
            }

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
            running_loss += loss_val;

            if counter % cfg.step_print_loss == 0 {
                let line = format!(
                    "epoch: ({}/{}) [{:5}/{:5}], loss: {:.6} | time: {}",
                    epoch, cfg.epochs, bidx, num_batch, running_loss,
                    format_elapsed(start.elapsed())
                );
                println!("{line}");
                store.save_log(&line)?;
                report.loss_logs.push(line);
                running_loss = 0.0;

                println!("learning rate: {lr}");
            }

            if counter > 0 && counter % cfg.step_save == 0 {
                report.checkpoints.push(store.save_training_state::<B, M, _>(&model, &optim, counter)?);
            }

            counter += 1;
        }

        // The loader stops at the first batch that fails to load.
        if consumed < planned {
            bail!(
                "Epoch {epoch} stopped after {consumed} of {planned} batches; a sample failed to load"
            );
        }
        tracing::debug!("Epoch {} done, lr {}", epoch, lr);
    }

    report.steps   = counter;
    report.elapsed = start.elapsed();
    println!("{:=^40}", " Finish ");
    let done = format!("training time: {}", format_elapsed(report.elapsed));
    println!("{done}\n");
    store.save_log(&done)?;

    Ok((model, report))
}

/// H:MM:SS.ffffff
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    format!(
        "{}:{:02}:{:02}.{:06}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        d.subsec_micros()
    )
}

/// 1234567 → "1,234,567"
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataset::InMemDataset;
    use std::fs;

    use crate::domain::image::SrImage;
    use crate::ml::model::EspcnConfig;

    type B = Autodiff<NdArray<f32>>;

    fn pairs(n: usize, with_hr: bool) -> InMemDataset<SrSample> {
        let samples = (0..n)
            .map(|i| {
                let v  = i as f32 / n as f32;
                let lr = SrImage::filled(3, 4, 4, v);
                let hr = with_hr.then(|| SrImage::filled(3, 8, 8, v));
                SrSample::new(format!("{i}.png"), lr, hr)
            })
            .collect();
        InMemDataset::new(samples)
    }

    fn config(save_dir: &Path) -> ExperimentConfig {
        ExperimentConfig {
            save_dir:        save_dir.display().to_string(),
            exp_name:        "unit".to_string(),
            scale:           2,
            batch_size:      2,
            num_threads:     1,
            epochs:          1,
            step_print_loss: 1,
            step_save:       1000,
            features:        4,
            code_dir:        None,
            ..ExperimentConfig::default()
        }
    }

    fn train(cfg: &ExperimentConfig, data: InMemDataset<SrSample>) -> Result<TrainReport> {
        let device = Default::default();
        let store  = CheckpointStore::new(&cfg.save_dir, &cfg.exp_name)?;
        let model  = EspcnConfig::new(cfg.scale).with_features(cfg.features).init::<B>(&device);
        run_training::<B, _, _>(cfg, model, data, &store, &device).map(|(_, r)| r)
    }

    #[test]
    fn drops_partial_batch_and_logs_every_step() {
        let tmp    = tempfile::tempdir().unwrap();
        let cfg    = config(tmp.path());
        let report = train(&cfg, pairs(5, true)).unwrap();

        assert_eq!(report.batches_per_epoch, 2);
        assert_eq!(report.steps, 2);
        assert_eq!(report.loss_logs.len(), 2);
        assert!(report.checkpoints.is_empty());
        assert!(report.loss_logs[0].starts_with("epoch: (0/1) [    0/    2], loss: "));

        let log = fs::read_to_string(tmp.path().join("unit/log.txt")).unwrap();
        assert!(log.starts_with("num of parameters: "));
        assert!(tmp.path().join("unit/config.json").exists());
    }

    #[test]
    fn checkpoints_follow_step_save_but_never_step_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ExperimentConfig { batch_size: 1, step_save: 2, step_print_loss: 3, ..config(tmp.path()) };
        let report = train(&cfg, pairs(6, true)).unwrap();

        let steps: Vec<usize> = report.checkpoints.iter().map(|c| c.step).collect();
        assert_eq!(steps, vec![2, 4]);
        assert_eq!(report.loss_logs.len(), 2);
        assert!(report.checkpoints.iter().all(|c| c.optimizer.is_some()));
    }

    #[test]
    fn finetuning_resumes_from_latest_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ExperimentConfig { step_save: 1, epochs: 2, ..config(tmp.path()) };
        let first = train(&cfg, pairs(4, true)).unwrap();

        // Same cadence again: the resumed run saves the same steps
        // within the same second and must still get fresh snapshots.
        let resumed = ExperimentConfig { is_finetuning: true, ..cfg };
        let second  = train(&resumed, pairs(4, true)).unwrap();
        assert_eq!(second.steps, 4);

        let steps: Vec<usize> = second.checkpoints.iter().map(|c| c.step).collect();
        assert_eq!(steps, vec![1, 2, 3]);
        for (a, b) in first.checkpoints.iter().zip(&second.checkpoints) {
            assert_ne!(a.model, b.model);
        }
    }

    #[test]
    fn finetuning_without_checkpoint_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ExperimentConfig { is_finetuning: true, ..config(tmp.path()) };
        let err = train(&cfg, pairs(4, true)).unwrap_err();
        assert!(format!("{err:#}").contains("No checkpoint found"));
    }

    #[test]
    fn batch_without_ground_truth_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = train(&config(tmp.path()), pairs(4, false)).unwrap_err();
        assert!(err.to_string().contains("without ground truth"));
    }

    #[test]
    fn elapsed_formats_like_a_timedelta() {
        assert_eq!(format_elapsed(Duration::from_micros(3_723_000_042)), "1:02:03.000042");
        assert_eq!(format_elapsed(Duration::ZERO), "0:00:00.000000");
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(57_281), "57,281");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
