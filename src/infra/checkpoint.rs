// ============================================================
// Layer 6 — Checkpoint Store
// ============================================================
// Persists everything an experiment leaves on disk.
//
// Layout under <save_dir>/<exp_name>/:
//
//   model_00001000_1760771234.mpk   ← weights at global step 1000
//   optim_00001000_1760771234.mpk   ← Adam moments at the same step
//   latest_checkpoint.json          ← which snapshot is newest
//   config.json                     ← ExperimentConfig of the run
//   log.txt                         ← append-only run log
//   codes/                          ← copy of the sources that ran
//
// Snapshots are keyed by step and stamped with the wall clock,
// and a snapshot file is never overwritten: a second save under
// the same name is an error. Restoring always goes through
// latest_checkpoint.json.
//
// Recording uses full precision so a save/load round-trip
// reproduces outputs exactly.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use burn::{
    module::{AutodiffModule, Module},
    optim::Optimizer,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::{AutodiffBackend, Backend},
};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::application::train_use_case::ExperimentConfig;

type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

const RECORD_EXT:  &str = "mpk";
const LATEST_FILE: &str = "latest_checkpoint.json";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE:    &str = "log.txt";
const CODES_DIR:   &str = "codes";

/// One saved snapshot, as recorded in latest_checkpoint.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub step:      usize,
    /// Model record name, without extension
    pub model:     String,
    /// Optimizer record name, when the optimizer was saved alongside
    pub optimizer: Option<String>,
    /// Seconds since the Unix epoch
    pub saved_at:  u64,
}

/// Saves and restores snapshots for one experiment directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Open (and create if needed) <save_dir>/<exp_name>.
    pub fn new(save_dir: impl AsRef<Path>, exp_name: &str) -> Result<Self> {
        let dir = save_dir.as_ref().join(exp_name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create experiment directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights only.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, step: usize) -> Result<CheckpointEntry> {
        let saved_at   = unix_secs();
        let stem       = self.free_stem(step, saved_at);
        let model_name = snapshot_name("model", &stem);
        self.record_model::<B, M>(model, &model_name)?;

        let entry = CheckpointEntry { step, model: model_name, optimizer: None, saved_at };
        self.write_latest(&entry)?;
        Ok(entry)
    }

    /// Save model weights and optimizer state for the same step.
    pub fn save_training_state<B, M, O>(&self, model: &M, optim: &O, step: usize) -> Result<CheckpointEntry>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        // The model snapshot claims a stem that is free for both kinds.
        let mut entry  = self.save_model::<B, M>(model, step)?;
        let optim_name = entry.model.replacen("model", "optim", 1);

        let path = self.fresh_path(&optim_name)?;
        Recorder::<B>::record(&CheckpointRecorder::new(), optim.to_record(), path.clone())
            .with_context(|| format!("Failed to save optimizer state to '{}'", path.display()))?;

        entry.optimizer = Some(optim_name);
        self.write_latest(&entry)?;
        tracing::info!("Saved checkpoint at step {} in '{}'", step, self.dir.display());
        Ok(entry)
    }

    /// The newest snapshot of this experiment.
    pub fn latest(&self) -> Result<CheckpointEntry> {
        let path = self.dir.join(LATEST_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "No checkpoint found in '{}'. Train the experiment (or check --exp-name) first.",
                self.dir.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Corrupt checkpoint pointer '{}'", path.display()))
    }

    /// Restore the newest weights into `model`.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let entry = self.latest()?;
        let path  = self.dir.join(&entry.model);
        tracing::info!("Loading checkpoint '{}' (step {})", entry.model, entry.step);

        let record = Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    /// Restore optimizer state saved with the newest snapshot, if any.
    /// Returns the optimizer unchanged when the snapshot has none.
    pub fn load_optimizer<B, M, O>(&self, optim: O, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let entry = self.latest()?;
        let Some(name) = entry.optimizer else {
            tracing::warn!("Checkpoint '{}' has no optimizer state; starting Adam from scratch", entry.model);
            return Ok(optim);
        };
        let path = self.dir.join(&name);
        let record = Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load optimizer state '{}'", path.display()))?;
        tracing::info!("Restored optimizer state from '{}'", name);
        Ok(optim.load_record(record))
    }

    /// Append one line to log.txt, creating it on first use.
    pub fn save_log(&self, line: &str) -> Result<()> {
        let path = self.log_path();
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Cannot open run log '{}'", path.display()))?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub fn save_config(&self, cfg: &ExperimentConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved experiment config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ExperimentConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Copy the .rs/.toml files under `src` into codes/, keeping
    /// relative paths. Returns the number of files copied.
    pub fn backup_sources(&self, src: &Path) -> Result<usize> {
        let dest = self.dir.join(CODES_DIR);
        fs::create_dir_all(&dest)
            .with_context(|| format!("Cannot create '{}'", dest.display()))?;
        if !src.is_dir() {
            tracing::warn!("Source directory '{}' not found; skipping code backup", src.display());
            return Ok(0);
        }
        copy_sources(src, &dest)
    }

    fn record_model<B: Backend, M: Module<B>>(&self, model: &M, name: &str) -> Result<()> {
        let path = self.fresh_path(name)?;
        Recorder::<B>::record(&CheckpointRecorder::new(), model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        tracing::debug!("Recorded '{}'", path.display());
        Ok(())
    }

    /// `{step:08}_{unix_secs}`, suffixed `_1`, `_2`, ... when that step
    /// was already saved within the same second (e.g. a fine-tune run
    /// whose step counter restarted).
    fn free_stem(&self, step: usize, saved_at: u64) -> String {
        let base  = format!("{step:08}_{saved_at}");
        let taken = |stem: &str| {
            ["model", "optim"].iter().any(|kind| {
                self.dir.join(snapshot_name(kind, stem)).with_extension(RECORD_EXT).exists()
            })
        };
        if !taken(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|stem| !taken(stem))
            .unwrap_or(base)
    }

    /// Path (without extension) for a new record; refuses existing files.
    fn fresh_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        if path.with_extension(RECORD_EXT).exists() {
            bail!("Checkpoint '{}' already exists; snapshots are never overwritten", name);
        }
        Ok(path)
    }

    fn write_latest(&self, entry: &CheckpointEntry) -> Result<()> {
        let path = self.dir.join(LATEST_FILE);
        fs::write(&path, serde_json::to_string_pretty(entry)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

fn snapshot_name(kind: &str, stem: &str) -> String {
    format!("{kind}_{stem}")
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn copy_sources(src: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in fs::read_dir(src).with_context(|| format!("Cannot read '{}'", src.display()))? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None    => continue,
        };
        if name.starts_with('.') || name == "target" || name == "examples" {
            continue;
        }
        if path.is_dir() {
            let sub = dest.join(&name);
            fs::create_dir_all(&sub)?;
            copied += copy_sources(&path, &sub)?;
        } else if matches!(path.extension().and_then(|e| e.to_str()), Some("rs" | "toml")) {
            fs::copy(&path, dest.join(&name))
                .with_context(|| format!("Cannot back up '{}'", path.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, Tensor};

    use crate::ml::model::{EspcnConfig, SrModel};

    type B = NdArray<f32>;

    #[test]
    fn save_log_appends_lines() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path(), "exp").unwrap();
        store.save_log("first").unwrap();
        store.save_log("second").unwrap();
        let text = fs::read_to_string(store.log_path()).unwrap();
        assert_eq!(text, "first\nsecond\n");
    }

    #[test]
    fn load_without_checkpoint_fails_loudly() {
        let tmp    = tempfile::tempdir().unwrap();
        let store  = CheckpointStore::new(tmp.path(), "missing").unwrap();
        let device = Default::default();
        let model  = EspcnConfig::new(2).with_features(4).init::<B>(&device);
        let err    = store.load_model::<B, _>(model, &device).unwrap_err();
        assert!(format!("{err:#}").contains("No checkpoint found"));
    }

    #[test]
    fn round_trip_reproduces_outputs() {
        let tmp    = tempfile::tempdir().unwrap();
        let store  = CheckpointStore::new(tmp.path(), "exp").unwrap();
        let device = Default::default();
        let cfg    = EspcnConfig::new(2).with_features(4);

        let trained = cfg.init::<B>(&device).initialize_weights();
        store.save_model::<B, _>(&trained, 10).unwrap();

        let fresh    = cfg.init::<B>(&device);
        let restored = store.load_model::<B, _>(fresh, &device).unwrap();

        let input = Tensor::<B, 4>::random([1, 3, 5, 5], Distribution::Default, &device);
        let a = trained.forward(input.clone()).into_data().to_vec::<f32>().unwrap();
        let b = restored.forward(input).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn snapshots_accumulate_and_latest_moves() {
        let tmp    = tempfile::tempdir().unwrap();
        let store  = CheckpointStore::new(tmp.path(), "exp").unwrap();
        let device = Default::default();
        let model  = EspcnConfig::new(2).with_features(4).init::<B>(&device);

        let first  = store.save_model::<B, _>(&model, 1).unwrap();
        let second = store.save_model::<B, _>(&model, 2).unwrap();
        assert_eq!(store.latest().unwrap(), second);
        assert!(store.dir().join(format!("{}.mpk", first.model)).exists());
        assert!(store.dir().join(format!("{}.mpk", second.model)).exists());
    }

    #[test]
    fn same_step_in_same_second_gets_a_new_name() {
        let tmp    = tempfile::tempdir().unwrap();
        let store  = CheckpointStore::new(tmp.path(), "exp").unwrap();
        let device = Default::default();
        let model  = EspcnConfig::new(2).with_features(4).init::<B>(&device);

        let entries: Vec<CheckpointEntry> =
            (0..3).map(|_| store.save_model::<B, _>(&model, 7).unwrap()).collect();
        assert_ne!(entries[0].model, entries[1].model);
        assert_ne!(entries[1].model, entries[2].model);
        for e in &entries {
            assert_eq!(e.step, 7);
            assert!(e.model.starts_with("model_00000007_"));
            assert!(store.dir().join(format!("{}.mpk", e.model)).exists());
        }
        assert_eq!(store.latest().unwrap(), entries[2]);
    }

    #[test]
    fn backup_copies_sources_only() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("ml")).unwrap();
        fs::write(src.join("main.rs"), "fn main() {}").unwrap();
        fs::write(src.join("ml/model.rs"), "").unwrap();
        fs::write(src.join("notes.md"), "").unwrap();

        let store  = CheckpointStore::new(tmp.path().join("out"), "exp").unwrap();
        let copied = store.backup_sources(&src).unwrap();
        assert_eq!(copied, 2);
        assert!(store.dir().join("codes/ml/model.rs").exists());
        assert!(!store.dir().join("codes/notes.md").exists());
    }
}
