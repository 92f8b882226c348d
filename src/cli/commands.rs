// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `test` and `benchmark`.
//
// clap's derive macros generate help text, missing-argument
// errors and string → number conversion for every field.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    eval_use_case::{BenchmarkRequest, TestRequest},
    train_use_case::ExperimentConfig,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a super-resolution model on paired LR/HR images
    Train(TrainArgs),

    /// Run a trained checkpoint over a folder of images
    Test(TestArgs),

    /// Evaluate a trained checkpoint on Set5, Set14, BSD100 and Urban100
    Benchmark(BenchmarkArgs),
}

/// Where an experiment lives; shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ExperimentArgs {
    /// Root folder for all experiments
    #[arg(long, default_value = "experiments")]
    pub save_dir: String,

    /// Experiment name; outputs go to <save_dir>/<exp_name>
    #[arg(long, default_value = "espcn_x2")]
    pub exp_name: String,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    /// Folder of low-resolution training images
    #[arg(long, default_value = "data/train/LR")]
    pub train_lr_dir: String,

    /// Folder of high-resolution images, same file names as the LR folder
    #[arg(long, default_value = "data/train/HR")]
    pub train_hr_dir: String,

    /// Upscaling factor
    #[arg(long, default_value_t = 2)]
    pub scale: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Loader worker threads
    #[arg(long, default_value_t = 4)]
    pub num_threads: usize,

    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Base learning rate of Adam
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Epochs between learning-rate decays
    #[arg(long, default_value_t = 30)]
    pub scheduler_step_size: usize,

    /// Multiplicative learning-rate decay
    #[arg(long, default_value_t = 0.1)]
    pub scheduler_gamma: f64,

    /// Print the loss every N steps
    #[arg(long, default_value_t = 100)]
    pub step_print_loss: usize,

    /// Save a checkpoint every N steps
    #[arg(long, default_value_t = 1000)]
    pub step_save: usize,

    /// Continue from the experiment's newest checkpoint
    #[arg(long)]
    pub is_finetuning: bool,

    /// Train on whole images instead of random patches
    #[arg(long)]
    pub no_patch: bool,

    /// Edge of the random LR patch, in pixels
    #[arg(long, default_value_t = 32)]
    pub patch_size: usize,

    /// Seed of the per-epoch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Colour channels of the images
    #[arg(long, default_value_t = 3)]
    pub channels: usize,

    /// Width of the first convolution
    #[arg(long, default_value_t = 64)]
    pub features: usize,

    /// Source tree to snapshot into <exp>/codes
    #[arg(long, default_value = "src")]
    pub code_dir: String,

    /// Skip the source snapshot
    #[arg(long)]
    pub no_backup: bool,
}

impl From<TrainArgs> for ExperimentConfig {
    fn from(a: TrainArgs) -> Self {
        ExperimentConfig {
            save_dir:            a.experiment.save_dir,
            exp_name:            a.experiment.exp_name,
            scale:               a.scale,
            batch_size:          a.batch_size,
            num_threads:         a.num_threads,
            epochs:              a.epochs,
            lr:                  a.lr,
            scheduler_step_size: a.scheduler_step_size,
            scheduler_gamma:     a.scheduler_gamma,
            step_print_loss:     a.step_print_loss,
            step_save:           a.step_save,
            is_finetuning:       a.is_finetuning,
            need_patch:          !a.no_patch,
            patch_size:          a.patch_size,
            seed:                a.seed,
            channels:            a.channels,
            features:            a.features,
            train_lr_dir:        a.train_lr_dir,
            train_hr_dir:        a.train_hr_dir,
            code_dir:            (!a.no_backup).then_some(a.code_dir),
        }
    }
}

#[derive(Args, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    /// Folder of low-resolution images to upscale
    #[arg(long)]
    pub lr_dir: PathBuf,

    /// Optional ground truth, same file names as the LR folder
    #[arg(long)]
    pub hr_dir: Option<PathBuf>,

    /// Output folder [default: <save_dir>/<exp_name>/testing_result]
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Do not write eval_result.txt
    #[arg(long)]
    pub no_save: bool,
}

impl From<TestArgs> for TestRequest {
    fn from(a: TestArgs) -> Self {
        TestRequest {
            save_dir: a.experiment.save_dir,
            exp_name: a.experiment.exp_name,
            lr_dir:   a.lr_dir,
            hr_dir:   a.hr_dir,
            out_dir:  a.out_dir,
            is_save:  !a.no_save,
        }
    }
}

#[derive(Args, Debug)]
pub struct BenchmarkArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    /// Folder holding Set5/, Set14/, BSD100/, Urban100/ and their CSV tables
    #[arg(long, default_value = "data/benchmark")]
    pub dir_benchmark: PathBuf,

    /// Output folder [default: <save_dir>/<exp_name>/benchmark_result]
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Skip the comparison tables
    #[arg(long)]
    pub no_compare: bool,
}

impl From<BenchmarkArgs> for BenchmarkRequest {
    fn from(a: BenchmarkArgs) -> Self {
        BenchmarkRequest {
            save_dir:      a.experiment.save_dir,
            exp_name:      a.experiment.exp_name,
            dir_benchmark: a.dir_benchmark,
            out_dir:       a.out_dir,
            is_compare:    !a.no_compare,
        }
    }
}
