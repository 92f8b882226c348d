// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands them to Layer 2.
//
//   1. `train`     — trains a model and writes checkpoints
//   2. `test`      — upscales a folder with the newest checkpoint
//   3. `benchmark` — Set5 / Set14 / BSD100 / Urban100 sweep
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BenchmarkArgs, Commands, TestArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "sr-bench",
    version = "0.1.0",
    about = "Train a super-resolution model and benchmark it on Set5/Set14/BSD100/Urban100."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Test(args)      => run_test(args),
            Commands::Benchmark(args) => run_benchmark(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;
    use crate::ml::trainer::format_elapsed;

    tracing::info!("Training on images in: {}", args.train_lr_dir);
    let report = TrainUseCase::new(args.into()).execute()?;

    if let Some(last) = report.loss_logs.last() {
        println!("Last loss: {last}");
    }
    println!(
        "Training complete: {} steps ({} per epoch), {} checkpoints in {}.",
        report.steps,
        report.batches_per_epoch,
        report.checkpoints.len(),
        format_elapsed(report.elapsed)
    );
    Ok(())
}

fn run_test(args: TestArgs) -> Result<()> {
    use crate::application::eval_use_case::TestUseCase;

    match TestUseCase::new(args.into()).execute()? {
        Some(mean) => println!("Mean psnr: {:.6}, ssim: {:.6}", mean.psnr, mean.ssim),
        None       => println!("No ground truth given; outputs written only."),
    }
    Ok(())
}

fn run_benchmark(args: BenchmarkArgs) -> Result<()> {
    use crate::application::eval_use_case::BenchmarkUseCase;

    let report = BenchmarkUseCase::new(args.into()).execute()?;
    println!("{:<10} {:>10} {:>8}  outputs", "set", "psnr", "ssim");
    for entry in &report.entries {
        let outputs = entry.output_dir.display();
        match entry.scores {
            Some(s) => println!("{:<10} {:>10.4} {:>8.4}  {}", entry.name, s.psnr, s.ssim, outputs),
            None    => println!("{:<10} {:>10} {:>8}  {}", entry.name, "-", "-", outputs),
        }
        if let Some(table) = &entry.table {
            println!("{:<10} table: {}", "", table.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::ExperimentConfig;

    #[test]
    fn train_args_map_onto_config() {
        let cli = Cli::try_parse_from([
            "sr-bench", "train", "--exp-name", "x3", "--scale", "3", "--no-patch", "--no-backup",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: ExperimentConfig = args.into();

        assert_eq!(cfg.exp_name, "x3");
        assert_eq!(cfg.scale, 3);
        assert!(!cfg.need_patch);
        assert!(cfg.code_dir.is_none());
        assert_eq!(cfg.step_save, 1000);
    }

    #[test]
    fn benchmark_compares_by_default() {
        let cli = Cli::try_parse_from(["sr-bench", "benchmark", "--dir-benchmark", "bench"]).unwrap();
        let Commands::Benchmark(args) = cli.command else { panic!("expected benchmark") };
        let req: crate::application::eval_use_case::BenchmarkRequest = args.into();
        assert!(req.is_compare);
        assert!(req.out_dir.is_none());
    }
}
