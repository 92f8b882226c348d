// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence and scoring used by more than one layer:
//
//   checkpoint.rs  — experiment directory: weights, optimizer
//                    state, config.json, log.txt, code backup
//
//   metrics.rs     — running PSNR/SSIM sums → dataset means,
//                    eval_result.txt
//
//   quality.rs     — Y-channel PSNR/SSIM kernel
//
//   comparison.rs  — per-benchmark CSV tables of published results
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Experiment directory: checkpoints, config and run log
pub mod checkpoint;

/// Metric accumulator and eval_result.txt
pub mod metrics;

/// PSNR / SSIM on the luminance channel
pub mod quality;

/// Benchmark comparison CSV tables
pub mod comparison;
