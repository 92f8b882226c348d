// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor math, no argument
// parsing. Each use case wires data, ml and infra together
// for one command.

// The training workflow and the experiment configuration
pub mod train_use_case;

// Single-pass testing and the benchmark sweep
pub mod eval_use_case;
