// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From image folders to tensor batches:
//
//   image folders
//       │
//       ▼
//   image_io            → decode / encode through the image crate
//       │
//       ▼
//   PairedImageDataset  → LR/HR pairs, optional random patches
//       │
//       ▼
//   DropLastBatches     → shuffled whole-batch plan per epoch
//       │
//       ▼
//   SrBatcher           → stacks samples into [N, C, H, W]
//       │
//       ▼
//   DataLoader          → parallel prefetch for the training loop

/// Image decoding and encoding
pub mod image_io;

/// Implements Burn's Dataset trait for LR/HR image pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Per-epoch shuffled batch plan that drops the partial batch
pub mod sampler;
