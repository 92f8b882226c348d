// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what the harness works on:
//
//   image.rs  — SrImage, a planar CHW float image in [0, 1]
//   sample.rs — SrSample, one (id, low-res, optional high-res) record
//   score.rs  — MetricRecord, the (psnr, ssim) pair for one image
//   traits.rs — MetricKernel, the seam to the PSNR/SSIM maths
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Planar float image used between the codec and the tensor world
pub mod image;

/// A single super-resolution sample with optional ground truth
pub mod sample;

/// Per-image quality scores
pub mod score;

/// Core abstractions implemented by other layers
pub mod traits;
