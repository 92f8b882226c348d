// ============================================================
// Layer 3 — SrSample
// ============================================================
// One record flowing from a dataset into either loop.
// Ground truth is optional: benchmark folders sometimes only
// ship the low-resolution inputs.

use crate::domain::image::SrImage;

#[derive(Debug, Clone)]
pub struct SrSample {
    /// File name used for the output image, e.g. "img_001_SRF_2_SR.png"
    pub id: String,
    /// Low-resolution input
    pub lr: SrImage,
    /// High-resolution target, if the dataset has one for this sample
    pub hr: Option<SrImage>,
}

impl SrSample {
    pub fn new(id: impl Into<String>, lr: SrImage, hr: Option<SrImage>) -> Self {
        Self { id: id.into(), lr, hr }
    }
}
