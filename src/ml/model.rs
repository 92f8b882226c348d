// ============================================================
// Layer 5 — Super-resolution network
// ============================================================
// ESPCN: every convolution runs at low resolution and the
// last one emits scale² channels per colour, which pixel
// shuffle rearranges into the high-resolution grid.
//
//   [N, C, H, W]
//       │ conv 5x5 → features, PReLU
//       │ conv 3x3 → features/2, PReLU
//       │ conv 3x3 → C·scale²
//       ▼ pixel shuffle
//   [N, C, H·scale, W·scale]
//
// Reference: Shi et al. (2016) Real-Time Single Image and Video
//            Super-Resolution Using an Efficient Sub-Pixel CNN

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PRelu, PReluConfig, PaddingConfig2d,
    },
    prelude::*,
};

use crate::ml::init::reinitialize;

/// What the trainer and evaluator need from a super-resolution network.
pub trait SrModel<B: Backend>: Module<B> {
    /// [batch, channels, h, w] → [batch, channels, h·scale, w·scale]
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4>;

    /// Pass every weighted layer through the initializer. Only 2D
    /// convolutions are re-drawn; everything else is left as constructed.
    fn initialize_weights(self) -> Self;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct EspcnConfig {
    /// Upscaling factor
    pub scale: usize,
    /// Colour channels in and out
    #[config(default = 3)]
    pub channels: usize,
    /// Width of the first convolution; the second uses half
    #[config(default = 64)]
    pub features: usize,
}

impl EspcnConfig {
    /// Build the network on `device` with Burn's default initialisation.
    /// Training replaces the convolution weights via `initialize_weights`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Espcn<B> {
        let hidden = (self.features / 2).max(1);
        let conv1 = Conv2dConfig::new([self.channels, self.features], [5, 5])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv2 = Conv2dConfig::new([self.features, hidden], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv3 = Conv2dConfig::new([hidden, self.channels * self.scale * self.scale], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let act1 = PReluConfig::new().with_num_parameters(self.features).init(device);
        let act2 = PReluConfig::new().with_num_parameters(hidden).init(device);
        Espcn { conv1, act1, conv2, act2, conv3, scale: self.scale }
    }
}

#[derive(Module, Debug)]
pub struct Espcn<B: Backend> {
    pub conv1: Conv2d<B>,
    pub act1:  PRelu<B>,
    pub conv2: Conv2d<B>,
    pub act2:  PRelu<B>,
    pub conv3: Conv2d<B>,
    pub scale: usize,
}

impl<B: Backend> SrModel<B> for Espcn<B> {
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.act1.forward(self.conv1.forward(input));
        let x = self.act2.forward(self.conv2.forward(x));
        pixel_shuffle(self.conv3.forward(x), self.scale)
    }

    fn initialize_weights(self) -> Self {
        Self {
            conv1: reinitialize(self.conv1),
            act1:  reinitialize(self.act1),
            conv2: reinitialize(self.conv2),
            act2:  reinitialize(self.act2),
            conv3: reinitialize(self.conv3),
            scale: self.scale,
        }
    }
}

/// [n, c·r², h, w] → [n, c, h·r, w·r]
/// out[c, y·r + i, x·r + j] = in[c·r² + i·r + j, y, x]
pub fn pixel_shuffle<B: Backend>(x: Tensor<B, 4>, r: usize) -> Tensor<B, 4> {
    let [n, crr, h, w] = x.dims();
    let c = crr / (r * r);
    x.reshape([n, c, r, r, h, w])
        .permute([0, 1, 4, 2, 5, 3])
        .reshape([n, c, h * r, w * r])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn pixel_shuffle_interleaves_channels() {
        let device = Default::default();
        let x = Tensor::<B, 1>::from_floats([0.0, 1.0, 2.0, 3.0], &device).reshape([1, 4, 1, 1]);
        let y = pixel_shuffle(x, 2);
        assert_eq!(y.dims(), [1, 1, 2, 2]);
        assert_eq!(y.into_data().to_vec::<f32>().unwrap(), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn initialize_redraws_convolutions_only() {
        let device = Default::default();
        let model  = EspcnConfig::new(2).with_features(8).init::<B>(&device);
        let conv   = model.conv1.weight.val().into_data();
        let slope  = model.act1.alpha.val().into_data();

        let model = model.initialize_weights();
        assert_ne!(model.conv1.weight.val().into_data(), conv);
        assert_eq!(model.act1.alpha.val().into_data(), slope);
    }

    #[test]
    fn output_is_scaled() {
        let device = Default::default();
        let model  = EspcnConfig::new(3).with_features(8).init::<B>(&device);
        let out    = model.forward(Tensor::zeros([2, 3, 5, 7], &device));
        assert_eq!(out.dims(), [2, 3, 15, 21]);
    }
}
