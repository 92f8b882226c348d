// ============================================================
// Layer 5 — Weight initialisation
// ============================================================
// Fresh (non fine-tuning) runs re-draw every 2D-convolution
// weight from a Kaiming normal distribution:
//
//   w ~ N(0, gain² / fan_in),   gain = √2,
//   fan_in = in_channels × kernel_h × kernel_w
//
// Every layer with a weight goes through `reinitialize`; the
// layer reports its kind and `initialize` decides what to do.
// Only Conv2d is re-drawn, other layers (PReLU slopes, ...)
// keep the values they were constructed with.
//
// Reference: He et al. (2015) Delving Deep into Rectifiers

use burn::{
    module::Param,
    nn::{conv::Conv2d, PRelu},
    prelude::*,
    tensor::Distribution,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Conv2d,
    Other,
}

/// Capability check: what kind of layer owns a weight tensor.
pub trait LayerKindOf {
    fn layer_kind(&self) -> LayerKind;
}

/// A layer with one weight tensor of rank `D` the initializer may replace.
pub trait WeightedLayer<B: Backend, const D: usize>: LayerKindOf {
    fn weight_mut(&mut self) -> &mut Param<Tensor<B, D>>;
}

impl<B: Backend> LayerKindOf for Conv2d<B> {
    fn layer_kind(&self) -> LayerKind {
        LayerKind::Conv2d
    }
}

impl<B: Backend> WeightedLayer<B, 4> for Conv2d<B> {
    fn weight_mut(&mut self) -> &mut Param<Tensor<B, 4>> {
        &mut self.weight
    }
}

impl<B: Backend> LayerKindOf for PRelu<B> {
    fn layer_kind(&self) -> LayerKind {
        LayerKind::Other
    }
}

impl<B: Backend> WeightedLayer<B, 1> for PRelu<B> {
    fn weight_mut(&mut self) -> &mut Param<Tensor<B, 1>> {
        &mut self.alpha
    }
}

/// New weight for a layer of the given kind. Non-convolution
/// tensors come back unchanged.
pub fn initialize<B: Backend, const D: usize>(kind: LayerKind, weight: Tensor<B, D>) -> Tensor<B, D> {
    match kind {
        LayerKind::Conv2d => kaiming_normal(weight),
        LayerKind::Other  => weight,
    }
}

fn kaiming_normal<B: Backend, const D: usize>(weight: Tensor<B, D>) -> Tensor<B, D> {
    let shape  = weight.shape();
    let fan_in = shape.dims.iter().skip(1).product::<usize>().max(1);
    let std    = (2.0 / fan_in as f64).sqrt();
    Tensor::random(shape, Distribution::Normal(0.0, std), &weight.device())
}

/// Pass a layer's weight through `initialize`, keeping its parameter
/// id so optimizer state stays attached.
pub fn reinitialize<B, L, const D: usize>(mut layer: L) -> L
where
    B: Backend,
    L: WeightedLayer<B, D>,
{
    let kind   = layer.layer_kind();
    let weight = layer.weight_mut();
    *weight = weight.clone().map(|w| initialize(kind, w).require_grad());
    layer
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::{conv::Conv2dConfig, PReluConfig};

    type B = NdArray<f32>;

    #[test]
    fn conv_weights_follow_kaiming_std() {
        let device = Default::default();
        // fan_in = 3 * 5 * 5 = 75 → std = sqrt(2/75) ≈ 0.1633
        let conv = reinitialize(Conv2dConfig::new([3, 64], [5, 5]).init::<B>(&device));
        let w: Vec<f32> = conv.weight.val().into_data().to_vec().unwrap();

        let n    = w.len() as f64;
        let mean = w.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var  = w.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        let expected = (2.0f64 / 75.0).sqrt();
        assert!(mean.abs() < 0.02, "mean {mean}");
        assert!((var.sqrt() - expected).abs() / expected < 0.1, "std {}", var.sqrt());
    }

    #[test]
    fn other_layers_are_left_alone() {
        let device = Default::default();
        let t   = Tensor::<B, 2>::ones([4, 4], &device);
        let out = initialize(LayerKind::Other, t.clone());
        assert_eq!(out.into_data(), t.into_data());
    }

    #[test]
    fn prelu_slopes_are_kept() {
        let device = Default::default();
        let prelu  = PReluConfig::new().with_num_parameters(4).init::<B>(&device);
        assert_eq!(prelu.layer_kind(), LayerKind::Other);

        let before = prelu.alpha.val().into_data();
        let after  = reinitialize(prelu).alpha.val().into_data();
        assert_eq!(before, after);
    }

    #[test]
    fn parameter_id_survives_reinit() {
        let device = Default::default();
        let conv   = Conv2dConfig::new([1, 2], [3, 3]).init::<B>(&device);
        let id     = conv.weight.id.clone();
        assert_eq!(reinitialize(conv).weight.id, id);
    }
}
