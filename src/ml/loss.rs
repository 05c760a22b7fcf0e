// ============================================================
// Layer 5 — Segmentation Loss
// ============================================================
// Per-pixel softmax cross-entropy that skips ignored pixels,
// and the composite FCN loss over main + auxiliary outputs.
//
//   CE(logits, target) = -Σ log softmax(logits)[target] / #valid
//   loss               = CE(main) + aux_weight · CE(aux)
//
// Pixels labelled IGNORE_INDEX (-1) contribute neither to the
// sum nor to the count. With no valid pixel the loss is 0.
//
// Reference: Long et al. (2015) Fully Convolutional Networks

use burn::{prelude::*, tensor::activation::log_softmax};

use crate::ml::model::SegOutput;

/// Mean cross-entropy over non-ignored pixels.
///
/// logits: [batch, classes, height, width]
/// targets: [batch, height, width], class index or negative to ignore
pub fn masked_cross_entropy<B: Backend>(
    logits:  Tensor<B, 4>,
    targets: Tensor<B, 3, Int>,
) -> Tensor<B, 1> {
    let [batch, classes, height, width] = logits.dims();
    let pixels = batch * height * width;

    // [B, C, H, W] → [B*H*W, C]
    let logits = logits.permute([0, 2, 3, 1]).reshape([pixels, classes]);
    let targets = targets.reshape([pixels]);

    let valid = targets.clone().greater_equal_elem(0);
    let safe  = targets.mask_fill(valid.clone().bool_not(), 0);

    let picked = log_softmax(logits, 1)
        .gather(1, safe.reshape([pixels, 1]))
        .reshape([pixels]);

    let weight = valid.float();
    let count  = weight.clone().sum().clamp_min(1.0);
    (picked * weight).sum().neg() / count
}

#[derive(Debug, Clone, Copy)]
pub struct SegLoss {
    pub aux_weight: f64,
}

impl SegLoss {
    pub fn new(aux_weight: f64) -> Self {
        Self { aux_weight }
    }

    pub fn forward<B: Backend>(
        &self,
        output:  SegOutput<B>,
        targets: Tensor<B, 3, Int>,
    ) -> Tensor<B, 1> {
        let main = masked_cross_entropy(output.main, targets.clone());
        let aux  = masked_cross_entropy(output.aux, targets);
        main + aux.mul_scalar(self.aux_weight)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type B = NdArray;

    fn scalar(t: Tensor<B, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_uniform_logits() {
        let device = Default::default();
        let logits  = Tensor::<B, 4>::zeros([1, 4, 2, 2], &device);
        let targets = Tensor::<B, 3, Int>::from_ints([[[0, 1], [2, 3]]], &device);
        let loss = scalar(masked_cross_entropy(logits, targets));
        assert!((loss - 4f64.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_ignored_pixels_are_skipped() {
        let device = Default::default();
        // pixel 0: confident and right; pixel 1: wrong but ignored
        let logits = Tensor::<B, 4>::from_floats(
            [[[[10.0, 0.0]], [[0.0, 10.0]]]],
            &device,
        );
        let targets = Tensor::<B, 3, Int>::from_ints([[[0, -1]]], &device);
        let loss = scalar(masked_cross_entropy(logits, targets));

        let expected = (1.0 + (-10f64).exp()).ln();
        assert!((loss - expected).abs() < 1e-4);
    }

    #[test]
    fn test_all_ignored_is_zero() {
        let device = Default::default();
        let logits  = Tensor::<B, 4>::ones([2, 3, 2, 2], &device);
        let targets = Tensor::<B, 3, Int>::full([2, 2, 2], -1, &device);
        assert_eq!(scalar(masked_cross_entropy(logits, targets)), 0.0);
    }

    #[test]
    fn test_composite_weights_aux() {
        let device = Default::default();
        let targets = Tensor::<B, 3, Int>::from_ints([[[0, 1]]], &device);
        let output = SegOutput {
            main: Tensor::<B, 4>::zeros([1, 2, 1, 2], &device),
            aux:  Tensor::<B, 4>::from_floats([[[[0.0, 5.0]], [[5.0, 0.0]]]], &device),
        };
        let aux_only = masked_cross_entropy(output.aux.clone(), targets.clone());
        let expected = 2f64.ln() + 0.2 * scalar(aux_only);

        let loss = scalar(SegLoss::new(0.2).forward(output, targets));
        assert!((loss - expected).abs() < 1e-5);
    }

    #[test]
    fn test_gradients_flow() {
        let device = Default::default();
        let logits = Tensor::<Autodiff<B>, 4>::zeros([1, 3, 2, 2], &device).require_grad();
        let targets = Tensor::<Autodiff<B>, 3, Int>::from_ints([[[0, 1], [2, -1]]], &device);

        let grads = masked_cross_entropy(logits.clone(), targets).backward();
        let grad = logits.grad(&grads).unwrap();
        assert_eq!(grad.dims(), [1, 3, 2, 2]);

        // the ignored pixel (1, 1) gets no gradient
        let ignored: Vec<f32> = grad
            .slice([0..1, 0..3, 1..2, 1..2])
            .into_data()
            .to_vec()
            .unwrap();
        assert!(ignored.iter().all(|g| g.abs() < 1e-7));
    }
}
