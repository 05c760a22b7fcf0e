// ============================================================
// Layer 5 — Validation Metrics
// ============================================================
// Pixel accuracy and mean IoU from a confusion matrix.
//
//   confusion[target][pred] += 1   for every labelled pixel
//
//   pixAcc = Σ diag / Σ all
//   IoU_c  = TP_c / (TP_c + FP_c + FN_c)
//   mIoU   = mean IoU over classes present in target or prediction
//
// Pixels with a negative label are not counted.
//
// Reference: Long et al. (2015) §5 (metrics)

use anyhow::{anyhow, bail, Result};
use burn::prelude::*;

use crate::data::batcher::SegBatch;
use crate::ml::model::FcnModel;

#[derive(Debug, Clone)]
pub struct SegmentationMetric {
    num_classes: usize,
    confusion:   Vec<u64>,
}

impl SegmentationMetric {
    pub fn new(num_classes: usize) -> Self {
        Self { num_classes, confusion: vec![0; num_classes * num_classes] }
    }

    /// Accumulate one batch of flattened predictions and targets.
    pub fn update(&mut self, preds: &[i64], targets: &[i64]) {
        let n = self.num_classes as i64;
        for (&p, &t) in preds.iter().zip(targets) {
            if t < 0 || t >= n || p < 0 || p >= n {
                continue;
            }
            self.confusion[t as usize * self.num_classes + p as usize] += 1;
        }
    }

    fn cell(&self, target: usize, pred: usize) -> u64 {
        self.confusion[target * self.num_classes + pred]
    }

    pub fn labeled(&self) -> u64 {
        self.confusion.iter().sum()
    }

    pub fn pixel_accuracy(&self) -> f64 {
        let labeled = self.labeled();
        if labeled == 0 {
            return 0.0;
        }
        let correct: u64 = (0..self.num_classes).map(|c| self.cell(c, c)).sum();
        correct as f64 / labeled as f64
    }

    pub fn mean_iou(&self) -> f64 {
        let ious: Vec<f64> = (0..self.num_classes)
            .filter_map(|c| {
                let tp = self.cell(c, c);
                let target_total: u64 = (0..self.num_classes).map(|p| self.cell(c, p)).sum();
                let pred_total:   u64 = (0..self.num_classes).map(|t| self.cell(t, c)).sum();
                let union = target_total + pred_total - tp;
                (union > 0).then(|| tp as f64 / union as f64)
            })
            .collect();

        if ious.is_empty() {
            0.0
        } else {
            ious.iter().sum::<f64>() / ious.len() as f64
        }
    }
}

fn to_labels<B: Backend, const D: usize>(t: Tensor<B, D, Int>) -> Result<Vec<i64>> {
    t.into_data()
        .convert::<i64>()
        .to_vec()
        .map_err(|e| anyhow!("Cannot read label tensor: {:?}", e))
}

/// Run the model over every batch and return (pixAcc, mIoU).
pub fn evaluate<B: Backend>(
    model:       &FcnModel<B>,
    batches:     impl IntoIterator<Item = SegBatch<B>>,
    num_classes: usize,
) -> Result<(f64, f64)> {
    let mut metric = SegmentationMetric::new(num_classes);

    for batch in batches {
        // argmax over the class dimension: [B, C, H, W] → [B, 1, H, W]
        let preds   = to_labels(model.forward(batch.images).main.argmax(1))?;
        let targets = to_labels(batch.targets)?;
        if preds.len() != targets.len() {
            bail!(
                "Prediction has {} pixels but the mask has {}",
                preds.len(),
                targets.len()
            );
        }
        metric.update(&preds, &targets);
    }

    tracing::debug!("Validation counted {} labelled pixels", metric.labeled());
    Ok((metric.pixel_accuracy(), metric.mean_iou()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backbone::BackboneKind;
    use crate::ml::model::FcnConfig;
    use burn::backend::NdArray;

    #[test]
    fn test_perfect_prediction() {
        let mut m = SegmentationMetric::new(3);
        m.update(&[0, 1, 2, 2], &[0, 1, 2, 2]);
        assert_eq!(m.pixel_accuracy(), 1.0);
        assert_eq!(m.mean_iou(), 1.0);
    }

    #[test]
    fn test_hand_checked_values() {
        let mut m = SegmentationMetric::new(3);
        // targets: 0 0 1 1 ; preds: 0 1 1 1
        m.update(&[0, 1, 1, 1], &[0, 0, 1, 1]);
        assert!((m.pixel_accuracy() - 0.75).abs() < 1e-12);
        // class 0: 1/2, class 1: 2/3, class 2 absent
        let expected = (0.5 + 2.0 / 3.0) / 2.0;
        assert!((m.mean_iou() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ignored_pixels_not_counted() {
        let mut m = SegmentationMetric::new(2);
        m.update(&[1, 0, 1], &[-1, 0, 5]);
        assert_eq!(m.labeled(), 1);
        assert_eq!(m.pixel_accuracy(), 1.0);
    }

    #[test]
    fn test_empty_metric() {
        let m = SegmentationMetric::new(4);
        assert_eq!(m.pixel_accuracy(), 0.0);
        assert_eq!(m.mean_iou(), 0.0);
    }

    #[test]
    fn test_evaluate_runs_model() {
        let device = Default::default();
        let model = FcnConfig::new(BackboneKind::Resnet18, 2)
            .with_base_width(4)
            .init::<NdArray>(&device);

        let batch = SegBatch {
            images:  Tensor::zeros([1, 3, 16, 16], &device),
            targets: Tensor::<NdArray, 3, Int>::zeros([1, 16, 16], &device),
        };
        let (acc, miou) = evaluate(&model, vec![batch], 2).unwrap();
        assert!((0.0..=1.0).contains(&acc));
        assert!((0.0..=1.0).contains(&miou));
    }

    #[test]
    fn test_evaluate_reports_mismatched_masks() {
        let device = Default::default();
        let model = FcnConfig::new(BackboneKind::Resnet18, 2)
            .with_base_width(4)
            .init::<NdArray>(&device);

        let batch = SegBatch {
            images:  Tensor::zeros([1, 3, 16, 16], &device),
            targets: Tensor::<NdArray, 3, Int>::zeros([1, 8, 8], &device),
        };
        let err = evaluate(&model, vec![batch], 2).unwrap_err();
        assert!(err.to_string().contains("256 pixels"), "{err}");
    }

    #[test]
    fn test_label_readback() {
        let device = Default::default();
        let t = Tensor::<NdArray, 2, Int>::from_ints([[0, 1], [-1, 2]], &device);
        assert_eq!(to_labels(t).unwrap(), vec![0, 1, -1, 2]);
    }
}
