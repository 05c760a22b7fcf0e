// ============================================================
// Layer 4 — Segmentation Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<SegItem>
// into device tensors.
//
//   Input:  Vec of N SegItems, each [3, H, W] + [H, W]
//   Output: SegBatch with images [N, 3, H, W] and targets [N, H, W]
//
// Every item has already been resized to the same H × W by the
// transform, so batching is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::SegItem;

/// A batch of examples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SegBatch<B: Backend> {
    /// Normalised images, shape: [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,

    /// Class index per pixel (-1 = ignore), shape: [batch_size, height, width]
    pub targets: Tensor<B, 3, Int>,
}

/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct SegBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SegBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<B, SegItem, SegBatch<B>> for SegBatcher<B> {
    fn batch(&self, items: Vec<SegItem>, device: &B::Device) -> SegBatch<B> {
        let batch_size = items.len();
        let (height, width) = (items[0].height, items[0].width);

        let image_flat: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().copied())
            .collect();

        let label_flat: Vec<i32> = items
            .iter()
            .flat_map(|item| item.labels.iter().copied())
            .collect();

        let images = Tensor::<B, 1>::from_floats(image_flat.as_slice(), device)
            .reshape([batch_size, 3, height, width]);

        let targets = Tensor::<B, 1, Int>::from_ints(label_flat.as_slice(), device)
            .reshape([batch_size, height, width]);

        SegBatch { images, targets }
    }
}
