// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from files on disk to device-ready tensor batches.
//
//   class file / VOC directory
//       │
//       ▼
//   loader            → class list, split index, image/mask decoding
//       │
//       ▼
//   SegTransform      → resize + normalise, mask → label indices
//       │
//       ▼
//   VocSegmentation   → implements Burn's Dataset trait
//       │
//       ▼
//   SegBatcher        → stacks items into tensor batches
//       │
//       ▼
//   DataLoader        → shuffles and feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads class files and VOC directories, decodes images and masks
pub mod loader;

/// Fixed resize/normalisation transform
pub mod preprocessor;

/// Implements Burn's Dataset trait for VOC segmentation samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{GrayImage, RgbImage};
    use std::{fs, path::Path};

    use crate::data::loader::VOID_LABEL;

    /// Write a tiny VOC tree: every image is 4x2 pixels, every mask
    /// row reads [0, 1, 2, void].
    pub(crate) fn write_voc(root: &Path, split: &str, ids: &[&str]) {
        let sets = root.join("ImageSets/Segmentation");
        fs::create_dir_all(&sets).unwrap();
        fs::create_dir_all(root.join("JPEGImages")).unwrap();
        fs::create_dir_all(root.join("SegmentationClass")).unwrap();
        fs::write(sets.join(format!("{split}.txt")), ids.join("\n")).unwrap();

        for id in ids {
            RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]))
                .save(root.join("JPEGImages").join(format!("{id}.jpg")))
                .unwrap();
            GrayImage::from_fn(4, 2, |x, _| {
                image::Luma([if x == 3 { VOID_LABEL } else { x as u8 }])
            })
            .save(root.join("SegmentationClass").join(format!("{id}.png")))
            .unwrap();
        }
    }
}
