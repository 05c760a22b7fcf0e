// ============================================================
// Layer 4 — Input Transform
// ============================================================
// The fixed transform applied to every training example before
// it becomes a tensor.
//
// Image:
//   1. Resize to height × width (triangle filter)
//   2. Scale bytes to [0, 1]
//   3. Normalise per channel: (x - mean) / std
//      mean = [0.485, 0.456, 0.406], std = [0.229, 0.224, 0.225]
//   4. Lay out as CHW (channel planes, row-major inside a plane)
//
// Mask:
//   1. Resize to height × width (nearest neighbour, so class
//      codes are never blended)
//   2. Codes that are not a valid class index become IGNORE_INDEX
//
// No random augmentation is applied.
//
// Reference: image crate documentation (imageops::resize)

use image::{imageops::FilterType, GrayImage, RgbImage};

/// Label value excluded from loss and metrics
pub const IGNORE_INDEX: i32 = -1;

/// ImageNet statistics the pretrained backbone expects
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD:  [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy)]
pub struct SegTransform {
    pub height: u32,
    pub width:  u32,
}

impl SegTransform {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// RGB image → normalised CHW floats of length 3 * H * W
    pub fn image_to_chw(&self, img: &RgbImage) -> Vec<f32> {
        let resized = if img.dimensions() == (self.width, self.height) {
            img.clone()
        } else {
            image::imageops::resize(img, self.width, self.height, FilterType::Triangle)
        };

        let plane = (self.width * self.height) as usize;
        let mut chw = vec![0.0f32; 3 * plane];
        for (i, px) in resized.pixels().enumerate() {
            for c in 0..3 {
                let v = px.0[c] as f32 / 255.0;
                chw[c * plane + i] = (v - MEAN[c]) / STD[c];
            }
        }
        chw
    }

    /// Mask of class codes → label indices of length H * W
    pub fn mask_to_labels(&self, mask: &GrayImage, num_classes: usize) -> Vec<i32> {
        let resized = if mask.dimensions() == (self.width, self.height) {
            mask.clone()
        } else {
            image::imageops::resize(mask, self.width, self.height, FilterType::Nearest)
        };

        resized
            .pixels()
            .map(|px| {
                let code = px.0[0] as usize;
                if code < num_classes { code as i32 } else { IGNORE_INDEX }
            })
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_is_normalised_channel_major() {
        let t = SegTransform::new(2, 2);
        let img = RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 128]));
        let chw = t.image_to_chw(&img);

        assert_eq!(chw.len(), 12);
        let expect_r = (1.0 - MEAN[0]) / STD[0];
        let expect_g = (0.0 - MEAN[1]) / STD[1];
        assert!(chw[0..4].iter().all(|v| (v - expect_r).abs() < 1e-5));
        assert!(chw[4..8].iter().all(|v| (v - expect_g).abs() < 1e-5));
    }

    #[test]
    fn test_image_is_resized() {
        let t = SegTransform::new(3, 5);
        let img = RgbImage::new(10, 6);
        assert_eq!(t.image_to_chw(&img).len(), 3 * 3 * 5);
    }

    #[test]
    fn test_mask_codes_outside_classes_are_ignored() {
        let t = SegTransform::new(1, 4);
        let mask = GrayImage::from_raw(4, 1, vec![0, 2, 3, 255]).unwrap();
        assert_eq!(t.mask_to_labels(&mask, 3), vec![0, 2, IGNORE_INDEX, IGNORE_INDEX]);
    }

    #[test]
    fn test_mask_resize_never_blends_codes() {
        let t = SegTransform::new(4, 4);
        let mask = GrayImage::from_raw(2, 2, vec![1, 2, 3, 4]).unwrap();
        let labels = t.mask_to_labels(&mask, 5);
        assert_eq!(labels.len(), 16);
        assert!(labels.iter().all(|l| (1..=4).contains(l)));
    }
}
