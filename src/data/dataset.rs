use burn::data::dataset::Dataset;

use crate::data::loader::{self, DatasetError, DatasetResult, SampleIndex};
use crate::data::preprocessor::SegTransform;
use crate::domain::traits::SampleSource;

/// One transformed training example.
/// image: [3, H, W] normalised floats, labels: [H, W] class indices
/// (IGNORE_INDEX for void pixels).
#[derive(Debug, Clone)]
pub struct SegItem {
    pub image:  Vec<f32>,
    pub labels: Vec<i32>,
    pub height: usize,
    pub width:  usize,
}

/// A split of a VOC-style dataset. Images are decoded lazily in
/// `get`, so only the index lives in memory.
#[derive(Debug, Clone)]
pub struct VocSegmentation {
    samples:     Vec<SampleIndex>,
    transform:   SegTransform,
    num_classes: usize,
    split:       String,
}

impl VocSegmentation {
    pub fn new(
        root:        impl AsRef<std::path::Path>,
        split:       &str,
        num_classes: usize,
        transform:   SegTransform,
    ) -> DatasetResult<Self> {
        let samples = loader::index_split(root.as_ref(), split)?;
        Ok(Self { samples, transform, num_classes, split: split.to_string() })
    }

    pub fn split(&self) -> &str {
        &self.split
    }

    /// Decode and transform one example.
    pub fn load_item(&self, index: usize) -> DatasetResult<Option<SegItem>> {
        let Some(idx) = self.samples.get(index) else {
            return Ok(None);
        };

        let image = loader::load_image(&idx.image)?;
        let mask  = loader::load_mask(&idx.mask, self.num_classes)?;
        if image.dimensions() != mask.dimensions() {
            return Err(DatasetError::SizeMismatch {
                image: idx.image.clone(),
                mask:  idx.mask.clone(),
            });
        }

        Ok(Some(SegItem {
            image:  self.transform.image_to_chw(&image),
            labels: self.transform.mask_to_labels(&mask, self.num_classes),
            height: self.transform.height as usize,
            width:  self.transform.width as usize,
        }))
    }
}

impl SampleSource for VocSegmentation {
    fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl Dataset<SegItem> for VocSegmentation {
    /// A sample that fails to decode ends the loader's stream early;
    /// the trainer notices the short epoch and aborts the run.
    fn get(&self, index: usize) -> Option<SegItem> {
        match self.load_item(index) {
            Ok(item) => item,
            Err(e) => {
                tracing::error!("Cannot load sample {} of split '{}': {}", index, self.split, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
