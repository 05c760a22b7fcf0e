// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads a Pascal-VOC style segmentation dataset from disk.
//
// Expected layout (VOCdevkit/VOC2012 or any copy of it):
//
//   <root>/
//     ImageSets/Segmentation/train.txt   ← one image id per line
//     ImageSets/Segmentation/val.txt
//     JPEGImages/<id>.jpg                ← RGB input image
//     SegmentationClass/<id>.png         ← per-pixel class mask
//
// If <root> has no ImageSets directory but contains VOC2012/,
// that subdirectory is used instead.
//
// Mask encodings understood:
//   - single channel PNG: pixel value is the class index,
//     255 marks "void" (object boundaries, ignored in the loss)
//   - palette / RGB PNG: decoded to RGB by the image crate and
//     mapped back to indices through the standard VOC colormap
//
// Reference: image crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::domain::class_registry::ClassRegistry;

/// Mask code for pixels that carry no label
pub const VOID_LABEL: u8 = 255;

pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("missing file {path} (listed in split '{split}')")]
    MissingFile { path: PathBuf, split: String },
    #[error("split file {path} lists no images")]
    EmptySplit { path: PathBuf },
    #[error("image {image} and mask {mask} differ in size")]
    SizeMismatch { image: PathBuf, mask: PathBuf },
}

// ─── Class file ───────────────────────────────────────────────────────────────
/// Read the newline-delimited class file into a registry.
/// An unreadable or empty class file is a configuration error.
pub fn load_class_registry(path: impl AsRef<Path>) -> Result<ClassRegistry> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Cannot read class list '{}'", path.display()))?;

    let registry = ClassRegistry::from_lines(&contents);
    if registry.is_empty() {
        anyhow::bail!("Class list '{}' contains no class names", path.display());
    }
    Ok(registry)
}

// ─── VOC layout ───────────────────────────────────────────────────────────────
/// One image/mask pair listed in a split file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleIndex {
    pub id:    String,
    pub image: PathBuf,
    pub mask:  PathBuf,
}

/// Resolve the directory that actually holds ImageSets/, JPEGImages/...
pub fn resolve_voc_root(root: &Path) -> PathBuf {
    if !root.join("ImageSets").is_dir() && root.join("VOC2012").join("ImageSets").is_dir() {
        return root.join("VOC2012");
    }
    root.to_path_buf()
}

/// Read `ImageSets/Segmentation/<split>.txt` and check that every
/// listed image and mask exists.
pub fn index_split(root: &Path, split: &str) -> DatasetResult<Vec<SampleIndex>> {
    let root = resolve_voc_root(root);
    let split_path = root
        .join("ImageSets")
        .join("Segmentation")
        .join(format!("{split}.txt"));

    let listing = fs::read_to_string(&split_path).map_err(|e| DatasetError::Io {
        path:   split_path.clone(),
        source: e,
    })?;

    let mut samples = Vec::new();
    for id in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let image = root.join("JPEGImages").join(format!("{id}.jpg"));
        let mask  = root.join("SegmentationClass").join(format!("{id}.png"));
        for path in [&image, &mask] {
            if !path.is_file() {
                return Err(DatasetError::MissingFile {
                    path:  path.clone(),
                    split: split.to_string(),
                });
            }
        }
        samples.push(SampleIndex { id: id.to_string(), image, mask });
    }

    if samples.is_empty() {
        return Err(DatasetError::EmptySplit { path: split_path });
    }

    tracing::debug!("Indexed {} samples from '{}'", samples.len(), split_path.display());
    Ok(samples)
}

// ─── Decoding ─────────────────────────────────────────────────────────────────
fn open_image(path: &Path) -> DatasetResult<DynamicImage> {
    image::open(path).map_err(|e| DatasetError::Image {
        path:   path.to_path_buf(),
        source: e,
    })
}

/// Decode the RGB input image.
pub fn load_image(path: &Path) -> DatasetResult<RgbImage> {
    Ok(open_image(path)?.to_rgb8())
}

/// Decode a mask into a single-channel image of class codes
/// (class index, or VOID_LABEL for unlabelled pixels).
pub fn load_mask(path: &Path, num_classes: usize) -> DatasetResult<GrayImage> {
    match open_image(path)? {
        DynamicImage::ImageLuma8(codes) => Ok(codes),
        other => {
            let rgb = other.to_rgb8();
            let lookup: HashMap<[u8; 3], u8> = voc_colormap(num_classes.min(VOID_LABEL as usize))
                .into_iter()
                .enumerate()
                .map(|(index, color)| (color, index as u8))
                .collect();

            let (w, h) = rgb.dimensions();
            Ok(GrayImage::from_fn(w, h, |x, y| {
                let px = rgb.get_pixel(x, y).0;
                image::Luma([lookup.get(&px).copied().unwrap_or(VOID_LABEL)])
            }))
        }
    }
}

/// The Pascal VOC colormap: class i is encoded by spreading the
/// bits of i over the high bits of R, G and B.
pub fn voc_colormap(n: usize) -> Vec<[u8; 3]> {
    (0..n)
        .map(|i| {
            let mut rgb = [0u8; 3];
            let mut c = i;
            for shift in (0..8).rev() {
                for (channel, value) in rgb.iter_mut().enumerate() {
                    *value |= (((c >> channel) & 1) as u8) << shift;
                }
                c >>= 3;
            }
            rgb
        })
        .collect()
}
