//! Classification function interface
//!
//! The actual model lives outside this crate. Anything implementing
//! [`Classifier`] can be plugged into the pool; it is called concurrently from
//! several worker threads with independent images.

use std::path::Path;

use image::RgbImage;

use crate::error::ClassificationError;

/// Maps a decoded RGB frame to a category index
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, image: &RgbImage) -> Result<u32, String>;

    /// Decode a work item; PNG/RGB8 through `image` unless overridden
    fn load(&self, item: &Path) -> Result<RgbImage, ClassificationError> {
        load_image(item)
    }
}

impl<F> Classifier for F
where
    F: Fn(&RgbImage) -> Result<u32, String> + Send + Sync + 'static,
{
    fn classify(&self, image: &RgbImage) -> Result<u32, String> {
        self(image)
    }
}

/// Deterministic stand-in model
///
/// Buckets the mean pixel intensity into `num_classes` categories. Useful for
/// exercising the pipeline end to end without a real network.
#[derive(Debug, Clone, Copy)]
pub struct ColorBucketClassifier {
    num_classes: u32,
}

impl ColorBucketClassifier {
    pub fn new(num_classes: u32) -> Self {
        Self {
            num_classes: num_classes.max(1),
        }
    }
}

impl Classifier for ColorBucketClassifier {
    fn classify(&self, image: &RgbImage) -> Result<u32, String> {
        let raw = image.as_raw();
        if raw.is_empty() {
            return Err("empty image".into());
        }

        let sum: u64 = raw.iter().map(|&v| u64::from(v)).sum();
        let mean = sum / raw.len() as u64;

        Ok((mean * u64::from(self.num_classes) / 256) as u32)
    }
}

/// Decode an image file into an RGB8 buffer
pub fn load_image(path: &Path) -> Result<RgbImage, ClassificationError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| ClassificationError::new(path, e.to_string()))
}
