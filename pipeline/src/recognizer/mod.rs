pub mod tesseract;

use async_trait::async_trait;
use image::GrayImage;
use platewatch_common::plate::TextFragment;

/// Turns a cropped plate image into text fragments, in reading order.
#[async_trait]
pub trait TextRecognizer: Send {
    async fn recognize(&mut self, crop: &GrayImage) -> Result<Vec<TextFragment>, RecognizeError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    #[error("failed to encode crop for recognizer: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to spawn {0}: {1}")]
    Spawn(String, std::io::Error),
    #[error("recognizer I/O failed: {0}")]
    Io(String),
    #[error("recognizer exited with non-zero status: {0}")]
    Failed(String),
}
