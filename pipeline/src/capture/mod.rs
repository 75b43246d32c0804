pub mod directory;
pub mod mjpeg;

use async_trait::async_trait;
use platewatch_common::config::CaptureConfig;

use crate::frame::Frame;

/// A camera-like source of frames.
///
/// `None` from [`FrameSource::next_frame`] is the capture-failure sentinel:
/// the device produced no frame and the pipeline must shut down.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Option<Frame>;

    /// Release the underlying device. Called once on shutdown.
    fn release(&mut self) {}

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Open the capture source selected by `config.source`.
pub async fn open(config: &CaptureConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    match config.source.as_str() {
        "mjpeg" => Ok(Box::new(mjpeg::MjpegSource::connect(&config.url).await?)),
        "directory" => Ok(Box::new(directory::DirectorySource::open(&config.directory)?)),
        other => Err(CaptureError::UnknownSource(other.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("HTTP connection failed: {0}")]
    HttpConnect(reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("failed to list frame directory {0}: {1}")]
    ReadDir(String, std::io::Error),
    #[error("unknown capture source {0:?}, expected 'mjpeg' or 'directory'")]
    UnknownSource(String),
}
