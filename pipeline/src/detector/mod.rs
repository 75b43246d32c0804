#[cfg(feature = "cascade")]
pub mod cascade;
pub mod full_frame;

use image::GrayImage;
use platewatch_common::config::DetectorConfig;
use platewatch_common::plate::Region;

/// Fixed per-run parameters handed to the detector with every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
}

impl DetectorParams {
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            scale_factor: config.scale_factor,
            min_neighbors: config.min_neighbors,
        }
    }
}

/// Finds plate-candidate rectangles in a grayscale frame.
pub trait RegionDetector: Send {
    fn detect(
        &mut self,
        gray: &GrayImage,
        params: &DetectorParams,
    ) -> Result<Vec<Region>, DetectError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Build the detector selected by `config.kind`.
pub fn from_config(config: &DetectorConfig) -> Result<Box<dyn RegionDetector>, DetectError> {
    match config.kind.as_str() {
        "full_frame" => Ok(Box::new(full_frame::FullFrameDetector)),
        #[cfg(feature = "cascade")]
        "cascade" => Ok(Box::new(cascade::CascadeDetector::load(&config.model)?)),
        #[cfg(not(feature = "cascade"))]
        "cascade" => Err(DetectError::Unsupported(
            "cascade detector requires building with --features cascade".into(),
        )),
        other => Err(DetectError::Unsupported(format!(
            "unknown detector kind {other:?}, expected 'full_frame' or 'cascade'"
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
#[cfg_attr(not(feature = "cascade"), allow(dead_code))]
pub enum DetectError {
    #[error("failed to load detector model {0}: {1}")]
    Model(String, String),
    #[error("detection failed: {0}")]
    Detect(String),
    #[error("{0}")]
    Unsupported(String),
}
