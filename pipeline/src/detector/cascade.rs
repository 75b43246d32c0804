use std::path::Path;

use image::GrayImage;
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use platewatch_common::plate::Region;
use tracing::{debug, info};

use super::{DetectError, DetectorParams, RegionDetector};

/// Haar-cascade plate detector backed by OpenCV's `detectMultiScale`.
pub struct CascadeDetector {
    classifier: CascadeClassifier,
}

impl CascadeDetector {
    pub fn load(model: &Path) -> Result<Self, DetectError> {
        let model_str = model.display().to_string();
        let classifier = CascadeClassifier::new(&model_str)
            .map_err(|e| DetectError::Model(model_str.clone(), e.to_string()))?;
        let empty = classifier
            .empty()
            .map_err(|e| DetectError::Model(model_str.clone(), e.to_string()))?;
        if empty {
            return Err(DetectError::Model(model_str, "classifier is empty".into()));
        }
        info!(model = model_str, "cascade classifier loaded");
        Ok(Self { classifier })
    }
}

impl RegionDetector for CascadeDetector {
    fn detect(
        &mut self,
        gray: &GrayImage,
        params: &DetectorParams,
    ) -> Result<Vec<Region>, DetectError> {
        let flat = Mat::from_slice(gray.as_raw()).map_err(|e| DetectError::Detect(e.to_string()))?;
        let mat = flat
            .reshape(1, gray.height() as i32)
            .map_err(|e| DetectError::Detect(e.to_string()))?;

        let mut found = Vector::<Rect>::new();
        self.classifier
            .detect_multi_scale(
                &mat,
                &mut found,
                params.scale_factor,
                params.min_neighbors,
                0,
                Size::new(0, 0),
                Size::new(0, 0),
            )
            .map_err(|e| DetectError::Detect(e.to_string()))?;

        let regions: Vec<Region> = found
            .iter()
            .filter(|r| r.x >= 0 && r.y >= 0 && r.width > 0 && r.height > 0)
            .map(|r| Region::new(r.x as u32, r.y as u32, r.width as u32, r.height as u32))
            .collect();
        debug!(count = regions.len(), "cascade detections");
        Ok(regions)
    }

    fn name(&self) -> &str {
        "cascade"
    }
}
