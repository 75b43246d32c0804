use image::GrayImage;
use platewatch_common::plate::Region;

use super::{DetectError, DetectorParams, RegionDetector};

/// Reports the whole frame as the single candidate region.
///
/// For fixed-mount gate cameras framed tightly on the plate, where running a
/// classifier buys nothing.
pub struct FullFrameDetector;

impl RegionDetector for FullFrameDetector {
    fn detect(
        &mut self,
        gray: &GrayImage,
        _params: &DetectorParams,
    ) -> Result<Vec<Region>, DetectError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![Region::new(0, 0, width, height)])
    }

    fn name(&self) -> &str {
        "full_frame"
    }
}
