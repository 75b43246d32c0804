use platewatch_common::plate::Region;
use tracing::debug;

use super::traits::RegionFilter;

/// Drops regions too small to hold a readable plate.
///
/// A region is kept only when `width * height` is strictly greater than
/// `min_area`.
pub struct MinAreaFilter {
    min_area: u64,
}

impl MinAreaFilter {
    pub fn new(min_area: u64) -> Self {
        Self { min_area }
    }
}

impl RegionFilter for MinAreaFilter {
    fn accept(&mut self, region: &Region) -> bool {
        let area = region.area();
        let accepted = area > self.min_area;
        debug!(
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            area,
            min_area = self.min_area,
            accepted,
            "area check"
        );
        accepted
    }

    fn name(&self) -> &str {
        "min_area"
    }
}
