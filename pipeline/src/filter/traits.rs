use platewatch_common::plate::Region;

/// Candidate-region filter applied to detector output.
///
/// Implementations decide whether a detected rectangle is worth cropping
/// and sending to the recognizer.
pub trait RegionFilter: Send {
    /// Returns `true` to keep the region, `false` to drop it.
    fn accept(&mut self, region: &Region) -> bool;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
