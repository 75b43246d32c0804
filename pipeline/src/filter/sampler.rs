use tracing::debug;

/// Frame-skip policy: only every `frame_skip`-th captured frame is processed.
///
/// The counter starts at 0 and is incremented for each captured frame before
/// the check, so with `frame_skip = 5` the 5th, 10th, 15th ... frames pass.
pub struct FrameSampler {
    frame_skip: u64,
    counter: u64,
}

impl FrameSampler {
    pub fn new(frame_skip: u64) -> Self {
        Self {
            frame_skip: frame_skip.max(1),
            counter: 0,
        }
    }

    /// Count one captured frame and report whether it should be processed.
    pub fn admit(&mut self) -> bool {
        self.counter += 1;
        let admitted = self.counter % self.frame_skip == 0;
        if !admitted {
            debug!(counter = self.counter, frame_skip = self.frame_skip, "frame skipped");
        }
        admitted
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }
}
