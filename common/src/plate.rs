/// An axis-aligned rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Intersect with a `frame_width` x `frame_height` frame.
    /// Returns `None` when nothing of the region lies inside the frame.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<Region> {
        if self.x >= frame_width || self.y >= frame_height {
            return None;
        }
        let width = self.width.min(frame_width - self.x);
        let height = self.height.min(frame_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Region::new(self.x, self.y, width, height))
    }
}

/// One recognizer output tuple: where the text was found, what it reads, and how sure the engine is.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub bounds: Region,
    pub text: String,
    pub confidence: f32,
}

/// Join fragment texts in recognizer order with a single space.
pub fn join_fragments(fragments: &[TextFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The outcome of processing one region. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateRecord {
    pub text: String,
    pub source_region: Region,
    pub sequence_id: u64,
}

impl PlateRecord {
    pub fn new(text: String, source_region: Region, sequence_id: u64) -> Self {
        Self {
            text,
            source_region,
            sequence_id,
        }
    }

    /// Empty plates are stored but never announced.
    pub fn is_announceable(&self) -> bool {
        !self.text.is_empty()
    }
}
