use image::{GrayImage, RgbImage};
use platewatch_common::plate::Region;

/// A captured camera frame. Owned by the cycle that captured it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at_ms: i64,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Single-channel (luma) copy of the frame, used for detection and recognition.
    pub fn grayscale(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }

    /// Colour crop of `region`; the region must already be clamped to the frame.
    pub fn crop(&self, region: &Region) -> RgbImage {
        image::imageops::crop_imm(&self.image, region.x, region.y, region.width, region.height)
            .to_image()
    }
}

/// Crop `region` out of a grayscale frame. The region must already be clamped.
pub fn crop_gray(gray: &GrayImage, region: &Region) -> GrayImage {
    image::imageops::crop_imm(gray, region.x, region.y, region.width, region.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn grayscale_keeps_dimensions() {
        let frame = Frame::new(RgbImage::from_pixel(64, 48, Rgb([200, 10, 10])));
        let gray = frame.grayscale();
        assert_eq!(gray.dimensions(), (64, 48));
    }

    #[test]
    fn crops_are_region_sized() {
        let mut image = RgbImage::new(50, 40);
        image.put_pixel(10, 5, Rgb([255, 255, 255]));
        let frame = Frame::new(image);
        let region = Region::new(10, 5, 20, 10);

        let color = frame.crop(&region);
        assert_eq!(color.dimensions(), (20, 10));
        assert_eq!(color.get_pixel(0, 0), &Rgb([255, 255, 255]));

        let gray = crop_gray(&frame.grayscale(), &region);
        assert_eq!(gray.dimensions(), (20, 10));
        assert_eq!(gray.get_pixel(0, 0), &Luma([255]));
    }
}
