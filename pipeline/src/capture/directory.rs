use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{CaptureError, FrameSource};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Replays still images from a directory in lexicographic filename order.
///
/// Running out of files, or a file that cannot be read or decoded, is a
/// capture failure.
pub struct DirectorySource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
}

impl DirectorySource {
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CaptureError::ReadDir(dir.display().to_string(), e))?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        info!(dir = dir.display().to_string(), frames = files.len(), "opened frame directory");

        Ok(Self {
            dir: dir.to_path_buf(),
            pending: files.into(),
        })
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl FrameSource for DirectorySource {
    async fn next_frame(&mut self) -> Option<Frame> {
        let Some(path) = self.pending.pop_front() else {
            info!(dir = self.dir.display().to_string(), "frame directory exhausted");
            return None;
        };

        let data = match tokio::fs::read(&path).await {
            Ok(d) => d,
            Err(e) => {
                warn!(path = path.display().to_string(), error = %e, "failed to read frame file");
                return None;
            }
        };

        match image::load_from_memory(&data) {
            Ok(img) => {
                debug!(path = path.display().to_string(), "frame loaded");
                Some(Frame::new(img.to_rgb8()))
            }
            Err(e) => {
                warn!(path = path.display().to_string(), error = %e, "failed to decode frame file");
                None
            }
        }
    }

    fn release(&mut self) {
        self.pending.clear();
        info!(dir = self.dir.display().to_string(), "frame directory released");
    }

    fn name(&self) -> &str {
        "directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str, shade: u8) {
        RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
            .save(dir.join(name))
            .unwrap();
    }

    #[tokio::test]
    async fn replays_images_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(tmp.path(), "b.png", 20);
        write_png(tmp.path(), "a.png", 10);
        std::fs::write(tmp.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = DirectorySource::open(tmp.path()).unwrap();
        assert_eq!(source.pending.len(), 2, "text file ignored");

        let first = source.next_frame().await.unwrap();
        assert_eq!(first.image.get_pixel(0, 0), &Rgb([10, 10, 10]));
        let second = source.next_frame().await.unwrap();
        assert_eq!(second.image.get_pixel(0, 0), &Rgb([20, 20, 20]));
        assert!(source.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn undecodable_file_is_capture_failure() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("broken.jpg"), b"not a jpeg").unwrap();
        let mut source = DirectorySource::open(tmp.path()).unwrap();
        assert!(source.next_frame().await.is_none());
    }

    #[test]
    fn missing_directory_is_error() {
        let result = DirectorySource::open(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(CaptureError::ReadDir(..))));
    }
}
