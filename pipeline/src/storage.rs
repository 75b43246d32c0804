use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use platewatch_common::config::StorageConfig;
use tracing::{debug, info};

/// Local-filesystem store for plate crops and their recognized text.
///
/// Layout, keyed by the record's sequence id:
///
/// ```text
/// {plates_dir}/scanned_img_{id}.jpg
/// {text_dir}/plate_text_{id}.txt
/// ```
///
/// Ids restart at 0 with every process, so a later run overwrites the
/// artifacts of an earlier one.
pub struct ArtifactStore {
    plates_dir: PathBuf,
    text_dir: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating both artifact directories if absent.
    pub fn open(config: &StorageConfig) -> Result<Self, ArtifactError> {
        for dir in [&config.plates_dir, &config.text_dir] {
            std::fs::create_dir_all(dir)
                .map_err(|e| ArtifactError::CreateDir(dir.display().to_string(), e))?;
        }
        info!(
            plates_dir = config.plates_dir.display().to_string(),
            text_dir = config.text_dir.display().to_string(),
            "artifact directories ready"
        );
        Ok(Self {
            plates_dir: config.plates_dir.clone(),
            text_dir: config.text_dir.clone(),
        })
    }

    pub fn image_path(&self, sequence_id: u64) -> PathBuf {
        self.plates_dir.join(format!("scanned_img_{sequence_id}.jpg"))
    }

    pub fn text_path(&self, sequence_id: u64) -> PathBuf {
        self.text_dir.join(format!("plate_text_{sequence_id}.txt"))
    }

    /// Write the crop and the text for one record.
    ///
    /// Both writes are always attempted; if either fails the error lists
    /// every artifact that could not be written.
    pub async fn persist(
        &self,
        sequence_id: u64,
        crop: &RgbImage,
        text: &str,
    ) -> Result<(), PersistError> {
        let mut failures = Vec::new();

        let image_path = self.image_path(sequence_id);
        if let Err(e) = write_jpeg(&image_path, crop).await {
            failures.push(e);
        }

        let text_path = self.text_path(sequence_id);
        if let Err(e) = tokio::fs::write(&text_path, text.as_bytes()).await {
            failures.push(ArtifactError::Write(text_path.display().to_string(), e));
        }

        if !failures.is_empty() {
            return Err(PersistError {
                sequence_id,
                failures,
            });
        }

        debug!(
            sequence_id,
            image = image_path.display().to_string(),
            text = text_path.display().to_string(),
            "persisted plate artifacts"
        );
        Ok(())
    }
}

async fn write_jpeg(path: &Path, crop: &RgbImage) -> Result<(), ArtifactError> {
    let mut jpeg = Vec::new();
    crop.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
    tokio::fs::write(path, jpeg)
        .await
        .map_err(|e| ArtifactError::Write(path.display().to_string(), e))
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to create artifact directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to encode plate image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write {0}: {1}")]
    Write(String, std::io::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("record {sequence_id}: {} artifact write(s) failed: {}", .failures.len(), join_errors(.failures))]
pub struct PersistError {
    pub sequence_id: u64,
    pub failures: Vec<ArtifactError>,
}

fn join_errors(errors: &[ArtifactError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn store_in(root: &Path) -> ArtifactStore {
        ArtifactStore::open(&StorageConfig {
            plates_dir: root.join("plates"),
            text_dir: root.join("output_text"),
        })
        .unwrap()
    }

    #[test]
    fn open_creates_both_directories() {
        let tmp = tempfile::tempdir().unwrap();
        store_in(tmp.path());
        assert!(tmp.path().join("plates").is_dir());
        assert!(tmp.path().join("output_text").is_dir());
        // Opening again over existing directories is fine.
        store_in(tmp.path());
    }

    #[tokio::test]
    async fn persist_writes_correlated_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let crop = RgbImage::from_pixel(30, 20, Rgb([10, 200, 10]));

        store.persist(0, &crop, "AB 12").await.unwrap();

        let image_path = tmp.path().join("plates/scanned_img_0.jpg");
        let text_path = tmp.path().join("output_text/plate_text_0.txt");
        assert_eq!(store.image_path(0), image_path);
        assert_eq!(std::fs::read_to_string(text_path).unwrap(), "AB 12");
        let saved = image::open(image_path).unwrap();
        assert_eq!((saved.width(), saved.height()), (30, 20));
    }

    #[tokio::test]
    async fn empty_text_still_written() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.persist(3, &RgbImage::new(8, 8), "").await.unwrap();
        assert_eq!(std::fs::read_to_string(store.text_path(3)).unwrap(), "");
        assert!(store.image_path(3).is_file());
    }

    #[tokio::test]
    async fn same_id_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.persist(0, &RgbImage::new(8, 8), "OLD").await.unwrap();
        store.persist(0, &RgbImage::new(16, 4), "NEW").await.unwrap();
        assert_eq!(std::fs::read_to_string(store.text_path(0)).unwrap(), "NEW");
        let saved = image::open(store.image_path(0)).unwrap();
        assert_eq!((saved.width(), saved.height()), (16, 4));
    }

    #[tokio::test]
    async fn text_written_even_when_image_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        // A directory squatting on the image path makes that write fail.
        std::fs::create_dir(store.image_path(7)).unwrap();

        let err = store.persist(7, &RgbImage::new(8, 8), "XY").await.unwrap_err();
        assert_eq!(err.sequence_id, 7);
        assert_eq!(err.failures.len(), 1);
        assert!(matches!(err.failures[0], ArtifactError::Write(..)));
        assert_eq!(std::fs::read_to_string(store.text_path(7)).unwrap(), "XY");
    }
}
