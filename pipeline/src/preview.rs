use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::{Rgb, RgbImage};
use platewatch_common::plate::Region;
use tokio::task::JoinHandle;
use tracing::debug;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: u32 = 2;

/// Writes the latest processed frame, with candidate regions boxed, to a
/// single JPEG file for a human to watch.
///
/// Rendering runs on the blocking pool and is never awaited; failures are
/// only logged at debug level.
pub struct Preview {
    path: PathBuf,
    renders: AtomicU64,
}

impl Preview {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            renders: AtomicU64::new(0),
        }
    }

    /// Callers are not expected to await the returned handle.
    pub fn render(&self, image: &RgbImage, regions: &[Region]) -> JoinHandle<()> {
        let mut annotated = image.clone();
        let regions = regions.to_vec();
        let path = self.path.clone();
        let render = self.renders.fetch_add(1, Ordering::Relaxed);
        tokio::task::spawn_blocking(move || {
            for region in &regions {
                draw_box(&mut annotated, region, BOX_COLOR, BOX_THICKNESS);
            }
            if let Err(e) = write_replacing(&path, &annotated, render) {
                debug!(path = path.display().to_string(), error = %e, "preview write failed");
            }
        })
    }
}

/// Write to a sibling temp file, then rename over the target so readers
/// never see a half-written image. Each render gets its own temp file, so
/// overlapping renders cannot write into the same one.
fn write_replacing(path: &Path, image: &RgbImage, render: u64) -> Result<(), image::ImageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path, render);
    if let Err(e) = image.save(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path, render: u64) -> PathBuf {
    path.with_extension(format!("{render}.tmp.jpg"))
}

/// Draw a hollow rectangle, clipped to the image.
pub fn draw_box(image: &mut RgbImage, region: &Region, color: Rgb<u8>, thickness: u32) {
    let Some(r) = region.clamp_to(image.width(), image.height()) else {
        return;
    };
    let x1 = r.x + r.width - 1;
    let y1 = r.y + r.height - 1;
    for t in 0..thickness {
        if t * 2 >= r.width.min(r.height) {
            break;
        }
        for x in r.x..=x1 {
            image.put_pixel(x, r.y + t, color);
            image.put_pixel(x, y1 - t, color);
        }
        for y in r.y..=y1 {
            image.put_pixel(r.x + t, y, color);
            image.put_pixel(x1 - t, y, color);
        }
    }
}
