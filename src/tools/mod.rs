//! File-system helpers shared by the CLI, benches and integration tests

use crate::error::{InspectError, Result};
use crate::render::Views;
use image::{DynamicImage, GenericImageView};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

fn max_dim_from_env() -> Option<u32> {
    match env::var("DEFECT_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Decode an image file.
///
/// When `DEFECT_MAX_DIM` is set, larger images are downscaled so their
/// longer side matches it.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| InspectError::decode(path, err))?;
    if let Some(max_dim) = max_dim_from_env() {
        let (w, h) = img.dimensions();
        if w.max(h) > max_dim {
            debug!(path = %path.display(), w, h, max_dim, "downscaling input");
            return Ok(img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle));
        }
    }
    Ok(img)
}

/// Write every view as `<dir>/<name>.png`, creating `dir` when needed.
///
/// Returns the written paths in view-name order.
pub fn save_views<P: AsRef<Path>>(views: &Views, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| InspectError::OutputNotWritable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(views.len());
    for (name, view) in views {
        let path = dir.join(format!("{}.png", name));
        view.save(&path).map_err(|err| InspectError::OutputNotWritable {
            path: path.clone(),
            source: into_io_error(err),
        })?;
        written.push(path);
    }
    debug!(dir = %dir.display(), count = written.len(), "views saved");
    Ok(written)
}

fn into_io_error(err: image::ImageError) -> std::io::Error {
    match err {
        image::ImageError::IoError(io) => io,
        other => std::io::Error::other(other),
    }
}

/// Default dataset root from environment variables.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("DEFECT_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Default bench limit from environment variables.
///
/// Returns `None` (full dataset) when `DEFECT_BENCH_LIMIT` is unset or `0`.
pub fn bench_limit_from_env() -> Option<usize> {
    match env::var("DEFECT_BENCH_LIMIT") {
        Ok(value) => value
            .parse::<usize>()
            .ok()
            .and_then(|v| if v == 0 { None } else { Some(v) }),
        Err(_) => None,
    }
}

/// Image paths under `root`, sorted, optionally truncated to `limit`.
pub fn dataset_iter<P: AsRef<Path>>(root: P, limit: Option<usize>) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

/// Every image file under `root` (recursively), sorted by path
pub fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if is_image_path(&path) {
                images.push(path);
            }
        }
    }

    images.sort();
    images
}

/// Whether the extension is one of the decodable image formats
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX epoch")
            .as_nanos();
        let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("defect_scan_tools_{nanos}_{sequence}"));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    #[test]
    fn collect_images_filters_and_sorts() {
        let dir = temp_dir();
        fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "nested/c.bmp"] {
            fs::write(dir.join(name), b"x").unwrap();
        }
        let images = collect_images(&dir);
        let names: Vec<_> = images
            .iter()
            .map(|p| p.strip_prefix(&dir).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "nested/c.bmp"]);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn load_image_reports_decode_error() {
        let dir = temp_dir();
        let path = dir.join("broken.png");
        fs::write(&path, b"not an image").unwrap();
        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, InspectError::Decode { .. }));
        assert!(err.is_recoverable());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_views_writes_pngs() {
        let dir = temp_dir().join("out");
        let mut views = Views::new();
        views.insert("original".to_string(), RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        views.insert("defects".to_string(), RgbImage::new(4, 4));
        let written = save_views(&views, &dir).unwrap();
        assert_eq!(written, vec![dir.join("defects.png"), dir.join("original.png")]);
        let reloaded = load_image(&written[1]).unwrap().to_rgb8();
        assert_eq!(*reloaded.get_pixel(0, 0), Rgb([1, 2, 3]));
        let _ = fs::remove_dir_all(dir.parent().unwrap());
    }

    #[test]
    fn save_views_into_a_file_fails() {
        let dir = temp_dir();
        let blocker = dir.join("occupied");
        fs::write(&blocker, b"x").unwrap();
        let mut views = Views::new();
        views.insert("original".to_string(), RgbImage::new(2, 2));
        let err = save_views(&views, &blocker).unwrap_err();
        assert!(matches!(err, InspectError::OutputNotWritable { .. }));
        let _ = fs::remove_dir_all(dir);
    }
}
