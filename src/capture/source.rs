use crate::error::{InspectError, Result};
use crate::tools::{collect_images, load_image};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Anything that yields frames: a camera, a file, a folder of snapshots.
///
/// `open` is called once before the first `read`; `release` once after the
/// last one.
pub trait FrameSource: Send {
    /// Acquire the device; `DeviceUnavailable` when it cannot be used
    fn open(&mut self) -> Result<()>;

    /// Next frame; blocking up to one frame interval is fine
    fn read(&mut self) -> Result<RgbImage>;

    /// Give the device back
    fn release(&mut self);

    /// Short label for logs
    fn describe(&self) -> String;
}

/// A single image file, re-read on every frame
#[derive(Debug, Clone)]
pub struct ImageFileSource {
    path: PathBuf,
}

impl ImageFileSource {
    /// Source backed by one image file
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl FrameSource for ImageFileSource {
    fn open(&mut self) -> Result<()> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(InspectError::device(format!("{} is not a file", self.path.display())))
        }
    }

    fn read(&mut self) -> Result<RgbImage> {
        Ok(load_image(&self.path)?.to_rgb8())
    }

    fn release(&mut self) {}

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Cycles through the images of a directory, in path order
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl DirectorySource {
    /// Source over a directory; the listing happens on `open`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            files: Vec::new(),
            next: 0,
        }
    }

    /// Files found by the last `open`
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for DirectorySource {
    fn open(&mut self) -> Result<()> {
        if !self.dir.is_dir() {
            return Err(InspectError::device(format!("{} is not a directory", self.dir.display())));
        }
        self.files = collect_images(&self.dir);
        self.next = 0;
        if self.files.is_empty() {
            return Err(InspectError::device(format!("no images in {}", self.dir.display())));
        }
        debug!(dir = %self.dir.display(), count = self.files.len(), "directory source opened");
        Ok(())
    }

    fn read(&mut self) -> Result<RgbImage> {
        if self.files.is_empty() {
            return Err(InspectError::device("directory source is not open"));
        }
        let path = &self.files[self.next % self.files.len()];
        self.next = (self.next + 1) % self.files.len();
        Ok(load_image(path)?.to_rgb8())
    }

    fn release(&mut self) {
        self.files.clear();
        self.next = 0;
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
