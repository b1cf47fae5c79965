//! Destinations for captured frames.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::Result;

/// One captured screen with its output sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameImage {
    pub sequence: u64,
    pub image: RgbImage,
}

impl FrameImage {
    /// Zero-padded file name, e.g. `00000042.png` for 8 digits.
    pub fn file_name(&self, digits: usize) -> String {
        format!("{:0width$}.png", self.sequence, width = digits)
    }
}

/// Receives captured frames in sequence order.
pub trait FrameSink {
    fn push(&mut self, frame: FrameImage) -> Result<()>;
}

impl FrameSink for Vec<FrameImage> {
    fn push(&mut self, frame: FrameImage) -> Result<()> {
        Vec::push(self, frame);
        Ok(())
    }
}

/// Saves each frame as a numbered PNG in a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    digits: usize,
    written: usize,
}

impl DirectorySink {
    /// Create `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, digits: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, digits, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn digits(&self) -> usize {
        self.digits
    }

    /// Frames saved so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for DirectorySink {
    fn push(&mut self, frame: FrameImage) -> Result<()> {
        let path = self.dir.join(frame.file_name(self.digits));
        frame.image.save(&path)?;
        self.written += 1;
        log::trace!("saved {}", path.display());
        Ok(())
    }
}
