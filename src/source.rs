//! Numbered frame images on disk.

use std::io;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// A contiguous run of `NNNN.png` frames in one directory, decoded lazily in
/// ascending order.
#[derive(Debug, Clone)]
pub struct FrameSource {
    frames: Vec<(u64, PathBuf)>,
    next: usize,
}

impl FrameSource {
    /// List the frames in `dir`, which must be numbered `first_index`,
    /// `first_index + 1`, ... with no gaps.
    pub fn open(dir: &Path, first_index: u64) -> Result<Self> {
        let mut frames = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let path = entry.map_err(io::Error::from)?.into_path();
            if path.extension().map(|e| e != "png").unwrap_or(true) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<u64>().ok()) {
                Some(index) => frames.push((index, path)),
                None => log::warn!("ignoring non-numeric frame file {}", path.display()),
            }
        }
        frames.sort_by_key(|(index, _)| *index);

        let Some((first, _)) = frames.first() else {
            return Err(Error::exhausted(format!("no frames in {}", dir.display())));
        };
        if *first != first_index {
            return Err(Error::exhausted(format!(
                "first frame in {} is {}, expected {}",
                dir.display(),
                first,
                first_index
            )));
        }
        for (expected, (index, path)) in (first_index..).zip(&frames) {
            if *index != expected {
                return Err(Error::exhausted(format!(
                    "frame {} is missing before {}",
                    expected,
                    path.display()
                )));
            }
        }

        log::debug!("{} frames found in {}", frames.len(), dir.display());
        Ok(Self { frames, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.frames.iter().map(|(_, p)| p.as_path())
    }
}

impl Iterator for FrameSource {
    type Item = Result<DynamicImage>;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, path) = self.frames.get(self.next)?;
        self.next += 1;
        Some(image::open(path).map_err(Error::from))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.frames.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for FrameSource {}
