//! Scratch directories for extracted and captured frames.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Make `path` an empty directory, creating it or clearing what is in it.
pub fn prepare_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))?;
        return Ok(());
    }
    for entry in fs::read_dir(path).with_context(|| format!("reading {}", path.display()))? {
        let entry = entry?;
        let p = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&p).with_context(|| format!("removing {}", p.display()))?;
        } else {
            fs::remove_file(&p).with_context(|| format!("removing {}", p.display()))?;
        }
    }
    Ok(())
}

/// Removes a staging tree when dropped, unless [`keep`](Self::keep) was
/// called.
#[derive(Debug)]
pub struct StagingGuard {
    root: PathBuf,
    keep: bool,
}

impl StagingGuard {
    /// Prepare `root` as an empty directory and guard it.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        prepare_dir(&root)?;
        Ok(Self { root, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// An empty subdirectory of the staging root.
    pub fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        prepare_dir(&dir)?;
        Ok(dir)
    }

    /// Leave the tree on disk after drop.
    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.keep {
            log::info!("keeping staging directory {}", self.root.display());
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.root) {
            log::warn!("could not remove staging directory {}: {}", self.root.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_dir_empties_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("temp");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("00000001.png"), b"x").unwrap();
        fs::write(dir.join("nested/file"), b"x").unwrap();

        prepare_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn prepare_dir_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a/b");
        prepare_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn guard_removes_tree_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("staging");
        {
            let guard = StagingGuard::create(&root).unwrap();
            let frames = guard.subdir("frames").unwrap();
            fs::write(frames.join("1.png"), b"x").unwrap();
        }
        assert!(!root.exists());
    }

    #[test]
    fn kept_guard_leaves_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("staging");
        {
            let mut guard = StagingGuard::create(&root).unwrap();
            guard.subdir("capture").unwrap();
            guard.keep();
        }
        assert!(root.join("capture").is_dir());
    }
}
