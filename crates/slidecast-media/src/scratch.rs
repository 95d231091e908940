//! Scoped scratch files for a single render.
//!
//! Every intermediate file (speech audio, slide text, clip segments, concat
//! list) is created through [`ScratchFiles`] and removed when the scope ends,
//! whether the render succeeded or failed. Removal failures are logged and
//! never surface as errors.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Tracks uniquely named temporary files and deletes them on cleanup or drop.
#[derive(Debug)]
pub struct ScratchFiles {
    dir: PathBuf,
    files: Vec<TempPath>,
}

impl ScratchFiles {
    /// Create a scope rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> MediaResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    /// Reserve a new empty file named `<prefix><random><suffix>`.
    pub fn create(&mut self, prefix: &str, suffix: &str) -> MediaResult<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.dir)?;
        let path = file.into_temp_path();
        let owned = path.to_path_buf();
        self.files.push(path);
        Ok(owned)
    }

    /// Reserve a new file and write `contents` to it.
    pub async fn write(&mut self, prefix: &str, suffix: &str, contents: &[u8]) -> MediaResult<PathBuf> {
        let path = self.create(prefix, suffix)?;
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files are tracked.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Delete all tracked files now. Returns how many could not be removed.
    pub fn cleanup(mut self) -> usize {
        self.release()
    }

    fn release(&mut self) -> usize {
        let mut failures = 0;
        for path in self.files.drain(..) {
            let removed = path.to_path_buf();
            match path.close() {
                Ok(()) => debug!("Removed scratch file {}", removed.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    failures += 1;
                    warn!("Failed to remove temp file {}: {}", removed.display(), e);
                }
            }
        }
        failures
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        self.release();
    }
}
