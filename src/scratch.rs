//! Transient per-task scratch storage.
//!
//! Every capture task owns at most two scratch files: the raw captured
//! segment and its enhanced counterpart. Files are named uniquely per
//! (speaker, timestamp, generation) and removal is idempotent, so the
//! scheduler's single cleanup point can always delete both paths without
//! caring which stages actually ran.

use crate::error::{Result, WardenError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Scratch file pair owned by one capture task.
#[derive(Debug, Clone)]
pub struct TaskScratch {
    /// Raw captured segment (source rate/layout).
    pub raw: PathBuf,
    /// Enhanced segment (recognizer rate/layout).
    pub enhanced: PathBuf,
}

/// Designated writable directory for transient per-task audio files.
pub struct ScratchStore {
    root: PathBuf,
    // Held so a temp-dir root outlives the store; None for a configured dir.
    _tempdir: Option<TempDir>,
}

impl ScratchStore {
    /// Creates a store rooted at the given directory, creating it if needed.
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| WardenError::Scratch {
            path: root.display().to_string(),
            message: format!("Failed to create scratch directory: {}", e),
        })?;
        Ok(Self {
            root,
            _tempdir: None,
        })
    }

    /// Creates a store rooted at a fresh temporary directory.
    ///
    /// The directory and anything left in it are removed when the store is
    /// dropped.
    pub fn temporary() -> Result<Self> {
        let tempdir = tempfile::Builder::new()
            .prefix("voxwarden-")
            .tempdir()
            .map_err(|e| WardenError::Scratch {
                path: "<tempdir>".to_string(),
                message: format!("Failed to create scratch directory: {}", e),
            })?;
        Ok(Self {
            root: tempdir.path().to_path_buf(),
            _tempdir: Some(tempdir),
        })
    }

    /// Returns the scratch root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocates the scratch file pair for one task.
    ///
    /// Names embed speaker id, capture timestamp and the task generation so
    /// no two tasks can ever collide, including back-to-back tasks for the
    /// same speaker.
    pub fn allocate(&self, speaker: u64, timestamp_ms: u128, generation: u64) -> TaskScratch {
        let stem = format!("{}-{}-{}", speaker, timestamp_ms, generation);
        TaskScratch {
            raw: self.root.join(format!("{stem}-raw.wav")),
            enhanced: self.root.join(format!("{stem}-enh.wav")),
        }
    }

    /// Removes both scratch files for a task.
    ///
    /// Idempotent: missing files are not an error, so this can be called
    /// from every exit path (success, rejection, failure, timeout) and from
    /// late completions after the watchdog already cleaned up.
    pub fn release(&self, scratch: &TaskScratch) {
        remove_quietly(&scratch.raw);
        remove_quietly(&scratch.enhanced);
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "failed to remove scratch file"),
    }
}
