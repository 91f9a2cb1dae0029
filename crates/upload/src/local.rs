//! Local session layout and the default [`LocalFs`] implementation.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ports::LocalFs;

const CHUNK_DIR: &str = "chunks";

/// Maps session ids to local directories.
///
/// Each session owns `<root>/<session_id>/`, holding the source file under
/// its own name. Chunk files live in the separate `chunks/` subdirectory so
/// no chunk name can collide with the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalLayout {
    root: PathBuf,
}

impl LocalLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    pub fn file_path(&self, session_id: &str, file_name: &str) -> PathBuf {
        self.session_dir(session_id).join(file_name)
    }

    pub fn chunk_dir(&self, session_id: &str) -> PathBuf {
        self.session_dir(session_id).join(CHUNK_DIR)
    }

    pub fn chunk_path(&self, session_id: &str, chunk_name: &str) -> PathBuf {
        self.chunk_dir(session_id).join(chunk_name)
    }
}

/// [`LocalFs`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl LocalFs for StdFs {
    fn file_size(&self, path: &Path) -> u64 {
        std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    fn move_path(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Rename fails across filesystems; fall back to copy.
                debug!(from = %from.display(), to = %to.display(), error = %e, "rename failed, copying");
                std::fs::copy(from, to)?;
                std::fs::remove_file(from)
            }
        }
    }

    fn delete_path(&self, path: &Path) -> io::Result<()> {
        let result = match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
            Ok(_) => std::fs::remove_file(path),
            Err(e) => Err(e),
        };
        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
