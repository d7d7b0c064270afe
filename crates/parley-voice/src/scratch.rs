//! Per-connection scratch directory for inbound and synthesized audio.
//!
//! Files are never removed one by one; the whole directory goes when the
//! connection ends, either through [`ScratchDir::close`] or, if the owning
//! task is dropped or panics, through `TempDir`'s own drop.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

const DIR_PREFIX: &str = "parley-";

#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Creates a fresh, uniquely named directory under `root`.
    pub fn create_in(root: impl AsRef<Path>) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns a path for a new file named `<stem>_<uuid>.<extension>`.
    pub fn file_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("{}_{}.{}", stem, Uuid::new_v4().simple(), extension))
    }

    /// Writes `bytes` to a new uniquely named file and returns its path.
    pub async fn write(&self, stem: &str, extension: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.file_path(stem, extension);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Deletes the directory and everything in it.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}
