//! Partial-file handling for received transfers.
//!
//! Incoming bytes land in `<name>.part`. Only [`PartialFile::commit`] moves
//! the data to its final name; dropping an uncommitted `PartialFile` deletes
//! the partial data.

use crate::PARTIAL_SUFFIX;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// A file being received
pub struct PartialFile {
    file: Option<File>,
    part_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
    committed: bool,
}

impl PartialFile {
    /// Create `<dir>/<file_name>.part` for writing.
    ///
    /// # Errors
    /// Fails if the directory cannot be created or the partial file already
    /// exists.
    pub async fn create(dir: &Path, file_name: &str) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let final_path = dir.join(file_name);
        let part_path = dir.join(format!("{file_name}.{PARTIAL_SUFFIX}"));

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part_path)
            .await?;

        Ok(Self {
            file: Some(file),
            part_path,
            final_path,
            bytes_written: 0,
            committed: false,
        })
    }

    /// Append a chunk
    ///
    /// # Errors
    /// Propagates write errors.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("partial file already closed"))?;
        file.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Path of the in-progress `.part` file
    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    /// Flush, sync, and rename to the final name.
    ///
    /// If the final name is taken a numeric suffix is appended
    /// (`name.1`, `name.2`, ...).
    ///
    /// # Errors
    /// Propagates sync or rename errors; the partial file is removed on
    /// failure.
    pub async fn commit(mut self) -> io::Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        let target = available_path(&self.final_path).await;
        tokio::fs::rename(&self.part_path, &target).await?;
        self.committed = true;

        tracing::debug!(
            "Committed {} bytes to {}",
            self.bytes_written,
            target.display()
        );
        Ok(target)
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.file.take();
        if let Err(e) = std::fs::remove_file(&self.part_path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    "Failed to remove partial file {}: {}",
                    self.part_path.display(),
                    e
                );
            }
        } else {
            tracing::debug!("Discarded partial file {}", self.part_path.display());
        }
    }
}

async fn available_path(path: &Path) -> PathBuf {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return path.to_path_buf();
    }

    let mut n = 1u32;
    loop {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(format!(".{n}"));
        let candidate = PathBuf::from(candidate);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_moves_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut partial = PartialFile::create(dir.path(), "notes.txt").await.unwrap();
        assert!(partial.part_path().exists());

        partial.write_chunk(b"hello ").await.unwrap();
        partial.write_chunk(b"world").await.unwrap();
        assert_eq!(partial.bytes_written(), 11);

        let part_path = partial.part_path().to_path_buf();
        let path = partial.commit().await.unwrap();

        assert_eq!(path, dir.path().join("notes.txt"));
        assert!(!part_path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_drop_discards_partial() {
        let dir = tempfile::tempdir().unwrap();
        let mut partial = PartialFile::create(dir.path(), "big.bin").await.unwrap();
        partial.write_chunk(&[0u8; 128]).await.unwrap();
        let part_path = partial.part_path().to_path_buf();

        drop(partial);

        assert!(!part_path.exists());
        assert!(!dir.path().join("big.bin").exists());
    }

    #[tokio::test]
    async fn test_commit_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"old").unwrap();

        let mut partial = PartialFile::create(dir.path(), "a.txt").await.unwrap();
        partial.write_chunk(b"new").await.unwrap();
        let path = partial.commit().await.unwrap();

        assert_eq!(path, dir.path().join("a.txt.1"));
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"old");
        assert_eq!(std::fs::read(path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_create_makes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("downloads/today");
        let partial = PartialFile::create(&nested, "x").await.unwrap();
        assert!(nested.is_dir());
        drop(partial);
    }
}
