//! Local-directory transfer connector.
//!
//! Treats a rooted local directory as the "remote" side. Used as the
//! reference [`TransferConnector`] implementation and by tests; transfers
//! are real file copies that emit progress events.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use ferry_core::error::{AppError, ErrorKind};
use ferry_core::result::AppResult;
use ferry_core::traits::connector::{
    ProgressSender, RemoteEntry, TransferConnector, TransferProgress,
};

/// Copy chunk size; one progress event is emitted per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Transfer connector backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalDirConnector {
    /// Root directory standing in for the remote endpoint.
    root: PathBuf,
}

impl LocalDirConnector {
    /// Create a new connector rooted at the given path.
    pub fn new(root_path: &str) -> Self {
        Self {
            root: PathBuf::from(root_path),
        }
    }

    /// Resolve a remote path to an absolute path within the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let clean = path.trim_start_matches('/');
        self.root.join(clean)
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transfer,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Copy `from` to `to` in chunks, emitting a progress event per chunk.
    async fn copy_with_progress(
        &self,
        from: &Path,
        to: &Path,
        progress: Option<ProgressSender>,
    ) -> AppResult<()> {
        let mut src = fs::File::open(from).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("File not found: {}", from.display()))
            } else {
                AppError::with_source(
                    ErrorKind::Transfer,
                    format!("Failed to open file: {}", from.display()),
                    e,
                )
            }
        })?;

        let total = src
            .metadata()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transfer,
                    format!("Failed to stat file: {}", from.display()),
                    e,
                )
            })?
            .len();

        let mut dst = fs::File::create(to).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transfer,
                format!("Failed to create file: {}", to.display()),
                e,
            )
        })?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut done: u64 = 0;
        loop {
            let n = src.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            dst.write_all(&buf[..n]).await?;
            done += n as u64;
            if let Some(tx) = &progress {
                // Receiver may be gone; the transfer continues regardless.
                let _ = tx.send(TransferProgress {
                    bytes_done: done,
                    bytes_total: total,
                });
            }
        }

        dst.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl TransferConnector for LocalDirConnector {
    fn connector_type(&self) -> &str {
        "local"
    }

    async fn connect(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Connection,
                format!("Failed to create connector root: {}", self.root.display()),
                e,
            )
        })?;
        debug!("Local connector ready at {}", self.root.display());
        Ok(())
    }

    async fn disconnect(&self) {
        debug!("Local connector closed");
    }

    async fn upload(
        &self,
        local_path: &str,
        remote_path: &str,
        progress: Option<ProgressSender>,
    ) -> AppResult<()> {
        let dest = self.resolve(remote_path);
        self.ensure_parent(&dest).await?;
        debug!("Uploading {} to {}", local_path, remote_path);
        self.copy_with_progress(Path::new(local_path), &dest, progress)
            .await
    }

    async fn download(
        &self,
        remote_path: &str,
        local_path: &str,
        progress: Option<ProgressSender>,
    ) -> AppResult<()> {
        let src = self.resolve(remote_path);
        let dest = PathBuf::from(local_path);
        self.ensure_parent(&dest).await?;
        debug!("Downloading {} to {}", remote_path, local_path);
        self.copy_with_progress(&src, &dest, progress).await
    }

    async fn delete(&self, remote_path: &str) -> AppResult<()> {
        let full_path = self.resolve(remote_path);
        fs::remove_file(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("File not found: {remote_path}"))
            } else {
                AppError::with_source(
                    ErrorKind::Transfer,
                    format!("Failed to delete file: {remote_path}"),
                    e,
                )
            }
        })?;
        debug!("Deleted {}", remote_path);
        Ok(())
    }

    async fn list(&self, remote_dir: &str) -> AppResult<Vec<RemoteEntry>> {
        let full_path = self.resolve(remote_dir);
        let mut dir = fs::read_dir(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Directory not found: {remote_dir}"))
            } else {
                AppError::with_source(
                    ErrorKind::Transfer,
                    format!("Failed to list directory: {remote_dir}"),
                    e,
                )
            }
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transfer,
                format!("Failed to read directory entry in {remote_dir}"),
                e,
            )
        })? {
            let meta = entry.metadata().await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Transfer,
                    format!("Failed to stat entry in {remote_dir}"),
                    e,
                )
            })?;
            entries.push(RemoteEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size_bytes: if meta.is_dir() { 0 } else { meta.len() },
                is_directory: meta.is_dir(),
                modified: meta.modified().ok().map(chrono::DateTime::from),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(remote: &tempfile::TempDir) -> LocalDirConnector {
        LocalDirConnector::new(remote.path().to_str().unwrap())
    }

    #[tokio::test]
    async fn test_upload_download_delete() {
        let remote = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let conn = connector(&remote);
        conn.connect().await.unwrap();

        let src = local.path().join("a.txt");
        std::fs::write(&src, b"hello world").unwrap();

        conn.upload(src.to_str().unwrap(), "/inbox/a.txt", None)
            .await
            .unwrap();
        assert!(remote.path().join("inbox/a.txt").exists());

        let dest = local.path().join("sub/back.txt");
        conn.download("/inbox/a.txt", dest.to_str().unwrap(), None)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");

        conn.delete("/inbox/a.txt").await.unwrap();
        assert!(!remote.path().join("inbox/a.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_missing_local_file() {
        let remote = tempfile::tempdir().unwrap();
        let conn = connector(&remote);
        conn.connect().await.unwrap();

        let err = conn
            .upload("/nonexistent/file.txt", "/x.txt", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_progress_events_reach_total() {
        let remote = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let conn = connector(&remote);
        conn.connect().await.unwrap();

        // Three chunks worth of data.
        let payload = vec![7u8; CHUNK_SIZE * 2 + 10];
        let src = local.path().join("big.bin");
        std::fs::write(&src, &payload).unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        conn.upload(src.to_str().unwrap(), "/big.bin", Some(tx))
            .await
            .unwrap();

        let mut last = None;
        while let Some(event) = rx.recv().await {
            assert_eq!(event.bytes_total, payload.len() as u64);
            last = Some(event);
        }
        assert_eq!(last.unwrap().bytes_done, payload.len() as u64);
    }

    #[tokio::test]
    async fn test_list() {
        let remote = tempfile::tempdir().unwrap();
        let conn = connector(&remote);
        conn.connect().await.unwrap();

        std::fs::write(remote.path().join("a.txt"), b"a").unwrap();
        std::fs::write(remote.path().join("b.txt"), b"bb").unwrap();
        std::fs::create_dir(remote.path().join("subdir")).unwrap();

        let entries = conn.list("/").await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[1].size_bytes, 2);
        assert!(entries[2].is_directory);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let remote = tempfile::tempdir().unwrap();
        let conn = connector(&remote);
        conn.connect().await.unwrap();

        let err = conn.delete("/missing.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
