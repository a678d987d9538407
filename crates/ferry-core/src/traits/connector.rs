//! Transfer connector trait for pluggable remote file endpoints.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::result::AppResult;

/// Metadata about one entry in a remote directory listing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemoteEntry {
    /// Entry name relative to the listed directory.
    pub name: String,
    /// Size in bytes (0 for directories).
    pub size_bytes: u64,
    /// Whether this entry is a directory.
    pub is_directory: bool,
    /// Last modified timestamp (if known).
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// One progress event emitted during a transfer.
///
/// The stream of events for a single upload or download is finite: it ends
/// when the transfer completes or fails, and the final event carries
/// `bytes_done == bytes_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes transferred so far.
    pub bytes_done: u64,
    /// Total bytes expected (0 if unknown).
    pub bytes_total: u64,
}

/// Push channel for transfer progress events.
///
/// Connectors send events best-effort; a dropped receiver must not abort
/// the transfer.
pub type ProgressSender = mpsc::UnboundedSender<TransferProgress>;

/// Trait for remote file-transfer backends.
///
/// The scheduler consumes this interface and never implements a wire
/// protocol itself. The trait is defined here in `ferry-core` and
/// implemented in `ferry-connector`. All operations are synchronous from
/// the scheduler's viewpoint (awaited to completion); errors are opaque
/// messages with no structured taxonomy imposed on the connector.
#[async_trait]
pub trait TransferConnector: Send + Sync + std::fmt::Debug + 'static {
    /// Return the connector protocol name (e.g., "local", "sftp").
    fn connector_type(&self) -> &str;

    /// Establish the connection to the remote endpoint.
    async fn connect(&self) -> AppResult<()>;

    /// Close the connection to the remote endpoint.
    async fn disconnect(&self);

    /// Upload a local file to the remote path.
    async fn upload(
        &self,
        local_path: &str,
        remote_path: &str,
        progress: Option<ProgressSender>,
    ) -> AppResult<()>;

    /// Download a remote file to the local path.
    async fn download(
        &self,
        remote_path: &str,
        local_path: &str,
        progress: Option<ProgressSender>,
    ) -> AppResult<()>;

    /// Delete a file at the remote path.
    async fn delete(&self, remote_path: &str) -> AppResult<()>;

    /// List the contents of a remote directory.
    async fn list(&self, remote_dir: &str) -> AppResult<Vec<RemoteEntry>>;
}
