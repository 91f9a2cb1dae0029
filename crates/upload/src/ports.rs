//! Collaborator traits implemented by the host.
//!
//! The engine owns no HTTP client, database or filesystem policy. The host
//! bridges these traits onto its own stack; tests use in-memory mocks.

use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;

use chunkup_protocol::{ChunkRecord, RemoteError, RemoteFile, SessionStatus};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;
use crate::types::{ChunkRequest, Depth, MoveRequest, TransferUpdate};

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Remote file operations.
///
/// Futures borrow only `self`; implementations copy whatever they need
/// from their arguments before returning.
pub trait Transport: Send + Sync {
    /// Uploads one chunk file.
    ///
    /// Lifecycle updates go to `updates` while the request runs. When
    /// `cancel` fires the request must be abandoned and resolve to a
    /// cancelled [`RemoteError`].
    fn upload(
        &self,
        request: ChunkRequest,
        updates: mpsc::UnboundedSender<TransferUpdate>,
        cancel: CancellationToken,
    ) -> TransportFuture<'_, ()>;

    /// Server-side MOVE of `request.source` onto `request.destination`.
    fn move_item(&self, request: MoveRequest) -> TransportFuture<'_, ()>;

    /// Checks that `url` exists (PROPFIND).
    fn probe(&self, url: &str, depth: Depth) -> TransportFuture<'_, ()>;

    /// Creates the collection at `url` (MKCOL).
    fn create_folder(&self, url: &str) -> TransportFuture<'_, ()>;

    /// Deletes `url` and, for collections, everything below it.
    fn delete(&self, url: &str) -> TransportFuture<'_, ()>;

    /// Reads the metadata of the object at `url`.
    fn read_file(&self, url: &str) -> TransportFuture<'_, RemoteFile>;
}

/// Persistent session and chunk bookkeeping.
///
/// Calls are short and synchronous; implementations must be safe to share
/// between concurrent sessions.
pub trait SessionStore: Send + Sync {
    /// Staging folder name for the session. Stable across calls.
    fn chunk_folder(&self, account: &str, session_id: &str) -> String;

    /// Persists planned chunks in upload order.
    fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), UploadError>;

    /// Pending chunks of a session, in upload order.
    fn chunks(&self, account: &str, session_id: &str) -> Vec<ChunkRecord>;

    fn chunk(&self, account: &str, session_id: &str, file_name: &str) -> Option<ChunkRecord>;

    fn delete_chunk(&self, account: &str, session_id: &str, file_name: &str)
    -> Result<(), UploadError>;

    fn delete_chunks(&self, account: &str, session_id: &str) -> Result<(), UploadError>;

    fn set_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        error: &str,
        task_identifier: Option<u64>,
    ) -> Result<(), UploadError>;

    fn delete_session(&self, session_id: &str) -> Result<(), UploadError>;

    /// Records the assembled object's metadata.
    fn add_metadata(&self, file: &RemoteFile) -> Result<(), UploadError>;

    /// Records that a local copy of `file` is kept.
    fn add_local_file(&self, file: &RemoteFile) -> Result<(), UploadError>;
}

/// Local filesystem operations used outside of chunk splitting.
pub trait LocalFs: Send + Sync {
    /// Size of the file at `path`, or 0 if it cannot be read.
    fn file_size(&self, path: &Path) -> u64;

    fn move_path(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes a file or a directory tree. A missing path is not an error.
    fn delete_path(&self, path: &Path) -> io::Result<()>;
}
