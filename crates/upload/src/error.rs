//! Upload error types.

use chunkup_protocol::constants::{ERROR_INTERNAL, ERROR_READ_FILE};
use chunkup_protocol::RemoteError;

/// Errors produced while driving an upload session.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The source could not be split into chunks. The session record has
    /// already been deleted.
    #[error("planning failed: {0}")]
    Planning(String),

    #[error("staging folder error: {0}")]
    Folder(RemoteError),

    #[error("chunk {chunk} upload failed: {error}")]
    ChunkUpload { chunk: String, error: RemoteError },

    #[error("assembly failed: {0}")]
    Assembly(RemoteError),

    #[error("session store error: {0}")]
    Store(String),

    #[error("session {0} is already uploading")]
    AlreadyRunning(String),
}

impl UploadError {
    /// The remote error carried by this failure, if it came from the transport.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Folder(e) | Self::Assembly(e) => Some(e),
            Self::ChunkUpload { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Protocol error code reported to observers for this failure.
    pub fn code(&self) -> i64 {
        match self {
            Self::Planning(_) => ERROR_READ_FILE,
            other => other.remote().map_or(ERROR_INTERNAL, |e| e.code),
        }
    }

    /// Converts the failure into the remote error handed to the classifier.
    pub(crate) fn to_remote(&self) -> RemoteError {
        match self.remote() {
            Some(e) => e.clone(),
            None => RemoteError::new(self.code(), self.to_string()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.remote().is_some_and(RemoteError::is_cancelled)
    }
}
