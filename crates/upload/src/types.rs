//! Data types for the upload flow.

use std::path::PathBuf;
use std::time::Duration;

use chunkup_protocol::constants::DEFAULT_CHUNK_SIZE_MB;
use chunkup_protocol::{RemoteFile, Selector};
use chunkup_transfer::MEGABYTE;
use serde::Serialize;

/// Informational notice display duration in milliseconds.
pub const NOTICE_DURATION_MS: u64 = 4000;

/// Error notice display duration in milliseconds (longer for visibility).
pub const ERROR_NOTICE_DURATION_MS: u64 = 6000;

/// Engine tunables supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    /// Chunk size in bytes.
    pub chunk_size: u64,
    /// Flag uploaded library assets for deletion by their owner.
    pub remove_originals: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self::with_chunk_size_mb(DEFAULT_CHUNK_SIZE_MB)
    }
}

impl UploadSettings {
    /// Settings with a chunk size in megabytes. Zero falls back to the default.
    pub fn with_chunk_size_mb(megabytes: u64) -> Self {
        let megabytes = if megabytes == 0 {
            DEFAULT_CHUNK_SIZE_MB
        } else {
            megabytes
        };
        Self {
            chunk_size: megabytes * MEGABYTE,
            remove_originals: false,
        }
    }

    pub(crate) fn chunk_size_bytes(&self) -> usize {
        usize::try_from(self.chunk_size).unwrap_or(usize::MAX)
    }
}

/// The visual category of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-facing notice raised by the engine.
///
/// Display and dismissal timing are host concerns; `duration_ms` is a hint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Notice {
    /// Long-running notice shown while a source file is split.
    pub fn chunking() -> Self {
        Self {
            level: NoticeLevel::Info,
            title: "Preparing upload".into(),
            message: "Splitting the file into chunks, please wait".into(),
            error_code: None,
            duration_ms: None,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
            error_code: None,
            duration_ms: Some(NOTICE_DURATION_MS),
        }
    }

    pub fn error(message: impl Into<String>, code: i64) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: "Upload error".into(),
            message: message.into(),
            error_code: Some(code),
            duration_ms: Some(ERROR_NOTICE_DURATION_MS),
        }
    }
}

/// Event emitted while a session moves through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UploadEvent {
    /// The staging folder is ready and chunks are about to be sent.
    Started {
        session_id: String,
        server_url: String,
        account: String,
        file_name: String,
        selector: Selector,
    },
    /// Session-wide progress. `progress` is in `[0, 1]` and non-decreasing.
    Progress {
        session_id: String,
        account: String,
        file_name: String,
        server_url: String,
        progress: f64,
        bytes_done: u64,
        bytes_expected: u64,
    },
    /// The session was cancelled and its artifacts removed.
    Cancelled {
        session_id: String,
        server_url: String,
        account: String,
    },
    /// Terminal event for every run that got past planning.
    ///
    /// On success `session_id` is the assembled object's id and
    /// `temp_session_id` the id the session was uploaded under.
    Finished {
        session_id: String,
        server_url: String,
        account: String,
        file_name: String,
        temp_session_id: String,
        error_code: i64,
        error_description: String,
    },
    /// Listings of `server_url` should be refreshed.
    ReloadDataSource { server_url: String },
    /// Listings of `server_url` should be refreshed from the server.
    ReloadDataSourceForced { server_url: String },
    Notice { session_id: String, notice: Notice },
    NoticeDismissed { session_id: String },
}

impl UploadEvent {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Started { session_id, .. }
            | Self::Progress { session_id, .. }
            | Self::Cancelled { session_id, .. }
            | Self::Finished { session_id, .. }
            | Self::Notice { session_id, .. }
            | Self::NoticeDismissed { session_id } => Some(session_id),
            Self::ReloadDataSource { .. } | Self::ReloadDataSourceForced { .. } => None,
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    /// Id of the assembled object, or the temporary id when the metadata
    /// re-read failed.
    pub session_id: String,
    pub temp_session_id: String,
    /// Server metadata of the assembled object, when it could be read.
    pub remote: Option<RemoteFile>,
    pub error_code: i64,
}

/// One chunk PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    pub session_id: String,
    /// Full URL of the chunk inside the staging folder.
    pub destination: String,
    pub local_path: PathBuf,
    pub size: u64,
    /// SHA-256 hex digest of the payload, when known.
    pub checksum: String,
}

/// Lifecycle updates reported by the transport while a chunk is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferUpdate {
    /// The request object exists and can be cancelled.
    RequestCreated,
    /// The transport assigned a task id to the request.
    TaskStarted { task_id: u64 },
    /// Cumulative bytes sent for the current chunk.
    Progress { bytes_sent: u64 },
}

/// Server-side MOVE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub source: String,
    pub destination: String,
    pub overwrite: bool,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// PROPFIND depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
}

impl Depth {
    pub fn as_header(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
        }
    }
}
