use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an upload session as persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    WaitUpload,
    /// A chunk request has been handed to the transport.
    Uploading,
    /// Bytes are flowing; reported on progress events.
    InUpload,
    UploadError,
    Uploaded,
}

/// What happens to the local copy once the remote object is assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selector {
    /// Drop the local copy after upload.
    #[default]
    UploadFile,
    /// Keep the local copy, re-homed under the new object's id.
    UploadFileNoDelete,
}

impl Selector {
    pub fn keeps_local_copy(self) -> bool {
        matches!(self, Selector::UploadFileNoDelete)
    }
}

/// One file transfer, from planning through assembly or cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Temporary object id; also names the local session directory.
    pub id: String,
    pub account: String,
    pub user_id: String,
    pub url_base: String,
    /// Remote directory, under the WebDAV root, receiving the file.
    pub server_url: String,
    pub file_name: String,
    pub size: u64,
    pub creation_date: DateTime<Utc>,
    pub modification_date: DateTime<Utc>,
    #[serde(default)]
    pub selector: Selector,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub asset_local_identifier: String,
    #[serde(default)]
    pub live_photo: bool,
    #[serde(default)]
    pub e2e_encrypted: bool,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_identifier: Option<u64>,
}

impl UploadSession {
    /// `X-OC-CTime` header value.
    pub fn ctime_header(&self) -> String {
        epoch_seconds(&self.creation_date)
    }

    /// `X-OC-MTime` header value.
    pub fn mtime_header(&self) -> String {
        epoch_seconds(&self.modification_date)
    }
}

/// Formats a timestamp as decimal epoch seconds (`1700000000.25`).
pub fn epoch_seconds(date: &DateTime<Utc>) -> String {
    let secs = date.timestamp() as f64 + f64::from(date.timestamp_subsec_micros()) / 1e6;
    format!("{secs}")
}

/// A planned chunk still waiting to be confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    pub account: String,
    pub session_id: String,
    pub chunk_folder: String,
    /// Zero-padded ordinal, also the remote object name.
    pub file_name: String,
    pub index: u32,
    pub size: u64,
    /// SHA-256 hex digest of the chunk payload.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

/// Server-side metadata of the assembled object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub oc_id: String,
    #[serde(default)]
    pub file_id: String,
    pub account: String,
    pub server_url: String,
    pub file_name: String,
    #[serde(default)]
    pub etag: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub asset_local_identifier: String,
    #[serde(default)]
    pub live_photo: bool,
    #[serde(default)]
    pub e2e_encrypted: bool,
    /// The originating library asset should be removed by its owner.
    #[serde(default)]
    pub delete_asset_local_identifier: bool,
}
