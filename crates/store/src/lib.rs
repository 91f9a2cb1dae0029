//! Persistent session bookkeeping backed by a single JSON file.
//!
//! Every mutation rewrites the file, so a crash between chunk uploads
//! leaves exactly the unconfirmed chunk records behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chunkup_protocol::{ChunkRecord, RemoteFile, SessionStatus, UploadSession, paths};
use chunkup_upload::{SessionStore, UploadError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors produced by the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for UploadError {
    fn from(e: StoreError) -> Self {
        UploadError::Store(e.to_string())
    }
}

/// A kept local copy of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFileEntry {
    pub oc_id: String,
    pub account: String,
    pub file_name: String,
    #[serde(default)]
    pub etag: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreData {
    #[serde(default)]
    sessions: BTreeMap<String, UploadSession>,
    #[serde(default)]
    chunks: Vec<ChunkRecord>,
    #[serde(default)]
    metadata: BTreeMap<String, RemoteFile>,
    #[serde(default)]
    local_files: BTreeMap<String, LocalFileEntry>,
}

/// [`SessionStore`] persisted to a JSON file.
pub struct JsonStore {
    path: PathBuf,
    data: RwLock<StoreData>,
    writes: AtomicU64,
}

impl JsonStore {
    /// Opens the store at `path`, loading existing records from disk.
    pub fn new(path: PathBuf) -> Result<Self, StoreError> {
        let data = load_data(&path)?;
        Ok(Self {
            path,
            data: RwLock::new(data),
            writes: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts or replaces a session record.
    pub fn add_session(&self, session: &UploadSession) -> Result<(), StoreError> {
        self.mutate(|data| {
            data.sessions.insert(session.id.clone(), session.clone());
        })
    }

    pub fn session(&self, session_id: &str) -> Option<UploadSession> {
        self.read().sessions.get(session_id).cloned()
    }

    /// All sessions, ordered by id.
    pub fn sessions(&self) -> Vec<UploadSession> {
        self.read().sessions.values().cloned().collect()
    }

    pub fn metadata(&self, oc_id: &str) -> Option<RemoteFile> {
        self.read().metadata.get(oc_id).cloned()
    }

    pub fn local_file(&self, oc_id: &str) -> Option<LocalFileEntry> {
        self.read().local_files.get(oc_id).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f` and persists the result while still holding the write
    /// lock, so file writes happen in mutation order.
    fn mutate(&self, f: impl FnOnce(&mut StoreData)) -> Result<(), StoreError> {
        let mut data = self.write();
        f(&mut data);
        self.persist(&data)
    }

    /// Writes `data` to disk through a temp file. Callers hold the write lock.
    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(data)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let seq = self.writes.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .path
            .with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
        if let Err(e) = std::fs::write(&tmp, json).and_then(|()| std::fs::rename(&tmp, &self.path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(
            sessions = data.sessions.len(),
            chunks = data.chunks.len(),
            "persisted session store to {:?}",
            self.path
        );
        Ok(())
    }
}

impl SessionStore for JsonStore {
    fn chunk_folder(&self, account: &str, session_id: &str) -> String {
        paths::chunk_folder_name(account, session_id)
    }

    fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), UploadError> {
        Ok(self.mutate(|data| {
            // A fresh plan replaces whatever was left for the same session.
            for c in chunks {
                data.chunks
                    .retain(|old| !(old.account == c.account && old.session_id == c.session_id));
            }
            data.chunks.extend_from_slice(chunks);
        })?)
    }

    fn chunks(&self, account: &str, session_id: &str) -> Vec<ChunkRecord> {
        let mut found: Vec<ChunkRecord> = self
            .read()
            .chunks
            .iter()
            .filter(|c| c.account == account && c.session_id == session_id)
            .cloned()
            .collect();
        found.sort_by_key(|c| c.index);
        found
    }

    fn chunk(&self, account: &str, session_id: &str, file_name: &str) -> Option<ChunkRecord> {
        self.read()
            .chunks
            .iter()
            .find(|c| c.account == account && c.session_id == session_id && c.file_name == file_name)
            .cloned()
    }

    fn delete_chunk(
        &self,
        account: &str,
        session_id: &str,
        file_name: &str,
    ) -> Result<(), UploadError> {
        Ok(self.mutate(|data| {
            data.chunks.retain(|c| {
                !(c.account == account && c.session_id == session_id && c.file_name == file_name)
            });
        })?)
    }

    fn delete_chunks(&self, account: &str, session_id: &str) -> Result<(), UploadError> {
        Ok(self.mutate(|data| {
            data.chunks
                .retain(|c| !(c.account == account && c.session_id == session_id));
        })?)
    }

    fn set_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        error: &str,
        task_identifier: Option<u64>,
    ) -> Result<(), UploadError> {
        let mut data = self.write();
        let Some(session) = data.sessions.get_mut(session_id) else {
            debug!(session = %session_id, "status update for unknown session");
            return Ok(());
        };
        session.status = status;
        session.session_error = error.to_owned();
        if task_identifier.is_some() {
            session.task_identifier = task_identifier;
        }
        Ok(self.persist(&data)?)
    }

    fn delete_session(&self, session_id: &str) -> Result<(), UploadError> {
        Ok(self.mutate(|data| {
            data.sessions.remove(session_id);
        })?)
    }

    fn add_metadata(&self, file: &RemoteFile) -> Result<(), UploadError> {
        Ok(self.mutate(|data| {
            data.metadata.insert(file.oc_id.clone(), file.clone());
        })?)
    }

    fn add_local_file(&self, file: &RemoteFile) -> Result<(), UploadError> {
        let entry = LocalFileEntry {
            oc_id: file.oc_id.clone(),
            account: file.account.clone(),
            file_name: file.file_name.clone(),
            etag: file.etag.clone(),
        };
        Ok(self.mutate(|data| {
            data.local_files.insert(entry.oc_id.clone(), entry);
        })?)
    }
}

/// Loads store data from a JSON file on disk.
fn load_data(path: &Path) -> Result<StoreData, StoreError> {
    if !path.exists() {
        return Ok(StoreData::default());
    }
    let text = std::fs::read_to_string(path)?;
    let data: StoreData = serde_json::from_str(&text)?;
    debug!(
        sessions = data.sessions.len(),
        chunks = data.chunks.len(),
        "loaded session store from {:?}",
        path
    );
    Ok(data)
}

/// Returns the default store path.
pub fn default_store_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("chunkup").join("sessions.json"))
}

/// Returns the platform-specific config directory.
fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config"))
    }
}
