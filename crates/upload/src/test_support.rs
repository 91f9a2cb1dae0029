//! In-memory collaborators for engine tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use chunkup_protocol::{
    ChunkRecord, RemoteError, RemoteFile, Selector, SessionStatus, UploadSession, paths,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;
use crate::local::{LocalLayout, StdFs};
use crate::manager::{InFlightMap, UploadManager};
use crate::ports::{SessionStore, Transport, TransportFuture};
use crate::session::SessionContext;
use crate::types::{ChunkRequest, Depth, MoveRequest, TransferUpdate, UploadEvent, UploadSettings};

pub const FOLDER_URL: &str = "https://cloud.example.com/remote.php/dav/uploads/alice/f1";

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Probe(String),
    CreateFolder(String),
    UploadStart(String),
    UploadEnd(String),
    Move(MoveRequest),
    Delete(String),
    ReadFile(String),
}

impl Call {
    pub fn kind(&self) -> &'static str {
        match self {
            Call::Probe(_) => "probe",
            Call::CreateFolder(_) => "mkcol",
            Call::UploadStart(_) => "put",
            Call::UploadEnd(_) => "put-done",
            Call::Move(_) => "move",
            Call::Delete(_) => "delete",
            Call::ReadFile(_) => "read",
        }
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    folders: Mutex<HashSet<String>>,
    all_folders_exist: Mutex<bool>,
    probe_failure: Mutex<Option<RemoteError>>,
    create_failure: Mutex<Option<RemoteError>>,
    chunk_failures: Mutex<HashMap<String, RemoteError>>,
    hang_on: Mutex<Option<String>>,
    move_failure: Mutex<Option<RemoteError>>,
    read_result: Mutex<Result<RemoteFile, RemoteError>>,
    next_task: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            folders: Mutex::new(HashSet::new()),
            all_folders_exist: Mutex::new(false),
            probe_failure: Mutex::new(None),
            create_failure: Mutex::new(None),
            chunk_failures: Mutex::new(HashMap::new()),
            hang_on: Mutex::new(None),
            move_failure: Mutex::new(None),
            read_result: Mutex::new(Err(RemoteError::new(404, "Not Found"))),
            next_task: AtomicU64::new(1),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn all_folders_exist(&self) {
        *self.all_folders_exist.lock().unwrap() = true;
    }

    pub fn fail_probe(&self, error: RemoteError) {
        *self.probe_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_create(&self, error: RemoteError) {
        *self.create_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_chunk(&self, name: &str, error: RemoteError) {
        self.chunk_failures
            .lock()
            .unwrap()
            .insert(name.to_owned(), error);
    }

    /// The named chunk's request stays open until it is cancelled.
    pub fn hang_on_chunk(&self, name: &str) {
        *self.hang_on.lock().unwrap() = Some(name.to_owned());
    }

    pub fn fail_move(&self, error: RemoteError) {
        *self.move_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_read(&self, error: RemoteError) {
        *self.read_result.lock().unwrap() = Err(error);
    }

    pub fn set_remote_file(&self, file: RemoteFile) {
        *self.read_result.lock().unwrap() = Ok(file);
    }

    pub fn clear_failures(&self) {
        *self.probe_failure.lock().unwrap() = None;
        *self.create_failure.lock().unwrap() = None;
        self.chunk_failures.lock().unwrap().clear();
        *self.hang_on.lock().unwrap() = None;
        *self.move_failure.lock().unwrap() = None;
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Transport for MockTransport {
    fn upload(
        &self,
        request: ChunkRequest,
        updates: mpsc::UnboundedSender<TransferUpdate>,
        cancel: CancellationToken,
    ) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let name = request
                .destination
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_owned();
            self.record(Call::UploadStart(name.clone()));
            let _ = updates.send(TransferUpdate::RequestCreated);
            let task_id = self.next_task.fetch_add(1, Ordering::SeqCst);
            let _ = updates.send(TransferUpdate::TaskStarted { task_id });

            let hang = self.hang_on.lock().unwrap().as_deref() == Some(name.as_str());
            if hang {
                cancel.cancelled().await;
                return Err(RemoteError::cancelled());
            }

            let _ = updates.send(TransferUpdate::Progress {
                bytes_sent: request.size / 2,
            });
            tokio::task::yield_now().await;
            let _ = updates.send(TransferUpdate::Progress {
                bytes_sent: request.size,
            });

            let failure = self.chunk_failures.lock().unwrap().get(&name).cloned();
            if let Some(error) = failure {
                return Err(error);
            }
            if cancel.is_cancelled() {
                return Err(RemoteError::cancelled());
            }
            self.record(Call::UploadEnd(name));
            Ok(())
        })
    }

    fn move_item(&self, request: MoveRequest) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.record(Call::Move(request));
            match self.move_failure.lock().unwrap().clone() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        })
    }

    fn probe(&self, url: &str, _depth: Depth) -> TransportFuture<'_, ()> {
        let url = url.to_owned();
        Box::pin(async move {
            self.record(Call::Probe(url.clone()));
            if let Some(error) = self.probe_failure.lock().unwrap().clone() {
                return Err(error);
            }
            let exists =
                *self.all_folders_exist.lock().unwrap() || self.folders.lock().unwrap().contains(&url);
            if exists {
                Ok(())
            } else {
                Err(RemoteError::new(404, "Not Found"))
            }
        })
    }

    fn create_folder(&self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_owned();
        Box::pin(async move {
            self.record(Call::CreateFolder(url.clone()));
            if let Some(error) = self.create_failure.lock().unwrap().clone() {
                return Err(error);
            }
            self.folders.lock().unwrap().insert(url);
            Ok(())
        })
    }

    fn delete(&self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_owned();
        Box::pin(async move {
            self.folders.lock().unwrap().remove(&url);
            self.record(Call::Delete(url));
            Ok(())
        })
    }

    fn read_file(&self, url: &str) -> TransportFuture<'_, RemoteFile> {
        let url = url.to_owned();
        Box::pin(async move {
            self.record(Call::ReadFile(url));
            self.read_result.lock().unwrap().clone()
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    chunks: Vec<ChunkRecord>,
    statuses: HashMap<String, (SessionStatus, String)>,
    deleted_sessions: HashSet<String>,
    metadata: Vec<RemoteFile>,
    local_files: Vec<RemoteFile>,
    fail_add_chunks: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn chunk_folder_for(&self, session: &UploadSession) -> String {
        self.chunk_folder(&session.account, &session.id)
    }

    pub fn pending(&self, session: &UploadSession) -> Vec<ChunkRecord> {
        self.chunks(&session.account, &session.id)
    }

    /// Makes the next `add_chunks` calls fail.
    pub fn fail_add_chunks(&self) {
        self.state.lock().unwrap().fail_add_chunks = true;
    }

    pub fn seed_chunks(&self, chunks: &[ChunkRecord]) {
        self.state.lock().unwrap().chunks.extend_from_slice(chunks);
    }

    pub fn session_deleted(&self, session_id: &str) -> bool {
        self.state.lock().unwrap().deleted_sessions.contains(session_id)
    }

    pub fn last_status(&self, session_id: &str) -> Option<SessionStatus> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .get(session_id)
            .map(|(status, _)| *status)
    }

    pub fn session_error(&self, session_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .get(session_id)
            .map(|(_, error)| error.clone())
    }

    pub fn metadata(&self) -> Vec<RemoteFile> {
        self.state.lock().unwrap().metadata.clone()
    }

    pub fn local_files(&self) -> Vec<RemoteFile> {
        self.state.lock().unwrap().local_files.clone()
    }
}

impl SessionStore for MemoryStore {
    fn chunk_folder(&self, account: &str, session_id: &str) -> String {
        paths::chunk_folder_name(account, session_id)
    }

    fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), UploadError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_add_chunks {
            return Err(UploadError::Store("disk full".into()));
        }
        state.chunks.extend_from_slice(chunks);
        Ok(())
    }

    fn chunks(&self, account: &str, session_id: &str) -> Vec<ChunkRecord> {
        let mut found: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .chunks
            .iter()
            .filter(|c| c.account == account && c.session_id == session_id)
            .cloned()
            .collect();
        found.sort_by_key(|c| c.index);
        found
    }

    fn chunk(&self, account: &str, session_id: &str, file_name: &str) -> Option<ChunkRecord> {
        self.chunks(account, session_id)
            .into_iter()
            .find(|c| c.file_name == file_name)
    }

    fn delete_chunk(
        &self,
        account: &str,
        session_id: &str,
        file_name: &str,
    ) -> Result<(), UploadError> {
        self.state.lock().unwrap().chunks.retain(|c| {
            !(c.account == account && c.session_id == session_id && c.file_name == file_name)
        });
        Ok(())
    }

    fn delete_chunks(&self, account: &str, session_id: &str) -> Result<(), UploadError> {
        self.state
            .lock()
            .unwrap()
            .chunks
            .retain(|c| !(c.account == account && c.session_id == session_id));
        Ok(())
    }

    fn set_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        error: &str,
        _task_identifier: Option<u64>,
    ) -> Result<(), UploadError> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(session_id.to_owned(), (status, error.to_owned()));
        Ok(())
    }

    fn delete_session(&self, session_id: &str) -> Result<(), UploadError> {
        self.state
            .lock()
            .unwrap()
            .deleted_sessions
            .insert(session_id.to_owned());
        Ok(())
    }

    fn add_metadata(&self, file: &RemoteFile) -> Result<(), UploadError> {
        self.state.lock().unwrap().metadata.push(file.clone());
        Ok(())
    }

    fn add_local_file(&self, file: &RemoteFile) -> Result<(), UploadError> {
        self.state.lock().unwrap().local_files.push(file.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Chunk records for `session` with the given sizes, named `00001`...
pub fn chunk_records(session: &UploadSession, folder: &str, sizes: &[u64]) -> Vec<ChunkRecord> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| {
            let index = i as u32 + 1;
            ChunkRecord {
                account: session.account.clone(),
                session_id: session.id.clone(),
                chunk_folder: folder.to_owned(),
                file_name: chunkup_transfer::chunk_name(index),
                index,
                size: *size,
                checksum: String::new(),
            }
        })
        .collect()
}

/// A session with its source file in a temp dir, plus mock collaborators.
pub struct Harness {
    pub session: UploadSession,
    pub settings: UploadSettings,
    pub layout: LocalLayout,
    pub transport: Arc<MockTransport>,
    pub store: Arc<MemoryStore>,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Mutex<mpsc::Receiver<UploadEvent>>,
    in_flight: InFlightMap,
    cancel: CancellationToken,
    _dir: TempDir,
}

impl Harness {
    /// Writes `source` as the session file; chunks are `chunk_size` bytes.
    pub fn new(source: &[u8], chunk_size: u64) -> Self {
        Self::with_file_name("movie.mov", source, chunk_size)
    }

    /// Like [`new`](Self::new) with the source stored as `file_name`.
    pub fn with_file_name(file_name: &str, source: &[u8], chunk_size: u64) -> Self {
        let mut h = Self::build(source.len() as u64, chunk_size);
        h.session.file_name = file_name.to_owned();
        let path = h.layout.file_path(&h.session.id, &h.session.file_name);
        std::fs::create_dir_all(h.session_dir()).unwrap();
        std::fs::write(path, source).unwrap();
        h
    }

    /// A session whose source file does not exist.
    pub fn without_source(chunk_size: u64) -> Self {
        Self::build(10, chunk_size)
    }

    fn build(size: u64, chunk_size: u64) -> Self {
        let dir = TempDir::new().unwrap();
        let layout = LocalLayout::new(dir.path().join("uploads"));
        let url_base = "https://cloud.example.com".to_owned();
        let session = UploadSession {
            id: "tmp-1".into(),
            account: format!("alice {url_base}"),
            user_id: "alice".into(),
            server_url: format!("{}/Photos", paths::home_url(&url_base)),
            url_base,
            file_name: "movie.mov".into(),
            size,
            creation_date: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            modification_date: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
            selector: Selector::UploadFile,
            asset_local_identifier: String::new(),
            live_photo: false,
            e2e_encrypted: false,
            status: SessionStatus::WaitUpload,
            session_error: String::new(),
            task_identifier: None,
        };
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            session,
            settings: UploadSettings {
                chunk_size,
                remove_originals: false,
            },
            layout,
            transport: Arc::new(MockTransport::new()),
            store: Arc::new(MemoryStore::default()),
            events_tx,
            events_rx: Mutex::new(events_rx),
            in_flight: InFlightMap::default(),
            cancel: CancellationToken::new(),
            _dir: dir,
        }
    }

    pub fn context(&self) -> SessionContext<'_> {
        SessionContext {
            transport: self.transport.as_ref(),
            store: self.store.as_ref(),
            fs: &StdFs,
            layout: &self.layout,
            settings: &self.settings,
            events: &self.events_tx,
            in_flight: &self.in_flight,
            session: &self.session,
            cancel: self.cancel.clone(),
        }
    }

    pub fn manager(&self) -> UploadManager {
        UploadManager::new(
            self.transport.clone(),
            self.store.clone(),
            Arc::new(StdFs),
            self.layout.clone(),
            self.settings,
        )
    }

    pub fn session_dir(&self) -> PathBuf {
        self.layout.session_dir(&self.session.id)
    }

    pub fn chunk_dir(&self) -> PathBuf {
        self.layout.chunk_dir(&self.session.id)
    }

    /// Events emitted through [`context`](Self::context) so far.
    pub fn drain_events(&self) -> Vec<UploadEvent> {
        let mut rx = self.events_rx.lock().unwrap();
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    pub fn remote_file(&self, oc_id: &str) -> RemoteFile {
        RemoteFile {
            oc_id: oc_id.to_owned(),
            file_id: "1001".into(),
            account: String::new(),
            server_url: String::new(),
            file_name: self.session.file_name.clone(),
            etag: "etag-1".into(),
            size: self.session.size,
            date: None,
            asset_local_identifier: String::new(),
            live_photo: false,
            e2e_encrypted: false,
            delete_asset_local_identifier: false,
        }
    }
}
