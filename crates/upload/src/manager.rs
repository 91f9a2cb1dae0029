//! Upload manager: runs sessions and tracks what is in flight.
//!
//! Sessions run independently; each owns a cancellation token registered
//! in the in-flight map for the duration of its run.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chunkup_protocol::UploadSession;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::UploadError;
use crate::local::LocalLayout;
use crate::ports::{LocalFs, SessionStore, Transport};
use crate::session::{self, SessionContext};
use crate::types::{UploadEvent, UploadOutcome, UploadSettings};

/// A running session's cancel handle and its current chunk request.
#[derive(Debug, Clone)]
pub(crate) struct InFlight {
    pub cancel: CancellationToken,
    pub chunk: Option<String>,
}

pub(crate) type InFlightMap = Arc<RwLock<HashMap<String, InFlight>>>;

/// Unregisters a session when its run ends, including when the run's
/// future is dropped before completion.
struct InFlightGuard<'m> {
    map: &'m InFlightMap,
    session_id: &'m str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.session_id);
    }
}

/// Drives chunked uploads against the host's collaborators.
///
/// Events are delivered on a bounded channel; the receiver from
/// [`take_events`](Self::take_events) must be drained while uploads run.
pub struct UploadManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    fs: Arc<dyn LocalFs>,
    layout: LocalLayout,
    settings: UploadSettings,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    in_flight: InFlightMap,
}

impl UploadManager {
    /// Creates a new manager.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        fs: Arc<dyn LocalFs>,
        layout: LocalLayout,
        settings: UploadSettings,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            transport,
            store,
            fs,
            layout,
            settings,
            events_tx,
            events_rx: Some(events_rx),
            in_flight: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    pub fn layout(&self) -> &LocalLayout {
        &self.layout
    }

    /// Uploads one session from planning through assembly.
    ///
    /// A session that was interrupted earlier resumes with its pending
    /// chunks. Failures have been cleaned up by the time this returns.
    pub async fn upload(&self, session: &UploadSession) -> Result<UploadOutcome, UploadError> {
        let cancel = CancellationToken::new();
        {
            let mut map = self
                .in_flight
                .write()
                .map_err(|_| UploadError::Store("in-flight map poisoned".into()))?;
            if map.contains_key(&session.id) {
                return Err(UploadError::AlreadyRunning(session.id.clone()));
            }
            map.insert(
                session.id.clone(),
                InFlight {
                    cancel: cancel.clone(),
                    chunk: None,
                },
            );
        }
        let guard = InFlightGuard {
            map: &self.in_flight,
            session_id: &session.id,
        };

        let ctx = SessionContext {
            transport: self.transport.as_ref(),
            store: self.store.as_ref(),
            fs: self.fs.as_ref(),
            layout: &self.layout,
            settings: &self.settings,
            events: &self.events_tx,
            in_flight: &self.in_flight,
            session,
            cancel,
        };
        info!(session = %session.id, file = %session.file_name, size = session.size, "upload starting");
        let result = session::run(&ctx).await;
        drop(guard);
        match &result {
            Ok(outcome) => {
                info!(session = %session.id, oc_id = %outcome.session_id, "upload completed")
            }
            Err(e) => error!(session = %session.id, error = %e, "upload failed"),
        }
        result
    }

    /// Cancels a running session. Returns false if it is not running.
    ///
    /// The in-flight chunk request is aborted; the session then goes
    /// through cancellation cleanup.
    pub fn cancel(&self, session_id: &str) -> bool {
        let Ok(map) = self.in_flight.read() else {
            return false;
        };
        match map.get(session_id) {
            Some(entry) => {
                info!(session = %session_id, chunk = ?entry.chunk, "cancelling upload");
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every running session.
    pub fn cancel_all(&self) -> usize {
        let Ok(map) = self.in_flight.read() else {
            return 0;
        };
        for entry in map.values() {
            entry.cancel.cancel();
        }
        map.len()
    }

    pub fn is_running(&self, session_id: &str) -> bool {
        self.in_flight
            .read()
            .is_ok_and(|map| map.contains_key(session_id))
    }

    /// Name of the chunk currently being sent for `session_id`.
    pub fn current_chunk(&self, session_id: &str) -> Option<String> {
        self.in_flight
            .read()
            .ok()?
            .get(session_id)
            .and_then(|entry| entry.chunk.clone())
    }

    pub fn running_sessions(&self) -> Vec<String> {
        self.in_flight
            .read()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }
}
