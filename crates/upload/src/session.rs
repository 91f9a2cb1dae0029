//! Per-session pipeline: plan, stage, upload, assemble.

use std::path::PathBuf;

use chunkup_protocol::{RemoteError, UploadSession, paths};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::chunk_loop::ChunkUploadLoop;
use crate::error::UploadError;
use crate::local::LocalLayout;
use crate::manager::InFlightMap;
use crate::ports::{LocalFs, SessionStore, Transport};
use crate::types::{UploadEvent, UploadOutcome, UploadSettings};
use crate::{assembler, failure, planner, staging};

/// Everything one run needs, borrowed from the manager.
pub(crate) struct SessionContext<'a> {
    pub transport: &'a dyn Transport,
    pub store: &'a dyn SessionStore,
    pub fs: &'a dyn LocalFs,
    pub layout: &'a LocalLayout,
    pub settings: &'a UploadSettings,
    pub events: &'a mpsc::Sender<UploadEvent>,
    pub in_flight: &'a InFlightMap,
    pub session: &'a UploadSession,
    pub cancel: CancellationToken,
}

impl SessionContext<'_> {
    pub async fn emit(&self, event: UploadEvent) {
        let _ = self.events.send(event).await;
    }

    pub fn session_dir(&self) -> PathBuf {
        self.layout.session_dir(&self.session.id)
    }

    /// Records which chunk request is currently cancellable.
    pub fn set_current_chunk(&self, chunk: Option<&str>) {
        let Ok(mut map) = self.in_flight.write() else {
            return;
        };
        if let Some(entry) = map.get_mut(&self.session.id) {
            entry.chunk = chunk.map(str::to_owned);
        }
    }

    /// Store writes after the point of no return are logged, not propagated.
    pub fn log_store_error(&self, action: &str, result: Result<(), UploadError>) {
        if let Err(e) = result {
            warn!(session = %self.session.id, action, error = %e, "session store update failed");
        }
    }

    pub fn started_event(&self) -> UploadEvent {
        let s = self.session;
        UploadEvent::Started {
            session_id: s.id.clone(),
            server_url: s.server_url.clone(),
            account: s.account.clone(),
            file_name: s.file_name.clone(),
            selector: s.selector,
        }
    }
}

/// Drives one session to completion.
///
/// Planning failures return directly. Every later failure is classified
/// and cleaned up by [`failure::handle`] before it is returned.
pub(crate) async fn run(ctx: &SessionContext<'_>) -> Result<UploadOutcome, UploadError> {
    let session = ctx.session;
    let planned = planner::plan(ctx).await?;
    let folder_url = paths::chunk_folder_url(&session.url_base, &session.user_id, &planned.folder);
    debug!(session = %session.id, folder = %folder_url, chunks = planned.chunks.len(), "planned");

    let staged = if ctx.cancel.is_cancelled() {
        Err(RemoteError::explicitly_cancelled())
    } else {
        staging::ensure_folder(ctx.transport, &folder_url).await
    };
    ctx.emit(UploadEvent::NoticeDismissed {
        session_id: session.id.clone(),
    })
    .await;
    if let Err(error) = staged {
        return Err(failure::handle(ctx, &folder_url, UploadError::Folder(error)).await);
    }

    ctx.emit(ctx.started_event()).await;

    let uploaded = ChunkUploadLoop::new(ctx, &folder_url)
        .run(&planned.chunks)
        .await;
    let result = match uploaded {
        Ok(()) => assembler::assemble(ctx, &folder_url).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) => Err(failure::handle(ctx, &folder_url, e).await),
    }
}
