//! Sequential upload of pending chunks.

use chunkup_protocol::constants::ERROR_READ_FILE;
use chunkup_protocol::{ChunkRecord, RemoteError, SessionStatus, paths};
use chunkup_transfer::{ProgressSnapshot, ProgressTracker, validate_chunk_name};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::UploadError;
use crate::session::SessionContext;
use crate::types::{ChunkRequest, TransferUpdate, UploadEvent};

/// Uploads chunks one at a time, in plan order.
///
/// A chunk's record is deleted only after the server confirmed it, so an
/// interrupted session resumes with exactly the unconfirmed chunks.
pub(crate) struct ChunkUploadLoop<'c, 'a> {
    ctx: &'c SessionContext<'a>,
    folder_url: &'c str,
}

impl<'c, 'a> ChunkUploadLoop<'c, 'a> {
    pub fn new(ctx: &'c SessionContext<'a>, folder_url: &'c str) -> Self {
        Self { ctx, folder_url }
    }

    /// Uploads every chunk in `chunks`, stopping at the first failure.
    pub async fn run(&self, chunks: &[ChunkRecord]) -> Result<(), UploadError> {
        let session = self.ctx.session;
        let mut tracker = ProgressTracker::new(session.size, chunks.iter().map(|c| c.size));

        for record in chunks {
            if self.ctx.cancel.is_cancelled() {
                info!(session = %session.id, chunk = %record.file_name, "upload cancelled between chunks");
                return Err(UploadError::ChunkUpload {
                    chunk: record.file_name.clone(),
                    error: RemoteError::explicitly_cancelled(),
                });
            }

            let result = self.upload_chunk(record, &mut tracker).await;
            self.ctx.set_current_chunk(None);

            if let Err(error) = result {
                warn!(
                    session = %session.id,
                    chunk = %record.file_name,
                    code = error.code,
                    error = %error.description,
                    "chunk upload failed"
                );
                return Err(UploadError::ChunkUpload {
                    chunk: record.file_name.clone(),
                    error,
                });
            }

            self.ctx.log_store_error(
                "delete chunk",
                self.ctx
                    .store
                    .delete_chunk(&session.account, &session.id, &record.file_name),
            );
            if let Some(snapshot) = tracker.confirm_chunk() {
                self.publish(snapshot).await;
            }
            debug!(session = %session.id, chunk = %record.file_name, "chunk confirmed");
        }
        Ok(())
    }

    async fn upload_chunk(
        &self,
        record: &ChunkRecord,
        tracker: &mut ProgressTracker,
    ) -> Result<(), RemoteError> {
        let session = self.ctx.session;
        validate_chunk_name(&record.file_name)
            .map_err(|e| RemoteError::new(ERROR_READ_FILE, e.to_string()))?;

        let local_path = self.ctx.layout.chunk_path(&session.id, &record.file_name);
        let expected = self
            .ctx
            .store
            .chunk(&session.account, &session.id, &record.file_name)
            .map_or(record.size, |c| c.size);
        let residual = self.ctx.fs.file_size(&local_path);
        tracker.begin_chunk(expected, residual);

        let request = ChunkRequest {
            session_id: session.id.clone(),
            destination: paths::chunk_url(self.folder_url, &record.file_name),
            local_path,
            size: record.size,
            checksum: record.checksum.clone(),
        };
        let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
        let upload = self
            .ctx
            .transport
            .upload(request, updates_tx, self.ctx.cancel.child_token());
        tokio::pin!(upload);

        let mut in_upload = false;
        let result = loop {
            tokio::select! {
                biased;
                Some(update) = updates_rx.recv() => {
                    self.on_update(record, update, tracker, &mut in_upload).await;
                }
                result = &mut upload => break result,
            }
        };
        while let Ok(update) = updates_rx.try_recv() {
            self.on_update(record, update, tracker, &mut in_upload).await;
        }
        result
    }

    async fn on_update(
        &self,
        record: &ChunkRecord,
        update: TransferUpdate,
        tracker: &mut ProgressTracker,
        in_upload: &mut bool,
    ) {
        let session = self.ctx.session;
        match update {
            TransferUpdate::RequestCreated => {
                self.ctx.set_current_chunk(Some(&record.file_name));
            }
            TransferUpdate::TaskStarted { task_id } => {
                debug!(session = %session.id, chunk = %record.file_name, task_id, "chunk upload started");
                self.ctx.log_store_error(
                    "set status",
                    self.ctx.store.set_session_status(
                        &session.id,
                        SessionStatus::Uploading,
                        "",
                        Some(task_id),
                    ),
                );
            }
            TransferUpdate::Progress { bytes_sent } => {
                // Bytes are flowing: flagged once per chunk.
                if !*in_upload {
                    *in_upload = true;
                    self.ctx.log_store_error(
                        "set status",
                        self.ctx.store.set_session_status(
                            &session.id,
                            SessionStatus::InUpload,
                            "",
                            None,
                        ),
                    );
                }
                if let Some(snapshot) = tracker.advance(bytes_sent) {
                    self.publish(snapshot).await;
                }
            }
        }
    }

    async fn publish(&self, snapshot: ProgressSnapshot) {
        let s = self.ctx.session;
        self.ctx
            .emit(UploadEvent::Progress {
                session_id: s.id.clone(),
                account: s.account.clone(),
                file_name: s.file_name.clone(),
                server_url: s.server_url.clone(),
                progress: snapshot.fraction,
                bytes_done: snapshot.bytes_done,
                bytes_expected: snapshot.bytes_expected,
            })
            .await;
    }
}
