//! Chunk planning: reuse pending chunks or split the source file.

use std::path::PathBuf;

use chunkup_protocol::ChunkRecord;
use chunkup_protocol::constants::ERROR_READ_FILE;
use chunkup_transfer::{ChunkFile, remove_chunk_files, split_file};
use tracing::{info, warn};

use crate::error::UploadError;
use crate::session::SessionContext;
use crate::types::{Notice, UploadEvent};

/// Chunks to upload and the staging folder they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChunks {
    pub folder: String,
    pub chunks: Vec<ChunkRecord>,
}

/// Returns the chunks still to upload for the session.
///
/// Pending records from an interrupted attempt are returned unchanged.
/// Otherwise the source is split into a fresh folder. A source that
/// cannot be read, yields no chunks or does not match the session size
/// deletes the session and fails with [`UploadError::Planning`].
pub(crate) async fn plan(ctx: &SessionContext<'_>) -> Result<PlannedChunks, UploadError> {
    let session = ctx.session;
    let existing = ctx.store.chunks(&session.account, &session.id);
    if let Some(first) = existing.first() {
        info!(session = %session.id, pending = existing.len(), "resuming chunked upload");
        let folder = first.chunk_folder.clone();
        ctx.emit(UploadEvent::ReloadDataSource {
            server_url: session.server_url.clone(),
        })
        .await;
        return Ok(PlannedChunks {
            folder,
            chunks: existing,
        });
    }

    let folder = ctx.store.chunk_folder(&session.account, &session.id);
    ctx.emit(UploadEvent::Notice {
        session_id: session.id.clone(),
        notice: Notice::chunking(),
    })
    .await;

    let source = ctx.layout.file_path(&session.id, &session.file_name);
    let output = ctx.layout.chunk_dir(&session.id);
    let chunk_size = ctx.settings.chunk_size_bytes();
    let split = {
        let output = output.clone();
        tokio::task::spawn_blocking(move || split_file(&source, &output, chunk_size))
            .await
            .map_err(|e| format!("task join error: {e}"))
            .and_then(|r| r.map_err(|e| e.to_string()))
    };

    let files = match split {
        Ok(files) if !files.is_empty() => files,
        Ok(_) => return Err(planning_failed(ctx, "source file is empty".into()).await),
        Err(reason) => return Err(planning_failed(ctx, reason).await),
    };

    // Chunk sizes must add up to the session size.
    let total: u64 = files.iter().map(|f| f.size).sum();
    if total != session.size {
        discard_chunks(output, files).await;
        let reason = format!("split {total} bytes, expected {}", session.size);
        return Err(planning_failed(ctx, reason).await);
    }

    let chunks: Vec<ChunkRecord> = files
        .iter()
        .map(|file| chunk_record(ctx, &folder, file))
        .collect();
    if let Err(e) = ctx.store.add_chunks(&chunks) {
        discard_chunks(output, files).await;
        abandon(ctx, &e.to_string()).await;
        return Err(e);
    }
    info!(
        session = %session.id,
        chunks = chunks.len(),
        bytes = session.size,
        "file split for chunked upload"
    );
    Ok(PlannedChunks { folder, chunks })
}

fn chunk_record(ctx: &SessionContext<'_>, folder: &str, file: &ChunkFile) -> ChunkRecord {
    ChunkRecord {
        account: ctx.session.account.clone(),
        session_id: ctx.session.id.clone(),
        chunk_folder: folder.to_owned(),
        file_name: file.name.clone(),
        index: file.index,
        size: file.size,
        checksum: file.checksum.clone(),
    }
}

/// Removes chunk files written by a plan that will not be used.
async fn discard_chunks(dir: PathBuf, files: Vec<ChunkFile>) {
    if let Err(e) = tokio::task::spawn_blocking(move || remove_chunk_files(&dir, &files)).await {
        warn!(error = %e, "chunk cleanup task failed");
    }
}

async fn planning_failed(ctx: &SessionContext<'_>, reason: String) -> UploadError {
    abandon(ctx, &reason).await;
    UploadError::Planning(reason)
}

/// Reports a failed plan and drops the session record.
async fn abandon(ctx: &SessionContext<'_>, reason: &str) {
    let session = ctx.session;
    warn!(session = %session.id, reason = %reason, "chunk planning failed");
    ctx.emit(UploadEvent::NoticeDismissed {
        session_id: session.id.clone(),
    })
    .await;
    ctx.emit(UploadEvent::Notice {
        session_id: session.id.clone(),
        notice: Notice::error(format!("Cannot read {}: {reason}", session.file_name), ERROR_READ_FILE),
    })
    .await;
    ctx.log_store_error("delete session", ctx.store.delete_session(&session.id));
}
