//! Server-side assembly and metadata reconciliation.

use std::time::Duration;

use chunkup_protocol::constants::{
    ASSEMBLE_TIME_MAX, ASSEMBLE_TIME_MIN, ASSEMBLE_TIME_PER_GB, ERROR_INTERNAL, ERROR_NONE,
    HEADER_CTIME, HEADER_MTIME,
};
use chunkup_protocol::{RemoteError, RemoteFile, paths};
use tracing::{info, warn};

use crate::error::UploadError;
use crate::session::SessionContext;
use crate::types::{MoveRequest, UploadEvent, UploadOutcome};

/// Time allowed for the server to assemble `size_bytes` of chunks.
///
/// Three minutes per gigabyte, clamped to between one and thirty minutes.
pub fn assemble_timeout(size_bytes: u64) -> Duration {
    let gigabytes = size_bytes as f64 / 1e9;
    let secs = (ASSEMBLE_TIME_PER_GB.as_secs_f64() * gigabytes)
        .clamp(ASSEMBLE_TIME_MIN.as_secs_f64(), ASSEMBLE_TIME_MAX.as_secs_f64());
    Duration::from_secs_f64(secs)
}

/// Moves the staging marker onto the destination, then reconciles.
///
/// Only a failed MOVE is an error. Once the server has assembled the file
/// the run succeeds, even if the metadata re-read fails.
pub(crate) async fn assemble(
    ctx: &SessionContext<'_>,
    folder_url: &str,
) -> Result<UploadOutcome, UploadError> {
    let session = ctx.session;
    let destination = paths::destination_url(
        &session.url_base,
        &session.user_id,
        &session.server_url,
        &session.file_name,
    )
    .ok_or_else(|| {
        UploadError::Assembly(RemoteError::new(
            ERROR_INTERNAL,
            format!("{} is not under {}", session.server_url, session.url_base),
        ))
    })?;

    let request = MoveRequest {
        source: paths::staging_marker_url(folder_url),
        destination: destination.clone(),
        overwrite: true,
        headers: vec![
            (HEADER_CTIME.to_owned(), session.ctime_header()),
            (HEADER_MTIME.to_owned(), session.mtime_header()),
        ],
        timeout: assemble_timeout(session.size),
    };
    ctx.transport
        .move_item(request)
        .await
        .map_err(UploadError::Assembly)?;
    info!(session = %session.id, destination = %destination, "chunks assembled");

    ctx.log_store_error("delete session", ctx.store.delete_session(&session.id));
    ctx.log_store_error(
        "delete chunks",
        ctx.store.delete_chunks(&session.account, &session.id),
    );

    match ctx.transport.read_file(&destination).await {
        Ok(remote) => Ok(reconcile(ctx, remote).await),
        Err(e) => {
            warn!(session = %session.id, code = e.code, error = %e.description, "metadata re-read failed");
            ctx.emit(UploadEvent::ReloadDataSourceForced {
                server_url: session.server_url.clone(),
            })
            .await;
            ctx.emit(finished_event(ctx, &session.id)).await;
            Ok(UploadOutcome {
                session_id: session.id.clone(),
                temp_session_id: session.id.clone(),
                remote: None,
                error_code: ERROR_NONE,
            })
        }
    }
}

/// Records the assembled object and settles the local copy.
async fn reconcile(ctx: &SessionContext<'_>, remote: RemoteFile) -> UploadOutcome {
    let session = ctx.session;
    let mut file = RemoteFile {
        account: session.account.clone(),
        server_url: session.server_url.clone(),
        asset_local_identifier: session.asset_local_identifier.clone(),
        live_photo: session.live_photo,
        e2e_encrypted: session.e2e_encrypted,
        ..remote
    };
    if ctx.settings.remove_originals && !file.asset_local_identifier.is_empty() {
        file.delete_asset_local_identifier = true;
    }
    ctx.log_store_error("add metadata", ctx.store.add_metadata(&file));

    if session.selector.keeps_local_copy() {
        let from = ctx.layout.file_path(&session.id, &session.file_name);
        let to = ctx.layout.file_path(&file.oc_id, &file.file_name);
        match ctx.fs.move_path(&from, &to) {
            Ok(()) => ctx.log_store_error("add local file", ctx.store.add_local_file(&file)),
            Err(e) => warn!(session = %session.id, error = %e, "could not keep local copy"),
        }
    }
    if let Err(e) = ctx.fs.delete_path(&ctx.session_dir()) {
        warn!(session = %session.id, error = %e, "could not remove session directory");
    }

    ctx.emit(UploadEvent::ReloadDataSource {
        server_url: session.server_url.clone(),
    })
    .await;
    ctx.emit(finished_event(ctx, &file.oc_id)).await;
    info!(session = %session.id, oc_id = %file.oc_id, "upload finished");

    UploadOutcome {
        session_id: file.oc_id.clone(),
        temp_session_id: session.id.clone(),
        remote: Some(file),
        error_code: ERROR_NONE,
    }
}

fn finished_event(ctx: &SessionContext<'_>, session_id: &str) -> UploadEvent {
    let s = ctx.session;
    UploadEvent::Finished {
        session_id: session_id.to_owned(),
        server_url: s.server_url.clone(),
        account: s.account.clone(),
        file_name: s.file_name.clone(),
        temp_session_id: s.id.clone(),
        error_code: ERROR_NONE,
        error_description: String::new(),
    }
}
