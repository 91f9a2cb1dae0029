//! Failure classification and cleanup.

use chunkup_protocol::constants::ERROR_INTERNAL;
use chunkup_protocol::{RemoteError, SessionStatus};
use tracing::{error, warn};

use crate::error::UploadError;
use crate::session::SessionContext;
use crate::types::{Notice, UploadEvent};

/// How a failed session is cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The caller or the transport cancelled: every artifact is removed.
    Cancelled,
    /// The network went away: the session stays resumable, quietly.
    ConnectionLost,
    /// Anything else: the session stays resumable and the user is told.
    Generic,
}

impl FailureKind {
    pub fn classify(error: &RemoteError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else if error.is_connection_lost() {
            Self::ConnectionLost
        } else {
            Self::Generic
        }
    }
}

/// Cleans up after a failure past the planning stage and returns `failure`.
///
/// Emits exactly one [`UploadEvent::Finished`] carrying the original code.
pub(crate) async fn handle(
    ctx: &SessionContext<'_>,
    folder_url: &str,
    failure: UploadError,
) -> UploadError {
    let session = ctx.session;
    let remote = failure.to_remote();
    let kind = FailureKind::classify(&remote);
    error!(
        session = %session.id,
        code = remote.code,
        kind = ?kind,
        error = %failure,
        "chunked upload failed"
    );

    let description = match kind {
        FailureKind::Cancelled => {
            if let Err(e) = ctx.transport.delete(folder_url).await {
                warn!(session = %session.id, code = e.code, "could not delete staging folder");
            }
            ctx.log_store_error("delete session", ctx.store.delete_session(&session.id));
            ctx.log_store_error(
                "delete chunks",
                ctx.store.delete_chunks(&session.account, &session.id),
            );
            if let Err(e) = ctx.fs.delete_path(&ctx.session_dir()) {
                warn!(session = %session.id, error = %e, "could not remove session directory");
            }
            ctx.emit(UploadEvent::Cancelled {
                session_id: session.id.clone(),
                server_url: session.server_url.clone(),
                account: session.account.clone(),
            })
            .await;
            String::new()
        }
        FailureKind::ConnectionLost => {
            ctx.log_store_error(
                "set status",
                ctx.store
                    .set_session_status(&session.id, SessionStatus::UploadError, "", None),
            );
            String::new()
        }
        FailureKind::Generic => {
            ctx.emit(UploadEvent::Notice {
                session_id: session.id.clone(),
                // The server code travels in the message text.
                notice: Notice::error(
                    format!("{} code: {}", remote.description, remote.code),
                    ERROR_INTERNAL,
                ),
            })
            .await;
            ctx.log_store_error(
                "set status",
                ctx.store.set_session_status(
                    &session.id,
                    SessionStatus::UploadError,
                    &remote.description,
                    None,
                ),
            );
            remote.description.clone()
        }
    };

    ctx.emit(UploadEvent::Finished {
        session_id: session.id.clone(),
        server_url: session.server_url.clone(),
        account: session.account.clone(),
        file_name: session.file_name.clone(),
        temp_session_id: session.id.clone(),
        error_code: remote.code,
        error_description: description,
    })
    .await;
    failure
}
