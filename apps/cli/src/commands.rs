//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use chunkup_protocol::constants::ERROR_NONE;
use chunkup_protocol::{Selector, SessionStatus, UploadSession, paths};
use chunkup_store::JsonStore;
use chunkup_upload::{LocalLayout, SessionStore, StdFs, UploadEvent, UploadManager};
use chunkup_webdav::Client;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bridge::WebDavTransport;
use crate::config::CliConfig;

/// Configured account plus the session store it uses.
pub struct App {
    config: CliConfig,
    store: Arc<JsonStore>,
}

impl App {
    pub fn open(config: CliConfig) -> anyhow::Result<Self> {
        let store_path = config.store_path()?;
        let store = JsonStore::new(store_path.clone())
            .with_context(|| format!("opening session store {}", store_path.display()))?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    fn layout(&self) -> anyhow::Result<LocalLayout> {
        Ok(LocalLayout::new(self.config.storage_dir()?))
    }

    /// Stages `file` locally under a new session and uploads it into `to`.
    pub async fn upload_file(&self, file: &Path, to: &str, keep_local: bool) -> anyhow::Result<()> {
        self.config.validate()?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .context("source path has no file name")?
            .to_owned();
        let meta = tokio::fs::metadata(file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;
        let modified: DateTime<Utc> = meta.modified().map(DateTime::from).unwrap_or_else(|_| Utc::now());
        let created: DateTime<Utc> = meta.created().map(DateTime::from).unwrap_or(modified);

        let id = uuid::Uuid::new_v4().simple().to_string();
        let layout = self.layout()?;
        tokio::fs::create_dir_all(layout.session_dir(&id)).await?;
        tokio::fs::copy(file, layout.file_path(&id, &file_name))
            .await
            .with_context(|| format!("staging {}", file.display()))?;

        let selector = if keep_local {
            Selector::UploadFileNoDelete
        } else {
            Selector::UploadFile
        };
        let session = build_session(
            &self.config,
            SessionSource {
                id,
                file_name,
                size: meta.len(),
                created,
                modified,
            },
            to,
            selector,
        );
        self.store.add_session(&session)?;
        info!(session = %session.id, file = %session.file_name, to = %session.server_url, "session created");
        self.run(session).await
    }

    /// Resumes a session left by an interrupted or failed run.
    pub async fn resume(&self, session_id: &str) -> anyhow::Result<()> {
        self.config.validate()?;
        let session = self
            .store
            .session(session_id)
            .with_context(|| format!("no session {session_id}"))?;
        let pending = self.store.chunks(&session.account, &session.id).len();
        info!(session = %session.id, pending, "resuming session");
        self.run(session).await
    }

    /// Prints every stored session with its pending chunk count.
    pub fn list_sessions(&self) {
        let sessions = self.store.sessions();
        if sessions.is_empty() {
            println!("no sessions");
            return;
        }
        for s in sessions {
            let pending = self.store.chunks(&s.account, &s.id).len();
            println!(
                "{}  {:<12} {:>4} pending  {}  {}",
                s.id,
                status_label(s.status),
                pending,
                s.file_name,
                s.session_error
            );
        }
    }

    async fn run(&self, session: UploadSession) -> anyhow::Result<()> {
        let client = Client::new(&self.config.user, &self.config.password())?;
        let mut manager = UploadManager::new(
            Arc::new(WebDavTransport::new(client)),
            self.store.clone(),
            Arc::new(StdFs),
            self.layout()?,
            self.config.upload_settings(),
        );
        let events = manager
            .take_events()
            .context("upload events already taken")?;
        let manager = Arc::new(manager);
        let printer = tokio::spawn(print_events(events));

        let canceller = {
            let manager = manager.clone();
            let session_id = session.id.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!(session = %session_id, "interrupt received, cancelling upload");
                    manager.cancel(&session_id);
                }
            })
        };

        let result = manager.upload(&session).await;
        canceller.abort();
        let _ = canceller.await;
        drop(manager);
        let _ = printer.await;

        let outcome = result.with_context(|| format!("upload of {} failed", session.file_name))?;
        println!("uploaded {} (id {})", session.file_name, outcome.session_id);
        Ok(())
    }
}

/// Local facts about a staged source file.
pub struct SessionSource {
    pub id: String,
    pub file_name: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

pub fn build_session(
    config: &CliConfig,
    source: SessionSource,
    to: &str,
    selector: Selector,
) -> UploadSession {
    let url_base = config.url_base.trim_end_matches('/').to_owned();
    UploadSession {
        id: source.id,
        account: config.account(),
        user_id: config.user_id().to_owned(),
        server_url: remote_dir_url(&url_base, to),
        url_base,
        file_name: source.file_name,
        size: source.size,
        creation_date: source.created,
        modification_date: source.modified,
        selector,
        asset_local_identifier: String::new(),
        live_photo: false,
        e2e_encrypted: false,
        status: SessionStatus::WaitUpload,
        session_error: String::new(),
        task_identifier: None,
    }
}

/// WebDAV URL of the remote directory `to` (`"/"` or `""` for home).
pub fn remote_dir_url(url_base: &str, to: &str) -> String {
    let dir = to.trim_matches('/');
    if dir.is_empty() {
        paths::home_url(url_base)
    } else {
        format!("{}/{dir}", paths::home_url(url_base))
    }
}

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::WaitUpload => "waiting",
        SessionStatus::Uploading | SessionStatus::InUpload => "uploading",
        SessionStatus::UploadError => "error",
        SessionStatus::Uploaded => "uploaded",
    }
}

async fn print_events(mut events: mpsc::Receiver<UploadEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::Started { file_name, .. } => eprintln!("uploading {file_name}"),
            UploadEvent::Progress {
                progress,
                bytes_done,
                bytes_expected,
                ..
            } => eprint!(
                "\r{:>6.1}%  {bytes_done}/{bytes_expected} bytes",
                progress * 100.0
            ),
            UploadEvent::Notice { notice, .. } => {
                eprintln!("{}: {}", notice.title, notice.message)
            }
            UploadEvent::Cancelled { .. } => eprintln!("\ncancelled"),
            UploadEvent::Finished {
                error_code,
                error_description,
                ..
            } => {
                eprintln!();
                if error_code != ERROR_NONE && !error_description.is_empty() {
                    eprintln!("failed: {error_description} (code {error_code})");
                }
            }
            other => debug!(event = ?other, "upload event"),
        }
    }
}
