//! Bridge between the WebDAV client and the upload engine's `Transport`.

use std::sync::atomic::{AtomicU64, Ordering};

use chunkup_protocol::{RemoteError, RemoteFile};
use chunkup_upload::{ChunkRequest, Depth, MoveRequest, TransferUpdate, Transport, TransportFuture};
use chunkup_webdav::{Client, DavEntry, last_segment};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Implements [`Transport`] on top of [`chunkup_webdav::Client`].
pub struct WebDavTransport {
    client: Client,
    next_task: AtomicU64,
}

impl WebDavTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            next_task: AtomicU64::new(1),
        }
    }
}

fn remote_error(e: chunkup_webdav::Error) -> RemoteError {
    RemoteError::new(e.code(), e.description())
}

/// Server metadata of an assembled object. Account and directory are
/// filled in by the engine.
fn remote_file(entry: DavEntry) -> RemoteFile {
    RemoteFile {
        oc_id: entry.oc_id,
        file_id: entry.file_id,
        account: String::new(),
        server_url: String::new(),
        file_name: last_segment(&entry.href),
        etag: entry.etag,
        size: entry.size,
        date: entry.last_modified,
        asset_local_identifier: String::new(),
        live_photo: false,
        e2e_encrypted: false,
        delete_asset_local_identifier: false,
    }
}

impl Transport for WebDavTransport {
    fn upload(
        &self,
        request: ChunkRequest,
        updates: mpsc::UnboundedSender<TransferUpdate>,
        cancel: CancellationToken,
    ) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let _ = updates.send(TransferUpdate::RequestCreated);
            let task_id = self.next_task.fetch_add(1, Ordering::Relaxed);
            let _ = updates.send(TransferUpdate::TaskStarted { task_id });

            let progress = updates.clone();
            self.client
                .put_file(
                    &request.destination,
                    &request.local_path,
                    &request.checksum,
                    move |bytes_sent| {
                        let _ = progress.send(TransferUpdate::Progress { bytes_sent });
                    },
                    cancel,
                )
                .await
                .map_err(remote_error)
        })
    }

    fn move_item(&self, request: MoveRequest) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.client
                .move_item(
                    &request.source,
                    &request.destination,
                    request.overwrite,
                    &request.headers,
                    request.timeout,
                )
                .await
                .map_err(remote_error)
        })
    }

    fn probe(&self, url: &str, depth: Depth) -> TransportFuture<'_, ()> {
        let url = url.to_owned();
        Box::pin(async move {
            self.client
                .propfind(&url, depth.as_header())
                .await
                .map(|_| ())
                .map_err(remote_error)
        })
    }

    fn create_folder(&self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_owned();
        Box::pin(async move { self.client.mkcol(&url).await.map_err(remote_error) })
    }

    fn delete(&self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_owned();
        Box::pin(async move { self.client.delete(&url).await.map_err(remote_error) })
    }

    fn read_file(&self, url: &str) -> TransportFuture<'_, RemoteFile> {
        let url = url.to_owned();
        Box::pin(async move {
            self.client
                .stat(&url)
                .await
                .map(remote_file)
                .map_err(remote_error)
        })
    }
}
