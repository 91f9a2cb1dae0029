//! Authenticated WebDAV requests.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chunkup_protocol::constants::HEADER_CHECKSUM;
use futures_util::TryStreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Body, Method, RequestBuilder, Response, StatusCode};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::multistatus::{DavEntry, parse_multistatus};
use crate::url::encode_url;
use crate::Error;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">
  <d:prop>
    <d:getlastmodified/>
    <d:getetag/>
    <d:getcontentlength/>
    <d:resourcetype/>
    <oc:id/>
    <oc:fileid/>
  </d:prop>
</d:propfind>"#;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// WebDAV client bound to one set of credentials.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    username: String,
    password: String,
}

impl Client {
    /// Creates a new client for `username`.
    pub fn new(username: &str, password: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("chunkup/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, encode_url(url))
            .basic_auth(&self.username, Some(&self.password))
    }

    /// Sends `req` and turns non-success statuses into [`Error::Status`].
    async fn send(&self, req: RequestBuilder) -> Result<Response, Error> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("HTTP error").to_owned(),
                body,
            });
        }
        Ok(resp)
    }

    /// PROPFIND `url` with the given depth (`"0"` or `"1"`).
    pub async fn propfind(&self, url: &str, depth: &str) -> Result<Vec<DavEntry>, Error> {
        let req = self
            .request(dav_method(b"PROPFIND"), url)
            .header("Depth", depth)
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY);
        let resp = self.send(req).await?;
        let text = resp.text().await?;
        parse_multistatus(&text)
    }

    /// Metadata of the single resource at `url`.
    pub async fn stat(&self, url: &str) -> Result<DavEntry, Error> {
        self.propfind(url, "0")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::MissingEntry(url.to_owned()))
    }

    /// Creates a collection.
    pub async fn mkcol(&self, url: &str) -> Result<(), Error> {
        self.send(self.request(dav_method(b"MKCOL"), url)).await?;
        debug!(url, "collection created");
        Ok(())
    }

    pub async fn delete(&self, url: &str) -> Result<(), Error> {
        self.send(self.request(Method::DELETE, url)).await?;
        debug!(url, "resource deleted");
        Ok(())
    }

    /// Server-side MOVE with extra headers and a per-request timeout.
    pub async fn move_item(
        &self,
        source: &str,
        destination: &str,
        overwrite: bool,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<(), Error> {
        let mut req = self
            .request(dav_method(b"MOVE"), source)
            .header("Destination", encode_url(destination))
            .header("Overwrite", if overwrite { "T" } else { "F" })
            .timeout(timeout);
        for (name, value) in headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                req = req.header(name, value);
            }
        }
        self.send(req).await?;
        debug!(source, destination, "resource moved");
        Ok(())
    }

    /// Streams the file at `path` to `url`.
    ///
    /// `on_progress` receives the cumulative bytes handed to the connection.
    /// A non-empty `checksum` is sent as `OC-Checksum: SHA256:<hex>`.
    pub async fn put_file<F>(
        &self,
        url: &str,
        path: &Path,
        checksum: &str,
        on_progress: F,
        cancel: CancellationToken,
    ) -> Result<(), Error>
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();

        let sent = Arc::new(AtomicU64::new(0));
        let stream = ReaderStream::new(file).inspect_ok(move |bytes| {
            let total = sent.fetch_add(bytes.len() as u64, Ordering::Relaxed) + bytes.len() as u64;
            on_progress(total);
        });

        let mut req = self
            .request(Method::PUT, url)
            .header(CONTENT_LENGTH, size)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(Body::wrap_stream(stream));
        if !checksum.is_empty() {
            req = req.header(HEADER_CHECKSUM, format!("SHA256:{checksum}"));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url, "upload cancelled");
                Err(Error::Cancelled)
            }
            result = self.send(req) => {
                result?;
                debug!(url, bytes = size, "file uploaded");
                Ok(())
            }
        }
    }
}

/// Builds an extension method. The names used here are valid tokens.
fn dav_method(name: &'static [u8]) -> Method {
    Method::from_bytes(name).unwrap_or(Method::GET)
}

/// Whether `err` means the resource does not exist.
pub fn is_not_found(err: &Error) -> bool {
    matches!(err, Error::Status { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
}
