//! WebDAV client for chunked uploads.
//!
//! Async HTTP client using `reqwest` with Basic authentication. Covers the
//! verbs the upload pipeline needs: PROPFIND, MKCOL, PUT, MOVE and DELETE.

mod client;
mod multistatus;
mod url;

pub use client::{Client, is_not_found};
pub use multistatus::{DavEntry, parse_multistatus};
pub use url::{encode_url, last_segment};

use chunkup_protocol::constants::{
    ERROR_CANCELLED, ERROR_CONNECTION_LOST, ERROR_INTERNAL, ERROR_READ_FILE, ERROR_TIMED_OUT,
};

/// Errors from the WebDAV client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{reason} (HTTP {status})")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("XML error: {0}")]
    Xml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server returned no entry for {0}")]
    MissingEntry(String),
}

impl Error {
    /// Protocol error code for this failure.
    ///
    /// HTTP failures report their status code; transport failures map onto
    /// the negative codes shared with the upload engine.
    pub fn code(&self) -> i64 {
        match self {
            Error::Status { status, .. } => i64::from(*status),
            Error::Cancelled => ERROR_CANCELLED,
            Error::Http(e) if e.is_timeout() => ERROR_TIMED_OUT,
            Error::Http(e) if e.is_connect() || e.is_request() || e.is_body() => {
                ERROR_CONNECTION_LOST
            }
            Error::Io(_) => ERROR_READ_FILE,
            Error::Http(_) | Error::Xml(_) | Error::MissingEntry(_) => ERROR_INTERNAL,
        }
    }

    /// Message suitable for a user-facing notice.
    pub fn description(&self) -> String {
        match self {
            Error::Status { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_pass_through() {
        let e = Error::Status {
            status: 507,
            reason: "Insufficient Storage".into(),
            body: String::new(),
        };
        assert_eq!(e.code(), 507);
        assert_eq!(e.description(), "Insufficient Storage");
        assert_eq!(e.to_string(), "Insufficient Storage (HTTP 507)");
    }

    #[test]
    fn local_failures_have_negative_codes() {
        assert_eq!(Error::Cancelled.code(), ERROR_CANCELLED);
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.code(), ERROR_READ_FILE);
        assert_eq!(Error::Xml("bad".into()).code(), ERROR_INTERNAL);
    }
}
