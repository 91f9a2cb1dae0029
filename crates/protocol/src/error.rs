//! Remote operation result codes.

use serde::{Deserialize, Serialize};

use crate::constants::{
    ERROR_CANCELLED, ERROR_CONNECTION_LOST, ERROR_EXPLICITLY_CANCELLED, ERROR_NONE,
    ERROR_RESOURCE_NOT_FOUND,
};

/// A failed remote operation: numeric code plus server/transport description.
///
/// Codes are either HTTP status codes or the negative transport codes in
/// [`constants`](crate::constants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{description} (code {code})")]
pub struct RemoteError {
    pub code: i64,
    pub description: String,
}

impl RemoteError {
    pub fn new(code: i64, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    /// The error reported when a request is cancelled in flight.
    pub fn cancelled() -> Self {
        Self::new(ERROR_CANCELLED, "request cancelled")
    }

    /// The error reported when the caller stops a session between requests.
    pub fn explicitly_cancelled() -> Self {
        Self::new(ERROR_EXPLICITLY_CANCELLED, "upload cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == ERROR_CANCELLED || self.code == ERROR_EXPLICITLY_CANCELLED
    }

    pub fn is_connection_lost(&self) -> bool {
        self.code == ERROR_CONNECTION_LOST
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ERROR_RESOURCE_NOT_FOUND
    }

    pub fn is_success(&self) -> bool {
        self.code == ERROR_NONE
    }
}
