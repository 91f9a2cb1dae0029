//! Wire contract and shared data types for chunked uploads.
//!
//! Everything that must match the server byte for byte (header names,
//! DAV roots, the staging marker, error codes) lives in [`constants`];
//! URL construction lives in [`paths`].

pub mod constants;
pub mod error;
pub mod paths;
pub mod types;

// Re-export primary types for convenience.
pub use error::RemoteError;
pub use types::{ChunkRecord, RemoteFile, Selector, SessionStatus, UploadSession};
