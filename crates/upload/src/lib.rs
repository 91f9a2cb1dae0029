//! Chunked upload orchestration engine.
//!
//! This crate drives one file through the chunked-upload pipeline against
//! injected collaborators. It has no HTTP, database or UI dependencies:
//! the caller provides a [`Transport`], a [`SessionStore`] and a
//! [`LocalFs`] and consumes [`UploadEvent`]s from the manager's channel.
//!
//! # Pipeline
//!
//! 1. **Plan**: split the source into chunk files, or reuse the chunk
//!    records left by an interrupted attempt
//! 2. **Stage**: make sure the remote staging folder exists
//! 3. **Upload**: send pending chunks one at a time, deleting each record
//!    as soon as the server confirms it
//! 4. **Assemble**: move the staging marker onto the destination, then
//!    reconcile local and remote metadata
//!
//! The first failure after planning is classified (cancelled, connection
//! lost, generic) and cleaned up before the run returns.

pub mod assembler;
mod chunk_loop;
pub mod error;
pub mod failure;
pub mod local;
pub mod manager;
mod planner;
pub mod ports;
mod session;
pub mod staging;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export primary types for convenience.
pub use assembler::assemble_timeout;
pub use error::UploadError;
pub use failure::FailureKind;
pub use local::{LocalLayout, StdFs};
pub use manager::UploadManager;
pub use ports::{LocalFs, SessionStore, Transport, TransportFuture};
pub use staging::ensure_folder;
pub use types::{
    ChunkRequest, Depth, MoveRequest, Notice, NoticeLevel, TransferUpdate, UploadEvent,
    UploadOutcome, UploadSettings,
};
