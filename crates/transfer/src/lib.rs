//! Local side of a chunked upload: splitting, validation, progress.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{ChunkReader, checksum_bytes, chunk_name, remove_chunk_files, split_file};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use types::{Chunk, ChunkFile};
pub use validation::validate_chunk_name;

/// Bytes per configured chunk-size megabyte.
pub const MEGABYTE: u64 = 1024 * 1024;

/// Chunk size used when the configured size is zero: 10 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * MEGABYTE as usize;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid chunk name: {0}")]
    InvalidName(String),
}
