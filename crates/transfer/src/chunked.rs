use std::io::{Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::types::{Chunk, ChunkFile};
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Name of the chunk at 1-based `index`: `00001`, `00002`, ...
pub fn chunk_name(index: u32) -> String {
    format!("{index:05}")
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a file in fixed-size chunks with automatic SHA-256 checksums.
pub struct ChunkReader {
    file: std::fs::File,
    chunk_size: usize,
    offset: u64,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            chunk_size,
            offset: 0,
            file_size,
        })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; read_size];
        let mut filled = 0;
        while filled < read_size {
            let n = self.file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);

        let chunk = Chunk {
            offset: self.offset,
            checksum: checksum_bytes(&buf),
            data: buf,
        };
        self.offset += filled as u64;
        Ok(Some(chunk))
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.offset)
    }
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Splits `source` into chunk files inside `output_dir`.
///
/// Returns the chunks in upload order. An empty source yields an empty list.
/// A chunk that would land on `source` itself is rejected with
/// [`TransferError::InvalidName`]. If writing fails midway, the chunk files
/// already written are removed before the error is returned.
pub fn split_file(
    source: &Path,
    output_dir: &Path,
    chunk_size: usize,
) -> Result<Vec<ChunkFile>, TransferError> {
    let mut reader = ChunkReader::new(source, chunk_size)?;
    std::fs::create_dir_all(output_dir)?;
    let source = source.canonicalize()?;
    let output_dir = output_dir.canonicalize()?;
    let output_dir = output_dir.as_path();

    let mut files = Vec::new();
    let result = write_chunks(&mut reader, &source, output_dir, &mut files);
    if let Err(e) = result {
        warn!(source = %source.display(), error = %e, "chunking failed, removing partial chunks");
        remove_chunk_files(output_dir, &files);
        return Err(e);
    }

    debug!(
        source = %source.display(),
        chunks = files.len(),
        bytes = reader.file_size(),
        "file split into chunks"
    );
    Ok(files)
}

fn write_chunks(
    reader: &mut ChunkReader,
    source: &Path,
    output_dir: &Path,
    files: &mut Vec<ChunkFile>,
) -> Result<(), TransferError> {
    let mut index = 0u32;
    while let Some(chunk) = reader.next_chunk()? {
        index += 1;
        let name = chunk_name(index);
        let path = output_dir.join(&name);
        if path == source {
            return Err(TransferError::InvalidName(format!(
                "chunk {name} would overwrite the source file"
            )));
        }
        let mut out = std::fs::File::create(path)?;
        out.write_all(&chunk.data)?;
        out.sync_all()?;
        files.push(ChunkFile {
            index,
            name,
            size: chunk.data.len() as u64,
            checksum: chunk.checksum,
        });
    }
    Ok(())
}

/// Best-effort removal of chunk artifacts.
pub fn remove_chunk_files(dir: &Path, files: &[ChunkFile]) {
    for file in files {
        if let Err(e) = std::fs::remove_file(dir.join(&file.name)) {
            debug!(chunk = %file.name, error = %e, "could not remove chunk file");
        }
    }
}
