/// A chunk of file data read from the source.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Byte offset within the source file.
    pub offset: u64,
    /// Raw chunk data.
    pub data: Vec<u8>,
    /// SHA-256 hex checksum of `data`.
    pub checksum: String,
}

/// A chunk artifact written to disk by [`split_file`](crate::split_file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFile {
    /// 1-based position in upload order.
    pub index: u32,
    /// File name inside the output directory, also the remote object name.
    pub name: String,
    pub size: u64,
    pub checksum: String,
}
