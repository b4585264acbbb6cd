//! VFS2 error types

use thiserror::Error;

/// VFS2-specific error type
#[derive(Debug, Error)]
pub enum Vfs2Error {
    /// Invalid VFS2 magic bytes
    #[error("invalid VFS2 magic: expected 'VFS2', got {0:?}")]
    InvalidMagic([u8; 4]),

    /// A declared count, table or name runs past the end of the input
    #[error("{what} truncated at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        /// Which part of the archive was being read
        what: &'static str,
        /// Byte offset the read started at
        offset: usize,
        /// Bytes required
        needed: usize,
        /// Bytes left in the input
        available: usize,
    },

    /// Name table count does not match the record table
    #[error("{table} name count mismatch: {records} records, {names} names")]
    NameCountMismatch {
        /// "file" or "directory"
        table: &'static str,
        /// Number of records in the table
        records: u32,
        /// Number of names in the name table
        names: u32,
    },

    /// Record ids or parent references do not form a tree
    #[error("unresolved archive structure: {0}")]
    UnresolvedStructure(String),

    /// A file payload lies outside the data region
    #[error("payload of file {file} out of bounds: offset {offset}, size {size}, data region {region_len} bytes")]
    PayloadOutOfBounds {
        /// File id
        file: u32,
        /// Offset relative to the data region
        offset: i64,
        /// Stored size
        size: i64,
        /// Length of the data region
        region_len: usize,
    },

    /// Two entries share a path hash
    #[error("duplicate path hash 0x{hash:08X}: '{first}' and '{second}'")]
    DuplicateHash {
        /// The colliding hash
        hash: u32,
        /// Path of the entry indexed first
        first: String,
        /// Path of the entry that collided
        second: String,
    },

    /// Unknown file compression type
    #[error("unsupported compression type {0}")]
    UnsupportedCompression(i32),

    /// Inflated payload length differs from the recorded size
    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    DecompressedSizeMismatch {
        /// Size recorded in the archive
        expected: u32,
        /// Size produced by inflating
        actual: usize,
    },

    /// Compression codec failure
    #[error("compression error: {0}")]
    Compression(String),

    /// Path cannot be represented in an archive
    #[error("invalid archive path '{0}'")]
    InvalidPath(String),

    /// A size or offset does not fit the 32-bit record fields
    #[error("{what} too large for VFS2: {value}")]
    ValueTooLarge {
        /// Which value overflowed
        what: &'static str,
        /// The value
        value: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

/// Result type for VFS2 operations
pub type Vfs2Result<T> = Result<T, Vfs2Error>;
