//! VFS2 archive format implementation
//!
//! A VFS2 archive packs a directory tree into one file. The loader finds
//! entries by a hash of their full path, so every directory and file carries
//! its path hash next to explicit id and parent links. All integers are
//! little-endian 32-bit.
//!
//! # Layout
//!
//! ```text
//! "VFS2"
//! u32 directory_count
//! directory records (20 bytes): hash, id, parent_id, flags, first_file_id
//! u32 file_count
//! file records (24 bytes): hash, id, compression, parent_id, offset, size
//! u32 name_table_offset                  absolute
//! data region                            payloads, offsets relative to here
//! u32 file_name_count, names             u32 byte length + UTF-8, by file id
//! u32 directory_name_count, names        by directory id, root is ""
//! ```
//!
//! A zlib payload (compression 2) is preceded by its u32 uncompressed size,
//! which the record's `size` does not count. Stored payloads (compression 0)
//! have no prefix. Directory flags have no known meaning and are carried
//! verbatim; the fix pass copies them from a reference archive.

mod builder;
mod codec;
mod compression;
mod error;
mod hash;
mod header;
mod names;
mod reconcile;
mod tree;
mod utils;

pub use builder::{BuildOptions, DEFAULT_DIRECTORY_FLAGS, DEFAULT_ROOT_FLAGS, TreeBuilder};
pub use codec::{DEFAULT_COMPRESSION_LEVEL, EncodeOptions};
pub use compression::{Compression, MAX_DECOMPRESSION_SIZE, SIZE_PREFIX_LEN, compress, decompress};
pub use error::{Vfs2Error, Vfs2Result};
pub use hash::{HashIndex, path_hash};
pub use header::{
    DIRECTORY_RECORD_SIZE, DirectoryRecord, FILE_RECORD_SIZE, FileRecord, NO_FILES, NO_PARENT,
    RecordTables, VFS2_MAGIC,
};
pub use names::NameTable;
pub use reconcile::{FlagChange, ReconcileReport, Reconciled, reconcile};
pub use tree::{
    Directory, Entry, EntryKind, EntryRef, EntryTree, File, Payload, StoredPayload, TreeDiff, Walk,
};
