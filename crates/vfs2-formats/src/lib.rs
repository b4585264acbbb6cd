//! Parser and builder for the VFS2 archive container
//!
#![allow(clippy::cast_possible_truncation)] // Ids and sizes are bounded by u32 tables
#![allow(clippy::cast_possible_wrap)] // Record fields are signed on disk
#![allow(clippy::cast_sign_loss)] // Signed fields are checked before use
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! VFS2 is the archive format a console port of a game uses to bundle a
//! directory tree into one blob. This crate provides symmetric (parser and
//! builder) support for it, plus the "fix" pass that carries flag values
//! from a known-good archive onto a freshly built one.
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: Both parsing and building supported
//! - **Zero-Copy Parsing**: Payloads stay slices of the input buffer until read
//! - **Opaque Flags**: Unknown record fields are carried verbatim, never interpreted
//! - **Round-Trip Guarantee**: build(parse(build(tree))) == build(tree)
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use vfs2_formats::vfs2::{BuildOptions, EncodeOptions, EntryTree, TreeBuilder};
//!
//! let mut builder = TreeBuilder::new(BuildOptions::default());
//! builder
//!     .add_file("ui/button.png", Bytes::from_static(b"not really a png"))
//!     .expect("valid path");
//! let tree = builder.build().expect("no hash collisions");
//!
//! let archive = tree.encode(&EncodeOptions::default()).expect("encodable");
//! let decoded = EntryTree::decode(archive).expect("well-formed");
//! assert_eq!(decoded.files().len(), 1);
//! ```

#![warn(missing_docs)]

/// VFS2 container: path hashing, binary codec, entry tree and flag reconciliation
///
/// Key features:
/// - **Path Hashing**: The loader's case-insensitive djb2 variant
/// - **Table Codec**: Directory and file record tables with a trailing name table
/// - **Lazy Payloads**: File contents inflate only when requested
/// - **Flag Reconciliation**: Hash-keyed transplant of flags from a reference archive
///
/// See the [`vfs2`] module for the byte layout.
pub mod vfs2;

/// Common format trait for archive containers
pub trait ArchiveFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err("Round-trip verification failed".into());
        }
        Ok(())
    }
}
