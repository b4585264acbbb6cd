//! File payload compression

use std::io::Read;

use flate2::Compression as ZlibLevel;
use flate2::read::{ZlibDecoder, ZlibEncoder};

use crate::vfs2::error::{Vfs2Error, Vfs2Result};

/// Maximum allowed decompression size (1 GB)
///
/// Bounds the preallocation driven by the size prefix of a compressed payload.
pub const MAX_DECOMPRESSION_SIZE: usize = 1024 * 1024 * 1024;

/// Length of the uncompressed-size prefix written before zlib payloads
pub const SIZE_PREFIX_LEN: usize = 4;

/// Storage mode of a file payload, as recorded in the file record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Stored as-is
    None,
    /// zlib stream preceded by a little-endian u32 uncompressed size
    Zlib,
}

impl Compression {
    /// Record value for stored payloads
    pub const NONE_FLAG: i32 = 0;
    /// Record value for zlib payloads
    pub const ZLIB_FLAG: i32 = 2;

    /// Interpret a file record's compression field
    pub fn from_flags(flags: i32) -> Vfs2Result<Self> {
        match flags {
            Self::NONE_FLAG => Ok(Self::None),
            Self::ZLIB_FLAG => Ok(Self::Zlib),
            other => Err(Vfs2Error::UnsupportedCompression(other)),
        }
    }

    /// Record value for this mode
    pub const fn as_flags(self) -> i32 {
        match self {
            Self::None => Self::NONE_FLAG,
            Self::Zlib => Self::ZLIB_FLAG,
        }
    }

    /// Whether payloads in this mode carry the size prefix
    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::Zlib)
    }
}

/// Compress `data` with zlib at `level` (0-9)
pub fn compress(data: &[u8], level: u32) -> Vfs2Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(data, ZlibLevel::new(level.min(9)));
    let mut compressed = Vec::with_capacity(data.len() / 2 + 16);
    encoder
        .read_to_end(&mut compressed)
        .map_err(|e| Vfs2Error::Compression(format!("zlib compression failed: {e}")))?;
    Ok(compressed)
}

/// Upper bound on initial output capacity, as a multiple of the input size
const MAX_PREALLOC_RATIO: usize = 8;

/// Inflate a zlib payload that is expected to produce `expected` bytes
pub fn decompress(data: &[u8], expected: u32) -> Vfs2Result<Vec<u8>> {
    let expected_len = expected as usize;
    if expected_len > MAX_DECOMPRESSION_SIZE {
        return Err(Vfs2Error::Compression(format!(
            "declared size {} exceeds limit of {} bytes",
            expected_len, MAX_DECOMPRESSION_SIZE
        )));
    }

    // One extra byte lets an oversized stream show up as a size mismatch.
    let mut decoder = ZlibDecoder::new(data).take(expected as u64 + 1);
    // The declared size comes from the archive; grow past this as needed.
    let mut decompressed =
        Vec::with_capacity(expected_len.min(data.len().saturating_mul(MAX_PREALLOC_RATIO)));
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Vfs2Error::Compression(format!("zlib decompression failed: {e}")))?;

    if decompressed.len() != expected_len {
        return Err(Vfs2Error::DecompressedSizeMismatch {
            expected,
            actual: decompressed.len(),
        });
    }
    Ok(decompressed)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_mapping() {
        assert_eq!(Compression::from_flags(0).unwrap(), Compression::None);
        assert_eq!(Compression::from_flags(2).unwrap(), Compression::Zlib);
        assert!(matches!(
            Compression::from_flags(1),
            Err(Vfs2Error::UnsupportedCompression(1))
        ));
        assert!(matches!(
            Compression::from_flags(-1),
            Err(Vfs2Error::UnsupportedCompression(-1))
        ));
        assert_eq!(Compression::Zlib.as_flags(), 2);
        assert!(!Compression::None.is_compressed());
    }

    #[test]
    fn test_zlib_round_trip() {
        let data = b"abcabcabcabcabcabcabcabcabcabcabcabc".repeat(20);
        let compressed = compress(&data, 1).unwrap();
        assert!(compressed.len() < data.len());
        let inflated = decompress(&compressed, data.len() as u32).unwrap();
        assert_eq!(inflated, data);
    }

    #[test]
    fn test_size_mismatch_is_reported() {
        let data = vec![7u8; 100];
        let compressed = compress(&data, 6).unwrap();

        let err = decompress(&compressed, 99).unwrap_err();
        assert!(matches!(
            err,
            Vfs2Error::DecompressedSizeMismatch {
                expected: 99,
                actual: 100
            }
        ));

        let err = decompress(&compressed, 101).unwrap_err();
        assert!(matches!(
            err,
            Vfs2Error::DecompressedSizeMismatch {
                expected: 101,
                actual: 100
            }
        ));
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        let compressed = compress(b"tiny", 1).unwrap();
        let declared = MAX_DECOMPRESSION_SIZE as u32;

        let err = decompress(&compressed, declared).unwrap_err();
        assert!(matches!(
            err,
            Vfs2Error::DecompressedSizeMismatch { expected, actual: 4 } if expected == declared
        ));
    }

    #[test]
    fn test_highly_compressible_payload_grows_past_preallocation() {
        let data = vec![0u8; 64 * 1024];
        let compressed = compress(&data, 9).unwrap();
        assert!(compressed.len() * MAX_PREALLOC_RATIO < data.len());

        let inflated = decompress(&compressed, data.len() as u32).unwrap();
        assert_eq!(inflated, data);
    }

    #[test]
    fn test_garbage_is_a_compression_error() {
        let err = decompress(b"definitely not zlib", 10).unwrap_err();
        assert!(matches!(err, Vfs2Error::Compression(_)));
    }
}
