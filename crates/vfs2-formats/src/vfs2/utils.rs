//! Bounds-checked readers shared by the table parsers

use crate::vfs2::error::{Vfs2Error, Vfs2Result};

/// Fail with [`Vfs2Error::Truncated`] unless `needed` bytes are available at `offset`
pub fn ensure_available(
    data: &[u8],
    offset: usize,
    needed: usize,
    what: &'static str,
) -> Vfs2Result<()> {
    let available = data.len().saturating_sub(offset);
    if needed > available {
        return Err(Vfs2Error::Truncated {
            what,
            offset,
            needed,
            available,
        });
    }
    Ok(())
}

/// Read a little-endian u32 and advance `offset`
pub fn read_u32_le(data: &[u8], offset: &mut usize, what: &'static str) -> Vfs2Result<u32> {
    ensure_available(data, *offset, 4, what)?;
    let bytes = [
        data[*offset],
        data[*offset + 1],
        data[*offset + 2],
        data[*offset + 3],
    ];
    *offset += 4;
    Ok(u32::from_le_bytes(bytes))
}

/// Read a u32 length-prefixed UTF-8 string and advance `offset`
pub fn read_string(data: &[u8], offset: &mut usize, what: &'static str) -> Vfs2Result<String> {
    let len = read_u32_le(data, offset, what)? as usize;
    ensure_available(data, *offset, len, what)?;
    let raw = data[*offset..*offset + len].to_vec();
    *offset += len;
    Ok(String::from_utf8(raw)?)
}

/// Append a u32 length-prefixed UTF-8 string
pub fn write_string(value: &str, out: &mut Vec<u8>) -> Vfs2Result<()> {
    out.extend_from_slice(&to_u32(value.len(), "name length")?.to_le_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Convert a size or offset to the u32 the format stores
pub fn to_u32(value: usize, what: &'static str) -> Vfs2Result<u32> {
    u32::try_from(value).map_err(|_| Vfs2Error::ValueTooLarge { what, value })
}

/// Convert a size or offset to the i32 the record tables store
pub fn to_i32(value: usize, what: &'static str) -> Vfs2Result<i32> {
    i32::try_from(value).map_err(|_| Vfs2Error::ValueTooLarge { what, value })
}
