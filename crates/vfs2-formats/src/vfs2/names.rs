//! Trailing name table

use crate::vfs2::error::{Vfs2Error, Vfs2Result};
use crate::vfs2::utils::{read_string, read_u32_le, to_u32, write_string};

/// Names of every file and directory, each list in id order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    /// File names, index == file id
    pub file_names: Vec<String>,
    /// Directory names, index == directory id
    pub directory_names: Vec<String>,
}

impl NameTable {
    /// Parse the name table starting at `offset`, checking both counts
    pub fn parse(
        data: &[u8],
        offset: usize,
        file_count: usize,
        directory_count: usize,
    ) -> Vfs2Result<Self> {
        let mut offset = offset;
        let file_names = read_names(data, &mut offset, "file", file_count)?;
        let directory_names = read_names(data, &mut offset, "directory", directory_count)?;
        Ok(Self {
            file_names,
            directory_names,
        })
    }

    /// Serialized size in bytes
    pub fn encoded_len(&self) -> usize {
        let names = |list: &[String]| list.iter().map(|n| 4 + n.len()).sum::<usize>();
        4 + names(&self.file_names) + 4 + names(&self.directory_names)
    }

    /// Append the serialized table to `out`
    pub fn write(&self, out: &mut Vec<u8>) -> Vfs2Result<()> {
        for list in [&self.file_names, &self.directory_names] {
            out.extend_from_slice(&to_u32(list.len(), "name count")?.to_le_bytes());
            for name in list {
                write_string(name, out)?;
            }
        }
        Ok(())
    }
}

fn read_names(
    data: &[u8],
    offset: &mut usize,
    table: &'static str,
    expected: usize,
) -> Vfs2Result<Vec<String>> {
    let count = read_u32_le(data, offset, "name count")?;
    if count as usize != expected {
        return Err(Vfs2Error::NameCountMismatch {
            table,
            records: expected as u32,
            names: count,
        });
    }
    (0..count)
        .map(|_| read_string(data, offset, "name"))
        .collect()
}
