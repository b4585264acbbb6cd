//! VFS2 header and record tables

use std::io::Cursor;

use binrw::{BinRead, BinWrite};

use crate::vfs2::error::{Vfs2Error, Vfs2Result};
use crate::vfs2::utils::{ensure_available, read_u32_le, to_u32};

/// Magic bytes at offset 0
pub const VFS2_MAGIC: [u8; 4] = *b"VFS2";

/// Size of one directory record
pub const DIRECTORY_RECORD_SIZE: usize = 20;

/// Size of one file record
pub const FILE_RECORD_SIZE: usize = 24;

/// Parent id of the root directory
pub const NO_PARENT: i32 = -1;

/// `first_file_id` of a directory without files
pub const NO_FILES: i32 = -1;

/// Directory record (20 bytes, little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct DirectoryRecord {
    /// Path hash (0 for the root)
    pub hash: u32,
    /// Directory id
    pub id: i32,
    /// Parent directory id, [`NO_PARENT`] for the root
    pub parent_id: i32,
    /// Unknown field, carried verbatim
    pub flags: i32,
    /// Id of the first file listed in this directory, or [`NO_FILES`]
    pub first_file_id: i32,
}

/// File record (24 bytes, little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct FileRecord {
    /// Path hash
    pub hash: u32,
    /// File id
    pub id: i32,
    /// Compression type (0 stored, 2 zlib)
    pub compression: i32,
    /// Parent directory id
    pub parent_id: i32,
    /// Payload offset relative to the data region
    pub offset: i32,
    /// Stored payload size, excluding the uncompressed-size prefix
    pub size: i32,
}

/// Everything in front of the data region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTables {
    /// Directory records in file order
    pub directories: Vec<DirectoryRecord>,
    /// File records in file order
    pub files: Vec<FileRecord>,
    /// Absolute offset of the name table
    pub name_table_offset: u32,
}

impl RecordTables {
    /// Size of the header and both tables, which is also the data region offset
    pub const fn encoded_len(directory_count: usize, file_count: usize) -> usize {
        VFS2_MAGIC.len()
            + 4
            + directory_count * DIRECTORY_RECORD_SIZE
            + 4
            + file_count * FILE_RECORD_SIZE
            + 4
    }

    /// Offset of the data region for these tables
    pub fn data_offset(&self) -> usize {
        Self::encoded_len(self.directories.len(), self.files.len())
    }

    /// Parse the magic, both record tables and the name table offset
    pub fn parse(data: &[u8]) -> Vfs2Result<Self> {
        ensure_available(data, 0, VFS2_MAGIC.len(), "magic")?;
        let magic = [data[0], data[1], data[2], data[3]];
        if magic != VFS2_MAGIC {
            return Err(Vfs2Error::InvalidMagic(magic));
        }
        let mut offset = VFS2_MAGIC.len();

        let directory_count = read_u32_le(data, &mut offset, "directory count")? as usize;
        let table_len = directory_count.saturating_mul(DIRECTORY_RECORD_SIZE);
        ensure_available(data, offset, table_len, "directory table")?;
        let mut cursor = Cursor::new(&data[offset..offset + table_len]);
        let mut directories = Vec::with_capacity(directory_count);
        for _ in 0..directory_count {
            directories.push(DirectoryRecord::read(&mut cursor)?);
        }
        offset += table_len;

        let file_count = read_u32_le(data, &mut offset, "file count")? as usize;
        let table_len = file_count.saturating_mul(FILE_RECORD_SIZE);
        ensure_available(data, offset, table_len, "file table")?;
        let mut cursor = Cursor::new(&data[offset..offset + table_len]);
        let mut files = Vec::with_capacity(file_count);
        for _ in 0..file_count {
            files.push(FileRecord::read(&mut cursor)?);
        }
        offset += table_len;

        let name_table_offset = read_u32_le(data, &mut offset, "name table offset")?;

        Ok(Self {
            directories,
            files,
            name_table_offset,
        })
    }

    /// Serialize the header and both tables
    pub fn build(&self) -> Vfs2Result<Vec<u8>> {
        let mut output = Vec::with_capacity(self.data_offset());
        let mut cursor = Cursor::new(&mut output);

        VFS2_MAGIC.write_le(&mut cursor)?;
        to_u32(self.directories.len(), "directory count")?.write_le(&mut cursor)?;
        for record in &self.directories {
            record.write(&mut cursor)?;
        }
        to_u32(self.files.len(), "file count")?.write_le(&mut cursor)?;
        for record in &self.files {
            record.write(&mut cursor)?;
        }
        self.name_table_offset.write_le(&mut cursor)?;

        Ok(output)
    }
}
