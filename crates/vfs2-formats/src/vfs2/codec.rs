//! Archive decoding and encoding

use bytes::Bytes;
use tracing::debug;

use crate::ArchiveFormat;
use crate::vfs2::compression::{self, Compression, SIZE_PREFIX_LEN};
use crate::vfs2::error::{Vfs2Error, Vfs2Result};
use crate::vfs2::header::{DirectoryRecord, FileRecord, NO_FILES, NO_PARENT, RecordTables};
use crate::vfs2::names::NameTable;
use crate::vfs2::tree::{Directory, EntryTree, File, Payload, StoredPayload};
use crate::vfs2::utils::{to_i32, to_u32};

/// Default zlib level, matching what the shipped archives were built with
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 1;

/// Options for [`EntryTree::encode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// zlib level (0-9) for payloads that need compressing
    pub level: u32,
    /// Store a payload raw when zlib would not make it smaller
    pub store_incompressible: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
            store_incompressible: true,
        }
    }
}

/// A file's payload as it will be written
struct PlannedPayload {
    compression: Compression,
    uncompressed_size: u32,
    data: Bytes,
    offset: usize,
}

impl PlannedPayload {
    fn stored_len(&self) -> usize {
        let prefix = if self.compression.is_compressed() {
            SIZE_PREFIX_LEN
        } else {
            0
        };
        prefix + self.data.len()
    }
}

impl EntryTree {
    /// Decode a complete archive.
    ///
    /// File payloads are kept as slices of `data` and only inflated when
    /// [`File::contents`](crate::vfs2::File::contents) is called.
    pub fn decode(data: impl Into<Bytes>) -> Vfs2Result<Self> {
        let data: Bytes = data.into();
        let tables = RecordTables::parse(&data)?;
        let data_offset = tables.data_offset();
        let name_table_offset = tables.name_table_offset as usize;
        if name_table_offset < data_offset {
            return Err(Vfs2Error::UnresolvedStructure(format!(
                "name table offset {name_table_offset} lies inside the record tables (data starts at {data_offset})"
            )));
        }

        let names = NameTable::parse(
            &data,
            name_table_offset,
            tables.files.len(),
            tables.directories.len(),
        )?;
        debug!(
            "Parsed VFS2 tables: {} directories, {} files, data region {} bytes",
            tables.directories.len(),
            tables.files.len(),
            name_table_offset - data_offset
        );

        let mut directory_records = tables.directories;
        directory_records.sort_by_key(|record| record.id);
        let mut file_records = tables.files;
        file_records.sort_by_key(|record| record.id);

        let directory_count = directory_records.len();
        let directories = directory_records
            .into_iter()
            .zip(names.directory_names)
            .enumerate()
            .map(|(position, (record, name))| {
                check_dense_id("directory", record.id, position)?;
                let parent = match record.parent_id {
                    id if id < 0 => None,
                    id => Some(id as u32),
                };
                Ok(Directory::new(name, record.hash, parent, record.flags))
            })
            .collect::<Vfs2Result<Vec<_>>>()?;

        let region = data.slice(data_offset..name_table_offset);
        let files = file_records
            .into_iter()
            .zip(names.file_names)
            .enumerate()
            .map(|(position, (record, name))| {
                check_dense_id("file", record.id, position)?;
                if record.parent_id < 0 || record.parent_id as usize >= directory_count {
                    return Err(Vfs2Error::UnresolvedStructure(format!(
                        "file {} ('{}') has invalid parent {}",
                        record.id, name, record.parent_id
                    )));
                }
                let payload = read_payload(&region, &record)?;
                Ok(File {
                    name,
                    hash: record.hash,
                    parent: record.parent_id as u32,
                    flags: record.compression,
                    payload: Payload::Stored(payload),
                })
            })
            .collect::<Vfs2Result<Vec<_>>>()?;

        Self::from_parts(directories, files)
    }

    /// Encode the tree into a complete archive.
    ///
    /// Layout is computed first (payload bytes, offsets, sizes), then the
    /// header, tables, data region and name table are written in one pass.
    pub fn encode(&self, options: &EncodeOptions) -> Vfs2Result<Vec<u8>> {
        let order = self.files_in_data_order();
        let mut planned: Vec<Option<PlannedPayload>> =
            (0..self.files().len()).map(|_| None).collect();
        let mut cursor = 0usize;
        for &id in &order {
            let file = &self.files()[id as usize];
            let mut payload = plan_payload(file, options)?;
            payload.offset = cursor;
            cursor += payload.stored_len();
            planned[id as usize] = Some(payload);
        }
        let planned: Vec<PlannedPayload> = planned.into_iter().flatten().collect();
        if planned.len() != self.files().len() {
            return Err(Vfs2Error::UnresolvedStructure(
                "file not reachable from the root".to_string(),
            ));
        }

        let data_offset = RecordTables::encoded_len(self.directories().len(), self.files().len());
        let name_table_offset = to_u32(data_offset + cursor, "name table offset")?;

        let directories = self
            .directories()
            .iter()
            .enumerate()
            .map(|(id, dir)| {
                Ok(DirectoryRecord {
                    hash: dir.hash(),
                    id: to_i32(id, "directory id")?,
                    parent_id: dir.parent().map_or(NO_PARENT, |p| p as i32),
                    flags: dir.flags(),
                    first_file_id: dir.files().first().map_or(NO_FILES, |&f| f as i32),
                })
            })
            .collect::<Vfs2Result<Vec<_>>>()?;

        let files = self
            .files()
            .iter()
            .zip(&planned)
            .enumerate()
            .map(|(id, (file, payload))| {
                Ok(FileRecord {
                    hash: file.hash(),
                    id: to_i32(id, "file id")?,
                    compression: payload.compression.as_flags(),
                    parent_id: file.parent() as i32,
                    offset: to_i32(payload.offset, "file offset")?,
                    size: to_i32(payload.data.len(), "file size")?,
                })
            })
            .collect::<Vfs2Result<Vec<_>>>()?;

        let tables = RecordTables {
            directories,
            files,
            name_table_offset,
        };
        let names = NameTable {
            file_names: self.files().iter().map(|f| f.name().to_string()).collect(),
            directory_names: self
                .directories()
                .iter()
                .map(|d| d.name().to_string())
                .collect(),
        };

        let mut output = tables.build()?;
        output.reserve(cursor + names.encoded_len());
        for &id in &order {
            let payload = &planned[id as usize];
            if payload.compression.is_compressed() {
                output.extend_from_slice(&payload.uncompressed_size.to_le_bytes());
            }
            output.extend_from_slice(&payload.data);
        }
        names.write(&mut output)?;

        debug!(
            "Encoded VFS2 archive: {} directories, {} files, {} bytes",
            self.directories().len(),
            self.files().len(),
            output.len()
        );
        Ok(output)
    }
}

fn check_dense_id(table: &str, id: i32, position: usize) -> Vfs2Result<()> {
    if id < 0 || id as usize != position {
        return Err(Vfs2Error::UnresolvedStructure(format!(
            "{table} ids are not contiguous: expected {position}, found {id}"
        )));
    }
    Ok(())
}

fn read_payload(region: &Bytes, record: &FileRecord) -> Vfs2Result<StoredPayload> {
    let compression = Compression::from_flags(record.compression)?;
    let out_of_bounds = || Vfs2Error::PayloadOutOfBounds {
        file: record.id as u32,
        offset: i64::from(record.offset),
        size: i64::from(record.size),
        region_len: region.len(),
    };
    if record.offset < 0 || record.size < 0 {
        return Err(out_of_bounds());
    }

    let mut start = record.offset as usize;
    let uncompressed_size = if compression.is_compressed() {
        let prefix = region
            .get(start..start + SIZE_PREFIX_LEN)
            .ok_or_else(out_of_bounds)?;
        start += SIZE_PREFIX_LEN;
        u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]])
    } else {
        record.size as u32
    };
    let end = start + record.size as usize;
    if end > region.len() {
        return Err(out_of_bounds());
    }

    Ok(StoredPayload {
        offset: record.offset as u32,
        compression,
        uncompressed_size,
        data: region.slice(start..end),
    })
}

fn plan_payload(file: &File, options: &EncodeOptions) -> Vfs2Result<PlannedPayload> {
    let wanted = Compression::from_flags(file.flags())?;
    if let Payload::Stored(stored) = file.payload() {
        if stored.compression == wanted {
            return Ok(PlannedPayload {
                compression: wanted,
                uncompressed_size: stored.uncompressed_size,
                data: stored.data.clone(),
                offset: 0,
            });
        }
    }

    let raw = file.contents()?;
    let uncompressed_size = to_u32(raw.len(), "file size")?;
    let stored_raw = |data: Bytes| PlannedPayload {
        compression: Compression::None,
        uncompressed_size,
        data,
        offset: 0,
    };
    match wanted {
        Compression::None => Ok(stored_raw(raw)),
        Compression::Zlib => {
            let compressed = compression::compress(&raw, options.level)?;
            if options.store_incompressible && compressed.len() + SIZE_PREFIX_LEN >= raw.len() {
                debug!(
                    "Storing {} raw: {} bytes would compress to {}",
                    file.name(),
                    raw.len(),
                    compressed.len()
                );
                return Ok(stored_raw(raw));
            }
            Ok(PlannedPayload {
                compression: Compression::Zlib,
                uncompressed_size,
                data: Bytes::from(compressed),
                offset: 0,
            })
        }
    }
}

impl ArchiveFormat for EntryTree {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        Self::decode(Bytes::copy_from_slice(data))
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        self.encode(&EncodeOptions::default())
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }
}
