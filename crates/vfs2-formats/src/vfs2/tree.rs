//! In-memory directory/file hierarchy

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::vfs2::compression::{self, Compression};
use crate::vfs2::error::{Vfs2Error, Vfs2Result};
use crate::vfs2::hash::HashIndex;

/// Reference to an entry by kind and id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryRef {
    /// Directory id (index into the directory table)
    Directory(u32),
    /// File id (index into the file table)
    File(u32),
}

impl EntryRef {
    /// Kind of the referenced entry
    pub const fn kind(self) -> EntryKind {
        match self {
            Self::Directory(_) => EntryKind::Directory,
            Self::File(_) => EntryKind::File,
        }
    }
}

/// Entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Directory node
    Directory,
    /// File node
    File,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => f.write_str("directory"),
            Self::File => f.write_str("file"),
        }
    }
}

/// Directory node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub(crate) name: String,
    pub(crate) hash: u32,
    pub(crate) parent: Option<u32>,
    pub(crate) flags: i32,
    pub(crate) subdirectories: Vec<u32>,
    pub(crate) files: Vec<u32>,
}

impl Directory {
    pub(crate) fn new(name: String, hash: u32, parent: Option<u32>, flags: i32) -> Self {
        Self {
            name,
            hash,
            parent,
            flags,
            subdirectories: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Final path component (empty for the root)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path hash
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Parent directory id, `None` for the root
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    /// Opaque flags value
    pub fn flags(&self) -> i32 {
        self.flags
    }

    /// Child directory ids in ascending id order
    pub fn subdirectories(&self) -> &[u32] {
        &self.subdirectories
    }

    /// Child file ids in ascending id order
    pub fn files(&self) -> &[u32] {
        &self.files
    }

    /// Whether this is the root directory
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// File contents as held by a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Bytes as they sit in an archive's data region
    Stored(StoredPayload),
    /// Raw contents supplied by a builder, compressed at encode time
    Loose(Bytes),
}

/// A payload slice taken from a decoded archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPayload {
    /// Offset of the payload relative to the data region
    pub offset: u32,
    /// How the bytes are stored
    pub compression: Compression,
    /// Size after inflating (equal to the stored size when not compressed)
    pub uncompressed_size: u32,
    /// Stored bytes, excluding the uncompressed-size prefix
    pub data: Bytes,
}

impl StoredPayload {
    /// Stored size, excluding the uncompressed-size prefix
    pub fn compressed_size(&self) -> u32 {
        self.data.len() as u32
    }

    /// Raw contents, inflating if needed
    pub fn contents(&self) -> Vfs2Result<Bytes> {
        match self.compression {
            Compression::None => Ok(self.data.clone()),
            Compression::Zlib => {
                compression::decompress(&self.data, self.uncompressed_size).map(Bytes::from)
            }
        }
    }
}

/// File node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub(crate) name: String,
    pub(crate) hash: u32,
    pub(crate) parent: u32,
    pub(crate) flags: i32,
    pub(crate) payload: Payload,
}

impl File {
    /// File name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path hash
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Parent directory id
    pub fn parent(&self) -> u32 {
        self.parent
    }

    /// Opaque flags value; for files this is the record's compression type
    pub fn flags(&self) -> i32 {
        self.flags
    }

    /// Whether the record marks the payload as compressed
    pub fn is_compressed(&self) -> bool {
        self.flags != Compression::NONE_FLAG
    }

    /// Payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Data region offset, known once the file has been read from an archive
    pub fn offset(&self) -> Option<u32> {
        match &self.payload {
            Payload::Stored(stored) => Some(stored.offset),
            Payload::Loose(_) => None,
        }
    }

    /// Stored size, known once the file has been read from an archive
    pub fn compressed_size(&self) -> Option<u32> {
        match &self.payload {
            Payload::Stored(stored) => Some(stored.compressed_size()),
            Payload::Loose(_) => None,
        }
    }

    /// Size of the raw contents
    pub fn uncompressed_size(&self) -> u32 {
        match &self.payload {
            Payload::Stored(stored) => stored.uncompressed_size,
            Payload::Loose(data) => data.len() as u32,
        }
    }

    /// Raw contents, inflated on demand
    pub fn contents(&self) -> Vfs2Result<Bytes> {
        match &self.payload {
            Payload::Stored(stored) => stored.contents(),
            Payload::Loose(data) => Ok(data.clone()),
        }
    }
}

/// Borrowed view of a directory or file
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    /// Directory with its id
    Directory(u32, &'a Directory),
    /// File with its id
    File(u32, &'a File),
}

impl<'a> Entry<'a> {
    /// Reference to this entry
    pub fn id(&self) -> EntryRef {
        match self {
            Self::Directory(id, _) => EntryRef::Directory(*id),
            Self::File(id, _) => EntryRef::File(*id),
        }
    }

    /// Entry kind
    pub fn kind(&self) -> EntryKind {
        self.id().kind()
    }

    /// Final path component
    pub fn name(&self) -> &'a str {
        match *self {
            Self::Directory(_, dir) => dir.name(),
            Self::File(_, file) => file.name(),
        }
    }

    /// Path hash
    pub fn hash(&self) -> u32 {
        match self {
            Self::Directory(_, dir) => dir.hash(),
            Self::File(_, file) => file.hash(),
        }
    }

    /// Opaque flags value
    pub fn flags(&self) -> i32 {
        match self {
            Self::Directory(_, dir) => dir.flags(),
            Self::File(_, file) => file.flags(),
        }
    }
}

/// Entries present on one or both sides of a hash-keyed comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    /// Hashes present in both trees, with `(self, other)` entries
    pub matched: BTreeMap<u32, (EntryRef, EntryRef)>,
    /// Hashes only present in `self`
    pub only_in_self: Vec<u32>,
    /// Hashes only present in `other`
    pub only_in_other: Vec<u32>,
}

/// Directory/file hierarchy of one archive
#[derive(Debug, Clone)]
pub struct EntryTree {
    directories: Vec<Directory>,
    files: Vec<File>,
    root: u32,
    index: HashIndex,
}

impl EntryTree {
    /// Assemble a tree from id-ordered nodes whose parent links are set.
    ///
    /// Child lists are rebuilt from the parent links, the structure is
    /// checked and the hash index is built.
    pub(crate) fn from_parts(
        mut directories: Vec<Directory>,
        files: Vec<File>,
    ) -> Vfs2Result<Self> {
        let mut roots = directories
            .iter()
            .enumerate()
            .filter(|(_, dir)| dir.parent.is_none())
            .map(|(id, _)| id as u32);
        let root = roots.next().ok_or_else(|| {
            Vfs2Error::UnresolvedStructure("archive has no root directory".to_string())
        })?;
        if let Some(second) = roots.next() {
            return Err(Vfs2Error::UnresolvedStructure(format!(
                "archive has more than one root directory ({root} and {second})"
            )));
        }

        let directory_count = directories.len();
        for dir in &mut directories {
            dir.subdirectories.clear();
            dir.files.clear();
        }
        for id in 0..directory_count {
            if let Some(parent) = directories[id].parent {
                if parent as usize >= directory_count || parent as usize == id {
                    return Err(Vfs2Error::UnresolvedStructure(format!(
                        "directory {id} has invalid parent {parent}"
                    )));
                }
                directories[parent as usize].subdirectories.push(id as u32);
            }
        }
        for (id, file) in files.iter().enumerate() {
            let parent = file.parent as usize;
            if parent >= directory_count {
                return Err(Vfs2Error::UnresolvedStructure(format!(
                    "file {id} ('{}') has invalid parent {}",
                    file.name, file.parent
                )));
            }
            directories[parent].files.push(id as u32);
        }

        // Every directory must hang off the root; anything else sits in a cycle.
        let mut reached = 0usize;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            reached += 1;
            stack.extend_from_slice(&directories[id as usize].subdirectories);
        }
        if reached != directory_count {
            return Err(Vfs2Error::UnresolvedStructure(format!(
                "{} directories are not reachable from the root",
                directory_count - reached
            )));
        }

        let mut tree = Self {
            directories,
            files,
            root,
            index: HashIndex::new(),
        };
        tree.index = tree.build_index()?;
        Ok(tree)
    }

    fn build_index(&self) -> Vfs2Result<HashIndex> {
        let mut index = HashIndex::with_capacity(self.directories.len() + self.files.len());
        for entry in self.walk() {
            if entry.id() == EntryRef::Directory(self.root) {
                continue;
            }
            if let Err(existing) = index.insert(entry.hash(), entry.id()) {
                return Err(Vfs2Error::DuplicateHash {
                    hash: entry.hash(),
                    first: self.path_of(existing),
                    second: self.path_of(entry.id()),
                });
            }
        }
        Ok(index)
    }

    /// Root directory id
    pub fn root_id(&self) -> u32 {
        self.root
    }

    /// Root directory
    pub fn root(&self) -> &Directory {
        &self.directories[self.root as usize]
    }

    /// All directories, index == id
    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }

    /// All files, index == id
    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// Directory by id
    pub fn directory(&self, id: u32) -> Option<&Directory> {
        self.directories.get(id as usize)
    }

    /// File by id
    pub fn file(&self, id: u32) -> Option<&File> {
        self.files.get(id as usize)
    }

    /// Resolve a reference
    pub fn entry(&self, entry: EntryRef) -> Option<Entry<'_>> {
        match entry {
            EntryRef::Directory(id) => self.directory(id).map(|d| Entry::Directory(id, d)),
            EntryRef::File(id) => self.file(id).map(|f| Entry::File(id, f)),
        }
    }

    /// Number of directories plus files
    pub fn len(&self) -> usize {
        self.directories.len() + self.files.len()
    }

    /// Whether the tree holds nothing but its root
    pub fn is_empty(&self) -> bool {
        self.directories.len() == 1 && self.files.is_empty()
    }

    /// Hash index of every entry except the root
    pub fn hash_index(&self) -> &HashIndex {
        &self.index
    }

    /// Look up an entry by path hash
    pub fn lookup_by_hash(&self, hash: u32) -> Option<Entry<'_>> {
        self.index.get(hash).and_then(|entry| self.entry(entry))
    }

    /// Full `/`-separated path relative to the root (empty for the root)
    pub fn path_of(&self, entry: EntryRef) -> String {
        let (name, mut parent) = match entry {
            EntryRef::Directory(id) => match self.directory(id) {
                Some(dir) => (dir.name.as_str(), dir.parent),
                None => return String::new(),
            },
            EntryRef::File(id) => match self.file(id) {
                Some(file) => (file.name.as_str(), Some(file.parent)),
                None => return String::new(),
            },
        };

        let mut parts = Vec::new();
        if parent.is_some() {
            parts.push(name);
        }
        while let Some(id) = parent {
            let dir = &self.directories[id as usize];
            if dir.parent.is_some() {
                parts.push(dir.name.as_str());
            }
            parent = dir.parent;
        }
        parts.reverse();
        parts.join("/")
    }

    /// Iterate every entry in table order: directories by id, then files by id
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            next_directory: 0,
            next_file: 0,
        }
    }

    /// File ids in data region order: depth-first from the root, each
    /// directory's files before its subdirectories
    pub fn files_in_data_order(&self) -> Vec<u32> {
        let mut order = Vec::with_capacity(self.files.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let dir = &self.directories[id as usize];
            order.extend_from_slice(&dir.files);
            stack.extend(dir.subdirectories.iter().rev());
        }
        order
    }

    /// Compare two trees by path hash. The roots are not part of the comparison.
    pub fn diff_by_hash(&self, other: &EntryTree) -> TreeDiff {
        let mut diff = TreeDiff::default();
        for (hash, entry) in self.index.sorted() {
            match other.index.get(hash) {
                Some(theirs) => {
                    diff.matched.insert(hash, (entry, theirs));
                }
                None => diff.only_in_self.push(hash),
            }
        }
        diff.only_in_other = other
            .index
            .sorted()
            .into_iter()
            .map(|(hash, _)| hash)
            .filter(|hash| !self.index.contains(*hash))
            .collect();
        diff
    }

    /// Replace an entry's flags, returning the previous value
    pub fn set_flags(&mut self, entry: EntryRef, flags: i32) -> Option<i32> {
        let slot = match entry {
            EntryRef::Directory(id) => &mut self.directories.get_mut(id as usize)?.flags,
            EntryRef::File(id) => &mut self.files.get_mut(id as usize)?.flags,
        };
        Some(std::mem::replace(slot, flags))
    }
}

/// Iterator over a tree's entries in table order
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    tree: &'a EntryTree,
    next_directory: usize,
    next_file: usize,
}

impl<'a> Iterator for Walk<'a> {
    type Item = Entry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(dir) = self.tree.directories.get(self.next_directory) {
            let id = self.next_directory as u32;
            self.next_directory += 1;
            return Some(Entry::Directory(id, dir));
        }
        let file = self.tree.files.get(self.next_file)?;
        let id = self.next_file as u32;
        self.next_file += 1;
        Some(Entry::File(id, file))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.tree.directories.len().saturating_sub(self.next_directory)
            + self.tree.files.len().saturating_sub(self.next_file);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Walk<'_> {}
