use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use vfs2_formats::vfs2::{Entry, EntryKind, EntryTree};

use crate::OutputFormat;
use crate::fs::read_archive;
use crate::output::{OutputStyle, create_table, format_hash, numeric_cell, print_json, regular_cell};

#[derive(Debug, Serialize)]
struct ListedEntry {
    kind: &'static str,
    id: u32,
    hash: String,
    flags: i32,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stored_size: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Listing {
    directories: usize,
    files: usize,
    entries: Vec<ListedEntry>,
}

fn listing(tree: &EntryTree) -> Listing {
    let entries = tree
        .walk()
        .map(|entry| {
            let (id, size, stored_size) = match entry {
                Entry::Directory(id, _) => (id, None, None),
                Entry::File(id, file) => (
                    id,
                    Some(file.uncompressed_size()),
                    file.compressed_size(),
                ),
            };
            ListedEntry {
                kind: match entry.kind() {
                    EntryKind::Directory => "directory",
                    EntryKind::File => "file",
                },
                id,
                hash: format_hash(entry.hash()),
                flags: entry.flags(),
                path: tree.path_of(entry.id()),
                size,
                stored_size,
            }
        })
        .collect();

    Listing {
        directories: tree.directories().len(),
        files: tree.files().len(),
        entries,
    }
}

pub fn handle(input: &Path, format: OutputFormat) -> Result<()> {
    let tree = read_archive(input)?;
    let listing = listing(&tree);

    match format {
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(&listing, format),
        OutputFormat::Text => {
            let style = OutputStyle::default();
            let mut table = create_table(
                &["Kind", "Id", "Hash", "Flags", "Size", "Stored", "Path"],
                &style,
            );
            for entry in &listing.entries {
                let size = |value: Option<u32>| value.map(|v| v.to_string()).unwrap_or_default();
                table.add_row(vec![
                    regular_cell(entry.kind),
                    numeric_cell(&entry.id.to_string()),
                    regular_cell(&entry.hash),
                    numeric_cell(&entry.flags.to_string()),
                    numeric_cell(&size(entry.size)),
                    numeric_cell(&size(entry.stored_size)),
                    regular_cell(if entry.path.is_empty() { "/" } else { &entry.path }),
                ]);
            }
            println!("{table}");
            println!(
                "{} directories, {} files",
                listing.directories, listing.files
            );
            Ok(())
        }
    }
}
