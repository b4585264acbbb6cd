use anyhow::Result;
use serde::Serialize;
use vfs2_formats::vfs2::path_hash;

use crate::OutputFormat;
use crate::output::{format_hash, print_json};

#[derive(Debug, Serialize)]
struct HashedPath<'a> {
    path: &'a str,
    hash: String,
}

pub fn handle(paths: &[String], format: OutputFormat) -> Result<()> {
    let hashed: Vec<HashedPath<'_>> = paths
        .iter()
        .map(|path| HashedPath {
            path,
            hash: format_hash(path_hash(path)),
        })
        .collect();

    match format {
        OutputFormat::Text => {
            for entry in &hashed {
                println!("{}  {}", entry.hash, entry.path);
            }
            Ok(())
        }
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(&hashed, format),
    }
}
