//! VFS2 command-line tool library
//!
//! This library provides the command definitions and handlers for the `vfs2`
//! binary, plus the filesystem side of the tool: walking a loose folder into
//! a tree, extracting a tree to disk and writing archives atomically.

pub mod commands;
pub mod fs;
pub mod output;

// Re-export command handlers
pub use crate::commands::{
    compress::handle as handle_compress, extract::handle as handle_extract,
    fix::handle as handle_fix, hash::handle as handle_hash, list::handle as handle_list,
};

use clap::{Args, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use vfs2_formats::vfs2::{BuildOptions, DEFAULT_COMPRESSION_LEVEL, EncodeOptions};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract every file of an archive into a folder
    #[command(visible_alias = "e")]
    Extract {
        /// Archive to read
        input: PathBuf,

        /// Folder to extract into (created if missing)
        output: PathBuf,
    },

    /// Build an archive from a folder
    #[command(visible_alias = "c")]
    Compress {
        /// Archive to write
        output: PathBuf,

        /// Folder to pack
        input: PathBuf,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Build an archive from a folder, copying flags from a reference archive
    #[command(visible_alias = "f")]
    Fix {
        /// Archive to write
        output: PathBuf,

        /// Folder to pack
        input: PathBuf,

        /// Known-good archive to take flags from [default: <output stem>_old<ext>]
        reference: Option<PathBuf>,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// List the entries of an archive
    #[command(visible_alias = "l")]
    List {
        /// Archive to read
        input: PathBuf,
    },

    /// Print the path hash of each argument
    Hash {
        /// Archive-relative paths, `/`-separated
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

/// Options for building a fresh tree and encoding it
#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// Flags for directories with this name, added to the defaults (ui=9)
    #[arg(
        long = "dir-flag",
        value_name = "NAME=VALUE",
        env = "VFS2_DIR_FLAGS",
        value_delimiter = ',',
        value_parser = parse_dir_flag
    )]
    pub dir_flags: Vec<(String, i32)>,

    /// Extensions of files stored uncompressed
    #[arg(
        long = "raw-ext",
        value_name = "EXT",
        env = "VFS2_RAW_EXTS",
        value_delimiter = ',',
        default_values_t = vec!["at9".to_string()]
    )]
    pub raw_extensions: Vec<String>,

    /// zlib compression level (0-9)
    #[arg(
        long,
        env = "VFS2_LEVEL",
        default_value_t = DEFAULT_COMPRESSION_LEVEL,
        value_parser = clap::value_parser!(u32).range(0..=9)
    )]
    pub level: u32,

    /// Compress every payload flagged for zlib, even when it grows
    #[arg(long, env = "VFS2_NO_STORE_INCOMPRESSIBLE")]
    pub no_store_incompressible: bool,
}

impl Default for BuildArgs {
    fn default() -> Self {
        Self {
            dir_flags: Vec::new(),
            raw_extensions: vec!["at9".to_string()],
            level: DEFAULT_COMPRESSION_LEVEL,
            no_store_incompressible: false,
        }
    }
}

impl BuildArgs {
    /// Defaults for freshly built entries
    pub fn build_options(&self) -> BuildOptions {
        let defaults = BuildOptions::default();
        let mut directory_flag_overrides: BTreeMap<String, i32> =
            defaults.directory_flag_overrides.clone();
        directory_flag_overrides.extend(self.dir_flags.iter().cloned());
        BuildOptions {
            directory_flag_overrides,
            raw_extensions: self
                .raw_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
            ..defaults
        }
    }

    /// Encoder settings
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            level: self.level,
            store_incompressible: !self.no_store_incompressible,
        }
    }
}

fn parse_dir_flag(value: &str) -> Result<(String, i32), String> {
    let (name, flags) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{value}'"))?;
    let name = name.trim();
    if name.is_empty() || name.contains('/') {
        return Err(format!("invalid directory name '{name}'"));
    }
    let flags = flags
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid flag value '{flags}': {e}"))?;
    Ok((name.to_string(), flags))
}

/// Output format for `list` and `hash`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Text,
    /// Compact JSON
    Json,
    /// Indented JSON
    JsonPretty,
}
