//! List command - enumerate a directory through the readdir cursor.
//!
//! The listing is read with a caller-chosen buffer size, so small values
//! exercise cursor resumption across many calls.
//!
//! # Examples
//!
//! ```bash
//! # List the shared folder root
//! sffs ls /srv/shared
//!
//! # Long format
//! sffs ls -l /srv/shared docs
//!
//! # JSON for scripting, paging 512 bytes at a time
//! sffs ls --json --buffer-size 512 /srv/shared | jq '.entries[].name'
//! ```

use anyhow::{bail, Result};
use clap::Args as ClapArgs;
use serde::Serialize;
use sffs_core::config::NAME_MAX;
use sffs_core::dirent::record_len;
use sffs_core::{ComponentName, Dirent, Node, SharedFolderFs};
use std::sync::Arc;
use tracing::instrument;

use super::{normalize_path, resolve};
use crate::output::{create_table, format_entry_type, format_mode, format_size};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path within the shared folder (default: root)
    #[arg(default_value = "/")]
    pub path: String,

    /// Show detailed information
    #[arg(short, long)]
    pub long: bool,

    /// Show all entries, including `.`, `..` and hidden names
    #[arg(short, long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Bytes handed to each readdir call (at least 280, one record of the longest name)
    #[arg(long, default_value_t = 4096, value_parser = clap::value_parser!(u32).range(MIN_BUFFER_SIZE..))]
    pub buffer_size: u32,
}

/// Smallest buffer that holds the next entry whatever its name.
#[allow(clippy::cast_possible_wrap)]
const MIN_BUFFER_SIZE: i64 = record_len(NAME_MAX) as i64;

/// JSON output format for ls command
#[derive(Serialize)]
struct LsOutput {
    path: String,
    readdir_calls: usize,
    entries: Vec<EntryInfo>,
}

#[derive(Serialize)]
struct EntryInfo {
    name: String,
    #[serde(rename = "type")]
    entry_type: &'static str,
    fileno: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

/// Read a whole directory with `buf_size`-byte readdir calls.
///
/// Returns the entries and the number of calls it took.
pub fn read_directory(fs: &SharedFolderFs, dir: &Node, buf_size: usize) -> Result<(Vec<Dirent>, usize)> {
    fs.open(dir)?;
    let result = page_directory(fs, dir, buf_size);
    fs.close(dir);
    if let Some(err) = fs.take_close_error() {
        tracing::warn!(path = %err.path, errno = err.errno, "close failed: {}", err.message);
    }
    result
}

fn page_directory(fs: &SharedFolderFs, dir: &Node, buf_size: usize) -> Result<(Vec<Dirent>, usize)> {
    let mut buf = vec![0u8; buf_size];
    let mut cursor = 0;
    let mut entries = Vec::new();
    let mut calls = 0;
    loop {
        let reply = fs.readdir(dir, cursor, &mut buf)?;
        calls += 1;
        entries.extend(Dirent::decode_all(&buf[..reply.bytes])?);
        cursor = reply.cursor;
        if reply.eof {
            return Ok((entries, calls));
        }
    }
}

#[instrument(level = "info", name = "cmd::ls", skip_all, fields(path = %args.path))]
pub fn execute(fs: &SharedFolderFs, args: &Args) -> Result<()> {
    let dir = resolve(fs, &args.path)?;
    if !dir.kind().is_dir() {
        bail!("Not a directory: {}", args.path);
    }

    let (entries, calls) = read_directory(fs, &dir, args.buffer_size as usize)?;
    tracing::debug!(entries = entries.len(), calls, "directory read");
    let visible: Vec<&Dirent> = entries
        .iter()
        .filter(|e| args.all || !e.name.starts_with('.'))
        .collect();

    if args.json {
        print_json(fs, &dir, &normalize_path(&args.path), &visible, calls, args.long)?;
    } else if args.long {
        print_long_format(fs, &dir, &visible);
    } else {
        for entry in visible {
            println!("{}", entry.name);
        }
    }
    Ok(())
}

/// Size of a listed child, through a lookup and getattr.
fn child_size(fs: &SharedFolderFs, dir: &Arc<Node>, entry: &Dirent) -> Option<u64> {
    if entry.name == "." || entry.name == ".." {
        return None;
    }
    let child = fs.lookup(dir, &ComponentName::lookup(&entry.name)).ok()?.node;
    let size = fs.getattr(&child).size;
    let _ = fs.release(&child);
    Some(size)
}

fn print_json(
    fs: &SharedFolderFs,
    dir: &Arc<Node>,
    path: &str,
    entries: &[&Dirent],
    calls: usize,
    with_size: bool,
) -> Result<()> {
    let output = LsOutput {
        path: path.to_string(),
        readdir_calls: calls,
        entries: entries
            .iter()
            .map(|e| EntryInfo {
                name: e.name.clone(),
                entry_type: e.file_type().name(),
                fileno: e.fileno,
                size: if with_size { child_size(fs, dir, e) } else { None },
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_long_format(fs: &SharedFolderFs, dir: &Arc<Node>, entries: &[&Dirent]) {
    let mut table = create_table();
    table.set_header(vec!["Mode", "Size", "Id", "Name"]);
    for entry in entries {
        let (mode, size) = if entry.name == "." || entry.name == ".." {
            (String::new(), String::new())
        } else {
            match fs.lookup(dir, &ComponentName::lookup(&entry.name)) {
                Ok(found) => {
                    let attrs = fs.getattr(&found.node);
                    let _ = fs.release(&found.node);
                    (
                        format!("{}{}", format_entry_type(attrs.kind), format_mode(attrs.perm())),
                        format_size(attrs.size),
                    )
                }
                Err(e) => {
                    tracing::debug!(name = %entry.name, error = %e, "lookup of listed entry failed");
                    (format_entry_type(entry.file_type()).to_string(), "?".to_string())
                }
            }
        };
        table.add_row(vec![mode, size, entry.fileno.to_string(), entry.name.clone()]);
    }
    println!("{table}");
}
