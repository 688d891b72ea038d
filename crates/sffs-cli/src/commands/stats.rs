//! Stats command - walk a tree through the adapter and report its counters.

use anyhow::{bail, Result};
use clap::Args;
use sffs_core::{ComponentName, MountStatsSnapshot, Node, SharedFolderFs};
use std::sync::Arc;
use tracing::instrument;

use super::ls::read_directory;
use super::resolve;
use crate::output::{create_table, format_size};

#[derive(Args, Clone)]
pub struct StatsArgs {
    /// Directory to walk (default: root)
    #[arg(default_value = "/")]
    pub path: String,

    /// Maximum depth to descend
    #[arg(short = 'd', long, default_value_t = 8)]
    pub max_depth: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[instrument(level = "info", name = "cmd::stats", skip_all, fields(path = %args.path))]
pub fn run(fs: &SharedFolderFs, args: &StatsArgs) -> Result<()> {
    let dir = resolve(fs, &args.path)?;
    if !dir.kind().is_dir() {
        bail!("Not a directory: {}", args.path);
    }
    let visited = walk(fs, &dir, 0, args.max_depth)?;
    tracing::debug!(visited, "walk finished");

    let snapshot = fs.stats().snapshot();
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Table => print_table(&snapshot, visited),
    }
    Ok(())
}

/// List `dir` and stat every child, descending into subdirectories.
///
/// Returns the number of entries visited.
fn walk(fs: &SharedFolderFs, dir: &Arc<Node>, depth: usize, max_depth: usize) -> Result<usize> {
    let (entries, _) = read_directory(fs, dir, 4096)?;
    let mut visited = 0;
    for entry in entries.iter().filter(|e| e.name != "." && e.name != "..") {
        let child = match fs.lookup(dir, &ComponentName::lookup(&entry.name)) {
            Ok(found) => found.node,
            Err(e) => {
                tracing::debug!(name = %entry.name, error = %e, "skipping entry");
                continue;
            }
        };
        fs.getattr(&child);
        visited += 1;
        if child.kind().is_dir() && depth + 1 < max_depth {
            visited += walk(fs, &child, depth + 1, max_depth)?;
        }
        fs.release(&child)?;
    }
    Ok(visited)
}

fn print_table(s: &MountStatsSnapshot, visited: usize) {
    let mut table = create_table();
    table.set_header(vec!["Metric", "Value"]);
    let rows: [(&str, String); 14] = [
        ("Entries visited", visited.to_string()),
        ("Provider calls", s.provider_calls.to_string()),
        ("  open", s.opens.to_string()),
        ("  close", s.closes.to_string()),
        ("  read", s.reads.to_string()),
        ("  list", s.listings.to_string()),
        ("  stat", s.stats.to_string()),
        ("  set attributes", s.set_attributes.to_string()),
        ("Bytes read", format_size(s.bytes_read)),
        ("Close errors", s.close_errors.to_string()),
        ("Attr cache hits", s.attr_hits.to_string()),
        ("Attr cache misses", s.attr_misses.to_string()),
        ("Name cache hits", s.name_hits.to_string()),
        ("Name cache misses", s.name_misses.to_string()),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }
    println!("{table}");
}
