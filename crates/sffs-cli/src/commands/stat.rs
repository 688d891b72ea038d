use anyhow::Result;
use clap::Args as ClapArgs;
use sffs_core::SharedFolderFs;
use tracing::instrument;

use crate::output::{create_table, format_entry_type, format_mode, format_time};
use super::resolve;

#[derive(ClapArgs)]
pub struct Args {
    /// Path within the shared folder
    #[arg(default_value = "/")]
    pub path: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::stat", skip_all, fields(path = %args.path))]
pub fn execute(fs: &SharedFolderFs, args: &Args) -> Result<()> {
    let node = resolve(fs, &args.path)?;
    let attrs = fs.getattr(&node);
    tracing::debug!("{}", fs.describe(&node));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&attrs)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Path".to_string(), node.path().to_string()]);
    table.add_row(vec!["Type".to_string(), attrs.kind.to_string()]);
    table.add_row(vec![
        "Mode".to_string(),
        format!("{}{} ({:o})", format_entry_type(attrs.kind), format_mode(attrs.perm()), attrs.perm()),
    ]);
    table.add_row(vec!["Links".to_string(), attrs.nlink.to_string()]);
    table.add_row(vec!["Owner".to_string(), format!("{}:{}", attrs.uid, attrs.gid)]);
    table.add_row(vec!["Size".to_string(), attrs.size.to_string()]);
    table.add_row(vec!["Blocks".to_string(), format!("{} x {}", attrs.blocks, attrs.blocksize)]);
    table.add_row(vec!["File id".to_string(), attrs.fileid.to_string()]);
    table.add_row(vec!["Fsid".to_string(), attrs.fsid.to_string()]);
    table.add_row(vec!["Accessed".to_string(), format_time(attrs.atime)]);
    table.add_row(vec!["Modified".to_string(), format_time(attrs.mtime)]);
    table.add_row(vec!["Changed".to_string(), format_time(attrs.ctime)]);
    println!("{table}");
    Ok(())
}
