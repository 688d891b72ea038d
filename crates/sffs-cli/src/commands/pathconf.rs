use anyhow::Result;
use clap::Args as ClapArgs;
use serde::Serialize;
use sffs_core::{PathconfName, SharedFolderFs};
use tracing::instrument;

use crate::output::create_table;
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

#[derive(Serialize)]
struct Limits {
    link_max: u64,
    name_max: u64,
    path_max: u64,
}

#[instrument(level = "info", name = "cmd::pathconf", skip_all, fields(path = %args.path))]
pub fn execute(fs: &SharedFolderFs, args: &Args) -> Result<()> {
    let node = resolve(fs, &args.path)?;
    let limits = Limits {
        link_max: fs.pathconf(&node, PathconfName::LinkMax)?,
        name_max: fs.pathconf(&node, PathconfName::NameMax)?,
        path_max: fs.pathconf(&node, PathconfName::PathMax)?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&limits)?);
        return Ok(());
    }
    let mut table = create_table();
    table.set_header(vec!["Limit", "Value"]);
    table.add_row(vec!["LINK_MAX".to_string(), limits.link_max.to_string()]);
    table.add_row(vec!["NAME_MAX".to_string(), limits.name_max.to_string()]);
    table.add_row(vec!["PATH_MAX".to_string(), limits.path_max.to_string()]);
    println!("{table}");
    Ok(())
}
