use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use sffs_core::{Node, SharedFolderFs, UioSegment};
use std::io::{self, Write};
use tracing::instrument;

use super::resolve;

#[derive(ClapArgs)]
pub struct Args {
    /// File path within the shared folder
    pub file: String,

    /// Bytes requested per read call
    #[arg(long, default_value_t = 64 * 1024, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: u32,
}

#[instrument(level = "info", name = "cmd::cat", skip_all, fields(file = %args.file))]
pub fn execute(fs: &SharedFolderFs, args: &Args) -> Result<()> {
    let node = resolve(fs, &args.file)?;
    fs.open(&node)
        .with_context(|| format!("Cannot open {}", args.file))?;

    let mut stdout = io::stdout().lock();
    let result = copy_out(fs, &node, args.chunk_size as usize, &mut stdout);
    fs.close(&node);
    if let Some(err) = fs.take_close_error() {
        tracing::warn!(path = %err.path, errno = err.errno, "close failed: {}", err.message);
    }
    result?;
    stdout.flush()?;
    Ok(())
}

fn copy_out(fs: &SharedFolderFs, node: &Node, chunk: usize, out: &mut impl Write) -> Result<()> {
    let mut buf = vec![0u8; chunk];
    let mut offset = 0u64;
    loop {
        let n = fs
            .read(node, offset, &mut buf, UioSegment::User)
            .with_context(|| format!("Read failed at offset {offset}"))?;
        if n == 0 {
            return Ok(());
        }
        out.write_all(&buf[..n])?;
        offset += n as u64;
    }
}
