#![deny(unsafe_code)]

mod commands;
mod config;
mod exit_code;
mod output;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sffs_core::{ErrorClass, FsError, SharedFolderFs};
use sffs_provider::{LocalProvider, ProviderClient, ProviderError};

use crate::commands::{cat, ls, pathconf, stat, stats};
use crate::config::Config;

const HOST_CONTEXT: &str = "Cannot serve host folder";

/// Inspect a host folder through the shared-folder adapter
#[derive(Parser)]
#[command(name = "sffs")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # List a shared folder
    sffs ls /srv/shared

    # Page through a directory 512 bytes at a time
    sffs ls --buffer-size 512 /srv/shared docs

    # Read a file
    sffs cat /srv/shared docs/notes.txt

    # Show reported attributes as JSON
    sffs stat --json /srv/shared docs/notes.txt
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file with a [mount] table
    #[arg(long, env = "SFFS_CONFIG", global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List directory contents
    Ls(HostCommand<ls::Args>),

    /// Write file contents to stdout
    Cat(HostCommand<cat::Args>),

    /// Show the attributes the adapter reports
    Stat(HostCommand<stat::Args>),

    /// Show the fixed filesystem limits
    Pathconf(HostCommand<pathconf::Args>),

    /// Walk a tree and show adapter statistics
    Stats(HostCommand<stats::StatsArgs>),
}

/// Wrapper for commands that operate on a host folder
#[derive(Parser)]
pub struct HostCommand<T: clap::Args> {
    /// Host directory served as the shared folder
    #[arg(value_name = "HOST")]
    pub host: PathBuf,

    #[command(flatten)]
    pub args: T,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);

            let args: Vec<String> = std::env::args().collect();
            let is_quiet = args.iter().any(|a| a == "-q" || a == "--quiet");
            if !is_quiet {
                eprintln!("Error: {e:#}");
            }

            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ls(cmd) => execute_host_command(&cmd, config, ls::execute),
        Commands::Cat(cmd) => execute_host_command(&cmd, config, cat::execute),
        Commands::Stat(cmd) => execute_host_command(&cmd, config, stat::execute),
        Commands::Pathconf(cmd) => execute_host_command(&cmd, config, pathconf::execute),
        Commands::Stats(cmd) => execute_host_command(&cmd, config, stats::run),
    }
}

/// Mount the host folder, run the command, then unmount
fn execute_host_command<T, F>(cmd: &HostCommand<T>, config: Config, f: F) -> Result<()>
where
    T: clap::Args,
    F: FnOnce(&SharedFolderFs, &T) -> Result<()>,
{
    let provider = LocalProvider::new(&cmd.host)
        .with_context(|| format!("{HOST_CONTEXT}: {}", cmd.host.display()))?;
    let provider: Arc<dyn ProviderClient> = Arc::new(provider);
    let fs = SharedFolderFs::mount(provider, config.mount).context("Mount failed")?;

    let result = f(&fs, &cmd.args);
    let closed = fs.unmount();
    if closed > 0 {
        tracing::debug!(closed, "handles still open at unmount");
    }
    result
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting
fn categorize_error(e: &anyhow::Error) -> u8 {
    // The outermost context says whether the host folder itself was the problem.
    if e.to_string().starts_with(HOST_CONTEXT) {
        return exit_code::HOST_UNAVAILABLE;
    }

    for cause in e.chain() {
        if let Some(fs_err) = cause.downcast_ref::<FsError>() {
            if matches!(fs_err, FsError::Config(_)) {
                return exit_code::CONFIG_INVALID;
            }
            if let Some(code) = errno_exit_code(fs_err.to_errno()) {
                return code;
            }
            if fs_err.class() == ErrorClass::Capability {
                return exit_code::NOT_SUPPORTED;
            }
        }

        if let Some(provider_err) = cause.downcast_ref::<ProviderError>() {
            if let Some(code) = errno_exit_code(provider_err.errno()) {
                return code;
            }
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::PermissionDenied => return exit_code::PERMISSION_DENIED,
                io::ErrorKind::NotFound => return exit_code::NOT_FOUND,
                io::ErrorKind::Interrupted => return exit_code::CANCELLED,
                _ => {}
            }
        }

        if cause.downcast_ref::<toml::de::Error>().is_some() {
            return exit_code::CONFIG_INVALID;
        }
    }

    let msg = format!("{e:#}").to_lowercase();
    if msg.contains("config") {
        exit_code::CONFIG_INVALID
    } else {
        exit_code::GENERAL_ERROR
    }
}

fn errno_exit_code(errno: i32) -> Option<u8> {
    match errno {
        libc::ENOENT => Some(exit_code::NOT_FOUND),
        libc::EACCES | libc::EPERM | libc::EROFS => Some(exit_code::PERMISSION_DENIED),
        libc::EOPNOTSUPP | libc::ENOTTY => Some(exit_code::NOT_SUPPORTED),
        libc::EINTR => Some(exit_code::CANCELLED),
        _ => None,
    }
}
