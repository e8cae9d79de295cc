#![warn(clippy::pedantic)]

//! # pvm
//!
//! Installs PHP builds published on the Windows distribution server into
//! `~/.pvm/versions/`.
//!
//! ## Subcommands
//!
//! - `install` - Resolve a version and install it
//! - `list` - List installed versions
//! - `versions` - List versions available for download
//!
//! ## Examples
//!
//! Install the newest 8.2 release (thread safe):
//! ```bash
//! pvm install 8.2
//! ```
//!
//! Install an exact non-thread-safe build:
//! ```bash
//! pvm install 8.1.27 nts
//! ```

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{install, list, versions};

/// PHP version manager.
#[derive(Parser)]
#[command(
    name = "pvm",
    author,
    version,
    about = "Install and manage PHP builds",
    after_help = "\
ENVIRONMENT VARIABLES:
    PVM_HOME            Root directory (default: ~/.pvm)
    PVM_DIST_SERVER     Distribution server URL (default: https://windows.php.net)
    PVM_LOG             Log filter, e.g. pvm_core=debug (overrides --verbose)"
)]
pub struct Cli {
    /// Print debug logs to stderr.
    #[clap(long, short = 'v', global = true, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the pvm CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Install a PHP version.
    ///
    /// Accepts a major (`8`), major.minor (`8.2`) or exact (`8.2.9`) version
    /// and installs the newest matching build of the requested variant.
    Install(install::InstallArgs),

    /// List installed PHP versions.
    List,

    /// List PHP versions available for download.
    Versions(versions::VersionsArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Prints the error chain and returns the exit code.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    1
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Install(args) => install::execute(&args).await,
        Commands::List => list::execute(),
        Commands::Versions(args) => versions::execute(&args).await,
    }
}
