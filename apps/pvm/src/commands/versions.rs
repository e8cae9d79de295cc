//! Versions command for the pvm CLI.
//!
//! Lists builds available on the distribution server, newest first.
//!
//! ## Usage
//!
//! ```bash
//! pvm versions          # Thread safe builds
//! pvm versions --nts    # Non-thread-safe builds
//! pvm versions --json   # Output in JSON format
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Available PHP versions (thread safe):
//!
//!   8.3.2
//!   8.2.9 *
//!   8.1.27
//!
//!   * = installed
//! ```

use anyhow::Result;
use clap::Args;
use pvm_core::{CatalogEntry, Config, PvmPaths, fetch_catalog};
use serde::Serialize;

/// Arguments for the versions command.
#[derive(Args)]
pub struct VersionsArgs {
    /// List non-thread-safe builds instead of thread safe ones.
    #[clap(long)]
    pub nts: bool,

    /// Show versions in JSON format.
    #[clap(long, short = 'j')]
    pub json: bool,
}

/// Version information for JSON output.
#[derive(Debug, Clone, Serialize)]
struct VersionInfo {
    version: String,
    thread_safe: bool,
    installed: bool,
    download_url: String,
}

/// Executes the versions command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the catalog cannot
/// be fetched.
pub async fn execute(args: &VersionsArgs) -> Result<()> {
    let paths = PvmPaths::new()?;
    let config = Config::load(&paths)?;
    let catalog = fetch_catalog(&config, &paths).await?;
    let entries = catalog.sorted_newest_first(!args.nts);

    if args.json {
        output_json(&entries, &paths)?;
    } else {
        output_text(&entries, &paths, !args.nts);
    }

    Ok(())
}

fn output_json(entries: &[&CatalogEntry], paths: &PvmPaths) -> Result<()> {
    let infos: Vec<VersionInfo> = entries
        .iter()
        .map(|e| VersionInfo {
            version: e.version(),
            thread_safe: e.thread_safe,
            installed: paths.is_installed(e),
            download_url: e.download_url.clone(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&infos)?);
    Ok(())
}

fn output_text(entries: &[&CatalogEntry], paths: &PvmPaths, thread_safe: bool) {
    let label = pvm_core::specifier::variant_label(thread_safe);

    if entries.is_empty() {
        println!("No {label} versions available.");
        return;
    }

    println!("Available PHP versions ({label}):");
    println!();

    let mut any_installed = false;
    for entry in entries {
        if paths.is_installed(entry) {
            any_installed = true;
            println!("  {} *", entry.version());
        } else {
            println!("  {}", entry.version());
        }
    }

    if any_installed {
        println!();
        println!("  * = installed");
    }
}
