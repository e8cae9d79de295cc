//! Install command for the pvm CLI.
//!
//! Resolves a version against the remote catalog and installs the matching
//! build. The thread safe variant is installed unless `nts` is given.
//!
//! ## Usage
//!
//! ```bash
//! pvm install 8          # Newest 8.x.y, thread safe
//! pvm install 8.2 nts    # Newest 8.2.y, non-thread safe
//! pvm install 8.2.9      # Exactly 8.2.9
//! ```

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use pvm_core::download::{format_bytes, format_speed};
use pvm_core::{
    Config, HttpTransport, ProgressCallback, ProgressEvent, PvmError, PvmPaths, VersionSpecifier,
    fetch_catalog, install,
};
use tracing::debug;

use super::Variant;

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Version to install: `8`, `8.2` or `8.2.9`.
    pub version: String,

    /// Build variant.
    #[clap(value_enum, default_value_t = Variant::Ts)]
    pub variant: Variant,
}

/// Executes the install command.
///
/// # Process
///
/// 1. Parse the version specifier
/// 2. Fetch the catalog (cached for the configured TTL)
/// 3. Resolve the specifier to one build
/// 4. Download, extract and clean up
///
/// # Errors
///
/// Returns an error if the version is malformed, nothing matches, the build
/// is already installed, or any pipeline step fails.
pub async fn execute(args: &InstallArgs) -> Result<()> {
    let thread_safe = args.variant.is_thread_safe();
    let spec = VersionSpecifier::parse(&args.version, thread_safe)?;

    if thread_safe {
        println!("Thread safe version will be installed");
    } else {
        println!("Non-thread safe version will be installed");
    }

    let paths = PvmPaths::new()?;
    let config = Config::load(&paths)?;

    println!("Fetching version listing...");
    let catalog = fetch_catalog(&config, &paths).await?;

    let entry = catalog
        .resolve(&spec)
        .ok_or_else(|| PvmError::not_found(spec.to_string()))?;
    debug!("Resolved {spec} to {}", entry.download_url);

    println!("Installing PHP {entry}...");
    let transport = HttpTransport::new(&config)?.with_progress(progress_printer());
    let outcome = install(entry, &paths.root, &transport).await?;

    println!(
        "PHP {} installed to {}",
        entry.version(),
        outcome.install_dir.display()
    );
    if !outcome.staging_removed {
        println!(
            "The downloaded archive could not be removed from {}",
            paths.versions.display()
        );
    }

    Ok(())
}

/// Renders download progress as a single updating line.
fn progress_printer() -> ProgressCallback {
    Arc::new(|event: ProgressEvent| match event {
        ProgressEvent::Started { total, .. } => {
            if total > 0 {
                println!("Downloading {}", format_bytes(total));
            }
        }
        ProgressEvent::Progress { downloaded, speed } => {
            print!(
                "\r{} {}     ",
                format_bytes(downloaded),
                format_speed(speed)
            );
            let _ = std::io::stdout().flush();
        }
        ProgressEvent::Completed { downloaded } => {
            println!("\r{} downloaded              ", format_bytes(downloaded));
        }
        ProgressEvent::Failed { .. } => println!(),
    })
}
