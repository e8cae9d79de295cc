//! List command for the pvm CLI.
//!
//! ## Usage
//!
//! ```bash
//! pvm list
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Installed versions:
//!   php-8.1.27-nts-Win32-vs16-x64
//!   php-8.2.9-Win32-vs16-x64
//! ```

use anyhow::Result;
use pvm_core::PvmPaths;

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the versions directory cannot be read.
pub fn execute() -> Result<()> {
    let paths = PvmPaths::new()?;
    let installed = paths.list_installed()?;

    if installed.is_empty() {
        println!("No PHP versions installed.");
        println!();
        println!("Run 'pvm install <version>' to install one.");
        return Ok(());
    }

    println!("Installed versions:");
    for name in &installed {
        println!("  {name}");
    }

    Ok(())
}
