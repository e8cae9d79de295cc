//! Command modules for the pvm CLI.
//!
//! - [`install`] - Resolve and install a version
//! - [`list`] - List installed versions
//! - [`versions`] - List available remote versions

pub mod install;
pub mod list;
pub mod versions;

use clap::ValueEnum;

/// Build variant selector shared by commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// Thread safe build.
    #[default]
    Ts,
    /// Non-thread-safe build.
    Nts,
}

impl Variant {
    #[must_use]
    pub const fn is_thread_safe(self) -> bool {
        matches!(self, Self::Ts)
    }
}
