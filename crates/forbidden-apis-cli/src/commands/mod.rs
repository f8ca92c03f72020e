//! Subcommand implementations.

pub mod check;
pub mod init;
pub mod list_bundled;
pub mod output;
pub mod report;
