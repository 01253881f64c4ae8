//! Command-line front end for the Chord ring.
//!
//! Provides commands for:
//! - Running a ring node (creating a ring or joining one)
//! - Storing and fetching values through an entry node
//! - Looking up which node owns a key

pub mod commands;
pub mod config;
pub mod logging;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
pub use logging::{init_logging, LogLevel};
