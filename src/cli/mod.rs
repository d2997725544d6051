//! CLI module for aerogrid
//!
//! Provides command-line interface for:
//! - serve: Load configuration and run the HTTP server
//! - check-config: Validate a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{build_state, check_config, run, run_command, serve, Config, TableSeed};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
