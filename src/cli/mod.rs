//! Command-line interface module
//!
//! Provides argument parsing and command execution.

pub mod args;
pub mod commands;

pub use args::{ArgumentArgs, Args, Command, TargetArgs, parse_args};
pub use commands::execute_command;
