//! Utility modules for common functionality
//!
//! Provides flag naming helpers and process execution.

pub mod naming;
pub mod process;

pub use naming::{canonicalize, quote, unquote};
pub use process::{ProcessResult, ProcessRunner, RunOptions};
