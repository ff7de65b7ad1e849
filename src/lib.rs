//! # cmdweave
//!
//! Compose command lines for external tools through a fluent argument model,
//! filter them against a whitelist derived from the tool's own help text, and
//! run them as subprocesses with streaming output and deadlines.
//!
//! ## Features
//!
//! - Shared tool definitions with aliases, binary override and timeout
//! - Ordered arguments with positional insertion, deduplication and removal
//! - Safe mode that drops flags the tool does not document
//! - Streaming execution with success/error callbacks and output parsers
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cmdweave::core::{ArgOptions, Command, Definition};
//!
//! let ffmpeg = Arc::new(Definition::new("ffmpeg"));
//! ffmpeg.suppress_double_dash().define_alias("input", "-i");
//!
//! let mut cmd = Command::new(&ffmpeg);
//! cmd.arg("input", "video.mp4")
//!     .arg("y", "out.avi")
//!     .set("vcodec", Some("libx264"), ArgOptions::new().before("-y"));
//! assert_eq!(cmd.command_line(), "ffmpeg -i 'video.mp4' -vcodec 'libx264' -y 'out.avi'");
//!
//! let output = cmd.exec()?;
//! println!("{output}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use crate::core::{ArgOptions, Command, Definition};
pub use error::{CommandError, Result};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with appropriate verbosity
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn setup_logging(debug: bool) -> anyhow::Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
