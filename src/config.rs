//! Configuration management for the command-line front end
//!
//! Centralizes the options a CLI invocation may set and turns them into a
//! tool [`Definition`].

use crate::{
    cli::{Args, Command},
    core::Definition,
    error::{CommandError, Result},
    utils::process::DEFAULT_SEPARATOR,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Enable debug logging and echo every composed line
    pub debug: bool,
    /// Tool name; also the binary unless overridden
    pub name: String,
    /// Binary path override
    pub binary: Option<String>,
    /// Run deadline in seconds
    pub timeout_secs: Option<u64>,
    /// Gate every argument through the help-derived whitelist
    pub safe_mode: bool,
    /// Keep long names single-dashed
    pub no_double_dash: bool,
    /// Flag that makes the tool print its help text
    pub help_flag: String,
    /// Stream output chunks as they arrive
    pub stream: bool,
    /// Byte that ends a streamed chunk
    pub separator: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            name: String::new(),
            binary: None,
            timeout_secs: None,
            safe_mode: false,
            no_double_dash: false,
            help_flag: "--help".to_string(),
            stream: false,
            separator: DEFAULT_SEPARATOR,
        }
    }
}

impl Config {
    /// Create configuration from command line arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let target = args.command.target();
        let mut config = Self {
            debug: args.debug,
            name: target.name.clone(),
            binary: target.binary.clone(),
            no_double_dash: target.no_double_dash,
            help_flag: target.help_flag.clone(),
            ..Self::default()
        };

        // Override with command-specific options
        match &args.command {
            Command::Compose { arguments, .. } => {
                config.safe_mode = arguments.safe;
            }
            Command::Run {
                arguments,
                timeout,
                stream,
                separator,
                ..
            } => {
                config.safe_mode = arguments.safe;
                config.timeout_secs = *timeout;
                config.stream = *stream;
                config.separator = parse_separator(separator)?;
            }
            Command::Help { .. } | Command::SafeArgs { .. } => {}
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CommandError::validation("tool name must not be empty"));
        }

        if self.timeout_secs == Some(0) {
            return Err(CommandError::validation("timeout must be at least one second"));
        }

        if self.help_flag.trim().is_empty() {
            return Err(CommandError::validation("help flag must not be empty"));
        }

        Ok(())
    }

    /// Run deadline as a duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Build the tool definition described by this configuration
    pub fn definition(&self) -> Result<Definition> {
        let definition = Definition::new(self.name.as_str());
        definition
            .set_safe_mode(self.safe_mode)
            .set_help_flag(self.help_flag.as_str())
            .set_verbose(self.debug);

        if let Some(binary) = &self.binary {
            definition.set_binary(binary.as_str());
        }
        if self.no_double_dash {
            definition.suppress_double_dash();
        }
        if let Some(timeout) = self.timeout() {
            definition.set_timeout(timeout)?;
        }

        Ok(definition)
    }
}

/// Parse a separator given as one ASCII character or a `\r`, `\n`, `\t` escape
fn parse_separator(raw: &str) -> Result<u8> {
    match raw {
        "\\r" => Ok(b'\r'),
        "\\n" => Ok(b'\n'),
        "\\t" => Ok(b'\t'),
        _ if raw.len() == 1 && raw.is_ascii() => Ok(raw.as_bytes()[0]),
        _ => Err(CommandError::validation(format!(
            "separator must be a single ASCII character, got {raw:?}"
        ))),
    }
}
