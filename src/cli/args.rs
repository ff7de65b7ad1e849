//! Command-line argument parsing and validation

use clap::{Parser, Subcommand};

/// cmdweave - compose and run command lines for external tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "cmdweave", disable_help_subcommand = true)]
pub struct Args {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Which tool to drive and how its flags are named
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Tool name; also the binary unless --bin is given
    pub name: String,

    /// Binary path override
    #[arg(long = "bin", value_name = "PATH")]
    pub binary: Option<String>,

    /// Keep long names single-dashed (-vcodec instead of --vcodec)
    #[arg(long)]
    pub no_double_dash: bool,

    /// Flag that makes the tool print its help text
    #[arg(long, default_value = "--help", allow_hyphen_values = true)]
    pub help_flag: String,
}

/// Arguments to compose into the command line
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ArgumentArgs {
    /// Argument as NAME or NAME=VALUE, in order (repeatable)
    #[arg(short = 'a', long = "arg", value_name = "NAME[=VALUE]", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Literal token appended after all --arg entries (repeatable)
    #[arg(long = "raw", value_name = "TOKEN", allow_hyphen_values = true)]
    pub raw: Vec<String>,

    /// Drop flags that the tool's help text does not mention
    #[arg(long)]
    pub safe: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the composed command line without running it
    Compose {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        arguments: ArgumentArgs,
    },

    /// Compose and run the command line
    Run {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        arguments: ArgumentArgs,

        /// Kill the run after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Print output chunks as they arrive
        #[arg(long)]
        stream: bool,

        /// Chunk separator for --stream (a single character, or \r, \n, \t)
        #[arg(long, default_value = "\\r")]
        separator: String,
    },

    /// Print the tool's help text as cached lines
    Help {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the flags accepted in safe mode
    SafeArgs {
        #[command(flatten)]
        target: TargetArgs,
    },
}

impl Command {
    /// Tool selection shared by every subcommand
    pub fn target(&self) -> &TargetArgs {
        match self {
            Self::Compose { target, .. }
            | Self::Run { target, .. }
            | Self::Help { target }
            | Self::SafeArgs { target } => target,
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_help_subcommand_is_ours() {
        let args = Args::try_parse_from(["cmdweave", "help", "curl", "--help-flag=-h"]).unwrap();
        match args.command {
            Command::Help { target } => {
                assert_eq!(target.name, "curl");
                assert_eq!(target.help_flag, "-h");
            }
            _ => panic!("Expected Help command"),
        }
    }

    #[test]
    fn test_parse_compose() {
        let args = Args::try_parse_from([
            "cmdweave", "compose", "ffmpeg", "--no-double-dash", "-a", "input=video.mp4", "--raw",
            "-y",
        ])
        .unwrap();

        assert!(!args.debug);
        match args.command {
            Command::Compose { target, arguments } => {
                assert_eq!(target.name, "ffmpeg");
                assert!(target.no_double_dash);
                assert_eq!(target.help_flag, "--help");
                assert_eq!(arguments.args, vec!["input=video.mp4"]);
                assert_eq!(arguments.raw, vec!["-y"]);
            }
            _ => panic!("Expected Compose command"),
        }
    }

    #[test]
    fn test_parse_debug_flag() {
        let args = Args::try_parse_from(["cmdweave", "--debug", "help", "ls"]).unwrap();
        assert!(args.debug);
        assert_eq!(args.command.target().name, "ls");
    }

    #[test]
    fn test_parse_run_with_options() {
        let args = Args::try_parse_from([
            "cmdweave", "run", "ping", "--bin", "/sbin/ping", "--timeout", "2", "--stream",
            "--safe",
        ])
        .unwrap();

        match args.command {
            Command::Run {
                target,
                arguments,
                timeout,
                stream,
                separator,
            } => {
                assert_eq!(target.binary.as_deref(), Some("/sbin/ping"));
                assert!(arguments.safe);
                assert_eq!(timeout, Some(2));
                assert!(stream);
                assert_eq!(separator, "\\r");
            }
            _ => panic!("Expected Run command"),
        }
    }
}
