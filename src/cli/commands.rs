//! Command implementations for the CLI

use crate::{
    cli::{ArgumentArgs, Command},
    config::Config,
    core::{Command as ToolCommand, Definition},
};
use anyhow::{Context, bail};
use std::io::{self, Write};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info, instrument};

/// Execute the appropriate command based on CLI arguments
#[instrument(skip(config))]
pub fn execute_command(config: &Config, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Compose { arguments, .. } => execute_compose_command(config, arguments),
        Command::Run { arguments, .. } => execute_run_command(config, arguments),
        Command::Help { .. } => execute_help_command(config),
        Command::SafeArgs { .. } => execute_safe_args_command(config),
    }
}

/// Build a tool command from `--arg` and `--raw` entries
fn build_command(config: &Config, arguments: &ArgumentArgs) -> anyhow::Result<ToolCommand> {
    let definition = Arc::new(
        config
            .definition()
            .context("Failed to configure tool definition")?,
    );
    let mut command = ToolCommand::new(&definition);

    for spec in &arguments.args {
        match spec.split_once('=') {
            Some((name, value)) => command.arg(name, value),
            None => command.flag(spec),
        };
    }
    for token in &arguments.raw {
        command.raw(token.as_str());
    }
    command.chunk_separator(config.separator);

    debug!("Composed {} arguments", command.args().len());
    Ok(command)
}

/// Execute the compose command
#[instrument(skip(config, arguments))]
fn execute_compose_command(config: &Config, arguments: &ArgumentArgs) -> anyhow::Result<()> {
    let command = build_command(config, arguments)?;
    println!("{}", command.command_line());
    Ok(())
}

/// Execute the run command
#[instrument(skip(config, arguments))]
fn execute_run_command(config: &Config, arguments: &ArgumentArgs) -> anyhow::Result<()> {
    let mut command = build_command(config, arguments)?;
    let line = command.command_line();
    info!("Running: {}", line);

    let failed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&failed);
    command.on_error(move |_| flag.store(true, Ordering::SeqCst));

    if config.stream {
        let mut writer = ChunkWriter::new(io::stdout().lock());
        command
            .exec_streaming(|chunk| writer.write_chunk(&chunk))
            .with_context(|| format!("Failed to run {line}"))?;
        writer.finish().context("Failed to write output")?;
    } else {
        let output = command
            .exec()
            .with_context(|| format!("Failed to run {line}"))?;
        print!("{output}");
    }

    if failed.load(Ordering::SeqCst) {
        bail!("{line} exited with an error");
    }

    info!("Run completed successfully");
    Ok(())
}

/// Writes streamed chunks as they arrive, keeping the first write error.
///
/// Once a write fails, later chunks are dropped so the run can finish.
struct ChunkWriter<W: Write> {
    inner: W,
    error: Option<io::Error>,
}

impl<W: Write> ChunkWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, error: None }
    }

    fn write_chunk(&mut self, chunk: &str) {
        if self.error.is_some() {
            return;
        }
        let result = self
            .inner
            .write_all(chunk.as_bytes())
            .and_then(|()| self.inner.flush());
        if let Err(e) = result {
            debug!("Dropping streamed output after write error: {}", e);
            self.error = Some(e);
        }
    }

    fn finish(self) -> io::Result<()> {
        self.error.map_or(Ok(()), Err)
    }
}

/// Execute the help command
#[instrument(skip(config))]
fn execute_help_command(config: &Config) -> anyhow::Result<()> {
    let definition: Definition = config.definition()?;
    let help = definition
        .help()
        .with_context(|| format!("Failed to fetch help for {}", definition.binary()))?;

    for line in help.iter() {
        println!("{line}");
    }
    Ok(())
}

/// Execute the safe-args command
#[instrument(skip(config))]
fn execute_safe_args_command(config: &Config) -> anyhow::Result<()> {
    let definition: Definition = config.definition()?;
    let tokens = definition.safe_args();

    if tokens.is_empty() {
        info!("No flags found in help text, safe mode would accept everything");
    }
    for token in tokens.sorted() {
        println!("{token}");
    }
    Ok(())
}
