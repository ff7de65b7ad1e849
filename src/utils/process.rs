//! Process execution utilities
//!
//! Runs a composed command line through `sh -c` with stderr merged into
//! stdout, streaming output in separator-delimited chunks and enforcing an
//! optional deadline.

use crate::error::{CommandError, Result};
use std::io::{self, BufRead, BufReader};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Default chunk separator, matching progress-style output of most tools
pub const DEFAULT_SEPARATOR: u8 = b'\r';

const WAIT_POLL: Duration = Duration::from_millis(10);

/// How long a timed-out process group gets between SIGTERM and SIGKILL
#[cfg(unix)]
const TERM_GRACE: Duration = Duration::from_millis(100);

/// Succeeds when `$1` names something the shell can start: an executable
/// file for paths, otherwise anything `command -v` resolves.
const LOCATE_SCRIPT: &str =
    r#"case "$1" in */*) [ -f "$1" ] && [ -x "$1" ] ;; *) command -v "$1" >/dev/null 2>&1 ;; esac"#;

/// Utility for running composed command lines
#[derive(Debug, Clone, Copy)]
pub struct ProcessRunner {
    verbose: bool,
}

/// Per-run settings
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Deadline for the whole run; `None` waits forever
    pub timeout: Option<Duration>,
    /// Byte that ends a streamed chunk
    pub separator: u8,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            separator: DEFAULT_SEPARATOR,
        }
    }
}

/// Result of a finished process
#[derive(Debug)]
pub struct ProcessResult {
    /// Exit status reported by the OS
    pub status: ExitStatus,
    /// Everything the process wrote to stdout and stderr, in order
    pub output: String,
}

impl ProcessResult {
    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

impl ProcessRunner {
    /// Create a new process runner
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run a command line, feeding each output chunk to `on_chunk` as it arrives.
    ///
    /// A chunk is everything up to and including `options.separator`, or the
    /// trailing bytes before EOF. An error from `on_chunk` kills the child and
    /// is returned unchanged.
    #[instrument(skip(self, options, on_chunk))]
    pub fn run_shell<F>(&self, line: &str, options: &RunOptions, mut on_chunk: F) -> Result<ProcessResult>
    where
        F: FnMut(&str) -> Result<()>,
    {
        if self.verbose {
            info!("+ {} (timeout: {:?})", line, options.timeout);
        } else {
            debug!("Running command: {}", line);
        }

        if let Some(program) = line.split_whitespace().next() {
            Self::ensure_available(line, program)?;
        }

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("exec {line} 2>&1"))
            .stdout(Stdio::piped());
        // Own process group, so a timeout can take down everything the tool started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| CommandError::execution(line, e))?;

        let reader = child.stdout.take().ok_or_else(|| {
            CommandError::execution(line, io::Error::other("stdout was not captured"))
        })?;

        let separator = options.separator;
        let (tx, rx) = mpsc::channel::<io::Result<Vec<u8>>>();
        thread::spawn(move || {
            let mut reader = BufReader::new(reader);
            loop {
                let mut chunk = Vec::new();
                match reader.read_until(separator, &mut chunk) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(Ok(chunk)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        });

        let deadline = options.timeout.map(|t| (Instant::now() + t, t));
        let mut output = String::new();

        loop {
            let received = match deadline {
                Some((at, timeout)) => {
                    match rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                        Ok(received) => received,
                        Err(RecvTimeoutError::Timeout) => {
                            return Err(Self::timed_out(&mut child, line, timeout));
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(received) => received,
                    Err(_) => break,
                },
            };

            let chunk = match received {
                Ok(chunk) => chunk,
                Err(e) => {
                    Self::terminate(&mut child);
                    return Err(CommandError::execution(line, e));
                }
            };

            let text = String::from_utf8_lossy(&chunk);
            output.push_str(&text);
            if let Err(e) = on_chunk(&text) {
                Self::terminate(&mut child);
                return Err(e);
            }
        }

        let status = match deadline {
            Some((at, timeout)) => Self::wait_until(&mut child, line, at, timeout)?,
            None => child.wait().map_err(|e| CommandError::execution(line, e))?,
        };

        debug!(
            "Command finished: success={}, exit_code={:?}, output_len={}",
            status.success(),
            status.code(),
            output.len()
        );

        Ok(ProcessResult { status, output })
    }

    /// Run a command line and return its combined output without streaming
    pub fn run_shell_with_output(&self, line: &str, options: &RunOptions) -> Result<ProcessResult> {
        self.run_shell(line, options, |_| Ok(()))
    }

    /// Fail with an execution error when `program` cannot be started
    fn ensure_available(line: &str, program: &str) -> Result<()> {
        let status = Command::new("sh")
            .args(["-c", LOCATE_SCRIPT, "sh", program])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| CommandError::execution(line, e))?;

        if status.success() {
            return Ok(());
        }

        debug!("Program not found or not executable: {}", program);
        Err(CommandError::execution(
            line,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: not found or not executable"),
            ),
        ))
    }

    fn wait_until(
        child: &mut Child,
        line: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<ExitStatus> {
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| CommandError::execution(line, e))?
            {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(Self::timed_out(child, line, timeout));
            }
            thread::sleep(WAIT_POLL);
        }
    }

    fn timed_out(child: &mut Child, line: &str, timeout: Duration) -> CommandError {
        warn!("Command exceeded {:?}, killing process {}", timeout, child.id());
        Self::terminate(child);
        CommandError::timeout(line, timeout)
    }

    fn terminate(child: &mut Child) {
        #[cfg(unix)]
        Self::terminate_group(child);

        if let Err(e) = child.kill() {
            debug!("Kill failed for process {}: {}", child.id(), e);
        }
        if let Err(e) = child.wait() {
            debug!("Reap failed for process {}: {}", child.id(), e);
        }
    }

    /// SIGTERM the child's process group, then SIGKILL whatever is left
    #[cfg(unix)]
    fn terminate_group(child: &mut Child) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(child.id()) else {
            return;
        };
        let pgid = Pid::from_raw(raw);

        if let Err(e) = killpg(pgid, Signal::SIGTERM) {
            debug!("SIGTERM failed for process group {}: {}", raw, e);
            return;
        }

        let grace = Instant::now() + TERM_GRACE;
        while Instant::now() < grace {
            if matches!(child.try_wait(), Ok(Some(_))) {
                break;
            }
            thread::sleep(WAIT_POLL);
        }

        // The leader may be gone while the rest of its group lingers.
        if let Err(e) = killpg(pgid, Signal::SIGKILL) {
            debug!("SIGKILL skipped for process group {}: {}", raw, e);
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(false)
    }
}
