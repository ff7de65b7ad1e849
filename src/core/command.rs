//! Command composition and execution
//!
//! A [`Command`] owns an ordered argument list built against a shared
//! [`Definition`] and runs the composed line as a subprocess.
//!
//! Two insertions are silently skipped rather than reported: a flag rejected
//! by the safe-mode whitelist, and a positional insert whose anchor is not in
//! the list. Callers may therefore probe flags a tool might not support.

use crate::{
    core::{
        arguments::{ArgEntry, ArgumentList, Position},
        definition::Definition,
        parser::{OutputParser, RawText},
        safe_mode::SafeTokens,
    },
    error::Result,
    utils::{
        naming::{quote, unquote},
        process::{DEFAULT_SEPARATOR, ProcessResult, ProcessRunner, RunOptions},
    },
};
use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

type OutputCallback = Box<dyn FnMut(&str) + Send>;

/// Per-call insertion options
#[derive(Debug, Clone, Default)]
pub struct ArgOptions {
    position: Option<Position>,
    uniq: bool,
    safe: bool,
    safe_tokens: Option<Arc<SafeTokens>>,
}

impl ArgOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert in front of the first entry for `anchor`
    pub fn before(mut self, anchor: impl Into<String>) -> Self {
        self.position = Some(Position::Before(anchor.into()));
        self
    }

    /// Insert right behind the first entry for `anchor`
    pub fn after(mut self, anchor: impl Into<String>) -> Self {
        self.position = Some(Position::After(anchor.into()));
        self
    }

    /// Drop the earlier entry for the same flag once this one is inserted
    pub fn uniq(mut self) -> Self {
        self.uniq = true;
        self
    }

    /// Gate this insertion even when the definition is not in safe mode
    pub fn safe(mut self) -> Self {
        self.safe = true;
        self
    }

    /// Gate this insertion against `tokens` instead of the definition's whitelist
    pub fn safe_with(mut self, tokens: SafeTokens) -> Self {
        self.safe = true;
        self.safe_tokens = Some(Arc::new(tokens));
        self
    }
}

/// Join a binary and its rendered arguments into one command line
pub fn compose(binary: &str, args: &ArgumentList) -> String {
    format!("{} {}", binary, args.render().unwrap_or_default())
        .trim()
        .to_string()
}

/// One composed invocation of a [`Definition`]
pub struct Command<P: OutputParser = RawText> {
    definition: Arc<Definition<P>>,
    args: ArgumentList,
    separator: u8,
    on_success: Option<OutputCallback>,
    on_error: Option<OutputCallback>,
}

impl<P: OutputParser> Command<P> {
    /// Create an empty command for `definition`
    pub fn new(definition: &Arc<Definition<P>>) -> Self {
        Self {
            definition: Arc::clone(definition),
            args: ArgumentList::new(),
            separator: DEFAULT_SEPARATOR,
            on_success: None,
            on_error: None,
        }
    }

    pub fn definition(&self) -> &Definition<P> {
        &self.definition
    }

    pub fn args(&self) -> &ArgumentList {
        &self.args
    }

    /// Add a flag without a value
    pub fn flag(&mut self, name: &str) -> &mut Self {
        self.set(name, None, ArgOptions::default())
    }

    /// Add a flag followed by a quoted value
    pub fn arg(&mut self, name: &str, value: impl AsRef<str>) -> &mut Self {
        self.set(name, Some(value.as_ref()), ArgOptions::default())
    }

    /// General insertion entry point behind [`flag`](Self::flag) and [`arg`](Self::arg)
    pub fn set(&mut self, name: &str, value: Option<&str>, options: ArgOptions) -> &mut Self {
        let token = self.definition.resolve(name, &self.args);

        if (self.definition.safe_mode() || options.safe) && !self.is_safe(&token, &options) {
            debug!("Safe mode dropped {}", token);
            return self;
        }

        let prior = if options.uniq {
            self.args.position(&token)
        } else {
            None
        };
        let entry = ArgEntry::new(token, value.map(quote));

        let inserted = match &options.position {
            None => Some(self.args.push(entry)),
            Some(position) => {
                let anchor = self.definition.resolve(position.anchor(), &self.args);
                let after = matches!(position, Position::After(_));
                let index = self.args.insert_at(entry, &anchor, after);
                if index.is_none() {
                    debug!("Anchor {} not found, dropped {}", anchor, name);
                }
                index
            }
        };

        if let (Some(new), Some(old)) = (inserted, prior) {
            let old = if old >= new { old + 1 } else { old };
            self.args.remove_index(old);
        }
        self
    }

    // Call-level whitelist first, then the definition's.
    fn is_safe(&self, token: &str, options: &ArgOptions) -> bool {
        match &options.safe_tokens {
            Some(tokens) => tokens.allows(token),
            None => self.definition.safe_args().allows(token),
        }
    }

    /// Append a literal token, bypassing naming, quoting and safe mode
    pub fn raw(&mut self, token: impl Into<String>) -> &mut Self {
        self.args.push(ArgEntry::new(token, None));
        self
    }

    /// Remove every entry for each logical name
    pub fn remove(&mut self, names: &[&str]) -> &mut Self {
        for name in names {
            let token = self.definition.resolve(name, &self.args);
            let removed = self.args.remove_all(&token);
            debug!("Removed {} entries for {}", removed, token);
        }
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.args.clear();
        self
    }

    /// Value of the first entry for `name`, without its quotes
    pub fn value_of(&self, name: &str) -> Option<&str> {
        let token = self.definition.resolve(name, &self.args);
        self.args.find(&token)?.value().map(unquote)
    }

    /// The literal line that [`exec`](Self::exec) runs
    pub fn command_line(&self) -> String {
        compose(&self.definition.binary(), &self.args)
    }

    /// Byte that delimits streamed chunks, `\r` by default
    pub fn chunk_separator(&mut self, separator: u8) -> &mut Self {
        self.separator = separator;
        self
    }

    /// Called with the full output when the process exits with status 0
    pub fn on_success<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Called with the full output when the process exits nonzero
    pub fn on_error<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Run the command and parse its full output.
    ///
    /// A nonzero exit still returns the parsed output; it is reported through
    /// the error callback and the definition's hooks.
    #[instrument(skip(self), fields(definition = %self.definition.name()))]
    pub fn exec(&mut self) -> Result<P::Output> {
        let result = self.run(|_| Ok(()))?;
        self.definition.parser().parse(&result.output)
    }

    /// Run the command, handing each parsed chunk to `on_output` as it arrives,
    /// and return the exit status
    #[instrument(skip(self, on_output), fields(definition = %self.definition.name()))]
    pub fn exec_streaming<F>(&mut self, mut on_output: F) -> Result<ExitStatus>
    where
        F: FnMut(P::Output),
    {
        let definition = Arc::clone(&self.definition);
        let result = self.run(|chunk| {
            on_output(definition.parser().parse(chunk)?);
            Ok(())
        })?;
        Ok(result.status)
    }

    fn run<F>(&mut self, on_chunk: F) -> Result<ProcessResult>
    where
        F: FnMut(&str) -> Result<()>,
    {
        let line = self.command_line();
        let options = RunOptions {
            timeout: self.definition.timeout(),
            separator: self.separator,
        };

        let result =
            ProcessRunner::new(self.definition.verbose()).run_shell(&line, &options, on_chunk)?;
        let hooks = self.definition.hooks();

        if result.success() {
            if let Some(callback) = self.on_success.as_mut() {
                callback(&result.output);
            }
            hooks.after_success(&result.status, &result.output);
        } else {
            warn!("{} exited with {:?}", line, result.status.code());
            if let Some(callback) = self.on_error.as_mut() {
                callback(&result.output);
            }
            hooks.after_error(&result.status, &result.output);
        }

        Ok(result)
    }
}

impl<P: OutputParser> fmt::Debug for Command<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("command", &self.command_line())
            .field("timeout", &self.definition.timeout())
            .finish()
    }
}
