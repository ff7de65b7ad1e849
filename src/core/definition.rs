//! Command definitions
//!
//! A [`Definition`] describes one external tool: where its binary lives, how
//! logical names map to flags, how long a run may take and which flags are
//! allowed in safe mode. It is shared behind an `Arc` by every [`Command`]
//! built from it, so all setters take `&self`.
//!
//! [`Command`]: crate::core::Command

use crate::{
    core::{
        arguments::ArgumentList,
        parser::{OutputParser, RawText},
        safe_mode::{HelpScanner, SafeTokens},
    },
    error::{CommandError, Result},
    utils::{
        naming::canonicalize,
        process::{ProcessRunner, RunOptions},
    },
};
use std::collections::HashMap;
use std::fmt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Help flag used when none is configured
pub const DEFAULT_HELP_FLAG: &str = "--help";

/// Expansion evaluated against the arguments already present
pub type AliasFn = Arc<dyn Fn(&ArgumentList) -> String + Send + Sync>;

/// Whitelist generator registered on a definition
pub type SafeArgsFn<P> = Arc<dyn Fn(&Definition<P>) -> Result<Vec<String>> + Send + Sync>;

/// What a logical argument name expands to
#[derive(Clone)]
pub enum Alias {
    /// Fixed flag text, possibly several space-separated flags (`"-a -h"`)
    Literal(String),
    /// Flag text computed from the current argument list
    Computed(AliasFn),
}

impl Alias {
    /// Alias to several independent flags rendered in order
    pub fn sequence<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let flags: Vec<String> = flags.into_iter().map(|f| f.as_ref().to_string()).collect();
        Self::Literal(flags.join(" "))
    }

    pub fn computed<F>(expand: F) -> Self
    where
        F: Fn(&ArgumentList) -> String + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(expand))
    }

    /// Flag token this alias stands for given `args`
    pub fn token(&self, args: &ArgumentList) -> String {
        match self {
            Self::Literal(flag) => flag.clone(),
            Self::Computed(expand) => expand(args),
        }
    }
}

impl From<&str> for Alias {
    fn from(flag: &str) -> Self {
        Self::Literal(flag.to_string())
    }
}

impl From<String> for Alias {
    fn from(flag: String) -> Self {
        Self::Literal(flag)
    }
}

impl fmt::Debug for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(flag) => f.debug_tuple("Literal").field(flag).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Hooks run after every finished process, before the result is returned
pub trait RunHooks: Send + Sync {
    fn after_success(&self, _status: &ExitStatus, _output: &str) {}
    fn after_error(&self, _status: &ExitStatus, _output: &str) {}
}

struct NoHooks;

impl RunHooks for NoHooks {}

#[derive(Debug, Clone)]
struct Settings {
    binary: Option<String>,
    timeout: Option<Duration>,
    no_double_dash: bool,
    safe_mode: bool,
    verbose: bool,
    help_flag: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            binary: None,
            timeout: None,
            no_double_dash: false,
            safe_mode: false,
            verbose: false,
            help_flag: DEFAULT_HELP_FLAG.to_string(),
        }
    }
}

/// Reusable configuration for one external binary
pub struct Definition<P = RawText> {
    name: String,
    parser: P,
    settings: RwLock<Settings>,
    aliases: RwLock<HashMap<String, Alias>>,
    hooks: RwLock<Arc<dyn RunHooks>>,
    safe_args_source: RwLock<Option<SafeArgsFn<P>>>,
    // Cached results. A warm read takes a shared lock and clones the `Arc`;
    // readers never block each other, only a concurrent `reset_caches` or fill.
    help: RwLock<Option<Arc<Vec<String>>>>,
    safe_tokens: RwLock<Option<Arc<SafeTokens>>>,
    // Separate locks so a whitelist generator may call `help()`.
    help_fill: Mutex<()>,
    safe_fill: Mutex<()>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Definition<RawText> {
    /// Create a definition whose runs return the raw captured text
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_parser(name, RawText)
    }
}

impl<P: OutputParser> Definition<P> {
    /// Create a definition with a custom output parser
    pub fn with_parser(name: impl Into<String>, parser: P) -> Self {
        Self {
            name: name.into(),
            parser,
            settings: RwLock::new(Settings::default()),
            aliases: RwLock::new(HashMap::new()),
            hooks: RwLock::new(Arc::new(NoHooks)),
            safe_args_source: RwLock::new(None),
            help: RwLock::new(None),
            safe_tokens: RwLock::new(None),
            help_fill: Mutex::new(()),
            safe_fill: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Override the binary path; the last call wins
    pub fn set_binary(&self, path: impl Into<String>) -> &Self {
        write(&self.settings).binary = Some(path.into());
        self
    }

    /// Binary to invoke, defaulting to the lowercased definition name
    pub fn binary(&self) -> String {
        read(&self.settings)
            .binary
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    /// Bound every run by `timeout`
    pub fn set_timeout(&self, timeout: Duration) -> Result<&Self> {
        if timeout.is_zero() {
            return Err(CommandError::validation("timeout must be positive"));
        }
        write(&self.settings).timeout = Some(timeout);
        Ok(self)
    }

    pub fn clear_timeout(&self) -> &Self {
        write(&self.settings).timeout = None;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        read(&self.settings).timeout
    }

    /// Keep long names single-dashed (`-vcodec` rather than `--vcodec`)
    pub fn suppress_double_dash(&self) -> &Self {
        write(&self.settings).no_double_dash = true;
        self
    }

    pub fn no_double_dash(&self) -> bool {
        read(&self.settings).no_double_dash
    }

    /// Gate every insertion through the safe-token whitelist
    pub fn set_safe_mode(&self, enabled: bool) -> &Self {
        write(&self.settings).safe_mode = enabled;
        self
    }

    pub fn safe_mode(&self) -> bool {
        read(&self.settings).safe_mode
    }

    /// Log every composed line at info level instead of debug
    pub fn set_verbose(&self, verbose: bool) -> &Self {
        write(&self.settings).verbose = verbose;
        self
    }

    pub fn verbose(&self) -> bool {
        read(&self.settings).verbose
    }

    pub fn set_help_flag(&self, flag: impl Into<String>) -> &Self {
        write(&self.settings).help_flag = flag.into();
        self
    }

    pub fn help_flag(&self) -> String {
        read(&self.settings).help_flag.clone()
    }

    /// Register or replace an alias
    pub fn define_alias(&self, name: impl Into<String>, alias: impl Into<Alias>) -> &Self {
        write(&self.aliases).insert(name.into(), alias.into());
        self
    }

    pub fn alias(&self, name: &str) -> Option<Alias> {
        read(&self.aliases).get(name).cloned()
    }

    /// Replace the post-run hooks
    pub fn set_hooks(&self, hooks: impl RunHooks + 'static) -> &Self {
        *write(&self.hooks) = Arc::new(hooks);
        self
    }

    pub fn hooks(&self) -> Arc<dyn RunHooks> {
        Arc::clone(&*read(&self.hooks))
    }

    /// Register the generator `safe_args` uses instead of scanning help text
    pub fn set_safe_args_source<F>(&self, source: F) -> &Self
    where
        F: Fn(&Definition<P>) -> Result<Vec<String>> + Send + Sync + 'static,
    {
        *write(&self.safe_args_source) = Some(Arc::new(source));
        self
    }

    /// Flag token for a logical name: its alias if one exists, else the
    /// generic naming rule
    pub fn resolve(&self, name: &str, args: &ArgumentList) -> String {
        let alias = read(&self.aliases).get(name).cloned();
        match alias {
            Some(alias) => alias.token(args),
            None => canonicalize(name, self.no_double_dash()),
        }
    }

    /// Help text of the binary, fetched once with the configured help flag
    pub fn help(&self) -> Result<Arc<Vec<String>>> {
        self.help_with(&self.help_flag())
    }

    /// Help text of the binary, fetched once with `help_flag`.
    ///
    /// An empty cached result counts as missing and is fetched again.
    #[instrument(skip(self), fields(definition = %self.name))]
    pub fn help_with(&self, help_flag: &str) -> Result<Arc<Vec<String>>> {
        if let Some(lines) = self.cached_help() {
            return Ok(lines);
        }

        let _fill = self.help_fill.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lines) = self.cached_help() {
            return Ok(lines);
        }

        let line = format!("{} {}", self.binary(), help_flag);
        let options = RunOptions {
            timeout: self.timeout(),
            ..RunOptions::default()
        };
        let result = ProcessRunner::new(self.verbose()).run_shell_with_output(&line, &options)?;

        let lines: Arc<Vec<String>> =
            Arc::new(result.output.lines().map(|l| l.trim().to_string()).collect());
        debug!("Cached {} help lines", lines.len());
        *write(&self.help) = Some(Arc::clone(&lines));
        Ok(lines)
    }

    /// Seed the help cache without running the binary
    pub fn set_help<I, S>(&self, lines: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *write(&self.help) = Some(Arc::new(lines.into_iter().map(Into::into).collect()));
        self
    }

    fn cached_help(&self) -> Option<Arc<Vec<String>>> {
        read(&self.help)
            .as_ref()
            .filter(|lines| !lines.is_empty())
            .cloned()
    }

    /// Whitelist of flags accepted in safe mode, computed once.
    ///
    /// Uses the registered generator if any, otherwise scans the help text.
    /// Any failure along the way yields an empty set, which disables the gate.
    /// Once filled, every call hands out the same shared set until
    /// [`reset_caches`](Self::reset_caches).
    pub fn safe_args(&self) -> Arc<SafeTokens> {
        let source = read(&self.safe_args_source).clone();
        self.fill_safe_args(|definition| match source {
            Some(source) => source(definition).map(SafeTokens::new),
            None => {
                let help = definition.help()?;
                Ok(HelpScanner::new()?.scan(help.as_slice()))
            }
        })
    }

    /// Like [`safe_args`](Self::safe_args), but a missing cache is filled from
    /// `source` verbatim
    pub fn safe_args_with<F>(&self, source: F) -> Arc<SafeTokens>
    where
        F: FnOnce(&Definition<P>) -> Result<Vec<String>>,
    {
        self.fill_safe_args(|definition| source(definition).map(SafeTokens::new))
    }

    fn fill_safe_args<F>(&self, derive: F) -> Arc<SafeTokens>
    where
        F: FnOnce(&Definition<P>) -> Result<SafeTokens>,
    {
        if let Some(tokens) = read(&self.safe_tokens).clone() {
            return tokens;
        }

        let _fill = self.safe_fill.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tokens) = read(&self.safe_tokens).clone() {
            return tokens;
        }

        let tokens = match derive(self) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Safe arguments unavailable for {}, safe mode is open: {}", self.name, e);
                SafeTokens::default()
            }
        };
        if tokens.is_empty() {
            debug!("No safe arguments found for {}", self.name);
        }

        let tokens = Arc::new(tokens);
        *write(&self.safe_tokens) = Some(Arc::clone(&tokens));
        tokens
    }

    /// Forget cached help text and safe tokens
    pub fn reset_caches(&self) -> &Self {
        *write(&self.help) = None;
        *write(&self.safe_tokens) = None;
        self
    }
}

impl<P> fmt::Debug for Definition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("settings", &*read(&self.settings))
            .field("aliases", &*read(&self.aliases))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_binary_is_lowercase_name() {
        let definition = Definition::new("FFMpeg");
        assert_eq!(definition.binary(), "ffmpeg");

        definition.set_binary("/usr/local/bin/ffmpeg");
        assert_eq!(definition.binary(), "/usr/local/bin/ffmpeg");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let definition = Definition::new("ping");
        assert!(definition.set_timeout(Duration::ZERO).is_err());
        assert_eq!(definition.timeout(), None);

        definition.set_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(definition.timeout(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_resolve_alias_and_fallback() {
        let definition = Definition::new("ls");
        definition
            .define_alias("all", "-a")
            .define_alias("full", Alias::sequence(["-a", "-h"]));
        let args = ArgumentList::new();

        assert_eq!(definition.resolve("all", &args), "-a");
        assert_eq!(definition.resolve("full", &args), "-a -h");
        assert_eq!(definition.resolve("color_test", &args), "--color-test");

        definition.suppress_double_dash();
        assert_eq!(definition.resolve("vcodec", &args), "-vcodec");
    }

    #[test]
    fn test_computed_alias_sees_current_args() {
        let definition = Definition::new("ls");
        definition.define_alias(
            "listing",
            Alias::computed(|args| {
                if args.contains("-a") {
                    "-l".to_string()
                } else {
                    "-a -l".to_string()
                }
            }),
        );

        let mut args = ArgumentList::new();
        assert_eq!(definition.resolve("listing", &args), "-a -l");
        args.push(crate::core::ArgEntry::new("-a", None));
        assert_eq!(definition.resolve("listing", &args), "-l");
    }

    #[test]
    fn test_safe_args_from_source_cached_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let definition = Definition::new("ping");
        definition.set_safe_args_source(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["-c".to_string()])
        });

        assert!(definition.safe_args().contains("-c"));
        assert_eq!(definition.safe_args().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        definition.reset_caches();
        definition.safe_args();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_safe_args_concurrent_callers_fill_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let definition = Arc::new(Definition::new("ping"));
        definition.set_safe_args_source(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(vec!["-c".to_string(), "-i".to_string()])
        });

        let results: Vec<Arc<SafeTokens>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| definition.safe_args()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|tokens| Arc::ptr_eq(tokens, &results[0])));
        assert_eq!(results[0].len(), 2);
    }

    #[test]
    fn test_warm_safe_args_share_one_set() {
        let definition = Definition::new("curl");
        definition.set_help(["    --url <url>"]);

        let first = definition.safe_args();
        let second = definition.safe_args();
        assert!(Arc::ptr_eq(&first, &second));

        definition.reset_caches();
        definition.set_help(["    --url <url>"]);
        assert!(!Arc::ptr_eq(&first, &definition.safe_args()));
    }

    #[test]
    fn test_safe_args_from_seeded_help() {
        let definition = Definition::new("curl");
        definition.set_help(["-d, --data <data>  HTTP POST data", "    --url <url>"]);

        let tokens = definition.safe_args();
        assert!(tokens.contains("--data"));
        assert!(tokens.contains("--url"));
    }

    #[test]
    fn test_safe_args_fail_open_on_generator_error() {
        let definition = Definition::new("ls");
        definition.set_safe_args_source(|_| Err(CommandError::parser("no usage line")));

        assert!(definition.safe_args().is_empty());
        assert!(definition.safe_args().allows("--anything"));
    }

    #[test]
    fn test_safe_args_fail_open_on_missing_binary() {
        let definition = Definition::new("nonexistent_command_12345");
        assert!(definition.safe_args().is_empty());
    }

    #[test]
    fn test_safe_args_with_only_fills_empty_cache() {
        let definition = Definition::new("ping");
        let first = definition.safe_args_with(|_| Ok(vec!["-c".to_string()]));
        let second = definition.safe_args_with(|_| Ok(vec!["-W".to_string()]));

        assert!(first.contains("-c"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_help_is_fetched_and_trimmed() {
        let definition = Definition::new("echo");
        let help = definition.help_with("  usage line").unwrap();
        assert_eq!(help.as_slice(), ["usage line"]);

        // Cached: a different flag is not run again.
        let again = definition.help_with("other").unwrap();
        assert!(Arc::ptr_eq(&help, &again));
    }

    #[test]
    fn test_help_missing_binary_fails() {
        let definition = Definition::new("nonexistent_command_12345");
        assert!(matches!(
            definition.help(),
            Err(CommandError::Execution { .. })
        ));
    }
}
