//! Safe-mode whitelist
//!
//! The whitelist is either scanned out of a tool's help text or supplied by a
//! generator. An empty whitelist lets everything through: a help format we
//! cannot read must not block legitimate flags.

use crate::error::{CommandError, Result};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Set of flag tokens accepted while safe mode is active
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeTokens {
    tokens: HashSet<String>,
}

impl SafeTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `flag` may be inserted; always true for an empty set
    pub fn allows(&self, flag: &str) -> bool {
        self.tokens.is_empty() || self.tokens.contains(flag)
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.tokens.contains(flag)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in lexical order
    pub fn sorted(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.tokens.iter().map(String::as_str).collect();
        tokens.sort_unstable();
        tokens
    }
}

/// Extracts flag tokens from help text lines
pub struct HelpScanner {
    /// One or two dashes, a word, then a non-word terminator
    re_flag: Regex,
}

impl HelpScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            re_flag: Regex::new(r"(-{1,2}[\w-]+)\W")
                .map_err(|e| CommandError::config("Failed to compile flag pattern", e))?,
        })
    }

    /// Collect every flag mentioned in `lines`
    pub fn scan<S: AsRef<str>>(&self, lines: &[S]) -> SafeTokens {
        let tokens: HashSet<String> = lines
            .iter()
            .flat_map(|line| self.re_flag.captures_iter(line.as_ref()))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect();

        debug!("Scanned {} help lines, found {} flags", lines.len(), tokens.len());
        SafeTokens { tokens }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELP: &[&str] = &[
        "Usage: curl [options...] <url>",
        "-d, --data <data>          HTTP POST data",
        "-X, --request <method>     Specify request method to use",
        "    --url <url>            URL to work with",
    ];

    #[test]
    fn test_scan_short_and_long_flags() {
        let tokens = HelpScanner::new().unwrap().scan(HELP);

        for flag in ["-d", "--data", "-X", "--request", "--url"] {
            assert!(tokens.contains(flag), "missing {flag}");
        }
        assert!(!tokens.contains("--fake-arg"));
    }

    #[test]
    fn test_scan_deduplicates() {
        let lines = ["-c count", "-c, --count stop after count"];
        let tokens = HelpScanner::new().unwrap().scan(&lines);

        assert_eq!(tokens.sorted(), vec!["--count", "-c"]);
    }

    #[test]
    fn test_unparseable_help_is_empty() {
        let tokens = HelpScanner::new().unwrap().scan(&["ffmpeg help broken"]);
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_empty_set_fails_open() {
        let tokens = SafeTokens::default();
        assert!(tokens.allows("--anything"));
    }

    #[test]
    fn test_explicit_whitelist() {
        let tokens = SafeTokens::new(["-c"]);
        assert!(tokens.allows("-c"));
        assert!(!tokens.allows("--nope"));
    }
}
