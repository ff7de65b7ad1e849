//! Output parsers
//!
//! A parser turns captured text into the value returned by a run. Streaming
//! runs apply it to every chunk as well.

use crate::error::{CommandError, Result};
use regex::Regex;

/// Transform from captured output to a caller-defined result
pub trait OutputParser: Send + Sync {
    type Output;

    /// Parse `raw`; errors are returned to the caller untouched
    fn parse(&self, raw: &str) -> Result<Self::Output>;
}

/// Identity parser: hands back the captured text unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct RawText;

impl OutputParser for RawText {
    type Output = String;

    fn parse(&self, raw: &str) -> Result<String> {
        Ok(raw.to_string())
    }
}

/// Keeps the first capture group of `pattern` on each line and drops lines
/// that do not match
#[derive(Debug, Clone)]
pub struct LineCapture {
    pattern: Regex,
}

impl LineCapture {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| CommandError::config(format!("Invalid capture pattern: {pattern}"), e))?;
        if pattern.captures_len() < 2 {
            return Err(CommandError::validation(format!(
                "Capture pattern needs a group: {pattern}"
            )));
        }
        Ok(Self { pattern })
    }
}

impl OutputParser for LineCapture {
    type Output = Vec<String>;

    fn parse(&self, raw: &str) -> Result<Vec<String>> {
        Ok(raw
            .lines()
            .filter_map(|line| self.pattern.captures(line))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect())
    }
}
