//! Core argument model and execution engine
//!
//! Contains command definitions, argument lists, the safe-mode whitelist,
//! output parsers and the command runner built on top of them.

pub mod arguments;
pub mod command;
pub mod definition;
pub mod parser;
pub mod safe_mode;

pub use arguments::{ArgEntry, ArgumentList, Position};
pub use command::{ArgOptions, Command, compose};
pub use definition::{Alias, Definition, RunHooks};
pub use parser::{LineCapture, OutputParser, RawText};
pub use safe_mode::{HelpScanner, SafeTokens};
