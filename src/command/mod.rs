//! Command side: transcripts in, timer commands out.

pub mod grammar;
pub mod number;
pub mod parser;
pub mod types;

pub use parser::{CommandParser, ParseMode, parse_command};
pub use types::{Command, Interpretation, RuleKind};
