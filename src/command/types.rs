//! Parsed timer commands and parse outcomes.

use crate::command::number::format_duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which grammar rule produced a command.
///
/// Declaration order is the evaluation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Create,
    Start,
    Stop,
    Help,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Create => "create",
            RuleKind::Start => "start",
            RuleKind::Stop => "stop",
            RuleKind::Help => "help",
        };
        f.write_str(name)
    }
}

/// A timer command understood from a transcript.
///
/// Names are stored exactly as captured from the transcript. A missing
/// name on `Start`/`Stop` (or an empty one on `Create`) means the command
/// applies to the most recently targeted timer, which the consumer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    /// New timer; `duration_seconds` is always greater than zero.
    Create { name: String, duration_seconds: u32 },
    Start { name: Option<String> },
    Stop { name: Option<String> },
    Help,
}

impl Command {
    pub fn kind(&self) -> RuleKind {
        match self {
            Command::Create { .. } => RuleKind::Create,
            Command::Start { .. } => RuleKind::Start,
            Command::Stop { .. } => RuleKind::Stop,
            Command::Help => RuleKind::Help,
        }
    }

    /// Target or new timer name, if one was spoken.
    pub fn name(&self) -> Option<&str> {
        match self {
            Command::Create { name, .. } if !name.is_empty() => Some(name),
            Command::Start { name } | Command::Stop { name } => name.as_deref(),
            _ => None,
        }
    }

    /// Name with its first letter upper-cased, for display.
    pub fn display_name(&self) -> Option<String> {
        self.name().map(capitalize)
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            Command::Create {
                duration_seconds, ..
            } => Some(Duration::from_secs(u64::from(*duration_seconds))),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Create {
                duration_seconds, ..
            } => {
                write!(f, "create {} timer", format_duration(*duration_seconds))?;
                if let Some(name) = self.display_name() {
                    write!(f, " for {name}")?;
                }
                Ok(())
            }
            Command::Start { .. } | Command::Stop { .. } => {
                write!(f, "{}", self.kind())?;
                match self.display_name() {
                    Some(name) => write!(f, " {name}"),
                    None => f.write_str(" latest timer"),
                }
            }
            Command::Help => f.write_str("help"),
        }
    }
}

/// Upper-case the first character, leaving the rest untouched.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Outcome of parsing one phrase's ranked alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Interpretation {
    /// An alternative matched a grammar rule.
    Matched {
        command: Command,
        /// The alternative that matched, as heard.
        transcript: String,
        /// Position of that alternative in the ranking, 0 = best.
        rank: usize,
        rule: RuleKind,
    },
    /// Nothing matched; not an error, most ambient speech ends here.
    NoMatch { heard: Vec<String> },
}

impl Interpretation {
    pub fn command(&self) -> Option<&Command> {
        match self {
            Interpretation::Matched { command, .. } => Some(command),
            Interpretation::NoMatch { .. } => None,
        }
    }

    pub fn into_command(self) -> Option<Command> {
        match self {
            Interpretation::Matched { command, .. } => Some(command),
            Interpretation::NoMatch { .. } => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Interpretation::Matched { .. })
    }
}
