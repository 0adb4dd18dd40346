//! kitchen-timer - Voice commands for kitchen timers
//!
//! Aggregates a speech engine's event feed into per-utterance phrase streams
//! and maps finished utterances to timer commands.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod command;
pub mod config;
pub mod defaults;
pub mod error;
pub mod output;
pub mod speech;
pub mod voice;

// Speech side (engine → aggregator)
pub use speech::aggregator::{AggregatorConfig, PhraseStream, SpeechAggregator, StopHandle};
pub use speech::engine::{EventSink, LineEngine, RecognitionEngine, ScriptedEngine};
pub use speech::types::{Phrase, RecognitionEvent, RecognitionResult};

// Command side (transcript → command)
pub use command::parser::{CommandParser, ParseMode, parse_command};
pub use command::types::{Command, Interpretation, RuleKind};

// Glue
pub use voice::{VoiceEvent, heard_commands, voice_events};

// Error handling
pub use error::{Result, TimerVoiceError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.0+abc1234"` when git hash is available, `"0.3.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
