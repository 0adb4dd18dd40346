//! Maps finalized phrases to timer commands.

use crate::command::grammar::{GRAMMAR, GrammarRule, Transcript};
use crate::command::types::{Command, Interpretation, RuleKind};
use crate::config::Config;
use crate::error::TimerVoiceError;
use crate::speech::types::Phrase;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How many of a phrase's ranked alternatives are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Only the best alternative.
    Simple,
    /// Every alternative in rank order; the first that matches wins.
    #[default]
    Robust,
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Simple => f.write_str("simple"),
            ParseMode::Robust => f.write_str("robust"),
        }
    }
}

impl FromStr for ParseMode {
    type Err = TimerVoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(ParseMode::Simple),
            "robust" => Ok(ParseMode::Robust),
            other => Err(TimerVoiceError::ConfigInvalidValue {
                key: "parser.mode".to_string(),
                message: format!("expected 'simple' or 'robust', got '{other}'"),
            }),
        }
    }
}

/// Stateless command parser over the timer grammar.
///
/// Parsing is a pure function of the transcript: the same text always
/// yields the same result.
#[derive(Debug, Clone, Copy)]
pub struct CommandParser {
    rules: &'static [GrammarRule],
    mode: ParseMode,
}

impl CommandParser {
    /// Parser over the built-in grammar in robust mode.
    pub fn new() -> Self {
        Self::with_mode(ParseMode::default())
    }

    pub fn with_mode(mode: ParseMode) -> Self {
        Self {
            rules: &GRAMMAR,
            mode,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_mode(config.parser.mode)
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Parse a single transcript. `None` means no rule matched.
    pub fn parse(&self, transcript: &str) -> Option<Command> {
        self.match_rules(transcript).map(|(command, _)| command)
    }

    fn match_rules(&self, transcript: &str) -> Option<(Command, RuleKind)> {
        let transcript = Transcript::new(transcript);
        if transcript.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find_map(|rule| rule.apply(&transcript).map(|command| (command, rule.kind())))
    }

    /// Parse ranked alternatives, best first, according to the parse mode.
    pub fn parse_alternatives<S: AsRef<str>>(&self, alternatives: &[S]) -> Interpretation {
        let tried = match self.mode {
            ParseMode::Simple => alternatives.len().min(1),
            ParseMode::Robust => alternatives.len(),
        };

        for (rank, alternative) in alternatives[..tried].iter().enumerate() {
            let transcript = alternative.as_ref();
            if let Some((command, rule)) = self.match_rules(transcript) {
                debug!(rank, transcript, %rule, "command recognized");
                return Interpretation::Matched {
                    command,
                    transcript: transcript.to_string(),
                    rank,
                    rule,
                };
            }
        }

        debug!(alternatives = alternatives.len(), "no command recognized");
        Interpretation::NoMatch {
            heard: alternatives
                .iter()
                .map(|a| a.as_ref().to_string())
                .collect(),
        }
    }

    pub fn interpret(&self, phrase: &Phrase) -> Interpretation {
        self.parse_alternatives(phrase.alternatives())
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one transcript with the built-in grammar.
pub fn parse_command(transcript: &str) -> Option<Command> {
    CommandParser::new().parse(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minute(n: u32) -> u32 {
        n * 60
    }

    fn created(name: &str, duration_seconds: u32) -> Option<Command> {
        Some(Command::Create {
            name: name.to_string(),
            duration_seconds,
        })
    }

    #[test]
    fn test_create_phrasings() {
        let checks = [
            ("1 minute", created("", minute(1))),
            ("one minute", created("", minute(1))),
            ("2 minutes", created("", minute(2))),
            ("2 minutes and a half", created("", minute(2) + 30)),
            ("2 and a half minutes", created("", minute(2) + 30)),
            ("2 minutes 45 seconds", created("", minute(2) + 45)),
            ("2 minutes and 45 seconds", created("", minute(2) + 45)),
            ("2 minute timer", created("", minute(2))),
            ("new 2 minute timer", created("", minute(2))),
            ("10 minutes for eggs", created("eggs", minute(10))),
            ("10 minutes for the eggs", created("eggs", minute(10))),
        ];

        for (input, expected) in checks {
            assert_eq!(parse_command(input), expected, "parsing {input:?}");
        }
    }

    #[test]
    fn test_minutes_for_each_number() {
        for n in 1..=9 {
            assert_eq!(
                parse_command(&format!("{n} minutes")),
                created("", minute(n))
            );
            assert_eq!(
                parse_command(&format!("{n} minutes and a half")),
                created("", minute(n) + 30)
            );
        }
    }

    #[test]
    fn test_word_and_digit_numbers_are_equivalent() {
        let words = ["one", "two", "three", "four", "five", "six", "seven", "eight", "nine"];
        for (i, word) in words.iter().enumerate() {
            assert_eq!(
                parse_command(&format!("{word} minute")),
                parse_command(&format!("{} minute", i + 1))
            );
        }
    }

    #[test]
    fn test_start_and_stop() {
        assert_eq!(parse_command("start"), Some(Command::Start { name: None }));
        assert_eq!(
            parse_command("start the eggs"),
            Some(Command::Start {
                name: Some("eggs".to_string())
            })
        );
        assert_eq!(parse_command("start eggs"), parse_command("start the eggs"));
        assert_eq!(parse_command("stop"), Some(Command::Stop { name: None }));
        assert_eq!(parse_command("pause"), Some(Command::Stop { name: None }));
        assert_eq!(
            parse_command("stop the eggs"),
            Some(Command::Stop {
                name: Some("eggs".to_string())
            })
        );
    }

    #[test]
    fn test_help_and_no_match() {
        assert_eq!(parse_command("help"), Some(Command::Help));
        assert_eq!(parse_command("help me"), Some(Command::Help));
        assert_eq!(parse_command("foo"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("   "), None);
    }

    #[test]
    fn test_case_folding() {
        assert_eq!(parse_command("START THE Eggs"), parse_command("start the Eggs"));
        assert_eq!(
            parse_command("Ten Minutes For The Eggs"),
            parse_command("ten minutes for the Eggs")
        );
        assert_eq!(parse_command("Help"), Some(Command::Help));
    }

    #[test]
    fn test_name_keeps_heard_casing() {
        assert_eq!(
            parse_command("5 minutes for the Pasta"),
            created("Pasta", minute(5))
        );
    }

    #[test]
    fn test_zero_duration_falls_through() {
        // A create-shaped phrase with no duration must not shadow later rules.
        assert_eq!(parse_command("0 minutes for the eggs"), None);
        assert_eq!(
            parse_command("start the timer"),
            Some(Command::Start { name: None })
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let parser = CommandParser::new();
        let first = parser.parse("2 minutes and 45 seconds for the rice");
        for _ in 0..10 {
            assert_eq!(parser.parse("2 minutes and 45 seconds for the rice"), first);
        }
    }

    #[test]
    fn test_robust_mode_uses_first_matching_alternative() {
        let parser = CommandParser::with_mode(ParseMode::Robust);
        let interpretation = parser.parse_alternatives(&["stark the eggs", "start the eggs"]);

        assert_eq!(
            interpretation,
            Interpretation::Matched {
                command: Command::Start {
                    name: Some("eggs".to_string())
                },
                transcript: "start the eggs".to_string(),
                rank: 1,
                rule: RuleKind::Start,
            }
        );
    }

    #[test]
    fn test_robust_mode_prefers_rank_over_rule_priority() {
        let parser = CommandParser::new();
        let interpretation = parser.parse_alternatives(&["stop", "2 minutes"]);
        assert_eq!(interpretation.command(), Some(&Command::Stop { name: None }));
    }

    #[test]
    fn test_simple_mode_only_tries_best_alternative() {
        let parser = CommandParser::with_mode(ParseMode::Simple);
        let interpretation = parser.parse_alternatives(&["stark the eggs", "start the eggs"]);

        assert_eq!(
            interpretation,
            Interpretation::NoMatch {
                heard: vec!["stark the eggs".to_string(), "start the eggs".to_string()]
            }
        );
    }

    #[test]
    fn test_no_alternatives_is_no_match() {
        let parser = CommandParser::new();
        let interpretation = parser.parse_alternatives::<&str>(&[]);
        assert_eq!(interpretation, Interpretation::NoMatch { heard: vec![] });
    }

    #[test]
    fn test_interpret_phrase() {
        let parser = CommandParser::new();
        let phrase = Phrase::finalized(["ten minutes for the eggs", "10 minutes for the eggs"]);

        match parser.interpret(&phrase) {
            Interpretation::Matched { command, rank, .. } => {
                assert_eq!(rank, 1);
                assert_eq!(command, created("eggs", minute(10)).unwrap());
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_mode_from_str() {
        assert_eq!("simple".parse::<ParseMode>().unwrap(), ParseMode::Simple);
        assert_eq!(" Robust ".parse::<ParseMode>().unwrap(), ParseMode::Robust);
        assert!(matches!(
            "fuzzy".parse::<ParseMode>(),
            Err(TimerVoiceError::ConfigInvalidValue { .. })
        ));
    }
}
