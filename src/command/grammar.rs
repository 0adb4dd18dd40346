//! Timer command grammar.
//!
//! Transcripts are split into words with punctuation dropped, then matched
//! word by word against each rule. Matching uses the case-folded words;
//! captured names keep the words as heard.
//!
//! ```text
//! create := filler? minutes? seconds? "timer"? ("for"? "the"? NAME)?
//! minutes := NUM ("and a half")? ("minute" | "minutes") ("and a half")?
//! seconds := "and"? NUM ("second" | "seconds")
//! start  := "start" ("the"? NAME)?
//! stop   := ("stop" | "pause") ("the"? NAME)?
//! help   := "help" | "help me" | "how do/can i ... this/add/use ..." | ...
//! ```

use crate::command::number::{parse_number, total_seconds};
use crate::command::types::{Command, RuleKind};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::trace;

const CREATE_FILLERS: &[&str] = &["new", "add", "create"];
const MINUTE_UNITS: &[&str] = &["minute", "minutes"];
const SECOND_UNITS: &[&str] = &["second", "seconds"];
const AND_A_HALF: &[&str] = &["and", "a", "half"];
const STOP_WORDS: &[&str] = &["stop", "pause"];

#[allow(clippy::expect_used)]
static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}\p{N}]+)*").expect("word pattern is valid")
});

#[allow(clippy::expect_used)]
static HELP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:please )?help(?: me)?(?: please)?|what can i (?:say|do)|how (?:do|can|should) i\b.*\b(?:this|add|use)\b.*)$",
    )
    .expect("help pattern is valid")
});

/// One word of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// The word as heard.
    pub raw: &'a str,
    /// Case-folded form used for matching.
    pub folded: String,
}

/// A transcript prepared for matching.
#[derive(Debug, Clone)]
pub struct Transcript<'a> {
    tokens: Vec<Token<'a>>,
    folded: String,
}

impl<'a> Transcript<'a> {
    pub fn new(text: &'a str) -> Self {
        let tokens: Vec<Token<'a>> = WORD_PATTERN
            .find_iter(text)
            .map(|m| Token {
                raw: m.as_str(),
                folded: m.as_str().to_lowercase(),
            })
            .collect();
        let folded = tokens
            .iter()
            .map(|t| t.folded.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self { tokens, folded }
    }

    pub fn tokens(&self) -> &[Token<'a>] {
        &self.tokens
    }

    /// Case-folded words joined by single spaces.
    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn cursor(&self) -> Cursor<'_, 'a> {
        Cursor {
            tokens: &self.tokens,
            pos: 0,
        }
    }
}

/// Backtracking position over a token slice.
struct Cursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl Cursor<'_, '_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|t| t.folded.as_str())
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn eat(&mut self, word: &str) -> bool {
        if self.peek() == Some(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_any(&mut self, words: &[&str]) -> bool {
        match self.peek() {
            Some(next) if words.contains(&next) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Consume `words` in order, or nothing.
    fn eat_seq(&mut self, words: &[&str]) -> bool {
        let start = self.pos;
        if words.iter().all(|word| self.eat(word)) {
            true
        } else {
            self.pos = start;
            false
        }
    }

    fn number(&mut self) -> Option<u32> {
        let value = parse_number(self.peek()?)?;
        self.pos += 1;
        Some(value)
    }

    /// Remaining words as heard, joined by spaces; `None` if nothing is left.
    fn rest(&mut self) -> Option<String> {
        if self.at_end() {
            return None;
        }
        let rest = self.tokens[self.pos..]
            .iter()
            .map(|t| t.raw)
            .collect::<Vec<_>>()
            .join(" ");
        self.pos = self.tokens.len();
        Some(rest)
    }
}

/// A grammar rule: a matcher that extracts a command from a transcript.
#[derive(Clone, Copy)]
pub struct GrammarRule {
    kind: RuleKind,
    matcher: fn(&Transcript<'_>) -> Option<Command>,
}

impl GrammarRule {
    pub const fn new(kind: RuleKind, matcher: fn(&Transcript<'_>) -> Option<Command>) -> Self {
        Self { kind, matcher }
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn apply(&self, transcript: &Transcript<'_>) -> Option<Command> {
        let command = (self.matcher)(transcript);
        trace!(rule = %self.kind, text = transcript.folded(), matched = command.is_some());
        command
    }
}

impl fmt::Debug for GrammarRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarRule")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The built-in rules in evaluation priority order.
///
/// Patterns overlap ("start the eggs" is also a duration-less create
/// phrase), so the first rule that extracts a command wins.
pub const GRAMMAR: [GrammarRule; 4] = [
    GrammarRule::new(RuleKind::Create, match_create),
    GrammarRule::new(RuleKind::Start, match_start),
    GrammarRule::new(RuleKind::Stop, match_stop),
    GrammarRule::new(RuleKind::Help, match_help),
];

fn match_create(transcript: &Transcript<'_>) -> Option<Command> {
    let mut cursor = transcript.cursor();
    cursor.eat_any(CREATE_FILLERS);

    let mut minutes = 0;
    let mut seconds = 0;
    let mut half = false;

    let start = cursor.pos;
    if let Some(n) = cursor.number() {
        let half_before_unit = cursor.eat_seq(AND_A_HALF);
        if cursor.eat_any(MINUTE_UNITS) {
            minutes = n;
            half = half_before_unit || cursor.eat_seq(AND_A_HALF);
        } else {
            cursor.pos = start;
        }
    }

    let start = cursor.pos;
    cursor.eat("and");
    match cursor.number() {
        Some(n) if cursor.eat_any(SECOND_UNITS) => seconds = n,
        _ => cursor.pos = start,
    }

    cursor.eat("timer");

    let name = if cursor.at_end() {
        None
    } else {
        cursor.eat("for");
        cursor.eat("the");
        cursor.rest()
    };

    let duration_seconds = total_seconds(minutes, seconds, half)?;
    if duration_seconds == 0 {
        trace!(text = transcript.folded(), "create phrase without a duration");
        return None;
    }

    Some(Command::Create {
        name: name.unwrap_or_default(),
        duration_seconds,
    })
}

/// Optional "the" followed by an optional name; a bare "timer" names nothing.
fn target(cursor: &mut Cursor<'_, '_>) -> Option<String> {
    cursor.eat("the");
    let start = cursor.pos;
    if cursor.eat("timer") && cursor.at_end() {
        return None;
    }
    cursor.pos = start;
    cursor.rest()
}

fn match_start(transcript: &Transcript<'_>) -> Option<Command> {
    let mut cursor = transcript.cursor();
    if !cursor.eat("start") {
        return None;
    }
    Some(Command::Start {
        name: target(&mut cursor),
    })
}

fn match_stop(transcript: &Transcript<'_>) -> Option<Command> {
    let mut cursor = transcript.cursor();
    if !cursor.eat_any(STOP_WORDS) {
        return None;
    }
    Some(Command::Stop {
        name: target(&mut cursor),
    })
}

fn match_help(transcript: &Transcript<'_>) -> Option<Command> {
    HELP_PATTERN
        .is_match(transcript.folded())
        .then_some(Command::Help)
}
