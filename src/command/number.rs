//! Spoken numbers and duration arithmetic.

use crate::defaults::{HALF_MINUTE_SECS, SECS_PER_MINUTE};

/// Spelled-out numbers the grammar accepts.
const NUMBER_WORDS: [(&str, u32); 9] = [
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
];

/// Parse a case-folded word as a digit numeral or a number word.
pub fn parse_number(word: &str) -> Option<u32> {
    if !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit()) {
        return word.parse().ok();
    }
    NUMBER_WORDS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, value)| *value)
}

/// Total seconds for a minutes/seconds pair.
///
/// `half` stands in for the seconds when none were given; an explicit
/// seconds count wins. Returns `None` on overflow.
pub fn total_seconds(minutes: u32, seconds: u32, half: bool) -> Option<u32> {
    let seconds = if seconds == 0 && half {
        HALF_MINUTE_SECS
    } else {
        seconds
    };
    minutes.checked_mul(SECS_PER_MINUTE)?.checked_add(seconds)
}

/// `M:SS` rendering of a duration in seconds.
pub fn format_duration(total: u32) -> String {
    format!("{}:{:02}", total / SECS_PER_MINUTE, total % SECS_PER_MINUTE)
}
