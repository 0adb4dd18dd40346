//! Shared event rendering for terminal output.
//! Used by `parse`, `replay` and `listen`.

use crate::command::{Command, Interpretation};
use crate::voice::VoiceEvent;
use std::io::{self, Write};

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Clear the current terminal line (replaces an interim transcript)
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

fn describe_command(command: &Command) -> String {
    format!("{GREEN}{command}{RESET}")
}

/// One-line summary of a parse outcome.
pub fn format_interpretation(interpretation: &Interpretation) -> String {
    match interpretation {
        Interpretation::Matched {
            command,
            transcript,
            rank,
            ..
        } => {
            let alt = if *rank > 0 {
                format!(" {DIM}(alternative #{}){RESET}", rank + 1)
            } else {
                String::new()
            };
            format!(
                "{} {DIM}← \"{transcript}\"{RESET}{alt}",
                describe_command(command)
            )
        }
        Interpretation::NoMatch { heard } => {
            let heard = heard
                .iter()
                .map(|h| format!("\"{h}\""))
                .collect::<Vec<_>>()
                .join(" | ");
            format!("{YELLOW}no command{RESET} {DIM}← {heard}{RESET}")
        }
    }
}

/// Render a voice event to the terminal.
///
/// Parse outcomes go to stdout; interim transcripts only show with `verbose`
/// and go to stderr, overwriting each other on one line.
pub fn render_event(event: &VoiceEvent, verbose: bool) {
    match event {
        VoiceEvent::Partial(phrase) => {
            if !verbose {
                return;
            }
            clear_line();
            eprint!("{DIM}… {}{RESET}", phrase.best().unwrap_or_default());
            io::stderr().flush().ok();
        }
        VoiceEvent::Heard(interpretation) => {
            if verbose {
                clear_line();
            }
            println!("{}", format_interpretation(interpretation));
        }
        VoiceEvent::Abandoned { last } => {
            if !verbose {
                return;
            }
            clear_line();
            match last.as_ref().and_then(|p| p.best()) {
                Some(text) => eprintln!("{DIM}(cut off: \"{text}\"){RESET}"),
                None => eprintln!("{DIM}(cut off){RESET}"),
            }
        }
    }
}

/// Render a value as one line of JSON on stdout.
pub fn render_json<T: serde::Serialize>(value: &T) -> serde_json::Result<()> {
    let line = serde_json::to_string(value)?;
    println!("{line}");
    Ok(())
}
