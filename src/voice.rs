//! Voice command pipeline: speech aggregator → command parser.
//!
//! Every utterance yields its interim phrases as [`VoiceEvent::Partial`] and
//! ends with exactly one [`VoiceEvent::Heard`] (the parse of its terminal
//! phrase) or [`VoiceEvent::Abandoned`] when the session ended mid-utterance.

use crate::command::{Command, CommandParser, Interpretation};
use crate::error::Result;
use crate::speech::aggregator::{PhraseStream, SpeechAggregator};
use crate::speech::engine::RecognitionEngine;
use crate::speech::types::Phrase;
use futures_util::stream::{self, Stream, StreamExt};
use futures_util::future;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VoiceEvent {
    /// In-progress transcript of the current utterance.
    Partial(Phrase),
    /// The utterance ended; its terminal phrase was parsed.
    Heard(Interpretation),
    /// The utterance ended without a terminal phrase.
    Abandoned { last: Option<Phrase> },
}

impl VoiceEvent {
    pub fn command(&self) -> Option<&Command> {
        match self {
            VoiceEvent::Heard(interpretation) => interpretation.command(),
            _ => None,
        }
    }
}

struct Utterance {
    phrases: PhraseStream,
    last: Option<Phrase>,
    done: bool,
}

fn utterance_events(
    phrases: PhraseStream,
    parser: CommandParser,
) -> impl Stream<Item = Result<VoiceEvent>> + Send + 'static {
    let initial = Utterance {
        phrases,
        last: None,
        done: false,
    };
    stream::unfold(initial, move |mut utterance| async move {
        if utterance.done {
            return None;
        }
        let event = match utterance.phrases.next().await {
            Some(phrase) if phrase.is_final() => {
                utterance.done = true;
                VoiceEvent::Heard(parser.interpret(&phrase))
            }
            Some(phrase) => {
                utterance.last = Some(phrase.clone());
                VoiceEvent::Partial(phrase)
            }
            None => {
                utterance.done = true;
                VoiceEvent::Abandoned {
                    last: utterance.last.take(),
                }
            }
        };
        Some((Ok(event), utterance))
    })
}

/// Interpret everything the aggregator hears.
///
/// A recognition error is yielded once and ends the stream, after any
/// utterance still in flight has been reported.
pub fn voice_events<E>(
    aggregator: SpeechAggregator<E>,
    parser: CommandParser,
) -> impl Stream<Item = Result<VoiceEvent>>
where
    E: RecognitionEngine + 'static,
{
    aggregator
        .map(move |item| match item {
            Ok(phrases) => utterance_events(phrases, parser).boxed(),
            Err(e) => stream::once(future::ready(Err(e))).boxed(),
        })
        .flatten_unordered(None)
}

/// Only the recognized commands; unmatched and abandoned utterances are skipped.
pub fn heard_commands<E>(
    aggregator: SpeechAggregator<E>,
    parser: CommandParser,
) -> impl Stream<Item = Result<Command>>
where
    E: RecognitionEngine + 'static,
{
    voice_events(aggregator, parser).filter_map(|event| {
        future::ready(match event {
            Ok(VoiceEvent::Heard(interpretation)) => interpretation.into_command().map(Ok),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    })
}
