//! Data types exchanged with a speech recognition engine.

use serde::{Deserialize, Serialize};

/// One ranked transcription of a recognized segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alternative {
    pub transcript: String,
}

impl From<&str> for Alternative {
    fn from(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
        }
    }
}

impl From<String> for Alternative {
    fn from(transcript: String) -> Self {
        Self { transcript }
    }
}

/// One segment recognized in the current session.
///
/// Engines re-send the whole list of segments on every event; a segment
/// stays non-final while the engine may still revise it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(rename = "final", default)]
    pub is_final: bool,
    pub alternatives: Vec<Alternative>,
}

impl RecognitionResult {
    /// A segment the engine may still revise.
    pub fn interim<I, A>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Alternative>,
    {
        Self {
            is_final: false,
            alternatives: alternatives.into_iter().map(Into::into).collect(),
        }
    }

    /// A segment the engine will not revise further.
    pub fn finalized<I, A>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Alternative>,
    {
        Self {
            is_final: true,
            alternatives: alternatives.into_iter().map(Into::into).collect(),
        }
    }

    /// Highest-ranked transcript, if the engine reported any.
    pub fn best_transcript(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.transcript.as_str())
    }
}

/// One notification from the speech engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecognitionEvent {
    /// Full current list of segments for the running session.
    Result { results: Vec<RecognitionResult> },
    /// The engine failed; the session is over.
    Error { message: String },
    /// The session ended, either on request or spontaneously.
    End,
}

/// Snapshot of the engine's ranked guesses for one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phrase {
    alternatives: Vec<String>,
    is_final: bool,
}

impl Phrase {
    /// Single-alternative in-progress phrase.
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            alternatives: vec![text.into()],
            is_final: false,
        }
    }

    /// Terminal phrase with ranked alternatives, best first.
    pub fn finalized<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            alternatives: alternatives.into_iter().map(Into::into).collect(),
            is_final: true,
        }
    }

    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    pub fn best(&self) -> Option<&str> {
        self.alternatives.first().map(String::as_str)
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Keep at most `max` alternatives; 0 keeps all.
    pub(crate) fn truncated(mut self, max: usize) -> Self {
        if max > 0 {
            self.alternatives.truncate(max);
        }
        self
    }

    pub fn into_alternatives(self) -> Vec<String> {
        self.alternatives
    }
}
