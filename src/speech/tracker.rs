//! Per-utterance state machine over engine result lists.
//!
//! Engines report the whole list of segments for the running session on
//! every event, mixing segments they already finalized with ones still in
//! flux. The tracker remembers the leading segments it delivered as final,
//! by transcript, so that re-sent finals are not mistaken for a new
//! utterance while a list that starts over is still recognized as new.
//!
//! ```text
//!            interim                 interim
//!   Idle ───────────▶ Accumulating ─────────┐
//!    ▲                     │   ▲            │
//!    │       final         │   └────────────┘
//!    └─────────────────────┘
//! ```

use crate::speech::types::{Phrase, RecognitionResult};
use tracing::{debug, trace};

/// Where the tracker is in the utterance lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceState {
    /// No utterance is open.
    Idle,
    /// An utterance is open and has produced `interims` interim phrases.
    Accumulating { interims: usize },
}

/// One phrase produced by feeding a result list to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtteranceUpdate {
    /// True when this update opens a new utterance.
    pub opened: bool,
    /// Interim or terminal phrase; a terminal phrase closes the utterance.
    pub phrase: Phrase,
}

#[derive(Debug)]
pub struct UtteranceTracker {
    state: UtteranceState,
    /// Best transcript of each leading result of the current list already
    /// delivered as final.
    finals: Vec<String>,
}

fn best_text(result: &RecognitionResult) -> &str {
    result.best_transcript().unwrap_or_default().trim()
}

impl UtteranceTracker {
    pub fn new() -> Self {
        Self {
            state: UtteranceState::Idle,
            finals: Vec::new(),
        }
    }

    pub fn state(&self) -> UtteranceState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, UtteranceState::Accumulating { .. })
    }

    /// Feed the engine's current result list.
    ///
    /// Every final result not delivered yet closes an utterance, in list
    /// order. Non-final segments after them form one interim phrase. A final
    /// that follows a non-final segment waits until it leads the undelivered
    /// part of the list. Returns nothing when the list carries nothing new.
    pub fn observe(&mut self, results: &[RecognitionResult]) -> Vec<UtteranceUpdate> {
        if results.is_empty() {
            trace!("ignoring empty result list");
            return Vec::new();
        }

        let resent = self
            .finals
            .iter()
            .zip(results)
            .take_while(|(delivered, result)| {
                result.is_final && best_text(result) == delivered.as_str()
            })
            .count();
        if resent < self.finals.len() && resent < results.len() {
            // The engine started a fresh list without ending the session.
            debug!(index = resent, finalized = self.finals.len(), "result list re-based");
            self.finals.truncate(resent);
        }

        let pending = results.get(self.finals.len()..).unwrap_or_default();
        if pending.is_empty() {
            debug!(results = results.len(), "ignoring re-sent final results");
            return Vec::new();
        }

        let mut updates: Vec<UtteranceUpdate> = pending
            .iter()
            .take_while(|result| result.is_final)
            .map(|result| self.close(result))
            .collect();

        let segments = &pending[updates.len()..];
        if !segments.is_empty() {
            updates.push(self.accumulate(segments));
        }
        updates
    }

    fn open(&self) -> bool {
        let opened = !self.is_open();
        if opened {
            debug!(index = self.finals.len(), "utterance opened");
        }
        opened
    }

    fn close(&mut self, result: &RecognitionResult) -> UtteranceUpdate {
        let opened = self.open();
        let phrase = Phrase::finalized(
            result
                .alternatives
                .iter()
                .map(|a| a.transcript.trim().to_string()),
        );
        self.finals.push(best_text(result).to_string());
        self.state = UtteranceState::Idle;
        debug!(index = self.finals.len() - 1, best = ?phrase.best(), "utterance finalized");
        UtteranceUpdate { opened, phrase }
    }

    fn accumulate(&mut self, segments: &[RecognitionResult]) -> UtteranceUpdate {
        let opened = self.open();
        let text: String = segments
            .iter()
            .filter(|r| !r.is_final)
            .filter_map(RecognitionResult::best_transcript)
            .collect();
        let interims = match self.state {
            UtteranceState::Accumulating { interims } => interims + 1,
            UtteranceState::Idle => 1,
        };
        self.state = UtteranceState::Accumulating { interims };
        trace!(interims, text = text.trim(), "interim phrase");

        UtteranceUpdate {
            opened,
            phrase: Phrase::interim(text.trim()),
        }
    }

    /// A new engine session started; its result list starts empty.
    ///
    /// An open utterance stays open across the restart.
    pub fn restart_session(&mut self) {
        self.finals.clear();
    }

    /// Drop the open utterance without a terminal phrase.
    ///
    /// Returns true if an utterance was open.
    pub fn abandon(&mut self) -> bool {
        let was_open = self.is_open();
        self.state = UtteranceState::Idle;
        was_open
    }
}

impl Default for UtteranceTracker {
    fn default() -> Self {
        Self::new()
    }
}
