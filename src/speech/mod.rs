//! Speech side: engine events in, per-utterance phrase streams out.

pub mod aggregator;
pub mod engine;
pub mod tracker;
pub mod types;

pub use aggregator::{AggregatorConfig, PhraseStream, SessionState, SpeechAggregator, StopHandle};
pub use engine::{EngineProbe, EventSink, LineEngine, RecognitionEngine, ScriptedEngine};
pub use tracker::{UtteranceState, UtteranceTracker, UtteranceUpdate};
pub use types::{Alternative, Phrase, RecognitionEvent, RecognitionResult};
