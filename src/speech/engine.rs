//! Speech engine abstraction and the engines shipped with the crate.
//!
//! A [`RecognitionEngine`] is started with an [`EventSink`] and pushes
//! [`RecognitionEvent`]s into it from whatever context the platform uses.
//! The aggregator owns the engine and decides when to start and stop it.

use crate::defaults;
use crate::error::{Result, TimerVoiceError};
use crate::speech::types::{RecognitionEvent, RecognitionResult};
use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Message delivered to the aggregator.
#[derive(Debug)]
pub(crate) enum Inbound {
    Event {
        generation: u64,
        event: RecognitionEvent,
    },
    StopRequested,
}

/// Trait for speech recognition engines.
///
/// This trait allows swapping implementations (platform engine vs scripted test double).
pub trait RecognitionEngine: Send {
    /// Begin a session that reports into `sink`.
    ///
    /// Must not block waiting for speech.
    fn start(&mut self, sink: EventSink) -> Result<()>;

    /// Ask the running session to stop, cancelling any in-flight recognition.
    ///
    /// The engine reports [`RecognitionEvent::End`] once the session is over.
    fn stop(&mut self) -> Result<()>;
}

impl<E: RecognitionEngine + ?Sized> RecognitionEngine for Box<E> {
    fn start(&mut self, sink: EventSink) -> Result<()> {
        (**self).start(sink)
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }
}

/// Where an engine session reports its events.
///
/// Each sink belongs to one session; events sent after a newer session
/// started are discarded by the aggregator.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: UnboundedSender<Inbound>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: UnboundedSender<Inbound>) -> Self {
        Self { generation, tx }
    }

    /// Report an event. Returns false once nobody is listening.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        self.tx
            .send(Inbound::Event {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn results(&self, results: Vec<RecognitionResult>) -> bool {
        self.emit(RecognitionEvent::Result { results })
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.emit(RecognitionEvent::Error {
            message: message.into(),
        })
    }

    pub fn end(&self) -> bool {
        self.emit(RecognitionEvent::End)
    }

    /// The input behind this engine is exhausted.
    ///
    /// Has the same effect as a caller's stop request: the aggregator stops
    /// the engine and completes on the following `End` instead of restarting.
    pub fn finish(&self) -> bool {
        self.tx.send(Inbound::StopRequested).is_ok()
    }

    /// True once the aggregator has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Counters shared with a [`ScriptedEngine`], readable after the engine moved.
#[derive(Debug, Clone, Default)]
pub struct EngineProbe {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl EngineProbe {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Engine that replays recorded sessions, one per `start()`.
///
/// A session that does not end on its own keeps running until `stop()`,
/// which reports `End` like a platform engine does.
#[derive(Debug)]
pub struct ScriptedEngine {
    sessions: VecDeque<Vec<RecognitionEvent>>,
    running: Option<EventSink>,
    finish_when_exhausted: bool,
    start_failure: Option<String>,
    probe: EngineProbe,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            sessions: VecDeque::new(),
            running: None,
            finish_when_exhausted: true,
            start_failure: None,
            probe: EngineProbe::default(),
        }
    }

    /// Load sessions from JSON: an array of sessions, each an array of events.
    pub fn from_json(json: &str) -> Result<Self> {
        let sessions: Vec<Vec<RecognitionEvent>> = serde_json::from_str(json)?;
        Ok(sessions
            .into_iter()
            .fold(Self::new(), |engine, events| engine.with_session(events)))
    }

    /// Queue the events one session reports.
    pub fn with_session(mut self, events: Vec<RecognitionEvent>) -> Self {
        self.sessions.push_back(events);
        self
    }

    /// Keep the last session running after its events are replayed instead
    /// of signalling that the input is exhausted.
    pub fn keep_running(mut self) -> Self {
        self.finish_when_exhausted = false;
        self
    }

    /// Configure the engine to fail on start.
    pub fn with_start_failure(mut self, message: &str) -> Self {
        self.start_failure = Some(message.to_string());
        self
    }

    pub fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }

    /// Number of sessions not yet replayed.
    pub fn remaining_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn start(&mut self, sink: EventSink) -> Result<()> {
        if let Some(message) = &self.start_failure {
            return Err(TimerVoiceError::EngineStart {
                message: message.clone(),
            });
        }
        self.probe.starts.fetch_add(1, Ordering::SeqCst);

        let events = self.sessions.pop_front().unwrap_or_default();
        for event in events {
            let session_over = matches!(
                event,
                RecognitionEvent::End | RecognitionEvent::Error { .. }
            );
            sink.emit(event);
            if session_over {
                self.running = None;
                return Ok(());
            }
        }

        if self.finish_when_exhausted && self.sessions.is_empty() {
            sink.finish();
        }
        self.running = Some(sink);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.running.take() {
            sink.end();
        }
        Ok(())
    }
}

/// Session state shared with the line reader thread.
#[derive(Debug, Default)]
struct LineSession {
    sink: Option<EventSink>,
    results: Vec<RecognitionResult>,
}

impl LineSession {
    /// Append a typed result and forward the list to the running session.
    ///
    /// Lines typed while no session runs are discarded. Returns false once
    /// the aggregator has gone away.
    fn push(&mut self, result: RecognitionResult) -> bool {
        let Some(sink) = &self.sink else {
            debug!("no session running; discarding typed line");
            return true;
        };
        self.results.push(result);
        sink.results(self.results.clone())
    }
}

/// Engine for typed input: every line is one final result.
///
/// Ranked alternatives on one line are separated by `|`, best first. Lines
/// read between sessions are dropped.
/// The reader runs on its own thread and signals [`EventSink::finish`] at
/// end of input.
pub struct LineEngine<R> {
    reader: Option<R>,
    session: Arc<Mutex<LineSession>>,
}

impl<R: BufRead + Send + 'static> LineEngine<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            session: Arc::new(Mutex::new(LineSession::default())),
        }
    }

    fn spawn_reader(reader: R, session: Arc<Mutex<LineSession>>) {
        thread::spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        let Some(result) = parse_line(&line) else {
                            continue;
                        };
                        let Ok(mut session) = session.lock() else {
                            return;
                        };
                        if !session.push(result) {
                            return;
                        }
                    }
                    Err(e) => {
                        if let Ok(session) = session.lock()
                            && let Some(sink) = &session.sink
                        {
                            sink.error(format!("failed to read input: {e}"));
                        }
                        return;
                    }
                }
            }
            debug!("typed input exhausted");
            if let Ok(session) = session.lock()
                && let Some(sink) = &session.sink
            {
                sink.finish();
            }
        });
    }
}

/// Split a typed line into a final result, or `None` for a blank line.
fn parse_line(line: &str) -> Option<RecognitionResult> {
    let alternatives: Vec<&str> = line
        .split(defaults::ALTERNATIVE_SEPARATOR)
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .collect();
    if alternatives.is_empty() {
        None
    } else {
        Some(RecognitionResult::finalized(alternatives))
    }
}

impl<R: BufRead + Send + 'static> RecognitionEngine for LineEngine<R> {
    fn start(&mut self, sink: EventSink) -> Result<()> {
        {
            let mut session = self
                .session
                .lock()
                .map_err(|_| TimerVoiceError::EngineStart {
                    message: "line reader state poisoned".to_string(),
                })?;
            session.sink = Some(sink);
            session.results.clear();
        }
        if let Some(reader) = self.reader.take() {
            Self::spawn_reader(reader, Arc::clone(&self.session));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| TimerVoiceError::EngineStop {
                message: "line reader state poisoned".to_string(),
            })?;
        match session.sink.take() {
            Some(sink) => {
                sink.end();
            }
            None => warn!("stop requested with no running session"),
        }
        Ok(())
    }
}
