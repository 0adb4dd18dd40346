//! Turns a speech engine's event feed into a stream of per-utterance phrase streams.
//!
//! The aggregator is pull-driven: nothing is started until the outer stream
//! is first polled, and engine events are only processed while it is polled.
//! Each [`PhraseStream`] it yields carries the interim phrases of one
//! utterance followed by its terminal phrase. Inner streams are fed from the
//! outer poll loop, so consume them concurrently with the outer stream
//! (e.g. with `flatten_unordered`) rather than draining one before polling on.

use crate::config::Config;
use crate::defaults;
use crate::error::{Result, TimerVoiceError};
use crate::speech::engine::{EventSink, Inbound, RecognitionEngine};
use crate::speech::tracker::{UtteranceTracker, UtteranceUpdate};
use crate::speech::types::{Phrase, RecognitionEvent};
use futures_util::stream::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, ready};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, trace, warn};

/// Aggregator behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Start a new engine session when the engine ends one on its own.
    pub restart_on_end: bool,
    /// Ranked alternatives kept per phrase; 0 keeps all.
    pub max_alternatives: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            restart_on_end: defaults::RESTART_ON_END,
            max_alternatives: defaults::MAX_ALTERNATIVES,
        }
    }
}

impl AggregatorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            restart_on_end: config.recognition.restart_on_end,
            max_alternatives: config.recognition.max_alternatives,
        }
    }
}

/// Lifecycle of the aggregated speech session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not polled yet; the engine has not been started.
    NotStarted,
    Listening,
    /// Stop was requested; waiting for the engine to report the end.
    Stopping,
    /// The outer stream completed or failed.
    Done,
}

/// Requests the aggregator to stop from outside its poll loop.
///
/// After a stop request the engine is stopped and the outer stream
/// completes once the engine reports the end of its session.
#[derive(Debug, Clone)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
    tx: UnboundedSender<Inbound>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.tx.send(Inbound::StopRequested).is_err() {
            trace!("stop requested after the aggregator went away");
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Phrases of one utterance: zero or more interims, then usually a final.
///
/// The stream ends right after the terminal phrase. It ends without one
/// when the session stops or fails mid-utterance.
#[derive(Debug)]
pub struct PhraseStream {
    rx: UnboundedReceiver<Phrase>,
}

impl PhraseStream {
    /// Wait for the utterance to end and return its terminal phrase.
    ///
    /// Returns `None` for an abandoned utterance.
    pub async fn final_phrase(mut self) -> Option<Phrase> {
        let mut last = None;
        while let Some(phrase) = self.rx.recv().await {
            last = Some(phrase);
        }
        last.filter(Phrase::is_final)
    }
}

impl Stream for PhraseStream {
    type Item = Phrase;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Phrase>> {
        self.rx.poll_recv(cx)
    }
}

/// What one inbound message means for the outer stream.
enum Step {
    Continue,
    Fail(TimerVoiceError),
    Complete,
}

/// Stream of [`PhraseStream`]s over a [`RecognitionEngine`].
///
/// A recognition error is yielded once as `Err` and ends the stream.
/// Dropping the aggregator stops a running engine.
pub struct SpeechAggregator<E: RecognitionEngine> {
    engine: E,
    config: AggregatorConfig,
    tx: UnboundedSender<Inbound>,
    rx: UnboundedReceiver<Inbound>,
    tracker: UtteranceTracker,
    /// Sender of the utterance currently being aggregated.
    open: Option<UnboundedSender<Phrase>>,
    /// Phrase streams opened but not yet yielded.
    pending: VecDeque<PhraseStream>,
    generation: u64,
    state: SessionState,
    engine_active: bool,
    stop_requested: Arc<AtomicBool>,
}

// The engine is never pinned; it is only reached through `&mut`.
impl<E: RecognitionEngine> Unpin for SpeechAggregator<E> {}

impl<E: RecognitionEngine> SpeechAggregator<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, AggregatorConfig::default())
    }

    pub fn with_config(engine: E, config: AggregatorConfig) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            engine,
            config,
            tx,
            rx,
            tracker: UtteranceTracker::new(),
            open: None,
            pending: VecDeque::new(),
            generation: 0,
            state: SessionState::NotStarted,
            engine_active: false,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            requested: Arc::clone(&self.stop_requested),
            tx: self.tx.clone(),
        }
    }

    /// Shorthand for `stop_handle().request_stop()`.
    pub fn request_stop(&self) {
        self.stop_handle().request_stop();
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn start_session(&mut self) -> Result<()> {
        self.generation += 1;
        debug!(generation = self.generation, "starting recognition session");
        let sink = EventSink::new(self.generation, self.tx.clone());
        self.engine.start(sink)?;
        self.engine_active = true;
        Ok(())
    }

    fn handle(&mut self, message: Inbound) -> Step {
        match message {
            Inbound::StopRequested => self.on_stop_requested(),
            Inbound::Event { generation, event } if generation != self.generation => {
                trace!(generation, current = self.generation, ?event, "dropping stale event");
                Step::Continue
            }
            Inbound::Event { event, .. } => match event {
                RecognitionEvent::Result { results } => {
                    for update in self.tracker.observe(&results) {
                        self.deliver(update);
                    }
                    Step::Continue
                }
                RecognitionEvent::Error { message } => {
                    warn!(%message, "speech recognition failed");
                    Step::Fail(TimerVoiceError::RecognitionFailure { message })
                }
                RecognitionEvent::End => self.on_end(),
            },
        }
    }

    fn on_stop_requested(&mut self) -> Step {
        self.stop_requested.store(true, Ordering::SeqCst);
        if self.state == SessionState::Stopping {
            return Step::Continue;
        }
        if !self.engine_active {
            return Step::Complete;
        }
        debug!("stop requested; stopping engine");
        self.state = SessionState::Stopping;
        match self.engine.stop() {
            Ok(()) => Step::Continue,
            Err(e) => {
                self.engine_active = false;
                Step::Fail(e)
            }
        }
    }

    fn on_end(&mut self) -> Step {
        self.engine_active = false;
        if self.state == SessionState::Stopping
            || self.stop_requested.load(Ordering::SeqCst)
            || !self.config.restart_on_end
        {
            debug!("recognition session over");
            return Step::Complete;
        }

        info!("engine ended the session; restarting");
        self.tracker.restart_session();
        match self.start_session() {
            Ok(()) => Step::Continue,
            Err(e) => Step::Fail(e),
        }
    }

    fn deliver(&mut self, update: UtteranceUpdate) {
        let phrase = update.phrase.truncated(self.config.max_alternatives);
        let is_final = phrase.is_final();

        if update.opened || self.open.is_none() {
            let (tx, rx) = unbounded_channel();
            if tx.send(phrase).is_err() {
                trace!("phrase receiver closed before delivery");
            }
            self.open = (!is_final).then_some(tx);
            self.pending.push_back(PhraseStream { rx });
            return;
        }

        if let Some(tx) = &self.open
            && tx.send(phrase).is_err()
        {
            trace!("phrase stream dropped by consumer");
        }
        if is_final {
            self.open = None;
        }
    }

    /// Close the outer stream: abandon the open utterance and stop the engine.
    fn finish(&mut self) {
        self.state = SessionState::Done;
        if self.tracker.abandon() {
            debug!("utterance abandoned without a final phrase");
        }
        self.open = None;
        self.stop_engine();
    }

    fn stop_engine(&mut self) {
        if !self.engine_active {
            return;
        }
        self.engine_active = false;
        if let Err(e) = self.engine.stop() {
            warn!("failed to stop recognition engine: {e}");
        }
    }
}

impl<E: RecognitionEngine> Stream for SpeechAggregator<E> {
    type Item = Result<PhraseStream>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match this.state {
            SessionState::Done => return Poll::Ready(None),
            SessionState::NotStarted => {
                if this.stop_requested.load(Ordering::SeqCst) {
                    debug!("stopped before the first session started");
                    this.finish();
                    return Poll::Ready(None);
                }
                this.state = SessionState::Listening;
                if let Err(e) = this.start_session() {
                    this.finish();
                    return Poll::Ready(Some(Err(e)));
                }
            }
            SessionState::Listening | SessionState::Stopping => {}
        }

        loop {
            if let Some(phrases) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(phrases)));
            }
            // The aggregator holds a sender itself, so the channel never closes.
            let Some(message) = ready!(this.rx.poll_recv(cx)) else {
                this.finish();
                return Poll::Ready(None);
            };
            match this.handle(message) {
                Step::Continue => {}
                Step::Fail(e) => {
                    this.finish();
                    return Poll::Ready(Some(Err(e)));
                }
                Step::Complete => {
                    this.finish();
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<E: RecognitionEngine> Drop for SpeechAggregator<E> {
    fn drop(&mut self) {
        self.stop_engine();
    }
}
