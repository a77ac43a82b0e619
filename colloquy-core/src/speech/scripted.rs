//! Scripted capture/output backends.
//!
//! These replay pre-seeded event scripts and record every lifecycle call in
//! a shared, ordered log. They are the in-tree test doubles for the
//! controller (ordering assertions like "cancel before start" need one log
//! spanning both capabilities) and double as the degraded backends for
//! headless hosts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{ColloquyError, Result};
use crate::speech::{Availability, CaptureEvent, CaptureSink, OutputEvent, OutputSink};
use crate::speech::{SpeechCapture, SpeechOutput};

/// Ordered record of capability calls, shared between adapters.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: &str) {
        self.0.lock().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Index of the first entry equal to `needle`, if any.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == needle)
    }

    pub fn count(&self, needle: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == needle).count()
    }
}

/// Capture backend that replays one queued event script per `start()`.
pub struct ScriptedCapture {
    availability: Availability,
    scripts: Mutex<VecDeque<Vec<CaptureEvent>>>,
    sink: Mutex<Option<CaptureSink>>,
    active: AtomicBool,
    log: CallLog,
}

impl ScriptedCapture {
    pub fn new(log: CallLog) -> Self {
        Self {
            availability: Availability::Available,
            scripts: Mutex::new(VecDeque::new()),
            sink: Mutex::new(None),
            active: AtomicBool::new(false),
            log,
        }
    }

    /// A backend whose probe reports no capture support.
    pub fn unavailable(log: CallLog) -> Self {
        Self {
            availability: Availability::Unavailable,
            ..Self::new(log)
        }
    }

    /// Queue the events the next `start()` will replay, in order.
    pub fn push_script(&self, events: Vec<CaptureEvent>) {
        self.scripts.lock().push_back(events);
    }
}

#[async_trait]
impl SpeechCapture for ScriptedCapture {
    fn availability(&self) -> Availability {
        self.availability
    }

    async fn start(&self, events: CaptureSink) -> Result<()> {
        if self.availability == Availability::Unavailable {
            return Err(ColloquyError::CaptureUnavailable);
        }
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(ColloquyError::Capture("capture already active".into()));
        }
        self.log.record("capture.start");
        *self.sink.lock() = Some(events.clone());

        let script = self.scripts.lock().pop_front().unwrap_or_default();
        for event in script {
            if matches!(event, CaptureEvent::Ended) {
                self.active.store(false, Ordering::SeqCst);
            }
            let _ = events.send(event);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.log.record("capture.stop");
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(sink) = self.sink.lock().take() {
                let _ = sink.send(CaptureEvent::Ended);
            }
        }
        Ok(())
    }
}

/// Output backend that records spoken text and completes utterances either
/// immediately or on demand.
pub struct ScriptedOutput {
    availability: Availability,
    /// When false, utterances stay live until `finish_current()`/`cancel()`.
    auto_complete: bool,
    speaking: AtomicBool,
    sink: Mutex<Option<OutputSink>>,
    spoken: Mutex<Vec<String>>,
    fail_next: Mutex<Option<String>>,
    log: CallLog,
}

impl ScriptedOutput {
    /// Each `speak()` emits `Started` then `Ended` straight away.
    pub fn new(log: CallLog) -> Self {
        Self {
            availability: Availability::Available,
            auto_complete: true,
            speaking: AtomicBool::new(false),
            sink: Mutex::new(None),
            spoken: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            log,
        }
    }

    /// Utterances stay in progress until `finish_current()` or `cancel()` —
    /// for exercising barge-in and mid-speech toggles.
    pub fn manual(log: CallLog) -> Self {
        Self {
            auto_complete: false,
            ..Self::new(log)
        }
    }

    /// A backend whose probe reports no output support.
    pub fn unavailable(log: CallLog) -> Self {
        Self {
            availability: Availability::Unavailable,
            ..Self::new(log)
        }
    }

    /// Make the next `speak()` report `OutputEvent::Error` after starting.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_string());
    }

    /// Complete the in-progress utterance of a `manual()` backend.
    pub fn finish_current(&self) {
        if self.speaking.swap(false, Ordering::SeqCst) {
            if let Some(sink) = self.sink.lock().take() {
                let _ = sink.send(OutputEvent::Ended);
            }
        }
    }

    /// Every text handed to `speak()`, oldest first.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

#[async_trait]
impl SpeechOutput for ScriptedOutput {
    fn availability(&self) -> Availability {
        self.availability
    }

    async fn speak(&self, text: &str, events: OutputSink) -> Result<()> {
        if self.availability == Availability::Unavailable {
            return Err(ColloquyError::OutputUnavailable);
        }
        // Newest request wins: a live utterance is cancelled first.
        if self.speaking.load(Ordering::SeqCst) {
            debug!("speak while speaking — cancelling prior utterance");
            self.cancel_current();
        }

        self.log.record("output.speak");
        self.spoken.lock().push(text.to_string());
        self.speaking.store(true, Ordering::SeqCst);
        *self.sink.lock() = Some(events.clone());

        let _ = events.send(OutputEvent::Started);
        if let Some(message) = self.fail_next.lock().take() {
            self.speaking.store(false, Ordering::SeqCst);
            let _ = events.send(OutputEvent::Error(message));
        } else if self.auto_complete {
            self.speaking.store(false, Ordering::SeqCst);
            let _ = events.send(OutputEvent::Ended);
        }
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        self.log.record("output.cancel");
        self.cancel_current();
        Ok(())
    }
}

impl ScriptedOutput {
    fn cancel_current(&self) {
        if self.speaking.swap(false, Ordering::SeqCst) {
            if let Some(sink) = self.sink.lock().take() {
                let _ = sink.send(OutputEvent::Ended);
            }
        }
    }
}
