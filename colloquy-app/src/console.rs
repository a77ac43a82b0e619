//! Console capability adapters.
//!
//! The headless host has no microphone or speaker, so both capabilities are
//! simulated at the terminal: typed lines stand in for final transcripts,
//! and "speech" is printed text paced at a reading speed. The controller
//! cannot tell the difference — both adapters honor the capability
//! contracts, events included.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use colloquy_core::error::{ColloquyError, Result};
use colloquy_core::speech::{
    Availability, CaptureEvent, CaptureSink, OutputEvent, OutputSink, SpeechCapture, SpeechOutput,
};

/// Capture backend fed by typed lines.
///
/// `start()` arms a session; the next `submit()` delivers the line as the
/// final transcript and ends the session.
pub struct LineCapture {
    active: Mutex<Option<CaptureSink>>,
}

impl LineCapture {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    /// Feed a typed line into the armed session. Returns `false` when no
    /// session is listening.
    pub fn submit(&self, text: &str) -> bool {
        match self.active.lock().take() {
            Some(sink) => {
                let _ = sink.send(CaptureEvent::Final(text.to_string()));
                let _ = sink.send(CaptureEvent::Ended);
                true
            }
            None => false,
        }
    }
}

impl Default for LineCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechCapture for LineCapture {
    fn availability(&self) -> Availability {
        Availability::Available
    }

    async fn start(&self, events: CaptureSink) -> Result<()> {
        let mut slot = self.active.lock();
        if slot.is_some() {
            return Err(ColloquyError::Capture("capture already active".into()));
        }
        let _ = events.send(CaptureEvent::Started);
        *slot = Some(events);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if let Some(sink) = self.active.lock().take() {
            let _ = sink.send(CaptureEvent::Ended);
        }
        Ok(())
    }
}

/// Output backend that prints replies and paces their `Ended` event at a
/// configurable reading speed, so barge-in and cancellation behave like
/// they would against real audio.
pub struct ConsoleSpeechOutput {
    rate_wpm: u32,
    current: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleSpeechOutput {
    pub fn new(rate_wpm: u32) -> Self {
        Self {
            rate_wpm: rate_wpm.max(1),
            current: Mutex::new(None),
        }
    }

    fn cancel_current(&self) {
        if let Some(handle) = self.current.lock().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl SpeechOutput for ConsoleSpeechOutput {
    fn availability(&self) -> Availability {
        Availability::Available
    }

    async fn speak(&self, text: &str, events: OutputSink) -> Result<()> {
        // Newest request wins.
        self.cancel_current();

        println!("(voice) {text}");
        let words = text.split_whitespace().count().max(1) as u64;
        let playback = Duration::from_millis(words * 60_000 / u64::from(self.rate_wpm));

        let _ = events.send(OutputEvent::Started);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(playback).await;
            let _ = events.send(OutputEvent::Ended);
        });
        *self.current.lock() = Some(handle);
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        self.cancel_current();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn submit_requires_an_armed_session() {
        let capture = LineCapture::new();
        assert!(!capture.submit("too early"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        capture.start(tx).await.expect("start");
        assert!(capture.submit("when is the final"));

        assert_eq!(rx.recv().await, Some(CaptureEvent::Started));
        assert_eq!(
            rx.recv().await,
            Some(CaptureEvent::Final("when is the final".into()))
        );
        assert_eq!(rx.recv().await, Some(CaptureEvent::Ended));

        // The session ended with the final — a second submit needs a restart.
        assert!(!capture.submit("again"));
    }

    #[tokio::test]
    async fn console_output_reports_started_then_ended() {
        let output = ConsoleSpeechOutput::new(600);
        let (tx, mut rx) = mpsc::unbounded_channel();
        output.speak("two words", tx).await.expect("speak");

        assert_eq!(rx.recv().await, Some(OutputEvent::Started));
        assert_eq!(rx.recv().await, Some(OutputEvent::Ended));
    }

    #[tokio::test]
    async fn cancel_suppresses_the_ended_event() {
        let output = ConsoleSpeechOutput::new(60);
        let (tx, mut rx) = mpsc::unbounded_channel();
        output.speak("a very long sentence indeed", tx).await.expect("speak");
        assert_eq!(rx.recv().await, Some(OutputEvent::Started));

        output.cancel().await.expect("cancel");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }
}
