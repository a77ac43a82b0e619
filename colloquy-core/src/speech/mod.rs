//! Speech capability contracts.
//!
//! Capture (speech-to-text) and output (text-to-speech) are external,
//! swappable capabilities. The controller consumes them exclusively through
//! the traits here and owns their lifecycle: no other component may start or
//! stop them. Adapters report progress by enqueueing typed events into the
//! sink supplied at `start()`/`speak()` time — they never call back into
//! controller state.

pub mod capture;
pub mod output;
pub mod scripted;

pub use capture::{CaptureEvent, CaptureSink, SpeechCapture};
pub use output::{OutputEvent, OutputSink, SpeechOutput};

use serde::{Deserialize, Serialize};

/// Result of the one-time capability probe performed at controller
/// initialization.
///
/// `Unknown` means the runtime cannot answer without trying — the controller
/// treats it as usable and lets the first `start()`/`speak()` decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unavailable,
    Unknown,
}

impl Availability {
    /// Whether the controller should attempt to use the capability.
    pub fn usable(self) -> bool {
        !matches!(self, Availability::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_counts_as_usable_until_tried() {
        assert!(Availability::Available.usable());
        assert!(Availability::Unknown.usable());
        assert!(!Availability::Unavailable.usable());
    }

    #[test]
    fn availability_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Availability::Unknown).expect("serialize"),
            serde_json::json!("unknown")
        );
    }
}
