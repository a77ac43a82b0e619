use thiserror::Error;

/// All errors produced by colloquy-core.
#[derive(Debug, Error)]
pub enum ColloquyError {
    #[error("speech capture is not available on this runtime")]
    CaptureUnavailable,

    #[error("speech capture error: {0}")]
    Capture(String),

    #[error("speech output is not available on this runtime")]
    OutputUnavailable,

    #[error("speech output error: {0}")]
    Output(String),

    #[error("dialogue service rejected the session token")]
    DialogueUnauthorized,

    #[error("dialogue network error: {0}")]
    DialogueNetwork(String),

    #[error("dialogue service error (status {status}): {message}")]
    DialogueServer { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ColloquyError>;
