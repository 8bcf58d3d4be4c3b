use thiserror::Error;

/// The initial snapshot could not be loaded.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("session is not valid")]
    Unauthorized,

    #[error("store returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// A create or delete was rejected.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("session is not valid")]
    Unauthorized,

    #[error("bookmark {0} not found")]
    NotFound(String),

    #[error("session belongs to a different user than {0}")]
    WrongOwner(String),

    #[error("store rejected the write ({code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
}

/// The change stream could not be opened, or was refused.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("could not obtain a gateway ticket: {0}")]
    Ticket(#[from] FetchError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("gateway closed the connection ({code}): {reason}")]
    Rejected { code: u16, reason: String },

    #[error("gateway protocol error: {0}")]
    Protocol(String),

    #[error("stream is scoped to {actual}, expected {expected}")]
    UserMismatch { expected: String, actual: String },
}

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorEnvelopeDetail,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ErrorEnvelopeDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorEnvelope {
    /// Read the envelope from a failed response, tolerating bodies that do not parse.
    pub(crate) async fn read(resp: reqwest::Response) -> ErrorEnvelopeDetail {
        resp.json::<ErrorEnvelope>()
            .await
            .map(|e| e.error)
            .unwrap_or_default()
    }
}
