use std::fmt;
use thiserror::Error;

/// The remote engines a turn talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Transcription,
    Chat,
    Search,
    Synthesis,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Transcription => "transcription",
            Self::Chat => "chat",
            Self::Search => "search",
            Self::Synthesis => "speech synthesis",
        };
        f.write_str(label)
    }
}

/// Failure of a single remote service call.
#[derive(Error, Debug)]
pub enum VoiceError {
    /// Network failure, timeout, or a non-success HTTP status.
    #[error("{service} service unavailable: {message}")]
    ServiceUnavailable {
        service: ServiceKind,
        message: String,
    },

    /// The service answered, but the payload was malformed or empty.
    #[error("{service} service returned an invalid response: {message}")]
    InvalidResponse {
        service: ServiceKind,
        message: String,
    },
}

impl VoiceError {
    pub fn unavailable(service: ServiceKind, message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service,
            message: message.into(),
        }
    }

    pub fn invalid(service: ServiceKind, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }

    pub fn service(&self) -> ServiceKind {
        match self {
            Self::ServiceUnavailable { service, .. } | Self::InvalidResponse { service, .. } => {
                *service
            }
        }
    }

    /// Maps a transport-level `reqwest` failure.
    pub(crate) fn from_request(service: ServiceKind, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::unavailable(service, "request timed out")
        } else {
            Self::unavailable(service, err.to_string())
        }
    }
}

/// Reason a turn was aborted. The `Display` text is what the client sees.
#[derive(Error, Debug)]
pub enum TurnError {
    /// The inbound audio was rejected before any remote call.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Service(#[from] VoiceError),

    /// A scratch file could not be written, read, or was missing.
    #[error("{0}")]
    Resource(String),

    /// The connection refused an outbound event.
    #[error("failed to send event: {0}")]
    Transport(String),
}

impl TurnError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
