use std::fmt;

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("server address is not configured")]
    MissingServerAddress,
    #[error("failed to read config: {}", .0)]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {}", .0)]
    Parse(#[from] toml::de::Error),
}

/// The server answered, but with a status the protocol treats as failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("preflight rejected: {}", .0)]
    Preflight(StatusCode),
    #[error("publish rejected: {}", .0)]
    Publish(StatusCode),
    #[error("trickle rejected: {}", .0)]
    Trickle(StatusCode),
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    timeout: bool,
    location: Option<String>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: false,
            location: None,
        }
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: true,
            location: None,
        }
    }

    /// Attaches the `Location` header of a response whose body could not be
    /// read.
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timed_out(err.to_string())
        } else {
            Self::new(err.to_string())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Preflight,
    Publish,
    Trickle,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preflight => "preflight",
            Self::Publish => "publish",
            Self::Trickle => "trickle",
        })
    }
}

/// Failure of a single queued signaling operation.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("{step} failed: {source}")]
    Transport {
        step: Step,
        #[source]
        source: TransportError,
    },
    #[error("peer connection rejected the remote answer: {}", .0)]
    PeerConnection(anyhow::Error),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("signaler is not started")]
    NotStarted,
    #[error("dispatch queue is closed")]
    DispatchClosed,
}

impl SignalingError {
    /// The protocol step this error came from, if it came from the network.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::Protocol(ProtocolError::Preflight(_)) => Some(Step::Preflight),
            Self::Protocol(ProtocolError::Publish(_)) => Some(Step::Publish),
            Self::Protocol(ProtocolError::Trickle(_)) => Some(Step::Trickle),
            Self::Transport { step, .. } => Some(*step),
            Self::PeerConnection(_)
            | Self::Configuration(_)
            | Self::NotStarted
            | Self::DispatchClosed => None,
        }
    }
}
