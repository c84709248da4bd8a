use std::fmt;

use derive_new::new;
use tracing::{debug, trace};

use crate::session::SignalingSession;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
        })
    }
}

/// Outgoing signaling payload raised by the local peer connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalingMessage {
    Description { sdp_type: SdpType, content: String },
    IceCandidate { content: String },
}

impl SignalingMessage {
    pub fn offer(content: impl Into<String>) -> Self {
        Self::Description {
            sdp_type: SdpType::Offer,
            content: content.into(),
        }
    }

    pub fn answer(content: impl Into<String>) -> Self {
        Self::Description {
            sdp_type: SdpType::Answer,
            content: content.into(),
        }
    }

    pub fn ice_candidate(content: impl Into<String>) -> Self {
        Self::IceCandidate {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Description { content, .. } => content,
            Self::IceCandidate { content } => content,
        }
    }
}

/// SDP answer returned by the server for a published offer.
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct RemoteAnswer {
    sdp: String,
}

impl RemoteAnswer {
    pub fn sdp(&self) -> &str {
        &self.sdp
    }

    pub fn into_sdp(self) -> String {
        self.sdp
    }
}

/// Decides whether `message` has to go on the wire for `session`.
///
/// A description identical to the last one sent is a no-op. A candidate is
/// dropped while the server has not allocated a session resource yet; it is
/// not buffered for later.
pub fn should_send(session: &SignalingSession, message: &SignalingMessage) -> bool {
    match message {
        SignalingMessage::Description { content, .. } => {
            if session.last_sent_description() == Some(content.as_str()) {
                debug!("not sending the same description again");
                return false;
            }
            true
        }
        SignalingMessage::IceCandidate { .. } => {
            if !session.has_resource() {
                trace!("dropping ice candidate, no session resource yet");
                return false;
            }
            true
        }
    }
}
