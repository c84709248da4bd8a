use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use crate::signaling::{RemoteAnswer, SdpType, SignalingMessage};

/// What the signaler needs from the local peer connection.
#[async_trait]
pub trait PeerConnection: Send + Sync + 'static {
    /// Begins negotiation; the local description arrives later as an event.
    async fn start_connection(&self) -> Result<()>;
    async fn handle_remote_answer(&self, answer: RemoteAnswer) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerConnectionEvent {
    Initialized,
    LocalDescription { sdp_type: SdpType, sdp: String },
    LocalIceCandidate(String),
}

impl PeerConnectionEvent {
    pub fn into_message(self) -> Option<SignalingMessage> {
        match self {
            Self::Initialized => None,
            Self::LocalDescription { sdp_type, sdp } => Some(SignalingMessage::Description {
                sdp_type,
                content: sdp,
            }),
            Self::LocalIceCandidate(candidate) => Some(SignalingMessage::ice_candidate(candidate)),
        }
    }
}

/// Handed to the peer connection to raise its events.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<PeerConnectionEvent>,
}

impl EventSink {
    fn emit(&self, event: PeerConnectionEvent) {
        if self.tx.send(event).is_err() {
            trace!("no listener for peer connection events");
        }
    }

    pub fn initialized(&self) {
        self.emit(PeerConnectionEvent::Initialized);
    }

    pub fn local_description(&self, sdp_type: SdpType, sdp: String) {
        self.emit(PeerConnectionEvent::LocalDescription { sdp_type, sdp });
    }

    pub fn local_candidate(&self, candidate: String) {
        self.emit(PeerConnectionEvent::LocalIceCandidate(candidate));
    }
}

/// Subscription end of an [`EventSink`]; registered on the signaler.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<PeerConnectionEvent>,
}

impl EventStream {
    pub async fn recv(&mut self) -> Option<PeerConnectionEvent> {
        self.rx.recv().await
    }
}

pub fn event_channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EventStream { rx })
}
