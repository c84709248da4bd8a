use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{debug, error, info, warn};

use crate::{
    config::WhepConfig,
    dispatch_queue::{CompletionHandle, DispatchQueue, ExecutionContext},
    error::{ConfigurationError, SignalingError},
    negotiator::Negotiator,
    peer_connection::{EventStream, PeerConnection, PeerConnectionEvent},
    session::{SessionState, SharedSession, SignalingSession},
    signaling::{should_send, RemoteAnswer, SignalingMessage},
    transport::WhepTransport,
};

/// Hands `answer` to the peer connection unless the session of `generation`
/// has been replaced in the meantime.
async fn deliver_answer(
    session: &SharedSession,
    peer_connection: &dyn PeerConnection,
    generation: u64,
    answer: RemoteAnswer,
) -> Result<Option<RemoteAnswer>, SignalingError> {
    if session.current_generation() != Some(generation) {
        info!("session was reset before the answer was applied, dropping it");
        return Ok(None);
    }
    peer_connection
        .handle_remote_answer(answer.clone())
        .await
        .map_err(SignalingError::PeerConnection)?;
    Ok(Some(answer))
}

struct Inner {
    config: WhepConfig,
    session: SharedSession,
    queue: DispatchQueue,
    negotiator: Negotiator,
    peer_connection: Arc<dyn PeerConnection>,
    context: Arc<dyn ExecutionContext>,
    initialized: AtomicBool,
}

/// WHEP signaling for one local peer connection.
///
/// Cloning yields another handle to the same signaler.
#[derive(Clone)]
pub struct WhepSignaler {
    inner: Arc<Inner>,
}

impl WhepSignaler {
    pub fn new(
        config: WhepConfig,
        transport: Arc<dyn WhepTransport>,
        peer_connection: Arc<dyn PeerConnection>,
        context: Arc<dyn ExecutionContext>,
    ) -> Self {
        let negotiator = Negotiator::new(transport, config.auto_log_errors);
        let queue = DispatchQueue::new(context.as_ref());
        Self {
            inner: Arc::new(Inner {
                config,
                session: SharedSession::default(),
                queue,
                negotiator,
                peer_connection,
                context,
                initialized: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &WhepConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SessionState {
        self.inner.session.state()
    }

    /// Read-only copy of the current session.
    pub fn session(&self) -> Option<SignalingSession> {
        self.inner.session.snapshot()
    }

    /// Validates the configuration, opens the session and subscribes to the
    /// peer connection's events.
    ///
    /// The peer connection is asked to start once it reports that it is
    /// initialized.
    pub fn start(&self, events: EventStream) -> Result<(), ConfigurationError> {
        if self.state() != SessionState::Uninitialized {
            warn!("signaler is already started");
            return Ok(());
        }
        let server_address = self.inner.config.server_address()?.to_owned();
        let local_peer_id = self.inner.config.local_peer_id_or_host();
        self.inner
            .session
            .begin(SignalingSession::new(server_address, local_peer_id, 0));

        let signaler = self.clone();
        self.inner
            .context
            .spawn(Box::pin(async move { signaler.listen(events).await }));
        Ok(())
    }

    async fn listen(self, mut events: EventStream) {
        while let Some(event) = events.recv().await {
            match event {
                PeerConnectionEvent::Initialized => {
                    if self.inner.initialized.swap(true, Ordering::SeqCst) {
                        continue;
                    }
                    self.start_connection().await;
                }
                event => {
                    let Some(message) = event.into_message() else {
                        continue;
                    };
                    let handle = self.send_message(message);
                    self.inner.context.spawn(Box::pin(async move {
                        if let Err(err) = handle.await {
                            debug!("signaling message failed: {}", err);
                        }
                    }));
                }
            }
        }
        debug!("peer connection events closed");
    }

    async fn start_connection(&self) {
        if let Some(session) = self.session() {
            info!("Local peer ID is {}", session.local_peer_id());
        }
        if let Err(err) = self.inner.peer_connection.start_connection().await {
            error!("failed to start connection: {}", err);
        }
    }

    /// Queues `message` for delivery.
    ///
    /// Duplicate descriptions and candidates without a session resource
    /// resolve immediately with `Ok(None)` and never reach the network.
    pub fn send_message(
        &self,
        message: SignalingMessage,
    ) -> CompletionHandle<Option<RemoteAnswer>> {
        let admitted = self.inner.session.with_session(|session| {
            if !should_send(session, &message) {
                return None;
            }
            match &message {
                SignalingMessage::Description { sdp_type, content } => {
                    session.record_description(content);
                    info!("Sending message of type {} to remote peer", sdp_type);
                }
                SignalingMessage::IceCandidate { .. } => {
                    info!(
                        "Sending ICE candidate to remote peer {}",
                        session.remote_peer_id().unwrap_or_default()
                    );
                }
            }
            Some(session.generation())
        });
        let generation = match admitted {
            None => return CompletionHandle::ready(Err(SignalingError::NotStarted)),
            Some(None) => return CompletionHandle::ready(Ok(None)),
            Some(Some(generation)) => generation,
        };

        let inner = self.inner.clone();
        self.inner.queue.enqueue(async move {
            let answer = inner
                .negotiator
                .negotiate(&inner.session, generation, &message)
                .await?;
            let Some(answer) = answer else {
                return Ok(None);
            };
            deliver_answer(
                &inner.session,
                inner.peer_connection.as_ref(),
                generation,
                answer,
            )
            .await
        })
    }

    /// Drops the session resource and the last description, then starts over.
    ///
    /// An exchange already in flight finishes, but its result is not applied.
    pub fn restart_connection(&self) -> Result<(), SignalingError> {
        self.reset(None)
    }

    /// Restarts against `server_address`.
    pub fn switch_server(&self, server_address: String) -> Result<(), SignalingError> {
        if server_address.is_empty() {
            return Err(ConfigurationError::MissingServerAddress.into());
        }
        info!("HttpServerAddress set to: {}", server_address);
        self.reset(Some(server_address))
    }

    fn reset(&self, server_address: Option<String>) -> Result<(), SignalingError> {
        let Some(session) = self.inner.session.reset(server_address) else {
            error!("signaler is not started");
            return Err(SignalingError::NotStarted);
        };
        info!(
            "restarting session {} against {}",
            session.generation(),
            session.server_address()
        );
        if self.inner.initialized.load(Ordering::SeqCst) {
            let signaler = self.clone();
            self.inner
                .context
                .spawn(Box::pin(async move { signaler.start_connection().await }));
        }
        Ok(())
    }
}
