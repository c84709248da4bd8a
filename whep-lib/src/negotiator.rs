use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    error::{ProtocolError, SignalingError, Step},
    session::{Phase, SessionState, SharedSession},
    signaling::{RemoteAnswer, SignalingMessage},
    transport::WhepTransport,
    whep_endpoint::{
        resource_id_from_location, PreflightResponse, PublishResponse, TrickleResponse,
        WhepRequest,
    },
};

fn record_resource_id(session: &SharedSession, generation: u64, resource_id: &str) {
    let resource_id = resource_id.to_owned();
    if session
        .with_generation(generation, |x| x.set_remote_peer_id(resource_id))
        .is_none()
    {
        info!("session was reset during publish, dropping resource id");
    }
}

/// Runs the OPTIONS / POST / PATCH sequence for one message.
pub struct Negotiator {
    transport: Arc<dyn WhepTransport>,
    auto_log_errors: bool,
}

impl Negotiator {
    pub fn new(transport: Arc<dyn WhepTransport>, auto_log_errors: bool) -> Self {
        Self {
            transport,
            auto_log_errors,
        }
    }

    fn log_failure(&self, remote_peer_id: Option<&str>, err: &SignalingError) {
        if self.auto_log_errors {
            warn!(
                "Failed to send message to remote peer {:?}: {}",
                remote_peer_id, err
            );
        } else {
            debug!(
                "Failed to send message to remote peer {:?}: {}",
                remote_peer_id, err
            );
        }
    }

    /// Sends `message` against the session of `generation`.
    ///
    /// Returns the server's answer when a description was published. Nothing
    /// is sent, and `Ok(None)` is returned, if the session has been renewed
    /// since the message was queued.
    pub async fn negotiate(
        &self,
        session: &SharedSession,
        generation: u64,
        message: &SignalingMessage,
    ) -> Result<Option<RemoteAnswer>, SignalingError> {
        let Some(snapshot) = session.with_generation(generation, |x| x.clone()) else {
            debug!("discarding message queued for stale session {}", generation);
            return Ok(None);
        };
        let resource_url = snapshot
            .resource_url()
            .filter(|_| snapshot.has_resource());
        let result = match resource_url {
            Some(resource_url) => {
                session.set_state(generation, SessionState::Negotiating(Phase::Trickle));
                self.trickle(resource_url, message.content())
                    .await
                    .map(|_| None)
            }
            None => {
                session.set_state(generation, SessionState::Negotiating(Phase::Offer));
                let server_address = snapshot.server_address();
                self.publish(session, generation, server_address, message.content())
                    .await
            }
        };
        session.settle(generation);
        if let Err(err) = &result {
            let remote_peer_id = session
                .with_generation(generation, |x| x.remote_peer_id().map(|x| x.to_owned()))
                .flatten();
            self.log_failure(remote_peer_id.as_deref(), err);
        }
        result
    }

    async fn publish(
        &self,
        session: &SharedSession,
        generation: u64,
        server_address: &str,
        sdp: &str,
    ) -> Result<Option<RemoteAnswer>, SignalingError> {
        let res = self
            .transport
            .send(WhepRequest::preflight(server_address))
            .await
            .map_err(|source| SignalingError::Transport {
                step: Step::Preflight,
                source,
            })?;
        if let PreflightResponse::Rejected(status) = PreflightResponse::parse(res.status()) {
            return Err(ProtocolError::Preflight(status).into());
        }

        let res = match self
            .transport
            .send(WhepRequest::publish(server_address, sdp))
            .await
        {
            Ok(res) => PublishResponse::parse(res),
            Err(source) => {
                if let Some(location) = source.location() {
                    let resource_id = resource_id_from_location(location);
                    record_resource_id(session, generation, resource_id);
                }
                return Err(SignalingError::Transport {
                    step: Step::Publish,
                    source,
                });
            }
        };
        if let Some(resource_id) = res.resource_id() {
            record_resource_id(session, generation, resource_id);
        }
        match res {
            PublishResponse::Rejected { status, .. } => Err(ProtocolError::Publish(status).into()),
            PublishResponse::Answer { answer, .. } => {
                if session.current_generation() != Some(generation) {
                    info!("session was reset during publish, dropping answer");
                    return Ok(None);
                }
                debug!("working with the server sdp answer");
                Ok(Some(answer))
            }
        }
    }

    async fn trickle(&self, resource_url: String, fragment: &str) -> Result<(), SignalingError> {
        let res = self
            .transport
            .send(WhepRequest::trickle(resource_url, fragment))
            .await
            .map_err(|source| SignalingError::Transport {
                step: Step::Trickle,
                source,
            })?;
        match TrickleResponse::parse(res.status()) {
            TrickleResponse::Accepted => Ok(()),
            TrickleResponse::Rejected(status) => Err(ProtocolError::Trickle(status).into()),
        }
    }
}
