use std::sync::{Arc, Mutex};

use getset::{CopyGetters, Getters};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Offer,
    Trickle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Starting,
    Negotiating(Phase),
    Established,
    Resetting,
}

/// Negotiation state against one WHEP endpoint.
///
/// `generation` identifies this session among the ones created by restarts
/// and server switches. Results of an exchange issued against an older
/// generation are never applied.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct SignalingSession {
    #[get = "pub"]
    server_address: String,
    #[get = "pub"]
    local_peer_id: String,
    remote_peer_id: Option<String>,
    last_sent_description: Option<String>,
    #[get_copy = "pub"]
    generation: u64,
}

impl SignalingSession {
    pub fn new(server_address: String, local_peer_id: String, generation: u64) -> Self {
        Self {
            server_address,
            local_peer_id,
            remote_peer_id: None,
            last_sent_description: None,
            generation,
        }
    }

    /// Fresh session for `server_address`, keeping the local identity.
    pub fn renew(&self, server_address: String) -> Self {
        Self::new(
            server_address,
            self.local_peer_id.clone(),
            self.generation + 1,
        )
    }

    pub fn remote_peer_id(&self) -> Option<&str> {
        self.remote_peer_id.as_deref()
    }

    /// An empty identifier (from a malformed `Location`) does not count.
    pub fn has_resource(&self) -> bool {
        self.remote_peer_id.as_ref().is_some_and(|x| !x.is_empty())
    }

    /// Records the server-allocated resource identifier.
    ///
    /// Only an absent (or empty) identifier is replaced; once a usable one is
    /// known it stays until the session is renewed.
    pub fn set_remote_peer_id(&mut self, remote_peer_id: String) -> bool {
        if self.has_resource() {
            warn!(
                "ignoring resource id {:?}, already have {:?}",
                remote_peer_id, self.remote_peer_id
            );
            return false;
        }
        debug!("remote peer id is {:?}", remote_peer_id);
        self.remote_peer_id = Some(remote_peer_id);
        true
    }

    pub fn last_sent_description(&self) -> Option<&str> {
        self.last_sent_description.as_deref()
    }

    pub fn record_description(&mut self, content: &str) {
        self.last_sent_description = Some(content.to_owned());
    }

    pub fn resource_url(&self) -> Option<String> {
        self.remote_peer_id
            .as_ref()
            .map(|id| format!("{}/{}", self.server_address, id))
    }
}

#[derive(Debug, Default)]
struct SessionSlot {
    session: Option<SignalingSession>,
    state: SessionState,
}

/// The single session of a signaler, shared between its handle and the
/// dispatch worker. The lock is never held across an await.
#[derive(Clone, Debug, Default)]
pub struct SharedSession(Arc<Mutex<SessionSlot>>);

impl SharedSession {
    pub fn snapshot(&self) -> Option<SignalingSession> {
        self.0.lock().unwrap().session.clone()
    }

    pub fn state(&self) -> SessionState {
        self.0.lock().unwrap().state
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.0.lock().unwrap().session.as_ref().map(|x| x.generation)
    }

    pub(crate) fn begin(&self, session: SignalingSession) {
        let mut slot = self.0.lock().unwrap();
        slot.session = Some(session);
        slot.state = SessionState::Starting;
    }

    /// Replaces the current session with a renewed one, returning it.
    pub(crate) fn reset(&self, server_address: Option<String>) -> Option<SignalingSession> {
        let mut guard = self.0.lock().unwrap();
        let slot = &mut *guard;
        let current = slot.session.as_ref()?;
        slot.state = SessionState::Resetting;
        let server_address = server_address.unwrap_or_else(|| current.server_address.clone());
        let renewed = current.renew(server_address);
        slot.session = Some(renewed.clone());
        slot.state = SessionState::Starting;
        Some(renewed)
    }

    pub(crate) fn with_session<R>(&self, f: impl FnOnce(&mut SignalingSession) -> R) -> Option<R> {
        self.0.lock().unwrap().session.as_mut().map(f)
    }

    /// Runs `f` only if `generation` is still the current session.
    pub(crate) fn with_generation<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut SignalingSession) -> R,
    ) -> Option<R> {
        let mut slot = self.0.lock().unwrap();
        match slot.session.as_mut() {
            Some(session) if session.generation == generation => Some(f(session)),
            _ => None,
        }
    }

    pub(crate) fn set_state(&self, generation: u64, state: SessionState) {
        let mut slot = self.0.lock().unwrap();
        if slot.session.as_ref().map(|x| x.generation) == Some(generation) {
            slot.state = state;
        }
    }

    /// Settles the state after an exchange of `generation` finished.
    pub(crate) fn settle(&self, generation: u64) {
        let mut guard = self.0.lock().unwrap();
        let slot = &mut *guard;
        let Some(session) = slot.session.as_ref() else {
            return;
        };
        if session.generation != generation {
            return;
        }
        slot.state = if session.has_resource() {
            SessionState::Established
        } else {
            SessionState::Starting
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> SharedSession {
        let shared = SharedSession::default();
        shared.begin(SignalingSession::new(
            "http://h:8100/s/whep".to_owned(),
            "local".to_owned(),
            0,
        ));
        shared
    }

    #[test]
    fn resource_id_is_set_once() {
        let mut session = SignalingSession::new("http://h/whep".to_owned(), "l".to_owned(), 0);
        assert!(session.set_remote_peer_id("a".to_owned()));
        assert!(!session.set_remote_peer_id("b".to_owned()));
        assert_eq!(session.remote_peer_id(), Some("a"));
        assert_eq!(session.resource_url().as_deref(), Some("http://h/whep/a"));
    }

    #[test]
    fn empty_resource_id_is_kept_but_can_be_replaced() {
        let mut session = SignalingSession::new("http://h/whep".to_owned(), "l".to_owned(), 0);
        assert!(session.set_remote_peer_id(String::new()));
        assert_eq!(session.remote_peer_id(), Some(""));
        assert!(!session.has_resource());
        assert!(session.set_remote_peer_id("a".to_owned()));
    }

    #[test]
    fn reset_clears_negotiation_state() {
        let shared = started();
        shared.with_session(|s| {
            s.set_remote_peer_id("peer9".to_owned());
            s.record_description("O1");
        });
        shared.settle(0);
        assert_eq!(shared.state(), SessionState::Established);

        let renewed = shared.reset(None).unwrap();
        assert_eq!(renewed.generation(), 1);
        assert_eq!(renewed.remote_peer_id(), None);
        assert_eq!(renewed.last_sent_description(), None);
        assert_eq!(renewed.server_address(), "http://h:8100/s/whep");
        assert_eq!(renewed.local_peer_id(), "local");
        assert_eq!(shared.state(), SessionState::Starting);
    }

    #[test]
    fn reset_before_start_does_nothing() {
        let shared = SharedSession::default();
        assert!(shared.reset(None).is_none());
        assert_eq!(shared.state(), SessionState::Uninitialized);
    }

    #[test]
    fn stale_generation_is_not_applied() {
        let shared = started();
        shared.reset(Some("http://other/whep".to_owned()));
        let applied = shared.with_generation(0, |s| s.set_remote_peer_id("old".to_owned()));
        assert_eq!(applied, None);
        shared.set_state(0, SessionState::Negotiating(Phase::Offer));
        assert_eq!(shared.state(), SessionState::Starting);
        let snapshot = shared.snapshot().unwrap();
        assert_eq!(snapshot.server_address(), "http://other/whep");
        assert_eq!(snapshot.remote_peer_id(), None);
    }
}
