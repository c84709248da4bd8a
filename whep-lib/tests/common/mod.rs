#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use http::StatusCode;
use tokio::{
    runtime::Handle,
    sync::{oneshot, watch},
    time::timeout,
};
use whep_lib::{
    peer_connection::{event_channel, EventSink, PeerConnection},
    transport::WhepTransport,
    whep_endpoint::{WhepRequest, WhepResponse},
    RemoteAnswer, TransportError, WhepConfig, WhepSignaler,
};

pub const SERVER: &str = "http://h:8100/s/whep";

enum Scripted {
    Respond(Result<WhepResponse, TransportError>),
    Gated(oneshot::Receiver<()>, Result<WhepResponse, TransportError>),
}

/// Records every request and answers from a script, `200 OK` once it runs out.
pub struct MockTransport {
    requests: Mutex<Vec<WhepRequest>>,
    script: Mutex<VecDeque<Scripted>>,
    count_tx: watch::Sender<usize>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            count_tx: watch::channel(0).0,
        })
    }

    pub fn respond(&self, status: StatusCode, location: Option<&str>, body: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Respond(Ok(response(status, location, body))));
    }

    pub fn fail(&self, err: TransportError) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Respond(Err(err)));
    }

    /// Headers with `location` arrive, then reading the body fails.
    pub fn fail_after_headers(&self, location: &str, message: &str) {
        self.fail(TransportError::new(message).with_location(Some(location.to_owned())));
    }

    /// The next scripted response is held until the returned sender fires.
    pub fn respond_when_released(
        &self,
        status: StatusCode,
        location: Option<&str>,
        body: &str,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().push_back(Scripted::Gated(
            rx,
            Ok(response(status, location, body)),
        ));
        tx
    }

    pub fn requests(&self) -> Vec<WhepRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn summary(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|x| format!("{} {}", x.method(), x.url()))
            .collect()
    }

    pub async fn wait_for_requests(&self, n: usize) {
        let mut rx = self.count_tx.subscribe();
        timeout(Duration::from_secs(5), rx.wait_for(|&count| count >= n))
            .await
            .expect("timed out waiting for requests")
            .unwrap();
    }
}

fn response(status: StatusCode, location: Option<&str>, body: &str) -> WhepResponse {
    WhepResponse::new(status, location.map(|x| x.to_owned()), body.to_owned())
}

#[async_trait]
impl WhepTransport for MockTransport {
    async fn send(&self, req: WhepRequest) -> Result<WhepResponse, TransportError> {
        let count = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(req);
            requests.len()
        };
        self.count_tx.send_replace(count);
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            None => Ok(response(StatusCode::OK, None, "")),
            Some(Scripted::Respond(result)) => result,
            Some(Scripted::Gated(gate, result)) => {
                let _ = gate.await;
                result
            }
        }
    }
}

/// Remembers answers and counts connection starts.
pub struct RecordingPeerConnection {
    answers: Mutex<Vec<String>>,
    reject_answers: bool,
    starts_tx: watch::Sender<usize>,
    offers: Mutex<VecDeque<String>>,
    events: Mutex<Option<EventSink>>,
}

impl RecordingPeerConnection {
    pub fn new() -> Arc<Self> {
        Self::build(false)
    }

    pub fn rejecting_answers() -> Arc<Self> {
        Self::build(true)
    }

    fn build(reject_answers: bool) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(Vec::new()),
            reject_answers,
            starts_tx: watch::channel(0).0,
            offers: Mutex::new(VecDeque::new()),
            events: Mutex::new(None),
        })
    }

    /// Each start raises the next of these offers on `events`.
    pub fn produce_offers(&self, events: EventSink, offers: &[&str]) {
        *self.events.lock().unwrap() = Some(events);
        self.offers
            .lock()
            .unwrap()
            .extend(offers.iter().map(|x| x.to_string()));
    }

    pub fn answers(&self) -> Vec<String> {
        self.answers.lock().unwrap().clone()
    }

    pub fn starts(&self) -> usize {
        *self.starts_tx.borrow()
    }

    pub async fn wait_for_starts(&self, n: usize) {
        let mut rx = self.starts_tx.subscribe();
        timeout(Duration::from_secs(5), rx.wait_for(|&count| count >= n))
            .await
            .expect("timed out waiting for starts")
            .unwrap();
    }
}

#[async_trait]
impl PeerConnection for RecordingPeerConnection {
    async fn start_connection(&self) -> Result<()> {
        self.starts_tx.send_modify(|x| *x += 1);
        let offer = self.offers.lock().unwrap().pop_front();
        if let (Some(offer), Some(events)) = (offer, self.events.lock().unwrap().as_ref()) {
            events.local_description(whep_lib::SdpType::Offer, offer);
        }
        Ok(())
    }

    async fn handle_remote_answer(&self, answer: RemoteAnswer) -> Result<()> {
        if self.reject_answers {
            bail!("malformed answer");
        }
        self.answers.lock().unwrap().push(answer.into_sdp());
        Ok(())
    }
}

pub fn config(server_address: &str) -> WhepConfig {
    WhepConfig {
        server_address: Some(server_address.to_owned()),
        local_peer_id: Some("local".to_owned()),
        ..Default::default()
    }
}

pub struct Fixture {
    pub signaler: WhepSignaler,
    pub transport: Arc<MockTransport>,
    pub peer_connection: Arc<RecordingPeerConnection>,
    pub events: EventSink,
}

pub fn started(peer_connection: Arc<RecordingPeerConnection>) -> Fixture {
    let transport = MockTransport::new();
    let signaler = WhepSignaler::new(
        config(SERVER),
        transport.clone(),
        peer_connection.clone(),
        Arc::new(Handle::current()),
    );
    let (events, stream) = event_channel();
    signaler.start(stream).unwrap();
    Fixture {
        signaler,
        transport,
        peer_connection,
        events,
    }
}
