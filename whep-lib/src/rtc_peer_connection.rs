use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{debug, info, trace, warn};
use webrtc::{
    api::{media_engine::MediaEngine, setting_engine::SettingEngine, APIBuilder},
    ice_transport::ice_server::RTCIceServer,
    peer_connection::{
        configuration::RTCConfiguration, offer_answer_options::RTCOfferOptions,
        sdp::session_description::RTCSessionDescription, RTCPeerConnection,
    },
    rtp_transceiver::{
        rtp_codec::RTPCodecType, rtp_transceiver_direction::RTCRtpTransceiverDirection,
        RTCRtpTransceiverInit,
    },
};

use crate::{
    peer_connection::{EventSink, PeerConnection},
    signaling::{RemoteAnswer, SdpType},
};

fn create_config(ice_servers: &[String]) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: vec![RTCIceServer {
            urls: ice_servers.to_vec(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

async fn create_receive_only_peer_connection(ice_servers: &[String]) -> Result<RTCPeerConnection> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;
    let mut setting_engine = SettingEngine::default();
    setting_engine.set_ice_timeouts(None, Some(Duration::from_secs(20 * 60)), None);
    let rtc = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_setting_engine(setting_engine)
        .build()
        .new_peer_connection(create_config(ice_servers))
        .await?;
    for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
        rtc.add_transceiver_from_kind(
            kind,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
                send_encodings: vec![],
            }),
        )
        .await?;
    }
    Ok(rtc)
}

/// Receive-only `webrtc` peer connection driven by a WHEP signaler.
pub struct RtcPeerConnection {
    rtc: RTCPeerConnection,
    events: EventSink,
}

impl RtcPeerConnection {
    /// Creates the connection and reports it initialized on `events`.
    pub async fn new(ice_servers: &[String], events: EventSink) -> Result<Arc<Self>> {
        let rtc = create_receive_only_peer_connection(ice_servers).await?;

        let candidate_events = events.clone();
        rtc.on_ice_candidate(Box::new(move |candidate| {
            if let Some(candidate) = candidate {
                match candidate.to_json() {
                    Ok(init) => candidate_events.local_candidate(init.candidate),
                    Err(err) => warn!("failed to serialize ice candidate: {}", err),
                }
            }
            Box::pin(async {})
        }));
        rtc.on_peer_connection_state_change(Box::new(|state| {
            debug!("on_peer_connection_state_change {}", state);
            Box::pin(async {})
        }));
        rtc.on_track(Box::new(|track, _receiver, _transceiver| {
            info!("remote {} track received", track.kind());
            Box::pin(async {})
        }));

        events.initialized();
        Ok(Arc::new(Self { rtc, events }))
    }

    pub async fn close(&self) -> Result<()> {
        self.rtc.close().await?;
        trace!("connection closed");
        Ok(())
    }
}

#[async_trait]
impl PeerConnection for RtcPeerConnection {
    async fn start_connection(&self) -> Result<()> {
        // Offers after the first one restart ICE.
        let options = self
            .rtc
            .remote_description()
            .await
            .map(|_| RTCOfferOptions {
                ice_restart: true,
                ..Default::default()
            });
        let offer = self.rtc.create_offer(options).await?;

        let mut gather_complete = self.rtc.gathering_complete_promise().await;
        self.rtc.set_local_description(offer).await?;
        let _ = gather_complete.recv().await;

        let local_desc = self
            .rtc
            .local_description()
            .await
            .ok_or_else(|| anyhow!("Failed to get local description"))?;
        self.events.local_description(SdpType::Offer, local_desc.sdp);
        Ok(())
    }

    async fn handle_remote_answer(&self, answer: RemoteAnswer) -> Result<()> {
        let answer_desc = RTCSessionDescription::answer(answer.into_sdp())?;
        self.rtc.set_remote_description(answer_desc).await?;
        Ok(())
    }
}
