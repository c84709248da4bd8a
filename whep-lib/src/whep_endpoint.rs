use derive_new::new;
use getset::{CopyGetters, Getters};
use http::{Method, StatusCode};

use crate::signaling::RemoteAnswer;

pub const SDP_CONTENT_TYPE: &str = "application/sdp";
pub const TRICKLE_ICE_CONTENT_TYPE: &str = "application/trickle-ice-sdpfrag";

#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct WhepRequest {
    #[get = "pub"]
    method: Method,
    #[get = "pub"]
    url: String,
    #[get_copy = "pub"]
    content_type: Option<&'static str>,
    #[get = "pub"]
    body: String,
}

impl WhepRequest {
    // OPTIONS {server}

    pub fn preflight(server_address: &str) -> Self {
        Self {
            method: Method::OPTIONS,
            url: server_address.to_owned(),
            content_type: None,
            body: String::new(),
        }
    }

    // POST {server}

    pub fn publish(server_address: &str, sdp: &str) -> Self {
        Self {
            method: Method::POST,
            url: server_address.to_owned(),
            content_type: Some(SDP_CONTENT_TYPE),
            body: sdp.to_owned(),
        }
    }

    // PATCH {server}/{resource}

    pub fn trickle(resource_url: String, fragment: &str) -> Self {
        Self {
            method: Method::PATCH,
            url: resource_url,
            content_type: Some(TRICKLE_ICE_CONTENT_TYPE),
            body: fragment.to_owned(),
        }
    }
}

/// Raw outcome of one HTTP exchange, as much as the protocol looks at.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters, new)]
pub struct WhepResponse {
    #[get_copy = "pub"]
    status: StatusCode,
    location: Option<String>,
    #[get = "pub"]
    body: String,
}

impl WhepResponse {
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

fn is_protocol_error(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

/// Last `/`-separated segment of a `Location` header, taken as is.
///
/// A trailing slash yields an empty identifier.
pub fn resource_id_from_location(location: &str) -> &str {
    location.rsplit('/').next().unwrap_or_default()
}

#[derive(Debug, PartialEq, Eq)]
pub enum PreflightResponse {
    Allowed,
    Rejected(StatusCode),
}

impl PreflightResponse {
    pub fn parse(status: StatusCode) -> Self {
        if is_protocol_error(status) {
            Self::Rejected(status)
        } else {
            Self::Allowed
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PublishResponse {
    Answer {
        resource_id: Option<String>,
        answer: RemoteAnswer,
    },
    Rejected {
        resource_id: Option<String>,
        status: StatusCode,
    },
}

impl PublishResponse {
    pub fn parse(res: WhepResponse) -> Self {
        let resource_id = res
            .location()
            .map(|x| resource_id_from_location(x).to_owned());
        if is_protocol_error(res.status) {
            return Self::Rejected {
                resource_id,
                status: res.status,
            };
        }
        Self::Answer {
            resource_id,
            answer: RemoteAnswer::new(res.body),
        }
    }

    /// The resource may exist even when the server reports an error.
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Self::Answer { resource_id, .. } => resource_id.as_deref(),
            Self::Rejected { resource_id, .. } => resource_id.as_deref(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum TrickleResponse {
    Accepted,
    Rejected(StatusCode),
}

impl TrickleResponse {
    pub fn parse(status: StatusCode) -> Self {
        if is_protocol_error(status) {
            Self::Rejected(status)
        } else {
            Self::Accepted
        }
    }
}
