use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use tracing::info;

use crate::{
    error::TransportError,
    whep_endpoint::{WhepRequest, WhepResponse},
};

/// Performs one HTTP exchange against a WHEP endpoint.
#[async_trait]
pub trait WhepTransport: Send + Sync {
    async fn send(&self, req: WhepRequest) -> Result<WhepResponse, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WhepTransport for HttpTransport {
    async fn send(&self, req: WhepRequest) -> Result<WhepResponse, TransportError> {
        info!("{} {}", req.method(), req.url());
        let mut builder = self.client.request(req.method().clone(), req.url());
        if let Some(content_type) = req.content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        let res = builder.body(req.body().clone()).send().await?;
        info!("{:?}", res.status());
        let status = res.status();
        let location = res
            .headers()
            .get(LOCATION)
            .and_then(|x| x.to_str().ok())
            .map(|x| x.to_owned());
        // The resource exists once the headers arrived, even if the body fails.
        let body = match res.text().await {
            Ok(body) => body,
            Err(err) => return Err(TransportError::from(err).with_location(location)),
        };
        Ok(WhepResponse::new(status, location, body))
    }
}
