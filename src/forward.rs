//! Best-effort fan-out of accepted payloads.
//!
//! Every target gets its own detached task. A task ends when its target
//! answers or the timeout expires; outcomes are only logged.

use std::time::Duration;

use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Client, Request, StatusCode};
use hyper_tls::HttpsConnector;
use log::{info, warn};
use tokio::task::JoinHandle;

use crate::error::ForwardError;

pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_CONTENT_TYPE: &str = "application/json";

type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

#[derive(Clone)]
pub struct Forwarder {
    client: HttpsClient,
    timeout: Duration,
}

impl Default for Forwarder {
    fn default() -> Self {
        Forwarder::new(FORWARD_TIMEOUT)
    }
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Forwarder {
        let https = HttpsConnector::new();
        let client = Client::builder().build::<_, Body>(https);
        Forwarder { client, timeout }
    }

    /// Spawns one POST per target and returns at once.
    ///
    /// The handles may be dropped; the tasks keep running. Must be called
    /// from inside a tokio runtime.
    pub fn dispatch(
        &self,
        targets: &[String],
        body: Bytes,
        content_type: Option<&HeaderValue>,
    ) -> Vec<JoinHandle<Result<StatusCode, ForwardError>>> {
        let content_type = content_type
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

        targets
            .iter()
            .map(|target| {
                let forwarder = self.clone();
                let target = target.clone();
                let body = body.clone();
                let content_type = content_type.clone();
                tokio::spawn(async move {
                    let result = forwarder.forward(&target, body, content_type).await;
                    match &result {
                        Ok(status) => info!("Forwarded webhook to {} (status: {})", target, status.as_u16()),
                        Err(err) => warn!("Failed to forward webhook to {}: {}", target, err),
                    }
                    result
                })
            })
            .collect()
    }

    async fn forward(
        &self,
        target: &str,
        body: Bytes,
        content_type: HeaderValue,
    ) -> Result<StatusCode, ForwardError> {
        let req = Request::post(target)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))?;
        let res = tokio::time::timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| ForwardError::Timeout(self.timeout))??;
        Ok(res.status())
    }
}
