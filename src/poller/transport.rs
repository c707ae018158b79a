use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};

/// What one poll of the gate produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateReply {
    /// Success response; the body is the payload.
    Released(Bytes),
    /// Any non-success response. The body is informational only.
    NotYet { status: u16, message: String },
}

/// One round-trip to the gate. An `Err` means the server could not be
/// reached at all, which ends the session.
#[async_trait]
pub trait GateTransport: Send + Sync {
    async fn check(&self, identifier: &str) -> anyhow::Result<GateReply>;
}

/// HTTP client for `GET /check-access`.
pub struct HttpGateTransport {
    client: Client,
    endpoint: Url,
}

impl HttpGateTransport {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: check_access_url(base_url)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Resolve `check-access` relative to `base_url`, keeping any path prefix
/// (`http://host/gate` → `http://host/gate/check-access`).
fn check_access_url(base_url: &str) -> anyhow::Result<Url> {
    let mut base = Url::parse(base_url).with_context(|| format!("invalid gate URL: {}", base_url))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("check-access")
        .with_context(|| format!("invalid gate URL: {}", base_url))
}

#[async_trait]
impl GateTransport for HttpGateTransport {
    async fn check(&self, identifier: &str) -> anyhow::Result<GateReply> {
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(&[("email", identifier)])
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.endpoint))?;

        let status = resp.status();
        if status.is_success() {
            let payload = resp.bytes().await.context("failed to read payload body")?;
            return Ok(GateReply::Released(payload));
        }

        // A body that fails to decode is still a "not yet".
        let message = resp.text().await.unwrap_or_default();
        Ok(GateReply::NotYet {
            status: status.as_u16(),
            message,
        })
    }
}
