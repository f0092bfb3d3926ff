use anyhow::{Context, Result};
use common::{mask_secret, PushSettings};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Status and body of a delivery endpoint reply.
#[derive(Debug, Clone)]
pub struct PushResponse {
    pub status: u16,
    pub body: String,
}

impl PushResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability: POST a form-encoded body.
#[async_trait::async_trait]
pub trait PushTransport: Send + Sync {
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<PushResponse>;
}

/// reqwest-backed transport with a bounded request timeout.
pub struct HttpPushTransport {
    client: Client,
}

impl HttpPushTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PushTransport for HttpPushTransport {
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<PushResponse> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .context("push request failed")?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(PushResponse { status, body })
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Sends the report once per configured key. Keys are independent:
/// a failure is logged and the next key is still attempted. No retries.
pub struct Dispatcher {
    settings: PushSettings,
    transport: Arc<dyn PushTransport>,
}

impl Dispatcher {
    pub const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(settings: PushSettings, transport: Arc<dyn PushTransport>) -> Self {
        Self { settings, transport }
    }

    pub async fn deliver(&self, title: &str, content: &str) -> DeliverySummary {
        let mut summary = DeliverySummary::default();

        for key in &self.settings.keys {
            let url = self.settings.endpoint_for(key);
            let masked = mask_secret(key);
            let form = [("title", title), ("desp", content)];

            match self.transport.post_form(&url, &form).await {
                Ok(response) if response.is_success() => {
                    info!(key = %masked, "push delivered");
                    summary.delivered += 1;
                }
                Ok(response) => {
                    error!(key = %masked, status = response.status, "push rejected: {}", response.body);
                    summary.failed += 1;
                }
                Err(e) => {
                    error!(key = %masked, "push error: {:#}", e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
