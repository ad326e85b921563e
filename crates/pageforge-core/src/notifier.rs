//! Evaluation callback delivery with bounded exponential backoff.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::backoff::{with_backoff, AttemptReport, BackoffPolicy, Sleeper};
use crate::config::ConfigError;
use crate::domain::NotificationPayload;
use crate::obs;

/// Delivers one notification attempt and reports the HTTP status received.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    /// `Err` carries a transport-level failure description.
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, String>;
}

/// JSON POST over reqwest.
pub struct HttpCallbackTransport {
    http: reqwest::Client,
}

impl HttpCallbackTransport {
    pub fn new() -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl CallbackTransport for HttpCallbackTransport {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, String> {
        self.http
            .post(url)
            .json(payload)
            .send()
            .await
            .map(|response| response.status().as_u16())
            .map_err(|e| e.to_string())
    }
}

/// A callback acknowledges delivery with any 2xx status.
pub fn is_acknowledged(status: u16) -> bool {
    (200..300).contains(&status)
}

pub struct EvaluationNotifier {
    transport: Arc<dyn CallbackTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: BackoffPolicy,
}

impl EvaluationNotifier {
    pub fn new(
        transport: Arc<dyn CallbackTransport>,
        sleeper: Arc<dyn Sleeper>,
        policy: BackoffPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// Post `payload` to `url` until acknowledged or attempts run out.
    /// Individual failures are logged, never returned.
    pub async fn notify(&self, url: &str, payload: &NotificationPayload) -> AttemptReport {
        let transport = &self.transport;
        let report = with_backoff(&self.policy, self.sleeper.as_ref(), |attempt| async move {
            match transport.post(url, payload).await {
                Ok(status) if is_acknowledged(status) => true,
                Ok(status) => {
                    obs::emit_notify_attempt_failed(attempt + 1, &format!("status {status}"));
                    false
                }
                Err(err) => {
                    obs::emit_notify_attempt_failed(attempt + 1, &err);
                    false
                }
            }
        })
        .await;

        if report.succeeded {
            info!(attempts = report.attempts, "Evaluation callback acknowledged");
        }
        report
    }
}
