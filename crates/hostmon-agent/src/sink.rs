use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use hostmon_common::MetricSample;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Maximum number of characters kept from a rejected response body.
const MAX_BODY_LOG_CHARS: usize = 200;

/// Destination for encoded envelopes.
///
/// The collector loop hands every encoded [`MetricSample`] to exactly one
/// sink and only looks at whether delivery succeeded.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Returns the sink name, used for logging.
    fn name(&self) -> &str;

    /// Delivers one encoded envelope.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Transmission`] or [`AgentError::Rejected`] when
    /// the sample did not reach the endpoint.
    async fn deliver(&self, body: String) -> Result<()>;
}

/// POSTs each envelope to the collection endpoint. No retries.
pub struct HttpSink {
    endpoint: Url,
    client: Client,
}

impl HttpSink {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AgentError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { endpoint, client })
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Self::new(&config.endpoint, config.request_timeout())
    }
}

#[async_trait]
impl MetricsSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn deliver(&self, body: String) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = match resp.text().await {
            Ok(text) => truncate_body(&text, MAX_BODY_LOG_CHARS),
            Err(e) => format!("[failed to read response body: {e}]"),
        };
        Err(AgentError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Truncates to at most `max` bytes on a char boundary.
fn truncate_body(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// In-memory sink that records delivered bodies.
///
/// Clones share state, so a test can keep one handle while the loop owns
/// another. [`RecordingSink::set_failing`] makes every delivery fail with a
/// 503 rejection until switched back.
#[derive(Clone, Default)]
pub struct RecordingSink {
    bodies: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of delivery attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Delivered bodies decoded back into envelopes.
    pub fn samples(&self) -> Vec<MetricSample> {
        self.bodies()
            .iter()
            .filter_map(|body| MetricSample::decode(body).ok())
            .collect()
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, body: String) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AgentError::Rejected {
                status: 503,
                body: "recording sink is failing".to_string(),
            });
        }
        self.bodies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(body);
        Ok(())
    }
}
