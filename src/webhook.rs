//! Outbound webhook notifications.
//!
//! Delivery is strictly best-effort: a webhook that is down, slow or
//! misconfigured must never fail the operation that produced the message.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Message severity, mapped to an embed colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl Severity {
    fn color(&self) -> u32 {
        match self {
            Severity::Debug => 0x95A5A6,
            Severity::Info => 0x3498DB,
            Severity::Success => 0x2ECC71,
            Severity::Warning => 0xF1C40F,
            Severity::Error => 0xE74C3C,
            Severity::Critical => 0xC0392B,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Success => "Success",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        }
    }
}

#[derive(Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField>,
}

#[derive(Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

/// Posts human-readable messages to a Discord-compatible webhook.
pub struct WebhookNotifier {
    url: Option<String>,
    http: Option<reqwest::blocking::Client>,
}

impl WebhookNotifier {
    /// With `url == None` the notifier is a no-op; every send reports false.
    pub fn new(url: Option<String>) -> Self {
        let url = url.filter(|u| !u.trim().is_empty());
        let http = if url.is_some() {
            reqwest::blocking::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .map_err(|e| warn!("Failed to build webhook client: {}", e))
                .ok()
        } else {
            None
        };
        Self { url, http }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.http.is_some()
    }

    /// Send one message. Returns whether delivery succeeded; all failures are
    /// logged and swallowed.
    pub fn send(&self, severity: Severity, message: &str, details: Option<&Value>) -> bool {
        let (url, http) = match (&self.url, &self.http) {
            (Some(url), Some(http)) => (url, http),
            _ => {
                debug!("No webhook configured, dropping message: {}", message);
                return false;
            }
        };

        let fields = details
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(k, v)| EmbedField {
                        name: k.clone(),
                        value: match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        },
                        inline: true,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let payload = WebhookPayload {
            embeds: vec![Embed {
                title: severity.label().to_string(),
                description: message.to_string(),
                color: severity.color(),
                fields,
            }],
        };

        match http.post(url).json(&payload).send() {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!("Webhook rejected message: http {}", response.status());
                false
            }
            Err(e) => {
                warn!("Webhook delivery failed: {}", e);
                false
            }
        }
    }
}
