//! Discord webhook notifications.
//!
//! Delivery is best effort: a failure is logged at warn and never fails
//! the command that triggered it.

use serde_json::{json, Value};
use tracing::{debug, warn};

/// Environment variable holding the webhook URL.
pub const WEBHOOK_ENV: &str = "HTB_DISCORD_WEBHOOK";

/// Discord rejects message content longer than this.
const MAX_CONTENT_CHARS: usize = 2000;

pub struct Notifier {
    client: reqwest::Client,
    webhook: Option<String>,
}

impl Notifier {
    pub fn new(webhook: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook: webhook.filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var(WEBHOOK_ENV).ok())
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook.is_some()
    }

    /// Post `[command] output`. Returns whether the webhook accepted it.
    pub async fn send(&self, command: &str, output: &str) -> bool {
        let Some(url) = &self.webhook else {
            return false;
        };
        let result = self
            .client
            .post(url)
            .json(&payload(command, output))
            .send()
            .await
            .and_then(|response| response.error_for_status());
        match result {
            Ok(_) => {
                debug!(command, "notification delivered");
                true
            }
            Err(err) => {
                warn!(command, error = %err, "discord notification failed");
                false
            }
        }
    }
}

/// Webhook body for one command result.
pub fn payload(command: &str, output: &str) -> Value {
    let content = format!("[{command}] {output}");
    json!({ "content": truncate(&content, MAX_CONTENT_CHARS) })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
