use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::{ReportError, Reporter};
use crate::models::{CheckResult, Transition};
use crate::tracker::DownCounter;

const COLOR_UP: &str = "#2ECC71";
const COLOR_DOWN: &str = "#E74C3C";
const COLOR_STILL_DOWN: &str = "#E67E22";
const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatAttachment {
    pub color: &'static str,
    pub title: String,
    pub text: String,
    pub fallback: String,
    pub footer: String,
    pub ts: i64,
}

#[async_trait]
pub trait ChatClient: Send + Sync + fmt::Debug {
    async fn post_message(&self, channel: &str, attachment: &ChatAttachment) -> Result<(), ReportError>;
}

/// `chat.postMessage` over the Slack Web API.
#[derive(Clone)]
pub struct SlackClient {
    http_client: reqwest::Client,
    token: String,
    api_base: String,
}

impl fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackClient {
    pub fn new(http_client: reqwest::Client, token: impl Into<String>) -> Self {
        Self::with_api_base(http_client, token, SLACK_API_BASE)
    }

    pub fn with_api_base(
        http_client: reqwest::Client,
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            token: token.into(),
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn post_message(&self, channel: &str, attachment: &ChatAttachment) -> Result<(), ReportError> {
        let payload = serde_json::json!({
            "channel": channel,
            "attachments": [attachment],
        });
        let response = self
            .http_client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status { service: "slack", status: status.as_u16() });
        }

        let body: SlackResponse = response.json().await?;
        if !body.ok {
            return Err(ReportError::Api {
                service: "slack",
                message: body.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(())
    }
}

/// Posts one colored attachment per result. With `failed_only`, steady-up
/// results are not posted.
#[derive(Debug)]
pub struct ChatReporter {
    channel: String,
    failed_only: bool,
    client: Box<dyn ChatClient>,
}

impl ChatReporter {
    pub fn new(channel: impl Into<String>, failed_only: bool, client: Box<dyn ChatClient>) -> Self {
        Self {
            channel: channel.into(),
            failed_only,
            client,
        }
    }

    pub fn compose(&self, result: &CheckResult, transition: Transition) -> Option<ChatAttachment> {
        let (color, title, text) = match transition {
            Transition::SteadyUp if self.failed_only => return None,
            Transition::SteadyUp => (
                COLOR_UP,
                format!("[{}] Check successful.", result.name),
                latency_text(result),
            ),
            Transition::WentDown => (
                COLOR_DOWN,
                format!("[{}] Check failed.", result.name),
                format!("Reason: {}", result.message),
            ),
            Transition::StillDown { streak } => (
                COLOR_STILL_DOWN,
                format!("[{}] Still down ({} consecutive failures).", result.name, streak),
                format!("Reason: {}", result.message),
            ),
            Transition::Recovered { streak } => (
                COLOR_UP,
                format!("[{}] Back up.", result.name),
                format!("Recovered after {} failed checks. {}", streak, latency_text(result)),
            ),
        };

        Some(ChatAttachment {
            color,
            fallback: format!("{} {}", title, text),
            title,
            text,
            footer: env!("CARGO_PKG_NAME").to_string(),
            ts: result.timestamp.timestamp(),
        })
    }
}

fn latency_text(result: &CheckResult) -> String {
    result
        .latency
        .map_or("Latency: N/A".to_string(), |l| format!("Latency: {}ms", l.as_millis()))
}

#[async_trait]
impl Reporter for ChatReporter {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn report(&self, result: &CheckResult, down: &DownCounter) -> Result<(), ReportError> {
        let Some(attachment) = self.compose(result, down.transition(result)) else {
            debug!(check = %result.name, "Chat report suppressed");
            return Ok(());
        };
        self.client.post_message(&self.channel, &attachment).await
    }
}
