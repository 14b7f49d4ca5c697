use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::{ReportError, Reporter};
use crate::models::{CheckResult, Transition};
use crate::tracker::DownCounter;

const MAILGUN_API_BASE: &str = "https://api.mailgun.net";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailClient: Send + Sync + fmt::Debug {
    async fn send(&self, message: &MailMessage, timeout: Duration) -> Result<(), ReportError>;
}

/// Mailgun `messages` endpoint.
#[derive(Clone)]
pub struct MailgunClient {
    http_client: reqwest::Client,
    domain: String,
    private_key: String,
    api_base: String,
}

impl fmt::Debug for MailgunClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunClient")
            .field("domain", &self.domain)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl MailgunClient {
    pub fn new(http_client: reqwest::Client, domain: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self::with_api_base(http_client, domain, private_key, MAILGUN_API_BASE)
    }

    pub fn with_api_base(
        http_client: reqwest::Client,
        domain: impl Into<String>,
        private_key: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            domain: domain.into(),
            private_key: private_key.into(),
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl MailClient for MailgunClient {
    async fn send(&self, message: &MailMessage, timeout: Duration) -> Result<(), ReportError> {
        let form = [
            ("from", message.sender.clone()),
            ("to", message.recipients.join(",")),
            ("subject", message.subject.clone()),
            ("text", message.body.clone()),
        ];
        let response = self
            .http_client
            .post(format!("{}/v3/{}/messages", self.api_base, self.domain))
            .basic_auth("api", Some(&self.private_key))
            .form(&form)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if message.is_empty() {
                return Err(ReportError::Status { service: "mailgun", status: status.as_u16() });
            }
            return Err(ReportError::Api { service: "mailgun", message });
        }
        Ok(())
    }
}

/// Emails went-down and recovered transitions only. Checks named in
/// `exclude` never produce mail.
#[derive(Debug)]
pub struct MailReporter {
    sender: String,
    recipients: Vec<String>,
    exclude: Vec<String>,
    poll_interval: Duration,
    timeout: Duration,
    client: Box<dyn MailClient>,
}

impl MailReporter {
    pub fn new(
        sender: impl Into<String>,
        recipients: Vec<String>,
        exclude: Vec<String>,
        poll_interval: Duration,
        client: Box<dyn MailClient>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipients,
            exclude,
            poll_interval,
            timeout: Duration::from_secs(10),
            client,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn compose(&self, result: &CheckResult, transition: Transition) -> Option<MailMessage> {
        if self.exclude.iter().any(|name| *name == result.name) {
            return None;
        }

        let at = result.timestamp.to_rfc3339();
        let (subject, body) = match transition {
            Transition::WentDown => (
                format!("[{}] {} is DOWN", env!("CARGO_PKG_NAME"), result.name),
                format!("Check '{}' failed at {}.\n\nReason: {}\n", result.name, at, result.message),
            ),
            Transition::Recovered { streak } => {
                let downtime = self.poll_interval.saturating_mul(streak);
                (
                    format!("[{}] {} is back UP", env!("CARGO_PKG_NAME"), result.name),
                    format!(
                        "Check '{}' recovered at {}.\n\nEstimated downtime: {} ({} failed checks, polled every {}s).\n",
                        result.name,
                        at,
                        humantime::format_duration(downtime),
                        streak,
                        self.poll_interval.as_secs()
                    ),
                )
            }
            Transition::SteadyUp | Transition::StillDown { .. } => return None,
        };

        Some(MailMessage {
            sender: self.sender.clone(),
            recipients: self.recipients.clone(),
            subject,
            body,
        })
    }
}

#[async_trait]
impl Reporter for MailReporter {
    fn name(&self) -> &'static str {
        "mailgun"
    }

    async fn report(&self, result: &CheckResult, down: &DownCounter) -> Result<(), ReportError> {
        match self.compose(result, down.transition(result)) {
            Some(message) => self.client.send(&message, self.timeout).await,
            None => {
                debug!(check = %result.name, "No mail for this transition");
                Ok(())
            }
        }
    }
}
