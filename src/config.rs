use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::models::Check;
use crate::reporters::{ChatReporter, LogReporter, MailReporter, MailgunClient, Reporter, SlackClient};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub checks: Vec<Check>,
    #[serde(default)]
    pub reporters: Vec<ReporterConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 { 10 }
fn default_request_timeout() -> u64 { 10 }

impl ServerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReporterKind {
    Log,
    Slack,
    Mailgun,
}

/// A reporter entry: a kind tag plus options decoded per kind.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReporterConfig {
    #[serde(rename = "type")]
    pub kind: ReporterKind,
    #[serde(default)]
    pub options: serde_yaml::Value,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlackOptions {
    pub slack_channel: String,
    pub slack_token: String,
    #[serde(default = "default_failed_only")]
    pub failed_only: bool,
}

fn default_failed_only() -> bool { true }

#[derive(Debug, Deserialize, Clone)]
pub struct MailgunOptions {
    pub mailgun_domain: String,
    pub mailgun_private_key: String,
    pub mailgun_sender: String,
    pub mailgun_recipients: Vec<String>,
    #[serde(default)]
    pub mailgun_exclude: Vec<String>,
}

impl ReporterConfig {
    fn options<T: DeserializeOwned>(&self) -> Result<T> {
        serde_yaml::from_value(self.options.clone())
            .with_context(|| format!("Invalid options for {:?} reporter", self.kind))
    }
}

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: MonitorConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.poll_interval == 0 {
            bail!("server.poll_interval must be greater than zero");
        }
        if self.server.request_timeout == 0 {
            bail!("server.request_timeout must be greater than zero");
        }
        if self.checks.is_empty() {
            bail!("No checks configured");
        }
        let mut names = HashSet::new();
        for check in &self.checks {
            if !names.insert(check.name.as_str()) {
                bail!("Duplicate check name '{}'", check.name);
            }
        }
        for reporter in &self.reporters {
            match reporter.kind {
                ReporterKind::Log => {}
                ReporterKind::Slack => {
                    reporter.options::<SlackOptions>()?;
                }
                ReporterKind::Mailgun => {
                    let opts: MailgunOptions = reporter.options()?;
                    if opts.mailgun_recipients.is_empty() {
                        bail!("mailgun_recipients must name at least one address");
                    }
                }
            }
        }
        Ok(())
    }

    /// Instantiate the configured reporters. Falls back to a single log
    /// reporter when none are configured.
    pub fn build_reporters(&self) -> Result<Vec<Box<dyn Reporter>>> {
        if self.reporters.is_empty() {
            return Ok(vec![Box::new(LogReporter)]);
        }

        let http_client = reqwest::Client::builder()
            .timeout(self.server.request_timeout())
            .build()
            .context("Failed to create notification HTTP client")?;

        let mut reporters: Vec<Box<dyn Reporter>> = Vec::with_capacity(self.reporters.len());
        for reporter in &self.reporters {
            match reporter.kind {
                ReporterKind::Log => reporters.push(Box::new(LogReporter)),
                ReporterKind::Slack => {
                    let opts: SlackOptions = reporter.options()?;
                    let client = SlackClient::new(http_client.clone(), opts.slack_token);
                    reporters.push(Box::new(ChatReporter::new(
                        opts.slack_channel,
                        opts.failed_only,
                        Box::new(client),
                    )));
                }
                ReporterKind::Mailgun => {
                    let opts: MailgunOptions = reporter.options()?;
                    let client = MailgunClient::new(
                        http_client.clone(),
                        opts.mailgun_domain,
                        opts.mailgun_private_key,
                    );
                    reporters.push(Box::new(
                        MailReporter::new(
                            opts.mailgun_sender,
                            opts.mailgun_recipients,
                            opts.mailgun_exclude,
                            self.server.poll_interval(),
                            Box::new(client),
                        )
                        .with_timeout(self.server.request_timeout()),
                    ));
                }
            }
        }
        Ok(reporters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r##"
server:
  poll_interval: 30
checks:
  - name: api
    url: https://example.test/health
    valid_status: 200
    body_match: ok
  - name: web
    url: https://example.test/
reporters:
  - type: log
  - type: slack
    options:
      slack_channel: "#ops"
      slack_token: xoxb-test
  - type: mailgun
    options:
      mailgun_domain: mg.example.test
      mailgun_private_key: key-test
      mailgun_sender: monitor@example.test
      mailgun_recipients: [ops@example.test]
      mailgun_exclude: [web]
"##;

    #[test]
    fn test_parse_full() {
        let config = MonitorConfig::parse(FULL).unwrap();
        assert_eq!(config.server.poll_interval, 30);
        assert_eq!(config.server.request_timeout, 10);
        assert_eq!(config.checks.len(), 2);
        assert_eq!(config.checks[0].body_match, "ok");
        assert_eq!(config.checks[1].valid_status, 200);
        assert_eq!(config.reporters.len(), 3);
        assert_eq!(config.reporters[1].kind, ReporterKind::Slack);

        let slack: SlackOptions = config.reporters[1].options().unwrap();
        assert!(slack.failed_only);
        let mail: MailgunOptions = config.reporters[2].options().unwrap();
        assert_eq!(mail.mailgun_exclude, vec!["web".to_string()]);

        let reporters = config.build_reporters().unwrap();
        let names: Vec<_> = reporters.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["log", "slack", "mailgun"]);
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::parse("checks:\n  - name: api\n    url: http://localhost/\n").unwrap();
        assert_eq!(config.server.poll_interval(), Duration::from_secs(10));
        let reporters = config.build_reporters().unwrap();
        assert_eq!(reporters.len(), 1);
        assert_eq!(reporters[0].name(), "log");
    }

    #[test]
    fn test_missing_slack_token() {
        let yaml = r##"
checks:
  - name: api
    url: http://localhost/
reporters:
  - type: slack
    options:
      slack_channel: "#ops"
"##;
        let err = MonitorConfig::parse(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("slack_token"));
    }

    #[test]
    fn test_unknown_reporter_type() {
        let yaml = "checks:\n  - name: api\n    url: http://localhost/\nreporters:\n  - type: pager\n";
        assert!(MonitorConfig::parse(yaml).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = "checks:\n  - name: api\n    url: http://a/\n  - name: api\n    url: http://b/\n";
        let err = MonitorConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate check name 'api'"));
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let yaml = "server:\n  request_timeout: 0\nchecks:\n  - name: api\n    url: http://a/\n";
        let err = MonitorConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("request_timeout"));
    }

    #[test]
    fn test_empty_mailgun_recipients_rejected() {
        let yaml = r##"
checks:
  - name: api
    url: http://localhost/
reporters:
  - type: mailgun
    options:
      mailgun_domain: mg.example.test
      mailgun_private_key: key-test
      mailgun_sender: monitor@example.test
      mailgun_recipients: []
"##;
        let err = MonitorConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("mailgun_recipients"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let yaml = "server:\n  poll_interval: 0\nchecks:\n  - name: api\n    url: http://a/\n";
        assert!(MonitorConfig::parse(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = MonitorConfig::load(file.path()).unwrap();
        assert_eq!(config.checks[0].name, "api");

        let err = MonitorConfig::load("/nonexistent/checks.yml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
