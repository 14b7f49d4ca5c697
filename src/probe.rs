use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::models::{Check, CheckResult};

/// Executes one check. Implementations never fail: every outcome is a
/// [`CheckResult`].
#[async_trait]
pub trait Executor: Send + Sync + fmt::Debug {
    async fn run_check(&self, check: &Check) -> CheckResult;
}

/// Performs single-attempt HTTP GETs and classifies the outcome.
#[derive(Debug, Clone)]
pub struct Prober {
    http_client: reqwest::Client,
}

impl Prober {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Executor for Prober {
    async fn run_check(&self, check: &Check) -> CheckResult {
        let start = Instant::now();
        let response = match self.http_client.get(&check.url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(check = %check.name, error = %e, "Request failed");
                return CheckResult::down(&check.name, None, e.to_string());
            }
        };

        let status = response.status().as_u16();
        if status != check.valid_status {
            return CheckResult::down(
                &check.name,
                Some(start.elapsed()),
                status_mismatch(check.valid_status, status),
            );
        }

        if !check.body_match.is_empty() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(check = %check.name, error = %e, "Failed to read response body");
                    return CheckResult::down(&check.name, Some(start.elapsed()), e.to_string());
                }
            };
            if !body.contains(&check.body_match) {
                return CheckResult::down(
                    &check.name,
                    Some(start.elapsed()),
                    body_mismatch(&check.body_match),
                );
            }
        }

        let latency = start.elapsed();
        debug!(check = %check.name, latency_ms = latency.as_millis() as u64, "Check passed");
        CheckResult::up(&check.name, latency)
    }
}

fn status_mismatch(expected: u16, actual: u16) -> String {
    format!("Status mismatch. Expected {}, got {}.", expected, actual)
}

fn body_mismatch(needle: &str) -> String {
    format!("String '{}' not found in body.", needle)
}
