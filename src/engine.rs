use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::models::{Check, CheckResult};
use crate::probe::Executor;
use crate::reporters::{ReportError, Reporter};
use crate::tracker::DownCounter;

/// A reporter that failed to deliver one result.
#[derive(Debug)]
pub struct DeliveryFailure {
    pub reporter: &'static str,
    pub check: String,
    pub error: ReportError,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub failed: usize,
    pub successful: usize,
    pub total: usize,
    pub delivery_failures: Vec<DeliveryFailure>,
}

/// Fans checks out to one task each and feeds results, in arrival order,
/// through the reporters and into the down counter.
#[derive(Debug)]
pub struct Runner {
    executor: Arc<dyn Executor>,
    reporters: Vec<Box<dyn Reporter>>,
}

impl Runner {
    pub fn new(executor: impl Executor + 'static, reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self {
            executor: Arc::new(executor),
            reporters,
        }
    }

    pub async fn run_checks(&self, checks: &[Check], down: &mut DownCounter) -> RunSummary {
        let total = checks.len();
        let mut summary = RunSummary { total, ..RunSummary::default() };
        if total == 0 {
            return summary;
        }

        let start_time = Utc::now();
        let (tx, mut rx) = mpsc::channel::<CheckResult>(total);
        for check in checks {
            let executor = Arc::clone(&self.executor);
            let check = check.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = executor.run_check(&check).await;
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let mut pending: HashSet<&str> = checks.iter().map(|c| c.name.as_str()).collect();
        let mut received = 0;
        while received < total {
            let Some(result) = rx.recv().await else { break };
            received += 1;
            pending.remove(result.name.as_str());
            self.process_result(result, down, &mut summary).await;
        }

        // A task that panicked never sends; count its check as failed.
        for name in pending {
            error!(check = %name, "Check task ended without a result");
            let result = CheckResult::down(name, None, "Check task aborted before producing a result");
            self.process_result(result, down, &mut summary).await;
        }

        let duration = Utc::now() - start_time;
        debug!(
            "Cycle completed {} checks in {:.2}s.",
            total,
            duration.num_milliseconds() as f64 / 1000.0
        );
        summary
    }

    /// Reporters see the counter before this result is recorded.
    async fn process_result(&self, result: CheckResult, down: &mut DownCounter, summary: &mut RunSummary) {
        for reporter in &self.reporters {
            if let Err(e) = reporter.report(&result, down).await {
                warn!(reporter = reporter.name(), check = %result.name, error = %e, "Reporter failed");
                summary.delivery_failures.push(DeliveryFailure {
                    reporter: reporter.name(),
                    check: result.name.clone(),
                    error: e,
                });
            }
        }

        let streak = down.record(&result);
        if result.success {
            summary.successful += 1;
        } else {
            summary.failed += 1;
            if streak > 1 {
                debug!(check = %result.name, streak, "Check still down");
            }
        }
    }
}

impl RunSummary {
    pub fn all_up(&self) -> bool {
        self.failed == 0
    }

    /// At least as many failures as successes; an empty cycle counts.
    pub fn is_degraded(&self) -> bool {
        self.failed >= self.successful
    }

    pub fn log(&self) {
        if self.is_degraded() {
            warn!("Failed/Successful/Total: {}/{}/{}", self.failed, self.successful, self.total);
        } else {
            info!("Failed/Successful/Total: {}/{}/{}", self.failed, self.successful, self.total);
        }
    }
}
