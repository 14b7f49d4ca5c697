use async_trait::async_trait;
use tracing::{debug, info, Level};

use super::{ReportError, Reporter};
use crate::models::{CheckResult, Transition};
use crate::tracker::DownCounter;

/// Writes every result to the tracing subscriber. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl LogReporter {
    pub fn line(result: &CheckResult, transition: Transition) -> (Level, String) {
        match transition {
            Transition::SteadyUp => (Level::INFO, format!("[{}] Check successful.", result.name)),
            Transition::Recovered { streak } => (
                Level::INFO,
                format!("[{}] Check successful. Recovered after {} failed checks.", result.name, streak),
            ),
            Transition::WentDown => (
                Level::DEBUG,
                format!("[{}] Check failed. Reason: {}", result.name, result.message),
            ),
            Transition::StillDown { streak } => (
                Level::DEBUG,
                format!(
                    "[{}] Check failed ({} in a row). Reason: {}",
                    result.name, streak, result.message
                ),
            ),
        }
    }
}

#[async_trait]
impl Reporter for LogReporter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn report(&self, result: &CheckResult, down: &DownCounter) -> Result<(), ReportError> {
        let (level, line) = Self::line(result, down.transition(result));
        if level == Level::INFO {
            info!("{}", line);
        } else {
            debug!("{}", line);
        }
        Ok(())
    }
}
