use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_valid_status() -> u16 { 200 }

/// An HTTP endpoint probe. `name` keys the down counter, so renaming a check
/// resets its streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub url: String,
    #[serde(default = "default_valid_status")]
    pub valid_status: u16,
    #[serde(default)]
    pub body_match: String,
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub latency: Option<Duration>,
    pub message: String,
}

impl CheckResult {
    pub fn up(name: impl Into<String>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            timestamp: Utc::now(),
            success: true,
            latency: Some(latency),
            message: String::new(),
        }
    }

    pub fn down(name: impl Into<String>, latency: Option<Duration>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: Utc::now(),
            success: false,
            latency,
            message: message.into(),
        }
    }
}

/// What a result means given the streak the down counter held before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SteadyUp,
    WentDown,
    /// `streak` is the count including this failure.
    StillDown { streak: u32 },
    /// `streak` is the number of failed cycles that preceded this success.
    Recovered { streak: u32 },
}

impl Transition {
    pub fn classify(success: bool, prior: u32) -> Self {
        match (success, prior) {
            (true, 0) => Transition::SteadyUp,
            (false, 0) => Transition::WentDown,
            (false, n) => Transition::StillDown { streak: n + 1 },
            (true, n) => Transition::Recovered { streak: n },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_classify() {
        assert_eq!(Transition::classify(true, 0), Transition::SteadyUp);
        assert_eq!(Transition::classify(false, 0), Transition::WentDown);
        assert_eq!(Transition::classify(false, 1), Transition::StillDown { streak: 2 });
        assert_eq!(Transition::classify(false, 4), Transition::StillDown { streak: 5 });
        assert_eq!(Transition::classify(true, 1), Transition::Recovered { streak: 1 });
        assert_eq!(Transition::classify(true, 3), Transition::Recovered { streak: 3 });
    }

    #[test]
    fn test_check_defaults() {
        let check: Check = serde_yaml::from_str("name: api\nurl: http://localhost/health\n").unwrap();
        assert_eq!(check.valid_status, 200);
        assert!(check.body_match.is_empty());
    }

    #[test]
    fn test_result_constructors() {
        let up = CheckResult::up("api", Duration::from_millis(12));
        assert!(up.success);
        assert!(up.message.is_empty());
        assert_eq!(up.latency, Some(Duration::from_millis(12)));

        let down = CheckResult::down("api", None, "connection refused");
        assert!(!down.success);
        assert_eq!(down.message, "connection refused");
        assert!(down.latency.is_none());
    }
}
