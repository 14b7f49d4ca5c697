use std::collections::HashMap;

use crate::models::{CheckResult, Transition};

/// Consecutive-failure count per check name.
///
/// Owned by the scheduling loop for the lifetime of the process and lent
/// mutably to one cycle at a time. Only the runner's drain loop calls
/// [`DownCounter::record`]; reporters get a shared reference.
#[derive(Debug, Default, Clone)]
pub struct DownCounter {
    streaks: HashMap<String, u32>,
}

impl DownCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current streak for `name`. Unknown names are up.
    pub fn streak(&self, name: &str) -> u32 {
        self.streaks.get(name).copied().unwrap_or(0)
    }

    /// Transition `result` represents relative to the current streak.
    pub fn transition(&self, result: &CheckResult) -> Transition {
        Transition::classify(result.success, self.streak(&result.name))
    }

    /// Apply `result` and return the new streak.
    pub fn record(&mut self, result: &CheckResult) -> u32 {
        let streak = self.streaks.entry(result.name.clone()).or_insert(0);
        if result.success {
            *streak = 0;
        } else {
            *streak += 1;
        }
        *streak
    }

    pub fn down_count(&self) -> usize {
        self.streaks.values().filter(|s| **s > 0).count()
    }
}
