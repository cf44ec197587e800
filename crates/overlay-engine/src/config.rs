//! Configuration for the overlay engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deadline for the pre-commit phase of a submission (0 disables)
    pub submit_timeout_secs: u64,
    /// Abort a current-mode submission when broadcast fails
    pub abort_on_broadcast_failure: bool,
    /// Longest allowed chain of topic dependencies
    pub max_dependency_depth: usize,
    /// Keep the raw transaction on every admitted output
    pub store_evidence: bool,
}

impl EngineConfig {
    pub fn submit_timeout(&self) -> Option<Duration> {
        (self.submit_timeout_secs > 0).then(|| Duration::from_secs(self.submit_timeout_secs))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            submit_timeout_secs: 30,
            abort_on_broadcast_failure: true,
            max_dependency_depth: 64,
            store_evidence: true,
        }
    }
}
