//! Runtime Configuration
//!
//! Each thread's reactive graph carries a [`RuntimeConfig`]. Hosts can build
//! one in code or deserialize it from any serde format; missing fields fall
//! back to their defaults.
//!
//! ```rust,ignore
//! let config: RuntimeConfig = serde_json::from_str(r#"{ "fault_policy": "log" }"#)?;
//! Runtime::configure(config);
//! ```

use serde::{Deserialize, Serialize};

/// What to do with effect faults that no fault handler claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Re-raise a panic summarising the faults once the outermost runtime
    /// call returns.
    #[default]
    Propagate,

    /// Log the faults and carry on.
    Log,
}

/// Limits and policies for one reactive graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many times an effect may re-run back to back because it wrote a
    /// signal it also reads.
    pub max_reruns: usize,

    /// How many times one effect may run during a single batch flush. Past
    /// this, further notifications of that effect are dropped until the flush
    /// ends.
    pub max_flush_runs: usize,

    /// Handling of faults when no fault handler is installed.
    pub fault_policy: FaultPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_reruns: 100,
            max_flush_runs: 100,
            fault_policy: FaultPolicy::Propagate,
        }
    }
}

impl RuntimeConfig {
    /// Set the self-write re-run limit.
    pub fn with_max_reruns(mut self, max_reruns: usize) -> Self {
        self.max_reruns = max_reruns;
        self
    }

    /// Set the per-effect run limit for a batch flush.
    pub fn with_max_flush_runs(mut self, max_flush_runs: usize) -> Self {
        self.max_flush_runs = max_flush_runs;
        self
    }

    /// Set the fault policy.
    pub fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }
}
