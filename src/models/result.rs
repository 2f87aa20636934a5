//! Job result model

use std::path::PathBuf;
use std::time::Duration;

/// Terminal state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobOutcome {
    #[default]
    Succeeded,
    Failed,
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed => "failed",
            JobOutcome::Cancelled => "cancelled",
        }
    }
}

/// Result of the last job
#[derive(Debug, Clone, Default)]
pub struct JobResult {
    /// Terminal state
    pub outcome: JobOutcome,
    /// Absolute paths of extracted files (empty for compression)
    pub produced: Vec<PathBuf>,
    /// Wall-clock duration of the job
    pub elapsed: Duration,
    /// Error that ended a failed job
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_result_is_success() {
        let result = JobResult::default();
        assert!(result.success());
        assert!(result.produced.is_empty());
        assert_eq!(result.elapsed, Duration::ZERO);
    }

    #[test]
    fn test_cancelled_is_not_success() {
        assert!(!JobOutcome::Cancelled.is_success());
        assert!(!JobOutcome::Failed.is_success());
        assert_eq!(JobOutcome::Cancelled.name(), "cancelled");
    }
}
