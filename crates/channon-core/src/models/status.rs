//! Run status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a run. Transitions only move forward:
/// `pending → executing → success | failure`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, no step started yet
    #[default]
    Pending,

    /// Steps are being executed
    Executing,

    /// Every step exited successfully
    Success,

    /// A step could not be started or exited unsuccessfully
    Failure,
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RunStatus::Pending),
            "executing" => Ok(RunStatus::Executing),
            "success" => Ok(RunStatus::Success),
            "failure" => Ok(RunStatus::Failure),
            _ => Err(format!("Invalid run status: {s}")),
        }
    }
}

impl RunStatus {
    /// Lowercase name as stored in `run.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Executing => "executing",
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        }
    }

    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failure)
    }

    fn rank(self) -> u8 {
        match self {
            RunStatus::Pending => 0,
            RunStatus::Executing => 1,
            RunStatus::Success | RunStatus::Failure => 2,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use channon_core::models::RunStatus;
    ///
    /// assert!(RunStatus::Pending.can_advance_to(RunStatus::Executing));
    /// assert!(RunStatus::Executing.can_advance_to(RunStatus::Failure));
    /// assert!(!RunStatus::Failure.can_advance_to(RunStatus::Success));
    /// ```
    pub fn can_advance_to(self, next: RunStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Get status with an icon for display.
    pub fn with_icon(&self) -> &'static str {
        match self {
            RunStatus::Pending => "○ Pending",
            RunStatus::Executing => "➤ Executing",
            RunStatus::Success => "✓ Success",
            RunStatus::Failure => "✗ Failure",
        }
    }
}
