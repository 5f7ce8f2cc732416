//! Run model: one execution of a plan's steps.

use std::path::PathBuf;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

use super::RunStatus;

/// Per-plan run identifier. Assigned sequentially, never reused.
pub type RunId = u64;

/// One execution instance of a plan. This is the `run.json` document.
///
/// The owning plan is referenced by name only; `plan` and `path` are
/// filled in from the directory layout and never written to disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Run {
    /// Index of this run within its plan
    pub id: RunId,

    /// Current lifecycle status
    #[serde(default)]
    pub status: RunStatus,

    /// Trigger kind that created the run
    #[serde(default)]
    pub trigger: String,

    /// When the run was created (UTC)
    pub start: Timestamp,

    /// Wall time of the step loop, recorded once when it ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<SignedDuration>,

    /// Name of the owning plan
    #[serde(skip)]
    pub plan: String,

    /// Working directory holding the trigger payload and step artifacts
    #[serde(skip)]
    pub path: PathBuf,
}

impl Run {
    /// Creates a pending run started now.
    pub fn new(
        plan: impl Into<String>,
        id: RunId,
        trigger: impl Into<String>,
        path: PathBuf,
    ) -> Self {
        Self {
            id,
            status: RunStatus::Pending,
            trigger: trigger.into(),
            start: Timestamp::now(),
            duration: None,
            plan: plan.into(),
            path,
        }
    }

    /// Path of the raw trigger payload handed to every step.
    pub fn trigger_path(&self) -> PathBuf {
        self.path.join(crate::disk::TRIGGER_FILE)
    }

    /// Path of this run's `run.json`.
    pub fn document_path(&self) -> PathBuf {
        self.path.join(crate::disk::RUN_DOCUMENT)
    }
}

/// Published whenever a run's status changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    pub plan: String,
    pub run_id: RunId,
    pub status: RunStatus,
}
