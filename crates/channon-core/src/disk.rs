//! Directory-tree document store for plans and runs.
//!
//! The tree is the database. Every plan owns one directory under the root:
//!
//! ```text
//! <root>/<plan>/plan.json                      plan document
//! <root>/<plan>/step<N>                         executable step payload
//! <root>/<plan>/notify-<target>                 executable notification payload
//! <root>/<plan>/runs/<id>/run.json              run document
//! <root>/<plan>/runs/<id>/trigger               raw trigger payload
//! <root>/<plan>/runs/<id>/step<N>[.out|.err]    per-run executable and captured output
//! ```
//!
//! Documents are replaced atomically (temp file + rename). Executables are
//! deleted before they are rewritten. Reads tolerate partial damage: a plan
//! that cannot be decoded is skipped and a run that cannot be decoded leaves
//! an empty slot.

use std::path::{Path, PathBuf};

use crate::models::RunId;

pub mod plan_files;
pub mod run_files;
pub mod utils;

pub use plan_files::LoadedPlan;
pub use run_files::{StepArtifacts, StepOutput};

/// File name of a plan document inside the plan directory.
pub const PLAN_DOCUMENT: &str = "plan.json";
/// File name of a run document inside the run directory.
pub const RUN_DOCUMENT: &str = "run.json";
/// File name of the raw trigger payload inside the run directory.
pub const TRIGGER_FILE: &str = "trigger";
/// Directory holding a plan's runs.
pub const RUNS_DIR: &str = "runs";

const STEP_PREFIX: &str = "step";
const NOTIFY_PREFIX: &str = "notify-";

/// Handle on a store root directory.
#[derive(Debug, Clone)]
pub struct Disk {
    root: PathBuf,
}

impl Disk {
    /// Creates a handle on `root`. Nothing is touched until an operation runs.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory containing one directory per plan.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn plan_dir(&self, plan: &str) -> PathBuf {
        self.root.join(plan)
    }

    pub fn runs_dir(&self, plan: &str) -> PathBuf {
        self.plan_dir(plan).join(RUNS_DIR)
    }

    pub fn run_dir(&self, plan: &str, id: RunId) -> PathBuf {
        self.runs_dir(plan).join(id.to_string())
    }
}

/// `step<N>` file name for the step at `index`.
pub fn step_file_name(index: usize) -> String {
    format!("{STEP_PREFIX}{index}")
}

/// `notify-<target>` file name for a notification target.
pub fn notify_file_name(target: &str) -> String {
    format!("{NOTIFY_PREFIX}{target}")
}

/// Parses `step<N>` back into `N`. Output files (`step0.out`) do not match.
fn parse_step_file_name(name: &str) -> Option<usize> {
    let digits = name.strip_prefix(STEP_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let disk = Disk::new("/srv/plans");

        assert_eq!(disk.plan_dir("deploy"), PathBuf::from("/srv/plans/deploy"));
        assert_eq!(
            disk.run_dir("deploy", 12),
            PathBuf::from("/srv/plans/deploy/runs/12")
        );
        assert_eq!(step_file_name(3), "step3");
        assert_eq!(notify_file_name("mail"), "notify-mail");
    }

    #[test]
    fn test_parse_step_file_name() {
        assert_eq!(parse_step_file_name("step0"), Some(0));
        assert_eq!(parse_step_file_name("step17"), Some(17));
        assert_eq!(parse_step_file_name("step"), None);
        assert_eq!(parse_step_file_name("step1.out"), None);
        assert_eq!(parse_step_file_name("notify-step1"), None);
    }
}
