//! Drives one run's steps to completion.
//!
//! A [`RunExecutor`] owns a snapshot of the steps taken when the run was
//! created, so updating the plan never changes a run already in flight. Each
//! step is written into the run directory, spawned with its output captured
//! beside it, and waited on. The first failing step ends the run.
//!
//! A spawn refused with "text file busy" is retried a few times. That only
//! repeats a spawn that never happened; a step that ran is never run again.

use std::{
    ffi::OsString,
    fs::File,
    path::Path,
    process::{Command, ExitStatus, Stdio},
    thread,
    time::Duration,
};

use log::{debug, info, warn};
use tokio::task;

use crate::{
    disk::{utils::write_executable, StepArtifacts},
    error::{ChannonError, FileSystemResultExt, Result},
    models::{Notification, Run, RunStatus, Step},
    notify::NotificationDispatcher,
    store::PlanStore,
};

/// Environment variable pointing a subprocess at its run's trigger payload.
pub const ENV_TRIGGER: &str = "CHANNON_TRIGGER";

/// `ETXTBSY` on Linux.
const TEXT_FILE_BUSY: i32 = 26;
const SPAWN_ATTEMPTS: u32 = 5;
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Everything an executor needs, captured when the run is created.
#[derive(Debug, Clone)]
pub(crate) struct RunJob {
    pub(crate) run: Run,
    pub(crate) steps: Vec<Step>,
    pub(crate) notifications: Vec<Notification>,
}

/// Executes a single run on a blocking worker.
#[derive(Debug)]
pub struct RunExecutor {
    store: PlanStore,
    job: RunJob,
}

impl RunExecutor {
    pub(crate) fn new(store: PlanStore, job: RunJob) -> Self {
        Self { store, job }
    }

    /// Starts the run on its own blocking task. Nobody awaits it; progress is
    /// observed through the store.
    pub(crate) fn spawn(self) {
        task::spawn_blocking(move || self.execute());
    }

    fn execute(mut self) {
        let plan = self.job.run.plan.clone();
        let id = self.job.run.id;
        info!("Starting run {id} of {plan} ({} steps)", self.job.steps.len());

        self.advance(RunStatus::Executing);

        let env = [(ENV_TRIGGER, self.job.run.trigger_path().into_os_string())];
        for (index, step) in self.job.steps.iter().enumerate() {
            let artifacts = StepArtifacts::for_step(&self.job.run.path, index);
            let label = step_label(index, step);
            debug!("Run {id} of {plan}: step {label}");

            if let Err(e) = run_payload(&label, &step.payload, &artifacts, &self.job.run.path, &env)
            {
                warn!("Run {id} of {plan} failed: {e}");
                self.job.run.status = RunStatus::Failure;
                break;
            }
        }

        if self.job.run.status == RunStatus::Failure {
            self.advance(RunStatus::Failure);
        }
        if let Err(e) = self.store.shared.record_duration(&plan, id) {
            warn!("Cannot record duration of run {id} of {plan}: {e}");
        }
        let finished = self.advance(RunStatus::Success);
        info!("Run {id} of {plan} finished: {}", finished.status);

        NotificationDispatcher::new(finished, self.job.notifications).dispatch();
    }

    /// Moves the run forward through the store and returns the run as the
    /// store now sees it. If the store no longer tracks the run, the local
    /// copy carries the status instead.
    fn advance(&mut self, status: RunStatus) -> Run {
        let run = &mut self.job.run;
        match self.store.shared.advance_run(&run.plan, run.id, status) {
            Ok(Some(current)) => {
                *run = current;
            }
            Ok(None) => {
                if run.status.can_advance_to(status) {
                    run.status = status;
                }
            }
            Err(e) => {
                warn!("Cannot set run {} of {} to {status}: {e}", run.id, run.plan);
                if run.status.can_advance_to(status) {
                    run.status = status;
                }
            }
        }
        run.clone()
    }
}

fn step_label(index: usize, step: &Step) -> String {
    if step.name.is_empty() {
        index.to_string()
    } else {
        format!("{index} ({})", step.name)
    }
}

/// Writes `payload` as an executable at `artifacts.executable`, runs it from
/// `cwd` with the parent environment plus `env`, and captures its output.
///
/// # Errors
///
/// Returns `ChannonError::FileSystem` if the executable or an output file
/// cannot be created and `ChannonError::Subprocess` if the process cannot be
/// spawned or exits unsuccessfully.
pub fn run_payload(
    label: &str,
    payload: &str,
    artifacts: &StepArtifacts,
    cwd: &Path,
    env: &[(&str, OsString)],
) -> Result<()> {
    write_executable(&artifacts.executable, payload)?;
    let stdout = File::create(&artifacts.stdout).at_path(&artifacts.stdout)?;
    let stderr = File::create(&artifacts.stderr).at_path(&artifacts.stderr)?;

    let mut command = Command::new(&artifacts.executable);
    command
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr);
    for (key, value) in env {
        command.env(key, value);
    }

    let status = spawn_and_wait(&mut command, label)?;
    if status.success() {
        Ok(())
    } else {
        Err(ChannonError::subprocess(label, format!("exited with {status}")))
    }
}

/// Spawns `command`, retrying while the freshly written executable is still
/// held open for writing by a concurrently forked process.
fn spawn_and_wait(command: &mut Command, label: &str) -> Result<ExitStatus> {
    let mut attempt = 1;
    loop {
        match command.spawn() {
            Ok(mut child) => {
                return child
                    .wait()
                    .map_err(|e| ChannonError::subprocess(label, format!("wait failed: {e}")));
            }
            Err(e) if e.raw_os_error() == Some(TEXT_FILE_BUSY) && attempt < SPAWN_ATTEMPTS => {
                debug!("Step {label} is busy, retrying spawn ({attempt}/{SPAWN_ATTEMPTS})");
                thread::sleep(SPAWN_RETRY_DELAY * attempt);
                attempt += 1;
            }
            Err(e) => {
                return Err(ChannonError::subprocess(label, format!("cannot spawn: {e}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_run_payload_captures_output_and_env() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let artifacts = StepArtifacts::for_step(temp_dir.path(), 0);
        let env = [(ENV_TRIGGER, OsString::from("/tmp/some-trigger"))];

        run_payload(
            "0",
            "#!/bin/sh\necho \"out $CHANNON_TRIGGER\"\necho err >&2\npwd\n",
            &artifacts,
            temp_dir.path(),
            &env,
        )
        .unwrap();

        let stdout = fs::read_to_string(&artifacts.stdout).unwrap();
        let mut lines = stdout.lines();
        assert_eq!(lines.next(), Some("out /tmp/some-trigger"));
        let cwd = fs::canonicalize(lines.next().unwrap()).unwrap();
        assert_eq!(cwd, fs::canonicalize(temp_dir.path()).unwrap());
        assert_eq!(fs::read_to_string(&artifacts.stderr).unwrap(), "err\n");
    }

    #[test]
    fn test_run_payload_nonzero_exit_is_subprocess_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let artifacts = StepArtifacts::for_step(temp_dir.path(), 3);

        let err = run_payload("3", "#!/bin/sh\nexit 7\n", &artifacts, temp_dir.path(), &[])
            .unwrap_err();

        match err {
            ChannonError::Subprocess { step, reason } => {
                assert_eq!(step, "3");
                assert!(reason.contains('7'), "reason was {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_run_payload_never_reruns_a_failed_step() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let artifacts = StepArtifacts::for_step(temp_dir.path(), 0);

        run_payload(
            "0",
            "#!/bin/sh\necho ran >> attempts\nexit 1\n",
            &artifacts,
            temp_dir.path(),
            &[],
        )
        .unwrap_err();

        let attempts = fs::read_to_string(temp_dir.path().join("attempts")).unwrap();
        assert_eq!(attempts, "ran\n");
    }

    #[test]
    fn test_run_payload_without_interpreter_fails_to_spawn() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let artifacts = StepArtifacts::for_step(temp_dir.path(), 0);

        let err = run_payload(
            "0",
            "#!/nonexistent/interpreter\n",
            &artifacts,
            temp_dir.path(),
            &[],
        )
        .unwrap_err();

        assert!(matches!(err, ChannonError::Subprocess { .. }));
    }

    #[test]
    fn test_run_payload_missing_directory_is_file_system_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("gone");
        let artifacts = StepArtifacts::for_step(&missing, 0);

        let err = run_payload("0", "#!/bin/sh\n", &artifacts, &missing, &[]).unwrap_err();

        assert!(matches!(err, ChannonError::FileSystem { .. }));
    }

    #[test]
    fn test_step_label_includes_name() {
        let named = Step {
            name: "build".to_string(),
            payload: String::new(),
        };
        let unnamed = Step {
            name: String::new(),
            payload: String::new(),
        };
        assert_eq!(step_label(2, &named), "2 (build)");
        assert_eq!(step_label(0, &unnamed), "0");
    }
}
