//! Run documents, trigger payloads and per-run step artifacts.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use super::{notify_file_name, step_file_name, utils::write_json, Disk, RUN_DOCUMENT, TRIGGER_FILE};
use crate::{
    error::{ChannonError, FileSystemResultExt, Result},
    models::{Run, RunId},
};

/// Largest hole tolerated between consecutive run directories.
const MAX_RUN_ID_GAP: RunId = 1024;

/// Paths of one executable and its captured output inside a run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepArtifacts {
    pub executable: PathBuf,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

impl StepArtifacts {
    fn at(run_dir: &Path, file_name: &str) -> Self {
        Self {
            executable: run_dir.join(file_name),
            stdout: run_dir.join(format!("{file_name}.out")),
            stderr: run_dir.join(format!("{file_name}.err")),
        }
    }

    /// `runs/<id>/step<N>`, `step<N>.out`, `step<N>.err`
    pub fn for_step(run_dir: &Path, index: usize) -> Self {
        Self::at(run_dir, &step_file_name(index))
    }

    /// `runs/<id>/notify-<target>`, `.out`, `.err`
    pub fn for_notification(run_dir: &Path, target: &str) -> Self {
        Self::at(run_dir, &notify_file_name(target))
    }
}

/// Captured output of one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
}

impl Disk {
    /// Creates the run directory and stores the raw trigger payload in it.
    pub fn create_run_dir(&self, plan: &str, id: RunId, payload: &[u8]) -> Result<PathBuf> {
        let run_dir = self.run_dir(plan, id);
        fs::create_dir_all(&run_dir).at_path(&run_dir)?;
        let trigger = run_dir.join(TRIGGER_FILE);
        fs::write(&trigger, payload).at_path(&trigger)?;
        debug!("Stored {} byte trigger for {plan}#{id}", payload.len());
        Ok(run_dir)
    }

    /// Atomically writes `run.json` into the run's working directory.
    pub fn save_run(&self, run: &Run) -> Result<()> {
        write_json(&run.document_path(), run)
    }

    /// Ids already taken by run directories of `plan`, as the next free id.
    pub fn next_run_id(&self, plan: &str) -> RunId {
        self.run_ids(plan)
            .last()
            .map_or(0, |max| max.saturating_add(1))
    }

    /// Sorted ids of the run directories of `plan`.
    ///
    /// An id more than [`MAX_RUN_ID_GAP`] past the previous accepted one did
    /// not come from this store; it and everything after it are ignored.
    fn run_ids(&self, plan: &str) -> Vec<RunId> {
        let runs_dir = self.runs_dir(plan);
        let mut ids: Vec<RunId> = match fs::read_dir(&runs_dir) {
            Ok(entries) => entries
                .flatten()
                .filter(|entry| entry.path().is_dir())
                .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Cannot list runs in {}: {e}", runs_dir.display());
                Vec::new()
            }
        };
        ids.sort_unstable();

        let mut next: RunId = 0;
        let mut accepted = 0;
        for &id in &ids {
            if id.saturating_sub(next) > MAX_RUN_ID_GAP {
                break;
            }
            next = id.saturating_add(1);
            accepted += 1;
        }
        for id in &ids[accepted..] {
            warn!("Ignoring run directory {id} of {plan}: too far past the last run");
        }
        ids.truncate(accepted);
        ids
    }

    /// Loads every run of `plan` into id-indexed slots.
    ///
    /// Ids without a readable document become `None` so the slot count stays
    /// past every id seen on disk.
    pub fn load_runs(&self, plan: &str) -> Vec<Option<Run>> {
        let mut slots: Vec<Option<Run>> = vec![None; self.next_run_id(plan) as usize];

        for (index, slot) in slots.iter_mut().enumerate() {
            let id = index as RunId;
            let run_dir = self.run_dir(plan, id);
            if !run_dir.is_dir() {
                continue;
            }
            match self.load_run(&run_dir.join(RUN_DOCUMENT)) {
                Ok(mut run) => {
                    info!("Loading run {id} from: {}", run_dir.display());
                    if run.id != id {
                        warn!("Run document in {} claims id {}", run_dir.display(), run.id);
                        run.id = id;
                    }
                    run.plan = plan.to_string();
                    run.path = run_dir;
                    *slot = Some(run);
                }
                Err(e) => warn!("Leaving run {id} of {plan} empty: {e}"),
            }
        }

        slots
    }

    /// Reads and decodes one `run.json`.
    pub fn load_run(&self, document: &Path) -> Result<Run> {
        let contents = fs::read(document).at_path(document)?;
        serde_json::from_slice(&contents).map_err(|source| ChannonError::Decode {
            path: document.to_path_buf(),
            source,
        })
    }

    /// Reads the captured stdout and stderr of a step of a run.
    ///
    /// A stream file that was never created reads as empty.
    pub fn read_step_output(&self, plan: &str, id: RunId, index: usize) -> Result<StepOutput> {
        let artifacts = StepArtifacts::for_step(&self.run_dir(plan, id), index);
        Ok(StepOutput {
            stdout: read_lossy(&artifacts.stdout)?,
            stderr: read_lossy(&artifacts.stderr)?,
        })
    }
}

fn read_lossy(path: &Path) -> Result<String> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e).at_path(path),
    }
}
