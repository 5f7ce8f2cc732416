//! Plan documents and plan-level payload files.

use std::{
    collections::HashSet,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use super::{
    notify_file_name, parse_step_file_name, step_file_name,
    utils::{remove_if_present, write_executable, write_json},
    Disk, NOTIFY_PREFIX, PLAN_DOCUMENT,
};
use crate::{
    error::{ChannonError, FileSystemResultExt, Result},
    models::{validate_segment, Plan, Run},
};

/// A plan read back from disk together with its run slots.
///
/// `runs[id]` is `None` for a slot whose document is missing or damaged.
#[derive(Debug, Clone)]
pub struct LoadedPlan {
    pub plan: Plan,
    pub runs: Vec<Option<Run>>,
}

impl Disk {
    /// Persists a plan: the document first, then its executables.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::FileSystem` if the plan directory or document
    /// cannot be written. Failures while materializing executables are
    /// logged and do not fail the call.
    pub fn save_plan(&self, plan: &Plan) -> Result<()> {
        let plan_dir = self.plan_dir(&plan.name);
        fs::create_dir_all(&plan_dir).at_path(&plan_dir)?;
        write_json(&plan_dir.join(PLAN_DOCUMENT), plan)?;
        debug!("Saved plan document for {}", plan.name);

        self.materialize_plan_payloads(plan);
        Ok(())
    }

    /// Writes `step<N>` and `notify-<target>` executables into the plan
    /// directory and removes ones the plan no longer has.
    pub fn materialize_plan_payloads(&self, plan: &Plan) {
        let plan_dir = self.plan_dir(&plan.name);

        for (index, step) in plan.steps.iter().enumerate() {
            let path = plan_dir.join(step_file_name(index));
            if let Err(e) = write_executable(&path, &step.payload) {
                warn!("Cannot create payload for step {index} of {}: {e}", plan.name);
                break;
            }
        }

        for notification in &plan.notifications {
            let path = plan_dir.join(notify_file_name(&notification.target));
            if let Err(e) = write_executable(&path, &notification.payload) {
                warn!(
                    "Cannot create notification script {} of {}: {e}",
                    notification.target, plan.name
                );
                break;
            }
        }

        remove_stale_payloads(plan, &plan_dir);
    }

    /// Moves a plan directory and rewrites its document under the new name.
    ///
    /// A missing source directory is not an error: the plan is simply saved
    /// under its new name. Files left at the destination by a deleted plan
    /// are moved aside to a dot-prefixed directory that bootstrap skips.
    pub fn rename_plan(&self, old: &str, plan: &Plan) -> Result<()> {
        let from = self.plan_dir(old);
        let to = self.plan_dir(&plan.name);

        if fs::symlink_metadata(&to).is_ok() {
            let aside = self.set_aside_path(&plan.name);
            fs::rename(&to, &aside).at_path(&to)?;
            warn!(
                "Moved leftover files of {} to {}",
                to.display(),
                aside.display()
            );
        }

        match fs::rename(&from, &to) {
            Ok(()) => info!("Moved {} to {}", from.display(), to.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Plan directory {} missing, saving fresh", from.display());
            }
            Err(e) => return Err(e).at_path(&to),
        }

        self.save_plan(plan)
    }

    /// First free `.<name>.stale[.<n>]` path under the root.
    fn set_aside_path(&self, name: &str) -> PathBuf {
        let base = format!(".{name}.stale");
        let mut path = self.root.join(&base);
        let mut n = 1;
        while fs::symlink_metadata(&path).is_ok() {
            path = self.root.join(format!("{base}.{n}"));
            n += 1;
        }
        path
    }

    /// Reads and decodes one `plan.json`.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::FileSystem` if the file cannot be read and
    /// `ChannonError::Decode` if it is not a valid plan document.
    pub fn load_plan(&self, document: &Path) -> Result<Plan> {
        let contents = fs::read(document).at_path(document)?;
        serde_json::from_slice(&contents).map_err(|source| ChannonError::Decode {
            path: document.to_path_buf(),
            source,
        })
    }

    /// Walks the root and loads every plan with its runs.
    ///
    /// The directory name is authoritative for the plan name; directories
    /// whose name is not a valid plan name are skipped. Plans whose document
    /// cannot be read or decoded are logged and skipped.
    pub fn load_all(&self) -> Result<Vec<LoadedPlan>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).at_path(&self.root),
        };

        let mut plan_dirs: Vec<(String, PathBuf)> = entries
            .flatten()
            .filter(|entry| entry.path().join(PLAN_DOCUMENT).is_file())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                if let Err(e) = validate_segment("name", &name) {
                    debug!("Skipping {}: {e}", entry.path().display());
                    return None;
                }
                Some((name, entry.path()))
            })
            .collect();
        plan_dirs.sort();

        let mut loaded = Vec::with_capacity(plan_dirs.len());
        for (dir_name, dir) in plan_dirs {
            let document = dir.join(PLAN_DOCUMENT);
            info!("Loading plan from: {}", document.display());

            let mut plan = match self.load_plan(&document) {
                Ok(plan) => plan,
                Err(e) => {
                    warn!("Skipping plan at {}: {e}", dir.display());
                    continue;
                }
            };

            if plan.name != dir_name {
                warn!(
                    "Plan document names '{}' but lives in '{dir_name}', using the directory name",
                    plan.name
                );
                plan.name = dir_name;
            }

            let runs = self.load_runs(&plan.name);
            loaded.push(LoadedPlan { plan, runs });
        }

        Ok(loaded)
    }
}

fn remove_stale_payloads(plan: &Plan, plan_dir: &Path) {
    let entries = match fs::read_dir(plan_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list {}: {e}", plan_dir.display());
            return;
        }
    };

    let targets: HashSet<&str> = plan
        .notifications
        .iter()
        .map(|n| n.target.as_str())
        .collect();

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };

        let stale = match parse_step_file_name(name) {
            Some(index) => index >= plan.steps.len(),
            None => name
                .strip_prefix(NOTIFY_PREFIX)
                .is_some_and(|target| !targets.contains(target)),
        };

        if stale {
            match remove_if_present(&entry.path()) {
                Ok(_) => debug!("Removed stale payload {name} of {}", plan.name),
                Err(e) => warn!("Problem removing stale payload {name}: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::RUNS_DIR;
    use tempfile::TempDir;

    fn create_test_disk() -> (TempDir, Disk) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let disk = Disk::new(temp_dir.path().join("plans"));
        (temp_dir, disk)
    }

    fn sample_plan() -> Plan {
        Plan::new("deploy")
            .with_step("build", "#!/bin/sh\necho build\n")
            .with_step("ship", "#!/bin/sh\necho ship\n")
            .with_notification("mail", "#!/bin/sh\necho mail\n")
            .with_tag("prod")
    }

    #[test]
    fn test_save_plan_writes_document_and_payloads() {
        let (_temp_dir, disk) = create_test_disk();
        let plan = sample_plan();

        disk.save_plan(&plan).unwrap();

        let dir = disk.plan_dir("deploy");
        assert_eq!(disk.load_plan(&dir.join(PLAN_DOCUMENT)).unwrap(), plan);
        assert_eq!(
            fs::read_to_string(dir.join("step1")).unwrap(),
            "#!/bin/sh\necho ship\n"
        );
        assert!(dir.join("notify-mail").is_file());
    }

    #[test]
    fn test_save_plan_removes_stale_payloads() {
        let (_temp_dir, disk) = create_test_disk();
        disk.save_plan(&sample_plan()).unwrap();

        let shorter = Plan::new("deploy").with_step("only", "#!/bin/sh\ntrue\n");
        disk.save_plan(&shorter).unwrap();

        let dir = disk.plan_dir("deploy");
        assert!(dir.join("step0").is_file());
        assert!(!dir.join("step1").exists());
        assert!(!dir.join("notify-mail").exists());
        assert!(dir.join(PLAN_DOCUMENT).is_file());
    }

    #[test]
    fn test_rename_plan_moves_directory() {
        let (_temp_dir, disk) = create_test_disk();
        let plan = sample_plan();
        disk.save_plan(&plan).unwrap();
        fs::create_dir_all(disk.run_dir("deploy", 0)).unwrap();

        let renamed = Plan {
            name: "release".to_string(),
            ..plan
        };
        disk.rename_plan("deploy", &renamed).unwrap();

        assert!(!disk.plan_dir("deploy").exists());
        assert!(disk.run_dir("release", 0).is_dir());
        let document = disk.plan_dir("release").join(PLAN_DOCUMENT);
        assert_eq!(disk.load_plan(&document).unwrap().name, "release");
    }

    #[test]
    fn test_rename_plan_sets_leftover_destination_aside() {
        let (_temp_dir, disk) = create_test_disk();
        let plan = sample_plan();
        disk.save_plan(&plan).unwrap();
        disk.save_plan(&Plan::new("release")).unwrap();
        fs::create_dir_all(disk.run_dir("release", 0)).unwrap();
        fs::create_dir_all(disk.root().join(".release.stale")).unwrap();

        let renamed = Plan {
            name: "release".to_string(),
            ..plan
        };
        disk.rename_plan("deploy", &renamed).unwrap();

        assert!(!disk.plan_dir("deploy").exists());
        assert!(!disk.run_dir("release", 0).exists());
        assert!(disk.plan_dir("release").join("step1").is_file());
        let aside = disk.root().join(".release.stale.1");
        assert!(aside.join(RUNS_DIR).join("0").is_dir());

        let loaded = disk.load_all().unwrap();
        let names: Vec<&str> = loaded.iter().map(|l| l.plan.name.as_str()).collect();
        assert_eq!(names, vec!["release"]);
        assert_eq!(loaded[0].plan.steps.len(), 2);
    }

    #[test]
    fn test_load_all_skips_invalid_directory_names() {
        let (_temp_dir, disk) = create_test_disk();
        disk.save_plan(&sample_plan()).unwrap();

        let hidden = disk.root().join(".hidden");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join(PLAN_DOCUMENT), r#"{"name":".hidden"}"#).unwrap();

        let loaded = disk.load_all().unwrap();
        let names: Vec<&str> = loaded.iter().map(|l| l.plan.name.as_str()).collect();
        assert_eq!(names, vec!["deploy"]);
    }

    #[test]
    fn test_load_all_skips_damaged_plans() {
        let (_temp_dir, disk) = create_test_disk();
        disk.save_plan(&sample_plan()).unwrap();
        disk.save_plan(&Plan::new("other")).unwrap();

        let broken = disk.plan_dir("broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(PLAN_DOCUMENT), "{ not json").unwrap();
        fs::create_dir_all(disk.plan_dir("no-document").join(RUNS_DIR)).unwrap();

        let loaded = disk.load_all().unwrap();
        let names: Vec<&str> = loaded.iter().map(|l| l.plan.name.as_str()).collect();
        assert_eq!(names, vec!["deploy", "other"]);
    }

    #[test]
    fn test_load_all_prefers_directory_name() {
        let (_temp_dir, disk) = create_test_disk();
        disk.save_plan(&sample_plan()).unwrap();
        fs::rename(disk.plan_dir("deploy"), disk.plan_dir("moved")).unwrap();

        let loaded = disk.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].plan.name, "moved");
    }

    #[test]
    fn test_load_all_on_missing_root_is_empty() {
        let (_temp_dir, disk) = create_test_disk();
        assert!(disk.load_all().unwrap().is_empty());
    }
}
