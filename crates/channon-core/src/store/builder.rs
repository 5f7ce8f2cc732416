//! Builder for creating and bootstrapping PlanStore instances.

use std::path::{Path, PathBuf};

use log::{info, warn};
use tokio::task;

use super::{PlanEntry, PlanStore, Registry, Shared};
use crate::{
    disk::Disk,
    error::{ChannonError, FileSystemResultExt, Result},
    models::RunStatus,
};

/// Builder for creating and configuring PlanStore instances.
#[derive(Debug, Clone)]
pub struct PlanStoreBuilder {
    root: Option<PathBuf>,
}

impl PlanStoreBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Sets a custom root directory for the plan tree.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/channon/plans` or `~/.local/share/channon/plans`
    pub fn with_root<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.root = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Builds the store, loading every plan and run found under the root.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::XdgDirectory` if no default root can be found
    /// Returns `ChannonError::FileSystem` if the root cannot be created or
    /// listed
    pub async fn build(self) -> Result<PlanStore> {
        let root = if let Some(path) = self.root {
            path
        } else {
            Self::default_root()?
        };

        let disk = Disk::new(root);
        let registry = task::spawn_blocking({
            let disk = disk.clone();
            move || {
                std::fs::create_dir_all(disk.root()).at_path(disk.root())?;
                bootstrap(&disk)
            }
        })
        .await
        .map_err(|e| ChannonError::Configuration {
            message: format!("Task join error: {e}"),
        })??;

        info!(
            "Loaded {} plans from {}",
            registry.plans.len(),
            disk.root().display()
        );
        Ok(PlanStore::new(Shared::new(disk, registry)))
    }

    /// Returns the default root following XDG Base Directory specification.
    fn default_root() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("channon")
            .place_data_file("plans")
            .map_err(|e| ChannonError::XdgDirectory(e.to_string()))
    }
}

impl Default for PlanStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebuilds the registry from the persisted tree.
///
/// Runs that were still pending or executing belonged to a process that no
/// longer exists; they are finalized as failures.
fn bootstrap(disk: &Disk) -> Result<Registry> {
    let mut registry = Registry::default();

    for loaded in disk.load_all()? {
        let mut runs = loaded.runs;
        for run in runs.iter_mut().flatten() {
            if !run.status.is_terminal() {
                warn!(
                    "Run {} of {} was interrupted while {}, marking it failed",
                    run.id, run.plan, run.status
                );
                run.status = RunStatus::Failure;
                if let Err(e) = disk.save_run(run) {
                    warn!("Cannot save run {} of {}: {e}", run.id, run.plan);
                }
            }
        }

        registry.tags.extend(loaded.plan.tags.iter().cloned());
        registry.plans.insert(
            loaded.plan.name.clone(),
            PlanEntry::new(loaded.plan, runs),
        );
    }

    Ok(registry)
}
