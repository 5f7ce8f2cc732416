//! The plan store: the authoritative registry of plans, tags and runs.
//!
//! [`PlanStore`] is the API every outer surface (CLI, MCP server, an HTTP
//! layer) calls. It owns an in-memory registry mirrored to the directory tree
//! managed by [`crate::disk`].
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   PlanStore     │    │  Shared state   │    │      Disk       │
//! │ (async API,     │───▶│ (Mutex<Registry>│───▶│ (plan.json,     │
//! │  spawn_blocking)│    │  + run events)  │    │  run.json, ...) │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!                               ▲
//!                               │ status updates
//!                        ┌──────┴──────────┐
//!                        │   RunExecutor   │
//!                        └─────────────────┘
//! ```
//!
//! ## Submodules
//!
//! - [`builder`]: Configures the root directory and bootstraps the registry
//! - [`plan_ops`]: Add, rename, update, delete, get and list plans
//! - [`tag_ops`]: The tag registry
//! - [`run_ops`]: Triggering, inspecting and deleting runs
//!
//! ## Concurrency
//!
//! Every operation hands its work to a single `spawn_blocking` worker that
//! takes the registry lock, applies the change (including the disk writes it
//! implies) and returns. The caller awaits that worker, so each call is
//! atomic and complete when it returns, and all calls form one linear
//! history. Reads take the same lock. Run executors update status through the
//! same lock and never hold it while a step is running.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use channon_core::{models::Plan, PlanStoreBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PlanStoreBuilder::new()
//!     .with_root(Some("/srv/channon/plans"))
//!     .build()
//!     .await?;
//!
//! store
//!     .add_plan(Plan::new("nightly").with_step("build", "#!/bin/sh\nmake\n"))
//!     .await?;
//!
//! let id = store.trigger_run("nightly", b"scheduled".to_vec()).await?;
//! let run = store.wait_for_run("nightly", id).await?;
//! println!("{run}");
//! # Ok(())
//! # }
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};

use log::warn;
use tokio::{sync::broadcast, task};

use crate::{
    disk::Disk,
    error::{ChannonError, Result},
    models::{Plan, Run, RunEvent, RunId, Tag},
};

pub mod builder;
pub mod plan_ops;
pub mod run_ops;
pub mod tag_ops;


pub use builder::PlanStoreBuilder;

/// Buffered run events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// A registered plan and its run slots.
///
/// `runs[id]` is `None` once the run is deleted or if its document could
/// not be loaded; the slot stays so ids are never handed out twice.
#[derive(Debug, Clone)]
pub(crate) struct PlanEntry {
    pub(crate) plan: Plan,
    pub(crate) runs: Vec<Option<Run>>,
}

impl PlanEntry {
    pub(crate) fn new(plan: Plan, runs: Vec<Option<Run>>) -> Self {
        Self { plan, runs }
    }

    pub(crate) fn next_run_id(&self) -> RunId {
        self.runs.len() as RunId
    }

    pub(crate) fn has_active_runs(&self) -> bool {
        self.runs
            .iter()
            .flatten()
            .any(|run| !run.status.is_terminal())
    }
}

/// Everything guarded by the registry lock.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub(crate) plans: BTreeMap<String, PlanEntry>,
    pub(crate) tags: BTreeSet<Tag>,
}

impl Registry {
    pub(crate) fn entry(&self, plan: &str) -> Result<&PlanEntry> {
        self.plans
            .get(plan)
            .ok_or_else(|| ChannonError::plan_not_found(plan))
    }

    pub(crate) fn entry_mut(&mut self, plan: &str) -> Result<&mut PlanEntry> {
        self.plans
            .get_mut(plan)
            .ok_or_else(|| ChannonError::plan_not_found(plan))
    }
}

/// State shared by every store handle and every run executor.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) disk: Disk,
    registry: Mutex<Registry>,
    events: broadcast::Sender<RunEvent>,
}

impl Shared {
    pub(crate) fn new(disk: Disk, registry: Registry) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            disk,
            registry: Mutex::new(registry),
            events,
        }
    }

    /// Takes the registry lock.
    pub(crate) fn registry(&self) -> Result<MutexGuard<'_, Registry>> {
        self.registry.lock().map_err(|_| ChannonError::Configuration {
            message: "plan registry lock poisoned".to_string(),
        })
    }

    /// Publishes a status change. Must be called with the registry lock held
    /// so subscribers see events in the order the changes were applied.
    pub(crate) fn publish(&self, run: &Run) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(RunEvent {
            plan: run.plan.clone(),
            run_id: run.id,
            status: run.status,
        });
    }

    /// Writes `run.json`, logging instead of failing.
    pub(crate) fn persist_run(&self, run: &Run) {
        if let Err(e) = self.disk.save_run(run) {
            warn!("Cannot save run {} of {}: {e}", run.id, run.plan);
        }
    }
}

/// Handle on the plan registry. Cheap to clone; all clones share state.
#[derive(Debug, Clone)]
pub struct PlanStore {
    pub(crate) shared: Arc<Shared>,
}

impl PlanStore {
    pub(crate) fn new(shared: Shared) -> Self {
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Root directory of the persisted tree.
    pub fn root(&self) -> &std::path::Path {
        self.shared.disk.root()
    }

    /// Subscribes to run status changes made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.shared.events.subscribe()
    }

    /// Runs `work` against the shared state on a blocking worker and waits
    /// for it to finish.
    pub(crate) async fn with_shared<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Shared) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        task::spawn_blocking(move || work(&shared))
            .await
            .map_err(|e| ChannonError::Configuration {
                message: format!("Task join error: {e}"),
            })?
    }
}
