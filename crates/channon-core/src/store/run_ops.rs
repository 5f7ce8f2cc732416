//! Run operations for the PlanStore.

use jiff::Timestamp;
use log::{debug, info};
use tokio::sync::broadcast::error::RecvError;

use super::{PlanStore, Shared};
use crate::{
    disk::StepOutput,
    error::{ChannonError, Result},
    executor::{RunExecutor, RunJob},
    models::{Run, RunId, RunStatus},
};

impl Shared {
    /// Allocates the next run id, stores the trigger payload and registers a
    /// pending run. Returns what the executor needs, snapshotted under the
    /// lock.
    pub(crate) fn create_run(&self, plan: &str, payload: &[u8]) -> Result<RunJob> {
        let mut registry = self.registry()?;
        let entry = registry.entry_mut(plan)?;

        let id = entry.next_run_id();
        let run_dir = self.disk.create_run_dir(plan, id, payload)?;
        let run = Run::new(plan, id, entry.plan.trigger.kind.clone(), run_dir);
        self.disk.save_run(&run)?;

        entry.runs.push(Some(run.clone()));
        info!("Created run {id} of {plan}");
        self.publish(&run);

        Ok(RunJob {
            run,
            steps: entry.plan.steps.clone(),
            notifications: entry.plan.notifications.clone(),
        })
    }

    pub(crate) fn list_runs(&self, plan: &str) -> Result<Vec<Run>> {
        let registry = self.registry()?;
        Ok(registry.entry(plan)?.runs.iter().flatten().cloned().collect())
    }

    pub(crate) fn get_run(&self, plan: &str, id: RunId) -> Result<Run> {
        let registry = self.registry()?;
        registry
            .entry(plan)?
            .runs
            .get(id as usize)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or_else(|| ChannonError::RunNotFound {
                plan: plan.to_string(),
                id,
            })
    }

    pub(crate) fn delete_run(&self, plan: &str, id: RunId) -> Result<Option<Run>> {
        let mut registry = self.registry()?;
        let slot = registry
            .entry_mut(plan)?
            .runs
            .get_mut(id as usize)
            .ok_or_else(|| ChannonError::RunNotFound {
                plan: plan.to_string(),
                id,
            })?;

        let removed = slot.take();
        if removed.is_some() {
            info!("Deleted run {id} of {plan}; its files stay on disk");
        }
        Ok(removed)
    }

    pub(crate) fn step_output(&self, plan: &str, id: RunId, index: usize) -> Result<StepOutput> {
        let registry = self.registry()?;
        let entry = registry.entry(plan)?;
        if !matches!(entry.runs.get(id as usize), Some(Some(_))) {
            return Err(ChannonError::RunNotFound {
                plan: plan.to_string(),
                id,
            });
        }
        self.disk.read_step_output(plan, id, index)
    }

    /// Moves a run forward to `status`, persisting and publishing the change.
    ///
    /// Backward or repeated transitions are ignored. Returns the run as it is
    /// after the call, or `None` if its slot has been emptied.
    pub(crate) fn advance_run(
        &self,
        plan: &str,
        id: RunId,
        status: RunStatus,
    ) -> Result<Option<Run>> {
        let mut registry = self.registry()?;
        let Some(run) = registry
            .entry_mut(plan)?
            .runs
            .get_mut(id as usize)
            .and_then(Option::as_mut)
        else {
            debug!("Run {id} of {plan} is gone, dropping status {status}");
            return Ok(None);
        };

        if run.status.can_advance_to(status) {
            debug!("Run {id} of {plan}: {} -> {status}", run.status);
            run.status = status;
            self.persist_run(run);
            self.publish(run);
        } else {
            debug!("Run {id} of {plan} stays {}, ignoring {status}", run.status);
        }
        Ok(Some(run.clone()))
    }

    /// Records the run's duration if it has not been recorded yet.
    pub(crate) fn record_duration(&self, plan: &str, id: RunId) -> Result<()> {
        let mut registry = self.registry()?;
        let run = registry
            .entry_mut(plan)?
            .runs
            .get_mut(id as usize)
            .and_then(Option::as_mut);

        if let Some(run) = run {
            if run.duration.is_none() {
                run.duration = Some(Timestamp::now().duration_since(run.start));
                self.persist_run(run);
            }
        }
        Ok(())
    }
}

impl PlanStore {
    /// Creates a run of `plan` with `payload` as its trigger and starts it
    /// in the background. Returns the new run id without waiting for any
    /// step.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::PlanNotFound` if the plan is not registered and
    /// `ChannonError::FileSystem` if the run directory or document cannot be
    /// created.
    pub async fn trigger_run(&self, plan: &str, payload: Vec<u8>) -> Result<RunId> {
        let plan = plan.to_string();
        let job = self
            .with_shared(move |shared| shared.create_run(&plan, &payload))
            .await?;

        let id = job.run.id;
        RunExecutor::new(self.clone(), job).spawn();
        Ok(id)
    }

    /// Lists the live runs of a plan in id order.
    pub async fn list_runs(&self, plan: &str) -> Result<Vec<Run>> {
        let plan = plan.to_string();
        self.with_shared(move |shared| shared.list_runs(&plan)).await
    }

    /// Retrieves one run.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::PlanNotFound` or `ChannonError::RunNotFound`;
    /// a deleted run is not found.
    pub async fn get_run(&self, plan: &str, id: RunId) -> Result<Run> {
        let plan = plan.to_string();
        self.with_shared(move |shared| shared.get_run(&plan, id))
            .await
    }

    /// Replaces a run with an empty slot and returns what was there. The id
    /// is not reused and nothing is removed from disk.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::RunNotFound` if the id was never assigned.
    pub async fn delete_run(&self, plan: &str, id: RunId) -> Result<Option<Run>> {
        let plan = plan.to_string();
        self.with_shared(move |shared| shared.delete_run(&plan, id))
            .await
    }

    /// Reads the captured output of step `index` of a run.
    pub async fn step_output(&self, plan: &str, id: RunId, index: usize) -> Result<StepOutput> {
        let plan = plan.to_string();
        self.with_shared(move |shared| shared.step_output(&plan, id, index))
            .await
    }

    /// Waits until a run reaches a terminal status and returns it.
    ///
    /// Does not wait for the run's notifications.
    pub async fn wait_for_run(&self, plan: &str, id: RunId) -> Result<Run> {
        let mut events = self.subscribe();
        loop {
            let run = self.get_run(plan, id).await?;
            if run.status.is_terminal() {
                return Ok(run);
            }

            loop {
                match events.recv().await {
                    Ok(event) if event.plan == plan && event.run_id == id => break,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => break,
                    Err(RecvError::Closed) => {
                        return Err(ChannonError::Configuration {
                            message: "run event channel closed".to_string(),
                        })
                    }
                }
            }
        }
    }
}
