//! Plan operations for the PlanStore.

use log::info;

use super::{PlanEntry, PlanStore, Shared};
use crate::{
    error::{ChannonError, Result},
    models::{validate_segment, Plan, Tag},
};

impl Shared {
    pub(crate) fn add_plan(&self, plan: Plan) -> Result<()> {
        plan.validate()?;
        let mut registry = self.registry()?;

        if registry.plans.contains_key(&plan.name) {
            return Err(ChannonError::NameConflict { name: plan.name });
        }

        self.disk.save_plan(&plan)?;

        // Run directories left behind by an earlier plan of the same name
        // keep their ids.
        let reserved = self.disk.next_run_id(&plan.name) as usize;

        registry.tags.extend(plan.tags.iter().cloned());
        info!("Added plan {} with {} steps", plan.name, plan.steps.len());
        registry
            .plans
            .insert(plan.name.clone(), PlanEntry::new(plan, vec![None; reserved]));
        Ok(())
    }

    pub(crate) fn rename_plan(&self, old: &str, new: &str) -> Result<()> {
        validate_segment("name", new)?;
        let mut registry = self.registry()?;

        let entry = registry.entry(old)?;
        if registry.plans.contains_key(new) {
            return Err(ChannonError::NameConflict {
                name: new.to_string(),
            });
        }
        if entry.has_active_runs() {
            return Err(ChannonError::invalid_input("name")
                .with_reason(format!("plan '{old}' has runs in progress")));
        }

        let renamed = Plan {
            name: new.to_string(),
            ..entry.plan.clone()
        };
        self.disk.rename_plan(old, &renamed)?;

        let Some(mut entry) = registry.plans.remove(old) else {
            return Err(ChannonError::plan_not_found(old));
        };
        entry.plan = renamed;
        for run in entry.runs.iter_mut().flatten() {
            run.plan = new.to_string();
            run.path = self.disk.run_dir(new, run.id);
        }
        registry.plans.insert(new.to_string(), entry);
        info!("Renamed plan {old} to {new}");
        Ok(())
    }

    pub(crate) fn update_plan(&self, plan: Plan) -> Result<()> {
        plan.validate()?;
        let mut registry = self.registry()?;

        registry.entry(&plan.name)?;
        self.disk.save_plan(&plan)?;

        registry.tags.extend(plan.tags.iter().cloned());
        let entry = registry.entry_mut(&plan.name)?;
        info!("Updated plan {}", plan.name);
        entry.plan = plan;
        Ok(())
    }

    pub(crate) fn delete_plan(&self, name: &str) -> Result<Option<Plan>> {
        let mut registry = self.registry()?;
        let removed = registry.plans.remove(name).map(|entry| entry.plan);
        if removed.is_some() {
            info!("Deleted plan {name}; its files stay on disk");
        }
        Ok(removed)
    }

    pub(crate) fn get_plan(&self, name: &str) -> Result<Option<Plan>> {
        let registry = self.registry()?;
        Ok(registry.plans.get(name).map(|entry| entry.plan.clone()))
    }

    pub(crate) fn list_plan_names(&self, filter: &[Tag]) -> Result<Vec<String>> {
        let registry = self.registry()?;
        Ok(registry
            .plans
            .values()
            .map(|entry| &entry.plan)
            .filter(|plan| !plan.name.is_empty())
            .filter(|plan| filter.is_empty() || plan.has_any_tag(filter))
            .map(|plan| plan.name.clone())
            .collect())
    }
}

impl PlanStore {
    /// Registers a new plan and persists its document and executables.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::NameConflict` if the name is taken,
    /// `ChannonError::InvalidInput` if the name or a notification target is
    /// not path-safe, and `ChannonError::FileSystem` if the plan document
    /// cannot be written (the registry is left unchanged).
    pub async fn add_plan(&self, plan: Plan) -> Result<()> {
        self.with_shared(move |shared| shared.add_plan(plan)).await
    }

    /// Renames a plan and moves its directory.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::PlanNotFound` if `old` is not registered,
    /// `ChannonError::NameConflict` if `new` is, and
    /// `ChannonError::InvalidInput` while one of the plan's runs is still
    /// pending or executing.
    pub async fn rename_plan(&self, old: &str, new: &str) -> Result<()> {
        let old = old.to_string();
        let new = new.to_string();
        self.with_shared(move |shared| shared.rename_plan(&old, &new))
            .await
    }

    /// Replaces a registered plan and regenerates its executables. Runs
    /// already started keep the steps they were triggered with.
    ///
    /// # Errors
    ///
    /// Returns `ChannonError::PlanNotFound` if no plan has this name.
    pub async fn update_plan(&self, plan: Plan) -> Result<()> {
        self.with_shared(move |shared| shared.update_plan(plan)).await
    }

    /// Removes a plan from the registry and returns it, or `None` if it was
    /// not registered. Files on disk are left untouched.
    pub async fn delete_plan(&self, name: &str) -> Result<Option<Plan>> {
        let name = name.to_string();
        self.with_shared(move |shared| shared.delete_plan(&name))
            .await
    }

    /// Retrieves a plan by name.
    pub async fn get_plan(&self, name: &str) -> Result<Option<Plan>> {
        let name = name.to_string();
        self.with_shared(move |shared| shared.get_plan(&name)).await
    }

    /// Lists plan names in order. With a non-empty `filter`, only plans
    /// carrying at least one of the tags are returned.
    pub async fn list_plan_names(&self, filter: &[Tag]) -> Result<Vec<String>> {
        let filter = filter.to_vec();
        self.with_shared(move |shared| shared.list_plan_names(&filter))
            .await
    }
}
