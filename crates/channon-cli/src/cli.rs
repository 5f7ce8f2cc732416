//! Command-line interface definitions and command handling
//!
//! Argument structures carry the clap derives and convert into the core
//! parameter types with `From`, keeping clap out of `channon-core`:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → PlanStore
//! ```
//!
//! [`Cli`] executes the parsed commands against a [`PlanStore`] and renders
//! the markdown output of the core display types.

use std::{fs, path::PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use channon_core::{
    display::{
        CreateResult, DeleteResult, OperationStatus, PlanNames, Runs, Tags, TriggerResult,
        UpdateResult,
    },
    models::{Plan, RunId, RunStatus},
    params::*,
    PlanStore,
};
use clap::{Args, Subcommand};
use log::debug;

use crate::renderer::TerminalRenderer;

// ============================================================================
// Plan arguments
// ============================================================================

/// List plan names
///
/// With one or more --tag values, only plans carrying at least one of them
/// are listed.
#[derive(Args)]
pub struct ListPlansArgs {
    #[arg(
        short,
        long,
        value_delimiter = ',',
        help = "Only list plans with any of these tags (comma-separated or repeated)"
    )]
    pub tag: Vec<String>,
}

impl From<ListPlansArgs> for ListPlans {
    fn from(val: ListPlansArgs) -> Self {
        ListPlans { tags: val.tag }
    }
}

/// Address a plan by name
#[derive(Args)]
pub struct PlanNameArgs {
    #[arg(help = "Name of the plan")]
    pub name: String,
}

impl From<PlanNameArgs> for PlanName {
    fn from(val: PlanNameArgs) -> Self {
        PlanName { name: val.name }
    }
}

/// Read a plan document from a JSON file
#[derive(Args)]
pub struct PlanFileArgs {
    #[arg(help = "Path to a plan.json document")]
    pub file: PathBuf,
}

impl PlanFileArgs {
    /// Reads and decodes the document.
    pub fn load(&self) -> Result<Plan> {
        let contents = fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("{} is not a valid plan document", self.file.display()))
    }
}

/// Rename a plan
#[derive(Args)]
pub struct RenamePlanArgs {
    #[arg(help = "Current name of the plan")]
    pub name: String,
    #[arg(help = "New name for the plan")]
    pub new_name: String,
}

impl From<RenamePlanArgs> for RenamePlan {
    fn from(val: RenamePlanArgs) -> Self {
        RenamePlan {
            name: val.name,
            new_name: val.new_name,
        }
    }
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// List plan names
    #[command(aliases = ["l", "ls"])]
    List(ListPlansArgs),
    /// Show a plan's steps, notifications and tags
    #[command(alias = "s")]
    Show(PlanNameArgs),
    /// Register a new plan from a JSON document
    #[command(alias = "c")]
    Create(PlanFileArgs),
    /// Replace an existing plan with a JSON document
    #[command(alias = "u")]
    Update(PlanFileArgs),
    /// Rename a plan
    #[command(alias = "mv")]
    Rename(RenamePlanArgs),
    /// Remove a plan from the registry (its files stay on disk)
    #[command(aliases = ["d", "rm"])]
    Delete(PlanNameArgs),
}

// ============================================================================
// Run arguments
// ============================================================================

/// Trigger a run and wait for it to finish
///
/// The payload is stored as the run's trigger file; every step finds its
/// path in $CHANNON_TRIGGER.
#[derive(Args)]
pub struct TriggerRunArgs {
    #[arg(help = "Name of the plan to run")]
    pub plan: String,
    #[arg(short, long, help = "Trigger payload given inline")]
    pub payload: Option<String>,
    #[arg(
        long,
        conflicts_with = "payload",
        help = "Read the trigger payload from this file"
    )]
    pub payload_file: Option<PathBuf>,
}

impl TriggerRunArgs {
    /// The raw payload bytes.
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        match (&self.payload, &self.payload_file) {
            (_, Some(path)) => {
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
            }
            (Some(payload), None) => Ok(payload.clone().into_bytes()),
            (None, None) => Ok(Vec::new()),
        }
    }
}

/// Address a run
#[derive(Args)]
pub struct RunRefArgs {
    #[arg(help = "Name of the plan owning the run")]
    pub plan: String,
    #[arg(help = "Run id")]
    pub id: RunId,
}

impl From<RunRefArgs> for RunRef {
    fn from(val: RunRefArgs) -> Self {
        RunRef {
            plan: val.plan,
            id: val.id,
        }
    }
}

/// Print the captured output of one step of a run
#[derive(Args)]
pub struct StepOutputArgs {
    #[arg(help = "Name of the plan owning the run")]
    pub plan: String,
    #[arg(help = "Run id")]
    pub id: RunId,
    #[arg(default_value_t = 0, help = "Zero-based step index")]
    pub step: usize,
}

impl From<StepOutputArgs> for StepOutputRef {
    fn from(val: StepOutputArgs) -> Self {
        StepOutputRef {
            run: RunRef {
                plan: val.plan,
                id: val.id,
            },
            step: val.step,
        }
    }
}

#[derive(Subcommand)]
pub enum RunCommands {
    /// Trigger a run and wait for it to finish
    #[command(alias = "t")]
    Trigger(TriggerRunArgs),
    /// List the runs of a plan
    #[command(aliases = ["l", "ls"])]
    List(PlanNameArgs),
    /// Show one run
    #[command(alias = "s")]
    Show(RunRefArgs),
    /// Remove a run from the registry (its files stay on disk)
    #[command(aliases = ["d", "rm"])]
    Delete(RunRefArgs),
    /// Print the captured output of a step
    #[command(alias = "o")]
    Output(StepOutputArgs),
}

// ============================================================================
// Tag arguments
// ============================================================================

/// A tag value
#[derive(Args)]
pub struct TagArgs {
    #[arg(help = "The tag")]
    pub tag: String,
}

impl From<TagArgs> for TagParam {
    fn from(val: TagArgs) -> Self {
        TagParam { tag: val.tag }
    }
}

#[derive(Subcommand)]
pub enum TagCommands {
    /// Register a tag
    #[command(alias = "a")]
    Add(TagArgs),
    /// Remove a tag from the registry and from every plan
    #[command(aliases = ["d", "rm"])]
    Delete(TagArgs),
    /// List registered tags
    #[command(aliases = ["l", "ls"])]
    List,
}

// ============================================================================
// Command handling
// ============================================================================

/// Executes parsed commands against a store.
pub struct Cli {
    store: PlanStore,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(store: PlanStore, renderer: TerminalRenderer) -> Self {
        Self { store, renderer }
    }

    pub async fn handle_plan_command(&self, command: PlanCommands) -> Result<()> {
        match command {
            PlanCommands::List(args) => self.list_plans(&args.into()).await,
            PlanCommands::Show(args) => self.show_plan(&args.into()).await,
            PlanCommands::Create(args) => self.create_plan(args.load()?).await,
            PlanCommands::Update(args) => self.update_plan(args.load()?).await,
            PlanCommands::Rename(args) => self.rename_plan(&args.into()).await,
            PlanCommands::Delete(args) => self.delete_plan(&args.into()).await,
        }
    }

    pub async fn handle_run_command(&self, command: RunCommands) -> Result<()> {
        match command {
            RunCommands::Trigger(args) => {
                let payload = args.payload_bytes()?;
                self.trigger_run(&args.plan, payload).await
            }
            RunCommands::List(args) => self.list_runs(&args.into()).await,
            RunCommands::Show(args) => self.show_run(&args.into()).await,
            RunCommands::Delete(args) => self.delete_run(&args.into()).await,
            RunCommands::Output(args) => self.step_output(&args.into()).await,
        }
    }

    pub async fn handle_tag_command(&self, command: TagCommands) -> Result<()> {
        match command {
            TagCommands::Add(args) => self.add_tag(&args.into()).await,
            TagCommands::Delete(args) => self.delete_tag(&args.into()).await,
            TagCommands::List => self.list_tags().await,
        }
    }

    pub async fn list_plans(&self, params: &ListPlans) -> Result<()> {
        debug!("list_plans: {:?}", params);
        let names = self
            .store
            .list_plan_names(&params.filter())
            .await
            .context("Failed to list plans")?;

        let title = if params.tags.is_empty() {
            "Plans".to_string()
        } else {
            format!("Plans tagged {}", params.tags.join(", "))
        };
        self.renderer
            .render(&format!("# {title}\n\n{}", PlanNames(names)))
    }

    async fn show_plan(&self, params: &PlanName) -> Result<()> {
        let plan = self
            .store
            .get_plan(&params.name)
            .await
            .context("Failed to get plan")?
            .ok_or_else(|| anyhow!("Plan '{}' not found", params.name))?;
        self.renderer.render(&plan.to_string())
    }

    async fn create_plan(&self, plan: Plan) -> Result<()> {
        self.store
            .add_plan(plan.clone())
            .await
            .context("Failed to create plan")?;
        self.renderer.render(&CreateResult::new(plan).to_string())
    }

    async fn update_plan(&self, plan: Plan) -> Result<()> {
        self.store
            .update_plan(plan.clone())
            .await
            .context("Failed to update plan")?;
        self.renderer.render(&UpdateResult::new(plan).to_string())
    }

    async fn rename_plan(&self, params: &RenamePlan) -> Result<()> {
        self.store
            .rename_plan(&params.name, &params.new_name)
            .await
            .context("Failed to rename plan")?;
        let plan = self
            .store
            .get_plan(&params.new_name)
            .await
            .context("Failed to get plan")?
            .ok_or_else(|| anyhow!("Plan '{}' not found", params.new_name))?;

        let changes = vec![format!("Renamed from '{}'", params.name)];
        self.renderer
            .render(&UpdateResult::with_changes(plan, changes).to_string())
    }

    async fn delete_plan(&self, params: &PlanName) -> Result<()> {
        let plan = self
            .store
            .delete_plan(&params.name)
            .await
            .context("Failed to delete plan")?
            .ok_or_else(|| anyhow!("Plan '{}' not found", params.name))?;
        self.renderer.render(&DeleteResult::new(plan).to_string())
    }

    async fn trigger_run(&self, plan: &str, payload: Vec<u8>) -> Result<()> {
        let id = self
            .store
            .trigger_run(plan, payload)
            .await
            .context("Failed to trigger run")?;
        self.renderer
            .render(&TriggerResult { plan, id }.to_string())?;

        let run = self
            .store
            .wait_for_run(plan, id)
            .await
            .context("Failed to wait for run")?;
        self.renderer.render(&run.to_string())?;

        if run.status == RunStatus::Failure {
            bail!("Run {id} of plan '{plan}' failed");
        }
        Ok(())
    }

    async fn list_runs(&self, params: &PlanName) -> Result<()> {
        let runs = self
            .store
            .list_runs(&params.name)
            .await
            .context("Failed to list runs")?;
        self.renderer
            .render(&format!("# Runs of {}\n\n{}", params.name, Runs(runs)))
    }

    async fn show_run(&self, params: &RunRef) -> Result<()> {
        let run = self
            .store
            .get_run(&params.plan, params.id)
            .await
            .context("Failed to get run")?;
        self.renderer.render(&run.to_string())
    }

    async fn delete_run(&self, params: &RunRef) -> Result<()> {
        let run = self
            .store
            .delete_run(&params.plan, params.id)
            .await
            .context("Failed to delete run")?
            .ok_or_else(|| {
                anyhow!("Run {} of plan '{}' was already deleted", params.id, params.plan)
            })?;
        self.renderer.render(&DeleteResult::new(run).to_string())
    }

    async fn step_output(&self, params: &StepOutputRef) -> Result<()> {
        let output = self
            .store
            .step_output(&params.run.plan, params.run.id, params.step)
            .await
            .context("Failed to read step output")?;
        self.renderer.render(&format!(
            "## Step {} of run {} of {}\n\n{output}",
            params.step, params.run.id, params.run.plan
        ))
    }

    async fn add_tag(&self, params: &TagParam) -> Result<()> {
        let added = self
            .store
            .add_tag(params.tag.as_str())
            .await
            .context("Failed to add tag")?;
        let message = if added {
            format!("Tag '{}' added", params.tag)
        } else {
            format!("Tag '{}' already registered", params.tag)
        };
        self.renderer
            .render(&OperationStatus::success(message).to_string())
    }

    async fn delete_tag(&self, params: &TagParam) -> Result<()> {
        self.store
            .delete_tag(params.tag.as_str())
            .await
            .context("Failed to delete tag")?;
        self.renderer.render(
            &OperationStatus::success(format!("Tag '{}' deleted", params.tag)).to_string(),
        )
    }

    async fn list_tags(&self) -> Result<()> {
        let tags = self.store.list_tags().await.context("Failed to list tags")?;
        self.renderer
            .render(&format!("# Tags\n\n{}", Tags(tags)))
    }
}
