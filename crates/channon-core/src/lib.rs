//! Core library for the channon job orchestrator.
//!
//! A *plan* is a named, ordered list of shell-script steps plus
//! notifications, a trigger descriptor and tags. Triggering a plan creates a
//! *run* that executes the steps as child processes, captures their output,
//! tracks its status and fires the notifications once it finishes. Everything
//! is persisted as a directory tree of JSON documents and executables.
//!
//! # Components
//!
//! - [`store`]: the [`PlanStore`] registry, the API every interface calls
//! - [`executor`]: drives one run's steps ([`RunExecutor`])
//! - [`notify`]: fire-and-forget notifications ([`NotificationDispatcher`])
//! - [`disk`]: the directory-tree document store
//! - [`models`], [`params`], [`display`]: documents, operation parameters and
//!   markdown formatting shared by the CLI and the MCP server
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use channon_core::{models::Plan, PlanStoreBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PlanStoreBuilder::new()
//!     .with_root(Some("/tmp/channon"))
//!     .build()
//!     .await?;
//!
//! let plan = Plan::new("hello")
//!     .with_step("greet", "#!/bin/sh\necho hello \"$(cat \"$CHANNON_TRIGGER\")\"\n")
//!     .with_tag("demo");
//! store.add_plan(plan).await?;
//!
//! let id = store.trigger_run("hello", b"world".to_vec()).await?;
//! let run = store.wait_for_run("hello", id).await?;
//! println!("{run}");
//! println!("{}", store.step_output("hello", id, 0).await?);
//! # Ok(())
//! # }
//! ```

pub mod disk;
pub mod display;
pub mod error;
pub mod executor;
pub mod models;
pub mod notify;
pub mod params;
pub mod store;

// Re-export commonly used types
pub use disk::{Disk, StepOutput};
pub use display::{
    CreateResult, DeleteResult, OperationStatus, PlanNames, Runs, Tags, TriggerResult,
    UpdateResult,
};
pub use error::{ChannonError, Result};
pub use executor::RunExecutor;
pub use models::{Notification, Plan, Run, RunEvent, RunId, RunStatus, Step, Tag, Trigger};
pub use notify::NotificationDispatcher;
pub use params::{ListPlans, PlanName, RenamePlan, RunRef, StepOutputRef, TagParam, TriggerRun};
pub use store::{PlanStore, PlanStoreBuilder};
