//! Display formatting for domain models and operation results.
//!
//! Domain models implement [`std::fmt::Display`] directly (see [`models`]);
//! this module adds newtype wrappers for collections and operation results so
//! the CLI and the MCP server format the same data the same way.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Domain Models  │    │  Wrappers for   │    │   Markdown      │
//! │  (Plan, Run)    │───▶│ lists & results │───▶│    Output       │
//! │                 │    │                 │    │  (Terminal/MCP) │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`collections`]: Collection wrapper types (PlanNames, Runs, Tags)
//! - [`results`]: Operation result types (CreateResult, UpdateResult,
//!   DeleteResult, TriggerResult)
//! - [`status`]: Status and confirmation messages (OperationStatus)
//! - [`datetime`]: Timestamp and duration formatting
//! - [`models`]: Display implementations for domain models
//!
//! ## Usage Examples
//!
//! ```rust
//! use channon_core::{
//!     display::{CreateResult, OperationStatus},
//!     models::Plan,
//! };
//!
//! let plan = Plan::new("deploy").with_step("build", "#!/bin/sh\nmake\n");
//! let output = format!("{}", CreateResult::new(plan));
//! assert!(output.contains("Created plan 'deploy'"));
//! assert!(output.contains("### 0. build"));
//!
//! let status = OperationStatus::success("Tag 'ci' deleted");
//! println!("{status}");
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod results;
pub mod status;

pub use collections::{PlanNames, Runs, Tags};
pub use datetime::{Elapsed, LocalDateTime};
pub use results::{CreateResult, DeleteResult, TriggerResult, UpdateResult};
pub use status::OperationStatus;
