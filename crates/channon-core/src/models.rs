//! Data models for plans, runs and tags.
//!
//! [`Plan`] and [`Run`] double as the `plan.json` and `run.json` documents of
//! the directory store (see [`crate::disk`]). Display implementations live in
//! [`crate::display::models`].
//!
//! # Examples
//!
//! ```rust
//! use channon_core::models::{Plan, Tag};
//!
//! let plan = Plan::new("nightly")
//!     .with_step("build", "#!/bin/sh\nmake\n")
//!     .with_step("test", "#!/bin/sh\nmake test\n")
//!     .with_notification("mail", "#!/bin/sh\nmail -s done ops\n")
//!     .with_tag("ci");
//!
//! assert!(plan.validate().is_ok());
//! assert!(plan.has_any_tag(&[Tag::from("ci")]));
//! ```

pub mod plan;
pub mod run;
pub mod status;
pub mod step;
pub mod tag;

#[cfg(test)]
mod tests;

pub use plan::{validate_segment, Plan, Trigger, DEFAULT_TRIGGER_KIND};
pub use run::{Run, RunEvent, RunId};
pub use status::RunStatus;
pub use step::{Notification, Step};
pub use tag::Tag;
