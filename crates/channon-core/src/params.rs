//! Parameter structures for PlanStore operations
//!
//! Shared by every interface (CLI, MCP, ...). They carry no framework
//! derives beyond serde; JSON schemas are generated only with the `schema`
//! feature. Interface layers wrap them with their own derives and convert via
//! `From`:
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   CLI Args      │    │   MCP Params    │    │  Core Params    │
//! │  (clap derives) │───▶│ (serde derives) │───▶│ (minimal deps)  │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! Whole plans are passed as [`crate::models::Plan`] documents directly.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::{RunId, Tag};

/// Parameters for listing plan names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ListPlans {
    /// Only list plans carrying at least one of these tags; empty lists all
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ListPlans {
    /// The filter as tag values.
    pub fn filter(&self) -> Vec<Tag> {
        self.tags.iter().map(|tag| Tag::from(tag.as_str())).collect()
    }
}

/// Parameters for operations addressing one plan by name.
///
/// Used for get_plan, delete_plan and list_runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct PlanName {
    /// Name of the plan
    pub name: String,
}

/// Parameters for renaming a plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RenamePlan {
    /// Current name of the plan
    pub name: String,
    /// New name; must not be taken
    pub new_name: String,
}

/// Parameters for triggering a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct TriggerRun {
    /// Name of the plan to run
    pub plan: String,
    /// Trigger payload handed to every step through `CHANNON_TRIGGER`
    #[serde(default)]
    pub payload: String,
}

/// Parameters for operations addressing one run.
///
/// Used for get_run, delete_run and wait_for_run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct RunRef {
    /// Name of the plan owning the run
    pub plan: String,
    /// Run id within the plan
    pub id: RunId,
}

/// Parameters for reading one step's captured output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct StepOutputRef {
    #[serde(flatten)]
    pub run: RunRef,
    /// Zero-based step index
    pub step: usize,
}

/// Parameters for tag registry operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct TagParam {
    /// The tag value
    pub tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_plans_defaults_to_no_filter() {
        let params: ListPlans = serde_json::from_str("{}").unwrap();
        assert!(params.tags.is_empty());
        assert!(params.filter().is_empty());

        let params: ListPlans = serde_json::from_str(r#"{"tags":["ci","nightly"]}"#).unwrap();
        assert_eq!(params.filter(), vec![Tag::new("ci"), Tag::new("nightly")]);
    }

    #[test]
    fn test_step_output_ref_is_flat() {
        let params: StepOutputRef =
            serde_json::from_str(r#"{"plan":"deploy","id":3,"step":1}"#).unwrap();
        assert_eq!(params.run.plan, "deploy");
        assert_eq!(params.run.id, 3);
        assert_eq!(params.step, 1);
    }

    #[test]
    fn test_trigger_payload_is_optional() {
        let params: TriggerRun = serde_json::from_str(r#"{"plan":"deploy"}"#).unwrap();
        assert_eq!(params.payload, "");
    }
}
