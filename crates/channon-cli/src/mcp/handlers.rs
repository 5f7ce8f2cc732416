//! MCP tool handlers implementation

use channon_core::{
    display::{
        CreateResult, DeleteResult, OperationStatus, PlanNames, Runs, Tags, TriggerResult,
        UpdateResult,
    },
    models::Plan,
    params as core,
    PlanStore,
};
use log::debug;
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    ErrorData,
};
use schemars::JsonSchema;
use serde::Deserialize;

use super::to_mcp_error;

// ============================================================================
// Generic Parameter Wrapper Implementation
// ============================================================================
//
// Core parameter types stay free of MCP concerns. This transparent wrapper
// adds the Deserialize + JsonSchema pair rmcp needs and passes the schema of
// the wrapped type through unchanged.

/// Generic MCP wrapper for core parameter types with serde integration
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct McpParams<T>(T)
where
    T: JsonSchema;

impl<T> JsonSchema for McpParams<T>
where
    T: JsonSchema,
{
    fn schema_name() -> std::borrow::Cow<'static, str> {
        T::schema_name()
    }

    fn json_schema(g: &mut schemars::SchemaGenerator) -> schemars::Schema {
        T::json_schema(g)
    }
}

impl<T> AsRef<T> for McpParams<T>
where
    T: JsonSchema,
{
    fn as_ref(&self) -> &T {
        &self.0
    }
}

impl<T> McpParams<T>
where
    T: JsonSchema,
{
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Type aliases for cleaner usage in function signatures
pub type ListPlans = McpParams<core::ListPlans>;
pub type PlanName = McpParams<core::PlanName>;
pub type PlanDocument = McpParams<Plan>;
pub type RenamePlan = McpParams<core::RenamePlan>;
pub type TriggerRun = McpParams<core::TriggerRun>;
pub type RunRef = McpParams<core::RunRef>;
pub type StepOutputRef = McpParams<core::StepOutputRef>;
pub type TagParam = McpParams<core::TagParam>;

pub type McpResult = Result<CallToolResult, ErrorData>;

fn text_result(text: impl Into<String>) -> McpResult {
    Ok(CallToolResult::success(vec![Content::text(text.into())]))
}

/// Handler implementations for the MCP server
pub struct McpHandlers {
    store: PlanStore,
}

impl McpHandlers {
    pub fn new(store: PlanStore) -> Self {
        Self { store }
    }

    pub async fn list_plans(&self, Parameters(params): Parameters<ListPlans>) -> McpResult {
        debug!("list_plans: {:?}", params);
        let params = params.as_ref();

        let names = self
            .store
            .list_plan_names(&params.filter())
            .await
            .map_err(|e| to_mcp_error("Failed to list plans", &e))?;

        let title = if params.tags.is_empty() {
            "Plans".to_string()
        } else {
            format!("Plans tagged {}", params.tags.join(", "))
        };
        text_result(format!("# {title}\n\n{}", PlanNames(names)))
    }

    pub async fn get_plan(&self, Parameters(params): Parameters<PlanName>) -> McpResult {
        debug!("get_plan: {:?}", params);
        let name = &params.as_ref().name;

        let plan = self
            .store
            .get_plan(name)
            .await
            .map_err(|e| to_mcp_error("Failed to get plan", &e))?
            .ok_or_else(|| ErrorData::invalid_params(format!("Plan '{name}' not found"), None))?;
        text_result(plan.to_string())
    }

    pub async fn create_plan(&self, Parameters(params): Parameters<PlanDocument>) -> McpResult {
        debug!("create_plan: {:?}", params);
        let plan = params.into_inner();

        self.store
            .add_plan(plan.clone())
            .await
            .map_err(|e| to_mcp_error("Failed to create plan", &e))?;
        text_result(CreateResult::new(plan).to_string())
    }

    pub async fn update_plan(&self, Parameters(params): Parameters<PlanDocument>) -> McpResult {
        debug!("update_plan: {:?}", params);
        let plan = params.into_inner();

        self.store
            .update_plan(plan.clone())
            .await
            .map_err(|e| to_mcp_error("Failed to update plan", &e))?;
        text_result(UpdateResult::new(plan).to_string())
    }

    pub async fn rename_plan(&self, Parameters(params): Parameters<RenamePlan>) -> McpResult {
        debug!("rename_plan: {:?}", params);
        let params = params.as_ref();

        self.store
            .rename_plan(&params.name, &params.new_name)
            .await
            .map_err(|e| to_mcp_error("Failed to rename plan", &e))?;
        text_result(
            OperationStatus::success(format!(
                "Renamed plan '{}' to '{}'",
                params.name, params.new_name
            ))
            .to_string(),
        )
    }

    pub async fn delete_plan(&self, Parameters(params): Parameters<PlanName>) -> McpResult {
        debug!("delete_plan: {:?}", params);
        let name = &params.as_ref().name;

        let plan = self
            .store
            .delete_plan(name)
            .await
            .map_err(|e| to_mcp_error("Failed to delete plan", &e))?
            .ok_or_else(|| ErrorData::invalid_params(format!("Plan '{name}' not found"), None))?;
        text_result(DeleteResult::new(plan).to_string())
    }

    pub async fn trigger_run(&self, Parameters(params): Parameters<TriggerRun>) -> McpResult {
        debug!("trigger_run: {:?}", params);
        let params = params.into_inner();

        let id = self
            .store
            .trigger_run(&params.plan, params.payload.into_bytes())
            .await
            .map_err(|e| to_mcp_error("Failed to trigger run", &e))?;
        text_result(
            TriggerResult {
                plan: &params.plan,
                id,
            }
            .to_string(),
        )
    }

    pub async fn list_runs(&self, Parameters(params): Parameters<PlanName>) -> McpResult {
        debug!("list_runs: {:?}", params);
        let name = &params.as_ref().name;

        let runs = self
            .store
            .list_runs(name)
            .await
            .map_err(|e| to_mcp_error("Failed to list runs", &e))?;
        text_result(format!("# Runs of {name}\n\n{}", Runs(runs)))
    }

    pub async fn get_run(&self, Parameters(params): Parameters<RunRef>) -> McpResult {
        debug!("get_run: {:?}", params);
        let params = params.as_ref();

        let run = self
            .store
            .get_run(&params.plan, params.id)
            .await
            .map_err(|e| to_mcp_error("Failed to get run", &e))?;
        text_result(run.to_string())
    }

    pub async fn wait_for_run(&self, Parameters(params): Parameters<RunRef>) -> McpResult {
        debug!("wait_for_run: {:?}", params);
        let params = params.as_ref();

        let run = self
            .store
            .wait_for_run(&params.plan, params.id)
            .await
            .map_err(|e| to_mcp_error("Failed to wait for run", &e))?;
        text_result(run.to_string())
    }

    pub async fn delete_run(&self, Parameters(params): Parameters<RunRef>) -> McpResult {
        debug!("delete_run: {:?}", params);
        let params = params.as_ref();

        let run = self
            .store
            .delete_run(&params.plan, params.id)
            .await
            .map_err(|e| to_mcp_error("Failed to delete run", &e))?
            .ok_or_else(|| {
                ErrorData::invalid_params(
                    format!(
                        "Run {} of plan '{}' was already deleted",
                        params.id, params.plan
                    ),
                    None,
                )
            })?;
        text_result(DeleteResult::new(run).to_string())
    }

    pub async fn step_output(&self, Parameters(params): Parameters<StepOutputRef>) -> McpResult {
        debug!("step_output: {:?}", params);
        let params = params.as_ref();

        let output = self
            .store
            .step_output(&params.run.plan, params.run.id, params.step)
            .await
            .map_err(|e| to_mcp_error("Failed to read step output", &e))?;
        text_result(output.to_string())
    }

    pub async fn add_tag(&self, Parameters(params): Parameters<TagParam>) -> McpResult {
        debug!("add_tag: {:?}", params);
        let tag = &params.as_ref().tag;

        let added = self
            .store
            .add_tag(tag.as_str())
            .await
            .map_err(|e| to_mcp_error("Failed to add tag", &e))?;
        let message = if added {
            format!("Tag '{tag}' added")
        } else {
            format!("Tag '{tag}' already registered")
        };
        text_result(OperationStatus::success(message).to_string())
    }

    pub async fn delete_tag(&self, Parameters(params): Parameters<TagParam>) -> McpResult {
        debug!("delete_tag: {:?}", params);
        let tag = &params.as_ref().tag;

        self.store
            .delete_tag(tag.as_str())
            .await
            .map_err(|e| to_mcp_error("Failed to delete tag", &e))?;
        text_result(OperationStatus::success(format!("Tag '{tag}' deleted")).to_string())
    }

    pub async fn list_tags(&self) -> McpResult {
        let tags = self
            .store
            .list_tags()
            .await
            .map_err(|e| to_mcp_error("Failed to list tags", &e))?;
        text_result(format!("# Tags\n\n{}", Tags(tags)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use channon_core::PlanStoreBuilder;
    use tempfile::TempDir;

    async fn create_test_handlers() -> (TempDir, McpHandlers) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = PlanStoreBuilder::new()
            .with_root(Some(temp_dir.path()))
            .build()
            .await
            .expect("Failed to create store");
        (temp_dir, McpHandlers::new(store))
    }

    fn params<T: JsonSchema + serde::de::DeserializeOwned>(
        value: serde_json::Value,
    ) -> Parameters<McpParams<T>> {
        Parameters(serde_json::from_value(value).expect("valid params"))
    }

    fn text(result: &CallToolResult) -> String {
        serde_json::to_string(result).expect("serializable result")
    }

    #[tokio::test]
    async fn test_create_trigger_and_wait() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        let result = handlers
            .create_plan(params(serde_json::json!({
                "name": "deploy",
                "steps": [{"name": "echo", "payload": "#!/bin/sh\ncat \"$CHANNON_TRIGGER\"\n"}],
                "tags": ["ci"]
            })))
            .await
            .unwrap();
        assert!(text(&result).contains("Created plan 'deploy'"));

        let result = handlers
            .trigger_run(params(serde_json::json!({"plan": "deploy", "payload": "hi"})))
            .await
            .unwrap();
        assert!(text(&result).contains("Triggered run 0 of 'deploy'"));

        let result = handlers
            .wait_for_run(params(serde_json::json!({"plan": "deploy", "id": 0})))
            .await
            .unwrap();
        assert!(text(&result).contains("✓ Success"));

        let result = handlers
            .step_output(params(serde_json::json!({"plan": "deploy", "id": 0, "step": 0})))
            .await
            .unwrap();
        assert!(text(&result).contains("hi"));

        let result = handlers
            .list_plans(params(serde_json::json!({"tags": ["ci"]})))
            .await
            .unwrap();
        assert!(text(&result).contains("- deploy"));
    }

    #[tokio::test]
    async fn test_list_plans_filters_by_any_tag() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        for (name, tag) in [("deploy", "ci"), ("backup", "nightly"), ("lint", "ci")] {
            handlers
                .create_plan(params(serde_json::json!({"name": name, "tags": [tag]})))
                .await
                .unwrap();
        }

        let result = handlers
            .list_plans(params(serde_json::json!({"tags": ["ci"]})))
            .await
            .unwrap();
        let output = text(&result);
        assert!(output.contains("Plans tagged ci"));
        assert!(output.contains("- deploy"));
        assert!(output.contains("- lint"));
        assert!(!output.contains("- backup"));

        let result = handlers
            .list_plans(params(serde_json::json!({"tags": ["nightly", "missing"]})))
            .await
            .unwrap();
        let output = text(&result);
        assert!(output.contains("- backup"));
        assert!(!output.contains("- deploy"));

        let result = handlers
            .list_plans(params(serde_json::json!({})))
            .await
            .unwrap();
        let output = text(&result);
        for name in ["backup", "deploy", "lint"] {
            assert!(output.contains(&format!("- {name}")));
        }
    }

    #[tokio::test]
    async fn test_missing_plan_is_invalid_params() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        let err = handlers
            .get_plan(params(serde_json::json!({"name": "missing"})))
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);

        let err = handlers
            .trigger_run(params(serde_json::json!({"plan": "missing"})))
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tags() {
        let (_temp_dir, handlers) = create_test_handlers().await;

        handlers
            .add_tag(params(serde_json::json!({"tag": "nightly"})))
            .await
            .unwrap();
        let result = handlers.list_tags().await.unwrap();
        assert!(text(&result).contains("- nightly"));

        handlers
            .delete_tag(params(serde_json::json!({"tag": "nightly"})))
            .await
            .unwrap();
        let result = handlers.list_tags().await.unwrap();
        assert!(text(&result).contains("No tags found."));
    }
}
