//! MCP server implementation for channon
//!
//! Exposes the plan store over the Model Context Protocol on stdio so AI
//! assistants and other MCP clients can manage plans, trigger runs and read
//! their output.

use anyhow::Result;
use channon_core::PlanStore;
use log::{debug, error, info};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use tokio::signal::unix::{signal, SignalKind};

pub mod errors;
pub mod handlers;

pub use errors::to_mcp_error;
// Re-export parameter types and result type from handlers for external use
pub use handlers::{
    ListPlans, McpResult, PlanDocument, PlanName, RenamePlan, RunRef, StepOutputRef, TagParam,
    TriggerRun,
};

/// MCP server for channon
#[derive(Clone)]
pub struct ChannonMcpServer {
    store: PlanStore,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ChannonMcpServer {
    /// Create a new channon MCP server
    pub fn new(store: PlanStore) -> Self {
        Self {
            store,
            tool_router: Self::tool_router(),
        }
    }

    fn handlers(&self) -> handlers::McpHandlers {
        handlers::McpHandlers::new(self.store.clone())
    }

    #[tool(
        name = "list_plans",
        description = "List plan names in alphabetical order. Pass tags to only list plans carrying at least one of them; an empty list returns every plan."
    )]
    async fn list_plans(&self, params: Parameters<ListPlans>) -> McpResult {
        self.handlers().list_plans(params).await
    }

    #[tool(
        name = "get_plan",
        description = "Show a plan by name: its steps with their script payloads, notifications, trigger type and tags."
    )]
    async fn get_plan(&self, params: Parameters<PlanName>) -> McpResult {
        self.handlers().get_plan(params).await
    }

    #[tool(
        name = "create_plan",
        description = "Register a new plan. The name must be unique and usable as a directory name. Each step payload is a script run directly, so it should start with a shebang line such as '#!/bin/sh'. Steps read the trigger payload from the file named by $CHANNON_TRIGGER."
    )]
    async fn create_plan(&self, params: Parameters<PlanDocument>) -> McpResult {
        self.handlers().create_plan(params).await
    }

    #[tool(
        name = "update_plan",
        description = "Replace an existing plan (matched by name) with a new document. Runs already started keep the steps they were triggered with."
    )]
    async fn update_plan(&self, params: Parameters<PlanDocument>) -> McpResult {
        self.handlers().update_plan(params).await
    }

    #[tool(
        name = "rename_plan",
        description = "Rename a plan and move its directory. Fails if the new name is taken or if one of the plan's runs is still pending or executing."
    )]
    async fn rename_plan(&self, params: Parameters<RenamePlan>) -> McpResult {
        self.handlers().rename_plan(params).await
    }

    #[tool(
        name = "delete_plan",
        description = "Remove a plan from the registry. Its files stay on disk."
    )]
    async fn delete_plan(&self, params: Parameters<PlanName>) -> McpResult {
        self.handlers().delete_plan(params).await
    }

    #[tool(
        name = "trigger_run",
        description = "Start a run of a plan with an optional text payload and return its run id immediately. Use wait_for_run to block until it finishes and get_step_output to read what each step printed."
    )]
    async fn trigger_run(&self, params: Parameters<TriggerRun>) -> McpResult {
        self.handlers().trigger_run(params).await
    }

    #[tool(
        name = "list_runs",
        description = "List the runs of a plan with their status, start time and duration."
    )]
    async fn list_runs(&self, params: Parameters<PlanName>) -> McpResult {
        self.handlers().list_runs(params).await
    }

    #[tool(
        name = "get_run",
        description = "Show one run: status (pending, executing, success or failure), trigger type, start time and duration."
    )]
    async fn get_run(&self, params: Parameters<RunRef>) -> McpResult {
        self.handlers().get_run(params).await
    }

    #[tool(
        name = "wait_for_run",
        description = "Block until a run reaches success or failure, then show it. Does not wait for the plan's notifications."
    )]
    async fn wait_for_run(&self, params: Parameters<RunRef>) -> McpResult {
        self.handlers().wait_for_run(params).await
    }

    #[tool(
        name = "delete_run",
        description = "Remove a run from the registry. Its id is never reused and its files stay on disk."
    )]
    async fn delete_run(&self, params: Parameters<RunRef>) -> McpResult {
        self.handlers().delete_run(params).await
    }

    #[tool(
        name = "get_step_output",
        description = "Read the captured stdout and stderr of one step (zero-based index) of a run."
    )]
    async fn get_step_output(&self, params: Parameters<StepOutputRef>) -> McpResult {
        self.handlers().step_output(params).await
    }

    #[tool(name = "add_tag", description = "Register a tag.")]
    async fn add_tag(&self, params: Parameters<TagParam>) -> McpResult {
        self.handlers().add_tag(params).await
    }

    #[tool(
        name = "delete_tag",
        description = "Remove a tag from the registry and from every plan carrying it."
    )]
    async fn delete_tag(&self, params: Parameters<TagParam>) -> McpResult {
        self.handlers().delete_tag(params).await
    }

    #[tool(name = "list_tags", description = "List registered tags.")]
    async fn list_tags(&self) -> McpResult {
        self.handlers().list_tags().await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for ChannonMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "channon".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(r#"channon is a small job orchestrator. A plan is a named, ordered list of shell-script steps; triggering it starts a run that executes the steps one after another.

## Core Concepts
- **Plans**: name, steps (script payloads), notify (scripts fired after every run), trigger type and tags
- **Runs**: one execution of a plan, identified by plan name and a per-plan id; status moves pending → executing → success | failure
- **Tags**: labels for filtering plans

## Typical Workflow
1. Create a plan with `create_plan`; every payload should start with a shebang line
2. Start it with `trigger_run`, passing an optional payload; steps find it in the file named by $CHANNON_TRIGGER
3. Call `wait_for_run` to block until it finishes
4. Read each step's output with `get_step_output`

A run stops at the first step that fails. Notifications run after the run finishes and never change its status.

## Tool Categories
- **Plans**: list_plans, get_plan, create_plan, update_plan, rename_plan, delete_plan
- **Runs**: trigger_run, list_runs, get_run, wait_for_run, delete_run, get_step_output
- **Tags**: add_tag, delete_tag, list_tags"#.to_string()),
        }
    }
}

/// Run the MCP server with stdio transport
pub async fn run_stdio_server(server: ChannonMcpServer) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting channon MCP server on stdio");
    debug!(
        "Server created with {} tools",
        server.tool_router.list_all().len()
    );

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!("serving error: {e:?}");
    })?;

    // Set up signal handlers for graceful shutdown
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("MCP server stopped normally"),
                Err(e) => error!("MCP server error: {e:?}"),
            }
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }

    info!("MCP server shutdown complete");
    Ok(())
}
