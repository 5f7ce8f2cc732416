//! channon CLI Application
//!
//! Command-line interface and MCP server for the channon job orchestrator.

mod args;
mod cli;
mod mcp;
mod renderer;

use std::io::IsTerminal;

use anyhow::{Context, Result};
use args::{Args, Commands};
use channon_core::{params::ListPlans, PlanStoreBuilder};
use clap::Parser;
use cli::Cli;
use log::info;
use mcp::{run_stdio_server, ChannonMcpServer};
use renderer::TerminalRenderer;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        root,
        no_color,
        command,
    } = Args::parse();

    let store = PlanStoreBuilder::new()
        .with_root(root)
        .build()
        .await
        .context("Failed to initialize plan store")?;

    let renderer = TerminalRenderer::new(!no_color && std::io::stdout().is_terminal());

    info!("channon started with root {}", store.root().display());

    match command {
        Some(Plan { command }) => {
            Cli::new(store, renderer)
                .handle_plan_command(command)
                .await
        }
        Some(Run { command }) => Cli::new(store, renderer).handle_run_command(command).await,
        Some(Tag { command }) => Cli::new(store, renderer).handle_tag_command(command).await,
        Some(Serve) => {
            info!("Starting channon MCP server");
            run_stdio_server(ChannonMcpServer::new(store))
                .await
                .context("MCP server failed")
        }
        None => {
            Cli::new(store, renderer)
                .list_plans(&ListPlans::default())
                .await
        }
    }
}
