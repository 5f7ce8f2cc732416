use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::{PlanCommands, RunCommands, TagCommands};

/// A small self-hosted job orchestrator
///
/// Plans are named lists of shell-script steps. Triggering a plan starts a run
/// that executes the steps in order, captures their output under the run's
/// directory and fires the plan's notifications when it finishes. Everything
/// is stored as plain files under the root directory. The `serve` command
/// exposes the same operations over MCP (Model Context Protocol) on stdio.
#[derive(Parser)]
#[command(version, about, name = "channon")]
pub struct Args {
    /// Root directory of the plan tree. Defaults to
    /// $XDG_DATA_HOME/channon/plans
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Manage plans
    #[command(alias = "p")]
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Trigger and inspect runs
    #[command(alias = "r")]
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Manage the tag registry
    #[command(alias = "t")]
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Start the MCP server
    Serve,
}
