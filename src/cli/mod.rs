//! CLI argument definitions for crewmux.

use clap::Parser;
use std::path::PathBuf;

/// crewmux - Launch a team of AI agents in a shared tmux session.
///
/// Reads WORKPLAN.md from the workspace to decide which agents the project
/// needs, opens one tmux pane per agent and starts each agent in its pane.
#[derive(Parser, Debug)]
#[command(name = "crewmux")]
#[command(author, version, about = "Launch a team of AI agents in tmux panes", long_about = None)]
#[command(after_help = "Examples:
  # Launch agents for a project (auto-detect from WORKPLAN.md)
  crewmux /path/to/project

  # Use a custom agent directory
  crewmux /path/to/project --agent-dir ~/my-agents

  # Show what would be launched without touching tmux
  crewmux /path/to/project --dry-run -H")]
pub struct Cli {
    /// Path to the project directory (where agents modify code)
    pub project_dir: PathBuf,

    /// Directory of agent specification files (*.md).
    /// Defaults to ~/.config/crewmux/agents.
    #[arg(long = "agent-dir", env = "CREWMUX_AGENT_DIR")]
    pub agent_dir: Option<PathBuf>,

    /// Directory containing WORKPLAN.md and other orchestration files.
    /// Defaults to the project directory.
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Don't automatically attach to the tmux session
    #[arg(long = "no-attach")]
    pub no_attach: bool,

    /// tmux session name (overrides config.kdl)
    #[arg(long = "session")]
    pub session: Option<String>,

    /// Kill and recreate an existing session without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Print the launch plan without touching tmux
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human")]
    pub human_readable: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
