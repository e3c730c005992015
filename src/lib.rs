//! crewmux - Launch a team of AI work-agents in a shared tmux session.
//!
//! This library provides the core functionality for the `crewmux` CLI tool:
//! deciding which agent roles a project needs, laying out one tmux pane per
//! role, and dispatching each agent's startup command into its pane.

pub mod agents;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod spec;
pub mod tmux;

/// Test utilities shared by unit tests across modules.
#[cfg(test)]
pub(crate) mod test_utils;

/// Library-level error type for crewmux operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Pane {index} not found (session has {count} panes)")]
    PaneNotFound { index: usize, count: usize },

    #[error("Multiplexer error: {0}")]
    Multiplexer(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Could not determine required agents: {0}")]
    NoAgents(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for crewmux operations.
pub type Result<T> = std::result::Result<T, Error>;
