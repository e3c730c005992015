//! Tmux session layout management.
//!
//! [`session::SessionController`] owns the agent session. The other modules
//! are its building blocks: command construction, split planning, pane
//! geometry parsing, the pane-role ledger and command execution.

pub mod command;
pub mod layout;
pub mod ledger;
pub mod runner;
pub mod schema;
pub mod session;

pub use layout::{LayoutPlan, Topology, is_rectangular_grid};
pub use runner::{Multiplexer, SystemTmux};
pub use session::{
    Confirm, FixedAnswer, PaneBinding, SessionController, SessionHandle, StdinConfirm,
    Verification,
};

use crate::{Error, Result};
use std::process::Command;

/// Check if tmux binary is available in PATH.
pub fn check_tmux_binary() -> Result<()> {
    which_tmux()?;
    Ok(())
}

/// Find tmux binary in PATH.
fn which_tmux() -> Result<String> {
    let not_found = || {
        Error::Multiplexer(
            "tmux binary not found in PATH. Please install tmux to launch agents.".to_string(),
        )
    };

    let output = Command::new("which")
        .arg("tmux")
        .output()
        .map_err(|e| Error::Multiplexer(format!("Failed to run 'which tmux': {}", e)))?;

    if !output.status.success() {
        return Err(not_found());
    }

    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path.is_empty() {
        return Err(not_found());
    }

    Ok(path)
}
