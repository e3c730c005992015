//! Execution of tmux commands.
//!
//! Every tmux invocation made by the session controller flows through the
//! [`Multiplexer`] trait, so the controller holds an explicit capability for
//! the session it mutates and tests can substitute an in-memory multiplexer.

use super::command::TmuxCommand;
use crate::{Error, Result};
use std::process::{Command, Stdio};

/// Captured result of a non-interactive tmux call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Non-empty trimmed lines of stdout.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Something that can run tmux commands.
///
/// `Err` is reserved for failing to run the command at all (e.g. tmux is not
/// installed). A command that ran and exited non-zero is `Ok` with
/// `success == false`.
pub trait Multiplexer {
    /// Run a command, capturing its output.
    fn run(&self, command: &TmuxCommand) -> Result<CommandOutput>;

    /// Run a command attached to the current terminal, blocking until it
    /// exits. Returns whether it exited successfully.
    fn run_interactive(&self, command: &TmuxCommand) -> Result<bool>;
}

impl<M: Multiplexer + ?Sized> Multiplexer for &M {
    fn run(&self, command: &TmuxCommand) -> Result<CommandOutput> {
        (**self).run(command)
    }

    fn run_interactive(&self, command: &TmuxCommand) -> Result<bool> {
        (**self).run_interactive(command)
    }
}

/// The real tmux binary found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTmux;

impl SystemTmux {
    fn command(command: &TmuxCommand) -> Result<Command> {
        let (program, args) = command
            .args()
            .split_first()
            .ok_or_else(|| Error::Multiplexer("empty tmux command".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }
}

impl Multiplexer for SystemTmux {
    fn run(&self, command: &TmuxCommand) -> Result<CommandOutput> {
        let output = Self::command(command)?
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Multiplexer(format!("Failed to run '{}': {}", command.name(), e)))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn run_interactive(&self, command: &TmuxCommand) -> Result<bool> {
        let status = Self::command(command)?
            .status()
            .map_err(|e| Error::Multiplexer(format!("Failed to run '{}': {}", command.name(), e)))?;
        Ok(status.success())
    }
}
