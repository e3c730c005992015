//! Common test utilities for crewmux integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't read the
//! user's `~/.config/crewmux/` or `~/.claude/agents/` directories.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
pub use tempfile::TempDir;

/// A test environment with isolated directories.
///
/// - `project_dir`: The project agents work in (also the workspace)
/// - `agent_dir`: Bundled agent specs, passed via `--agent-dir`
/// - `home_dir`: Stands in for `$HOME` and `$XDG_CONFIG_HOME`
pub struct TestEnv {
    pub project_dir: TempDir,
    pub agent_dir: TempDir,
    pub home_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            project_dir: TempDir::new().unwrap(),
            agent_dir: TempDir::new().unwrap(),
            home_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment with the given agent specs.
    pub fn with_agents(roles: &[&str]) -> Self {
        let env = Self::new();
        for role in roles {
            env.add_agent(role);
        }
        env
    }

    pub fn add_agent(&self, role: &str) {
        std::fs::write(
            self.agent_dir.path().join(format!("{}.md", role)),
            format!("# {}\n\nYou are the {} agent.\n", role, role),
        )
        .unwrap();
    }

    pub fn write_workplan(&self, text: &str) {
        std::fs::write(self.project_dir.path().join("WORKPLAN.md"), text).unwrap();
    }

    /// Write `<project>/.crewmux/config.kdl`.
    pub fn write_config(&self, kdl: &str) {
        let dir = self.project_dir.path().join(".crewmux");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.kdl"), kdl).unwrap();
    }

    /// Get a Command for the crewmux binary with isolated home and config.
    pub fn crewmux(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_crewmux"));
        cmd.env("HOME", self.home_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.home_dir.path().join(".config"));
        cmd.env("CREWMUX_AGENT_DIR", self.agent_dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn project_path(&self) -> &Path {
        self.project_dir.path()
    }

    /// Run a dry run and parse the JSON plan.
    pub fn dry_run_plan(&self) -> serde_json::Value {
        let output = self
            .crewmux()
            .arg(self.project_path())
            .arg("--dry-run")
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "dry run failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Roles in a JSON plan, in pane order.
pub fn plan_roles(plan: &serde_json::Value) -> Vec<String> {
    plan["agents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["role"].as_str().unwrap().to_string())
        .collect()
}
