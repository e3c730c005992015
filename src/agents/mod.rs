//! Agent roles: which ones exist and how to start one.
//!
//! ## Discovery
//!
//! Every `*.md` file in the agent directory defines a role named by its file
//! stem (`frontend-architect.md` -> `frontend-architect`). `README.md`,
//! `CLAUDE.md` and `WORKPLAN.template.md` are not agents. Files in
//! `~/.claude/agents/` override bundled ones of the same name.
//!
//! ## Launching
//!
//! [`LaunchTemplate`] renders the shell text typed into a role's pane:
//!
//! ```text
//! cd "<project>" && \
//! echo "=== Starting ROLE ===" && \
//! echo && \
//! cat <<'AGENT_PROMPT_EOF' | claude --agent "<spec>" --dangerously-skip-permissions
//! <initial prompt>
//! AGENT_PROMPT_EOF
//! ```

pub mod catalog;
pub mod launch;

pub use catalog::{AgentCatalog, AgentSource, AgentSpecFile, user_agents_dir};
pub use launch::{LaunchDirs, LaunchTemplate};
