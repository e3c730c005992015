//! Shell text that starts an agent in a pane.
//!
//! The initial prompt is fed to the agent program through a quoted heredoc,
//! so the shell performs no expansion on it.

use serde::Serialize;
use std::path::Path;

use crate::config::ResolvedConfig;
use crate::config::resolver::{DEFAULT_AGENT_ARGS, DEFAULT_AGENT_PROGRAM};

const HEREDOC_TAG: &str = "AGENT_PROMPT_EOF";

/// Where an agent works.
#[derive(Debug, Clone, Copy)]
pub struct LaunchDirs<'a> {
    /// Where the agent modifies code.
    pub project: &'a Path,
    /// Where WORKPLAN.md and PROGRESS.md live.
    pub workspace: &'a Path,
}

/// Agent program and its fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for LaunchTemplate {
    fn default() -> Self {
        Self {
            program: DEFAULT_AGENT_PROGRAM.to_string(),
            args: DEFAULT_AGENT_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LaunchTemplate {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            program: config.agent_program.value.clone(),
            args: config.agent_args.value.clone(),
        }
    }

    /// The prompt an agent starts with. `project_context` is the block from
    /// [`crate::spec::ProjectSpec::agent_context`].
    pub fn initial_prompt(
        &self,
        role: &str,
        dirs: LaunchDirs<'_>,
        workplan_section: Option<&str>,
        project_context: Option<&str>,
    ) -> String {
        let project = dirs.project.display();
        let workspace = dirs.workspace.display();

        let mut parts = vec![
            format!("You are the {} agent.", role),
            "\n## Working Directories".to_string(),
            format!("- **Project directory** (where you modify code): {}", project),
            format!(
                "- **Workspace directory** (where orchestration files live): {}",
                workspace
            ),
            "\nYou execute in the project directory. All code changes happen there.".to_string(),
            "Read WORKPLAN.md and write PROGRESS.md to the workspace directory.".to_string(),
        ];

        if let Some(section) = workplan_section {
            parts.push("\n## Your Assigned Tasks\n".to_string());
            parts.push(section.to_string());
        }

        if let Some(context) = project_context {
            parts.push("\n## Additional Context\n".to_string());
            parts.push(context.to_string());
        }

        parts.push("\n\n## File Locations".to_string());
        parts.push(format!("- Read: {}/WORKPLAN.md", workspace));
        parts.push(format!("- Read: {}/CLAUDE.md (if exists)", workspace));
        parts.push(format!("- Write: {}/PROGRESS.md", workspace));
        parts.push(format!("- Modify code in: {}/", project));
        parts.push("\nStart working on your assigned tasks. Report progress as you go.".to_string());

        parts.join("\n\n")
    }

    /// Full command text for `role` using the agent spec at `spec_path`.
    pub fn render(
        &self,
        role: &str,
        spec_path: &Path,
        dirs: LaunchDirs<'_>,
        workplan_section: Option<&str>,
        project_context: Option<&str>,
    ) -> String {
        let prompt = self.initial_prompt(role, dirs, workplan_section, project_context);
        let tag = heredoc_tag(&prompt);

        let mut invocation = format!("{} --agent \"{}\"", self.program, spec_path.display());
        for arg in &self.args {
            invocation.push(' ');
            invocation.push_str(arg);
        }

        format!(
            "cd \"{}\" && \\\necho \"=== Starting {} ===\" && \\\necho && \\\ncat <<'{}' | {}\n{}\n{}\n",
            dirs.project.display(),
            role.to_uppercase(),
            tag,
            invocation,
            prompt,
            tag
        )
    }
}

/// A heredoc terminator that no line of `body` equals.
fn heredoc_tag(body: &str) -> String {
    let mut tag = HEREDOC_TAG.to_string();
    let mut n = 0;
    while body.lines().any(|l| l.trim_end() == tag) {
        n += 1;
        tag = format!("{}_{}", HEREDOC_TAG, n);
    }
    tag
}
