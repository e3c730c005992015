//! Project specification model and parser.
//!
//! A workspace describes its project in `WORKPLAN.md`:
//!
//! ```markdown
//! **Name**: Dashboard
//! **Description**: Internal metrics dashboard
//!
//! **Tech Stack**:
//! - Frontend: React
//! - Backend: Axum
//!
//! ## Shared Contracts
//!
//! Types shared between agents. Location: `contracts/`
//!
//! ## @frontend-architect Tasks
//! ### Phase 1
//! - [ ] Build the layout
//! - [x] Pick a chart library
//! ```

use crate::Result;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const WORKPLAN_FILE: &str = "WORKPLAN.md";
pub const CLAUDE_FILE: &str = "CLAUDE.md";

const DEFAULT_PROJECT_NAME: &str = "Unknown Project";
const DEFAULT_PHASE: &str = "Main";

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Name\*\*:\s*(.+)").expect("Invalid regex"));
static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Description\*\*:\s*(.+)").expect("Invalid regex"));
static TECH_STACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*Tech Stack\*\*:\s*\n((?:- .+\n?)+)").expect("Invalid regex")
});
static SHARED_CONTRACTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)## Shared Contracts\n\n.+?Location:\s*`([^`]+)`").expect("Invalid regex")
});
static AGENT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^##[ \t]+@([\w-]+)[ \t]+Tasks[ \t]*\r?$").expect("Invalid regex")
});
static PHASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"###\s+(.+)").expect("Invalid regex"));
static TASK_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"- \[[ x]\]\s+(.+)").expect("Invalid regex"));

/// Tasks assigned to one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentTask {
    pub role: String,
    /// First `###` heading of the section, `"Main"` when absent.
    pub phase: String,
    /// Checkbox items, checked or not.
    pub tasks: Vec<String>,
    /// Raw text of the section, heading excluded.
    pub section: String,
}

/// Parsed project specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSpec {
    pub name: String,
    pub description: String,
    /// Tech stack entries in document order.
    pub tech_stack: Vec<(String, String)>,
    pub shared_contracts: Option<String>,
    /// Role sections in document order. A repeated role keeps its first
    /// position and its last content.
    pub agent_tasks: Vec<AgentTask>,
}

impl Default for ProjectSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROJECT_NAME.to_string(),
            description: String::new(),
            tech_stack: Vec::new(),
            shared_contracts: None,
            agent_tasks: Vec::new(),
        }
    }
}

impl ProjectSpec {
    pub fn task(&self, role: &str) -> Option<&AgentTask> {
        self.agent_tasks.iter().find(|t| t.role == role)
    }

    /// Roles that have a task section, in document order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.agent_tasks.iter().map(|t| t.role.as_str())
    }

    /// Project context block for one role. `None` if the role has no tasks.
    pub fn agent_context(&self, role: &str) -> Option<String> {
        let task = self.task(role)?;

        let mut context = format!(
            "# Project Context\n\n**Project**: {}\n**Description**: {}\n\n## Tech Stack\n",
            self.name, self.description
        );
        for (key, value) in &self.tech_stack {
            context.push_str(&format!("- **{}**: {}\n", key, value));
        }
        if let Some(ref contracts) = self.shared_contracts {
            context.push_str(&format!(
                "\n**Shared Contracts Location**: `{}`\n",
                contracts
            ));
        }
        context.push_str(&format!("\n## Your Tasks\n\n{}\n", task.section));

        Some(context)
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a WORKPLAN document. Missing fields take their defaults; parsing
/// never fails.
pub fn parse_spec(text: &str) -> ProjectSpec {
    let mut spec = ProjectSpec::default();

    if let Some(name) = capture(&NAME, text) {
        spec.name = name;
    }
    if let Some(description) = capture(&DESCRIPTION, text) {
        spec.description = description;
    }
    spec.shared_contracts = capture(&SHARED_CONTRACTS, text);

    if let Some(block) = TECH_STACK.captures(text).and_then(|c| c.get(1)) {
        for line in block.as_str().lines() {
            let line = line.trim_start().trim_start_matches("- ");
            if let Some((key, value)) = line.split_once(':') {
                let (key, value) = (key.trim().to_string(), value.trim().to_string());
                match spec.tech_stack.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = value,
                    None => spec.tech_stack.push((key, value)),
                }
            }
        }
    }

    let headings: Vec<_> = AGENT_SECTION.captures_iter(text).collect();
    for (i, caps) in headings.iter().enumerate() {
        let (Some(heading), Some(role)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let section = text[heading.end()..end]
            .trim_start_matches(['\r', '\n'])
            .trim_end_matches(['\r', '\n']);

        let task = AgentTask {
            role: role.as_str().to_string(),
            phase: capture(&PHASE, section).unwrap_or_else(|| DEFAULT_PHASE.to_string()),
            tasks: TASK_ITEM
                .captures_iter(section)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .collect(),
            section: section.to_string(),
        };

        match spec.agent_tasks.iter_mut().find(|t| t.role == task.role) {
            Some(existing) => *existing = task,
            None => spec.agent_tasks.push(task),
        }
    }

    spec
}

/// The specification files found in a workspace directory.
#[derive(Debug, Clone)]
pub struct WorkspaceSpec {
    pub root: PathBuf,
    /// Raw WORKPLAN.md text, if the file exists.
    pub workplan: Option<String>,
    pub has_claude_md: bool,
    pub spec: ProjectSpec,
}

impl WorkspaceSpec {
    /// Load `WORKPLAN.md` and note `CLAUDE.md` from `workspace`.
    ///
    /// Returns `Ok(None)` when neither file exists. With only `CLAUDE.md`
    /// present, `spec` holds defaults.
    pub fn load(workspace: &Path) -> Result<Option<Self>> {
        let workplan_path = workspace.join(WORKPLAN_FILE);
        let has_claude_md = workspace.join(CLAUDE_FILE).exists();

        if !workplan_path.exists() && !has_claude_md {
            return Ok(None);
        }

        let workplan = if workplan_path.exists() {
            Some(std::fs::read_to_string(&workplan_path)?)
        } else {
            None
        };
        let spec = workplan.as_deref().map(parse_spec).unwrap_or_default();

        Ok(Some(Self {
            root: workspace.to_path_buf(),
            workplan,
            has_claude_md,
            spec,
        }))
    }

    /// The role's raw WORKPLAN section, if it has one.
    pub fn section(&self, role: &str) -> Option<&str> {
        self.spec.task(role).map(|t| t.section.as_str())
    }
}
