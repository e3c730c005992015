//! Discovery of available agent roles.
//!
//! A role is defined by a markdown agent-spec file; the file stem is the role
//! name. Directories are scanned in order, later ones overriding earlier:
//!
//! 1. **Bundled** (`--agent-dir`) - Agent specs shipped with the team
//! 2. **User** (`~/.claude/agents/`) - The user's own agents

use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Markdown files in an agent directory that are not agent specs.
const IGNORED_FILES: &[&str] = &["readme.md", "claude.md", "workplan.template.md"];

/// Where an agent spec was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentSource {
    Bundled,
    User,
}

impl std::fmt::Display for AgentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentSource::Bundled => write!(f, "bundled"),
            AgentSource::User => write!(f, "user"),
        }
    }
}

/// One available role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSpecFile {
    pub role: String,
    pub path: PathBuf,
    pub source: AgentSource,
}

/// The universe of available roles.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: BTreeMap<String, AgentSpecFile>,
}

impl AgentCatalog {
    /// Scan `agent_dir`, then `~/.claude/agents/` when `include_user_agents`.
    pub fn discover(agent_dir: &Path, include_user_agents: bool) -> Result<Self> {
        let mut dirs = vec![(agent_dir.to_path_buf(), AgentSource::Bundled)];
        if include_user_agents {
            if let Some(user_dir) = user_agents_dir() {
                dirs.push((user_dir, AgentSource::User));
            }
        }
        Self::from_dirs(&dirs)
    }

    /// Scan directories in order; a later directory overrides earlier ones.
    /// Missing directories are skipped.
    pub fn from_dirs(dirs: &[(PathBuf, AgentSource)]) -> Result<Self> {
        let mut catalog = Self::default();
        for (dir, source) in dirs {
            for spec in scan_dir(dir, *source)? {
                if let Some(previous) = catalog.agents.get(&spec.role) {
                    debug!(
                        role = %spec.role,
                        from = %previous.path.display(),
                        to = %spec.path.display(),
                        "Agent spec overridden"
                    );
                }
                catalog.agents.insert(spec.role.clone(), spec);
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, role: &str) -> Option<&AgentSpecFile> {
        self.agents.get(role)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.agents.contains_key(role)
    }

    /// Role names, sorted.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentSpecFile> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// `~/.claude/agents`
pub fn user_agents_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("agents"))
}

fn scan_dir(dir: &Path, source: AgentSource) -> Result<Vec<AgentSpecFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut specs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if IGNORED_FILES.contains(&file_name.to_lowercase().as_str()) {
            continue;
        }
        let Some(role) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        specs.push(AgentSpecFile {
            role: role.to_string(),
            path: path.clone(),
            source,
        });
    }
    Ok(specs)
}
