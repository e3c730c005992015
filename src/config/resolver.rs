//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Project config.kdl (`<workspace>/.crewmux/config.kdl`)
//! 3. System config.kdl (`~/.config/crewmux/config.kdl`)
//! 4. Built-in defaults
//!
//! Keyword and marker tables merge per role: a project entry for a role
//! replaces the system entry for that role, other roles are kept.

use crate::config::schema::{CrewConfig, validate_session_name};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SESSION_NAME: &str = "agent-team";
pub const DEFAULT_FALLBACK_AGENT: &str = "fullstack-dev";
pub const DEFAULT_AGENT_PROGRAM: &str = "claude";
pub const DEFAULT_AGENT_ARGS: &[&str] = &["--dangerously-skip-permissions"];
pub const DEFAULT_DISPATCH_DELAY_MS: u64 = 500;
pub const DEFAULT_ATTACH_DELAY_MS: u64 = 2000;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from the project's config.kdl
    Project,
    /// Value from system-level config.kdl
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Project => write!(f, "project"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Locations of the config files.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// System-level config: ~/.config/crewmux/config.kdl
    pub system: Option<PathBuf>,
    /// Project-level config: <workspace>/.crewmux/config.kdl
    pub project: Option<PathBuf>,
}

impl ConfigPaths {
    /// Paths for a given workspace directory.
    pub fn for_workspace(workspace: &Path) -> Self {
        Self {
            system: Self::system_config_path(),
            project: Some(workspace.join(".crewmux").join("config.kdl")),
        }
    }

    /// Get the system config path (~/.config/crewmux/config.kdl).
    fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("crewmux").join("config.kdl"))
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub session_name: Resolved<String>,
    pub dispatch_delay_ms: Resolved<u64>,
    pub attach_delay_ms: Resolved<u64>,
    /// `None` when the fallback is disabled.
    pub fallback_agent: Resolved<Option<String>>,
    pub agent_program: Resolved<String>,
    pub agent_args: Resolved<Vec<String>>,
    pub include_user_agents: Resolved<bool>,
    /// Per-role trigger phrase overrides from config files
    pub keywords: BTreeMap<String, Vec<String>>,
    /// Per-role structure marker overrides from config files
    pub markers: BTreeMap<String, Vec<String>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            session_name: Resolved::new(DEFAULT_SESSION_NAME.to_string(), ValueSource::Default),
            dispatch_delay_ms: Resolved::new(DEFAULT_DISPATCH_DELAY_MS, ValueSource::Default),
            attach_delay_ms: Resolved::new(DEFAULT_ATTACH_DELAY_MS, ValueSource::Default),
            fallback_agent: Resolved::new(
                Some(DEFAULT_FALLBACK_AGENT.to_string()),
                ValueSource::Default,
            ),
            agent_program: Resolved::new(DEFAULT_AGENT_PROGRAM.to_string(), ValueSource::Default),
            agent_args: Resolved::new(
                DEFAULT_AGENT_ARGS.iter().map(|s| s.to_string()).collect(),
                ValueSource::Default,
            ),
            include_user_agents: Resolved::new(true, ValueSource::Default),
            keywords: BTreeMap::new(),
            markers: BTreeMap::new(),
        }
    }
}

impl ResolvedConfig {
    pub fn session_name(&self) -> &str {
        &self.session_name.value
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms.value)
    }

    pub fn attach_delay(&self) -> Duration {
        Duration::from_millis(self.attach_delay_ms.value)
    }

    pub fn fallback_agent(&self) -> Option<&str> {
        self.fallback_agent.value.as_deref()
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Session name override from `--session`
    pub session_name: Option<String>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set session name override.
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }
}

/// Pick the highest-precedence value among CLI, project and system layers.
fn layered<T: Clone>(
    cli: Option<&T>,
    project: Option<&T>,
    system: Option<&T>,
    default: Resolved<T>,
) -> Resolved<T> {
    if let Some(v) = cli {
        Resolved::new(v.clone(), ValueSource::CliFlag)
    } else if let Some(v) = project {
        Resolved::new(v.clone(), ValueSource::Project)
    } else if let Some(v) = system {
        Resolved::new(v.clone(), ValueSource::System)
    } else {
        default
    }
}

/// Resolve configuration with full precedence chain.
pub fn resolve_config(paths: &ConfigPaths, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = match paths.system {
        Some(ref path) => CrewConfig::load(path)?,
        None => CrewConfig::new(),
    };
    let project = match paths.project {
        Some(ref path) => CrewConfig::load(path)?,
        None => CrewConfig::new(),
    };
    if let Some(ref name) = overrides.session_name {
        validate_session_name(name)
            .map_err(|e| Error::Configuration(format!("--session: {}", e)))?;
    }
    Ok(resolve_layers(&system, &project, overrides))
}

/// Combine already-loaded layers.
pub fn resolve_layers(
    system: &CrewConfig,
    project: &CrewConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let mut tables = system.clone();
    tables.merge(project);

    ResolvedConfig {
        session_name: layered(
            overrides.session_name.as_ref(),
            project.session_name.as_ref(),
            system.session_name.as_ref(),
            defaults.session_name,
        ),
        dispatch_delay_ms: layered(
            None,
            project.dispatch_delay_ms.as_ref(),
            system.dispatch_delay_ms.as_ref(),
            defaults.dispatch_delay_ms,
        ),
        attach_delay_ms: layered(
            None,
            project.attach_delay_ms.as_ref(),
            system.attach_delay_ms.as_ref(),
            defaults.attach_delay_ms,
        ),
        fallback_agent: layered(
            None,
            project.fallback_agent.as_ref(),
            system.fallback_agent.as_ref(),
            defaults.fallback_agent,
        ),
        agent_program: layered(
            None,
            project.agent_program.as_ref(),
            system.agent_program.as_ref(),
            defaults.agent_program,
        ),
        agent_args: layered(
            None,
            project.agent_args.as_ref(),
            system.agent_args.as_ref(),
            defaults.agent_args,
        ),
        include_user_agents: layered(
            None,
            project.include_user_agents.as_ref(),
            system.include_user_agents.as_ref(),
            defaults.include_user_agents,
        ),
        keywords: tables.keywords,
        markers: tables.markers,
    }
}
