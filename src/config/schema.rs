//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Parsing from and serialization to KDL
//! - Validation
//! - Layer merging

use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings stored in config.kdl.
///
/// Every field is optional; unset fields fall through to the next layer.
///
/// # KDL Schema
///
/// ```kdl
/// session-name "agent-team"
/// dispatch-delay-ms 500
/// attach-delay-ms 2000
/// fallback-agent "fullstack-dev"   // #null disables the fallback
/// agent-program "claude"
/// agent-args "--dangerously-skip-permissions"
/// include-user-agents #true
///
/// // Replace the trigger phrases of a role (or add a new role)
/// keywords "mobile-dev" "ios" "android" "react native"
///
/// // Replace the structure markers of a role
/// markers "mobile-dev" "ios" "android"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewConfig {
    /// tmux session name
    pub session_name: Option<String>,

    /// Pause between pane dispatches, in milliseconds
    pub dispatch_delay_ms: Option<u64>,

    /// Pause before attaching, in milliseconds
    pub attach_delay_ms: Option<u64>,

    /// Fallback role. `Some(None)` means explicitly disabled.
    pub fallback_agent: Option<Option<String>>,

    /// Program that runs an agent
    pub agent_program: Option<String>,

    /// Extra arguments passed to the agent program
    pub agent_args: Option<Vec<String>>,

    /// Whether `~/.claude/agents` is merged into the catalog
    pub include_user_agents: Option<bool>,

    /// Trigger phrase overrides, per role
    pub keywords: BTreeMap<String, Vec<String>>,

    /// Structure marker overrides, per role
    pub markers: BTreeMap<String, Vec<String>>,
}

/// tmux rewrites `.` and `:` in session names, after which the name no
/// longer finds the session.
pub fn validate_session_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || name.contains([':', '.']) {
        return Err(format!(
            "session-name must be non-empty and contain no ':' or '.', got {:?}",
            name
        ));
    }
    Ok(())
}

impl CrewConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(ref name) = self.session_name {
            validate_session_name(name)?;
        }
        if let Some(ref program) = self.agent_program {
            if program.trim().is_empty() {
                return Err("agent-program must not be empty".to_string());
            }
        }
        for (role, phrases) in &self.keywords {
            if phrases.iter().any(|p| p.is_empty()) {
                return Err(format!("keywords for '{}' contain an empty phrase", role));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = doc.get("session-name").and_then(get_string_arg) {
            config.session_name = Some(s);
        }

        if let Some(ms) = doc.get("dispatch-delay-ms").and_then(get_millis_arg) {
            config.dispatch_delay_ms = Some(ms);
        }

        if let Some(ms) = doc.get("attach-delay-ms").and_then(get_millis_arg) {
            config.attach_delay_ms = Some(ms);
        }

        if let Some(node) = doc.get("fallback-agent") {
            if let Some(entry) = node.entries().first() {
                match entry.value() {
                    KdlValue::Null => config.fallback_agent = Some(None),
                    value => {
                        if let Some(s) = value.as_string() {
                            config.fallback_agent = Some(Some(s.to_string()));
                        }
                    }
                }
            }
        }

        if let Some(s) = doc.get("agent-program").and_then(get_string_arg) {
            config.agent_program = Some(s);
        }

        if let Some(node) = doc.get("agent-args") {
            config.agent_args = Some(get_string_args(node));
        }

        if let Some(b) = doc
            .get("include-user-agents")
            .and_then(|n| n.entries().first())
            .and_then(|e| e.value().as_bool())
        {
            config.include_user_agents = Some(b);
        }

        // Table nodes may repeat, one per role.
        for node in doc.nodes() {
            let (table, lowercase) = match node.name().value() {
                "keywords" => (&mut config.keywords, true),
                "markers" => (&mut config.markers, false),
                _ => continue,
            };
            let mut args = get_string_args(node).into_iter();
            if let Some(role) = args.next() {
                let values = args
                    .map(|v| if lowercase { v.to_lowercase() } else { v })
                    .collect();
                table.insert(role, values);
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref name) = self.session_name {
            doc.nodes_mut().push(string_node("session-name", [name.as_str()]));
        }

        if let Some(ms) = self.dispatch_delay_ms {
            let mut node = KdlNode::new("dispatch-delay-ms");
            node.push(KdlEntry::new(KdlValue::Integer(ms as i128)));
            doc.nodes_mut().push(node);
        }

        if let Some(ms) = self.attach_delay_ms {
            let mut node = KdlNode::new("attach-delay-ms");
            node.push(KdlEntry::new(KdlValue::Integer(ms as i128)));
            doc.nodes_mut().push(node);
        }

        if let Some(ref fallback) = self.fallback_agent {
            let mut node = KdlNode::new("fallback-agent");
            let value = match fallback {
                Some(role) => KdlValue::String(role.clone()),
                None => KdlValue::Null,
            };
            node.push(KdlEntry::new(value));
            doc.nodes_mut().push(node);
        }

        if let Some(ref program) = self.agent_program {
            doc.nodes_mut().push(string_node("agent-program", [program.as_str()]));
        }

        if let Some(ref args) = self.agent_args {
            doc.nodes_mut()
                .push(string_node("agent-args", args.iter().map(String::as_str)));
        }

        if let Some(b) = self.include_user_agents {
            let mut node = KdlNode::new("include-user-agents");
            node.push(KdlEntry::new(KdlValue::Bool(b)));
            doc.nodes_mut().push(node);
        }

        for (name, table) in [("keywords", &self.keywords), ("markers", &self.markers)] {
            for (role, values) in table {
                let args = std::iter::once(role.as_str()).chain(values.iter().map(String::as_str));
                doc.nodes_mut().push(string_node(name, args));
            }
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are set; table
    /// entries override per role.
    pub fn merge(&mut self, other: &CrewConfig) {
        if other.session_name.is_some() {
            self.session_name = other.session_name.clone();
        }
        if other.dispatch_delay_ms.is_some() {
            self.dispatch_delay_ms = other.dispatch_delay_ms;
        }
        if other.attach_delay_ms.is_some() {
            self.attach_delay_ms = other.attach_delay_ms;
        }
        if other.fallback_agent.is_some() {
            self.fallback_agent = other.fallback_agent.clone();
        }
        if other.agent_program.is_some() {
            self.agent_program = other.agent_program.clone();
        }
        if other.agent_args.is_some() {
            self.agent_args = other.agent_args.clone();
        }
        if other.include_user_agents.is_some() {
            self.include_user_agents = other.include_user_agents;
        }
        for (role, phrases) in &other.keywords {
            self.keywords.insert(role.clone(), phrases.clone());
        }
        for (role, paths) in &other.markers {
            self.markers.insert(role.clone(), paths.clone());
        }
    }

    /// Load a config file. Returns an empty config if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let doc: KdlDocument = content.parse().map_err(|e| {
            Error::Configuration(format!("Failed to parse KDL in {}: {}", path.display(), e))
        })?;

        let config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }
}

fn string_node<'a>(name: &str, values: impl IntoIterator<Item = &'a str>) -> KdlNode {
    let mut node = KdlNode::new(name);
    for value in values {
        node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    }
    node
}

/// Get a string argument from a node's first entry.
fn get_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// All positional string arguments of a node.
fn get_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

/// A non-negative integer argument.
fn get_millis_arg(node: &KdlNode) -> Option<u64> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_integer())
        .and_then(|i| u64::try_from(i).ok())
}
