//! Agent determination engine.

use super::keywords::KeywordProfile;
use super::structure::StructureMarkers;
use crate::config::ResolvedConfig;
use crate::config::resolver::DEFAULT_FALLBACK_AGENT;
use crate::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// Minimum keyword score for a role to qualify.
pub const KEYWORD_THRESHOLD: usize = 2;

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([\w-]+)").expect("Invalid regex"));

/// Which signal contributed roles to a [`RequiredAgentSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Signal {
    Explicit,
    Keywords,
    Structure,
    Fallback,
}

/// Deduplicated, sorted set of roles to launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequiredAgentSet {
    roles: BTreeSet<String>,
    signals: Vec<Signal>,
}

impl RequiredAgentSet {
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Roles in lexicographic order.
    pub fn to_vec(&self) -> Vec<String> {
        self.roles.iter().cloned().collect()
    }
}

/// Decides which roles a project needs, restricted to an available universe.
#[derive(Debug, Clone)]
pub struct AgentAnalyzer {
    universe: BTreeSet<String>,
    profile: KeywordProfile,
    markers: StructureMarkers,
    fallback: Option<String>,
}

impl AgentAnalyzer {
    /// Analyzer over `universe` with the built-in tables and the default
    /// fallback role.
    pub fn new<I, S>(universe: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            universe: universe.into_iter().map(Into::into).collect(),
            profile: KeywordProfile::builtin()?,
            markers: StructureMarkers::builtin()?,
            fallback: Some(DEFAULT_FALLBACK_AGENT.to_string()),
        })
    }

    /// Analyzer with the tables and fallback from resolved configuration.
    pub fn from_config<I, S>(universe: I, config: &ResolvedConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let analyzer = Self::new(universe)?;
        let profile = analyzer.profile.clone().with_overrides(&config.keywords);
        let markers = analyzer.markers.clone().with_overrides(&config.markers);
        Ok(analyzer
            .with_profile(profile)
            .with_markers(markers)
            .with_fallback(config.fallback_agent().map(str::to_string)))
    }

    pub fn with_profile(mut self, profile: KeywordProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_markers(mut self, markers: StructureMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Set or disable (`None`) the fallback role.
    pub fn with_fallback(mut self, fallback: Option<String>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn universe(&self) -> &BTreeSet<String> {
        &self.universe
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    /// Roles named as `@role` in `text` that are in the universe.
    pub fn from_explicit_mentions(&self, text: &str) -> BTreeSet<String> {
        MENTION
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|role| self.universe.contains(*role))
            .map(str::to_string)
            .collect()
    }

    /// `@tokens` in `text` that name no available role.
    pub fn unknown_mentions(&self, text: &str) -> BTreeSet<String> {
        MENTION
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|role| !self.universe.contains(*role))
            .map(str::to_string)
            .collect()
    }

    /// Raw keyword scores, zero scores omitted.
    pub fn keyword_scores(&self, text: &str) -> BTreeMap<String, usize> {
        self.profile.scores(text, &self.universe)
    }

    /// Roles whose keyword score reaches [`KEYWORD_THRESHOLD`].
    pub fn from_keywords(&self, text: &str) -> BTreeSet<String> {
        self.keyword_scores(text)
            .into_iter()
            .filter(|(_, score)| *score >= KEYWORD_THRESHOLD)
            .map(|(role, _)| role)
            .collect()
    }

    /// Roles with a structural marker under `project_root`.
    pub fn from_structure(&self, project_root: &Path) -> BTreeSet<String> {
        self.markers
            .matching_roles(project_root)
            .into_iter()
            .filter(|role| self.universe.contains(role))
            .collect()
    }

    /// Combine every signal into the set of roles to launch.
    ///
    /// Explicit mentions suppress keyword scoring. Structure is consulted
    /// only when the text yields nothing. If nothing matches, the fallback
    /// role is used when it is available. The result may be empty when the
    /// fallback is unavailable.
    pub fn determine_agents(
        &self,
        text: Option<&str>,
        project_root: Option<&Path>,
    ) -> Result<RequiredAgentSet> {
        if self.universe.is_empty() {
            return Err(Error::Configuration(
                "no agents are available to choose from".to_string(),
            ));
        }

        let mut set = RequiredAgentSet::default();

        if let Some(text) = text {
            let explicit = self.from_explicit_mentions(text);
            if !explicit.is_empty() {
                debug!(roles = ?explicit, "Explicit agent mentions");
                set.roles.extend(explicit);
                set.signals.push(Signal::Explicit);
            } else {
                let keywords = self.from_keywords(text);
                debug!(scores = ?self.keyword_scores(text), "Keyword scores");
                if !keywords.is_empty() {
                    set.roles.extend(keywords);
                    set.signals.push(Signal::Keywords);
                }
            }
        }

        if set.roles.is_empty() {
            if let Some(root) = project_root {
                let structural = self.from_structure(root);
                if !structural.is_empty() {
                    debug!(roles = ?structural, root = %root.display(), "Structural markers");
                    set.roles.extend(structural);
                    set.signals.push(Signal::Structure);
                }
            }
        }

        if set.roles.is_empty() {
            if let Some(fallback) = self.fallback.as_ref().filter(|f| self.universe.contains(*f)) {
                debug!(role = %fallback, "Using fallback agent");
                set.roles.insert(fallback.clone());
                set.signals.push(Signal::Fallback);
            }
        }

        Ok(set)
    }
}
