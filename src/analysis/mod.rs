//! Agent determination.
//!
//! Turns project text and directory layout into the set of agent roles to
//! launch. Signals are tried in order of confidence: explicit `@role`
//! mentions, keyword scoring, then structural markers on disk, with a
//! fallback role when nothing matches.
//!
//! The keyword and marker tables are data: a built-in KDL document embedded
//! in the binary, overridable per role from config.kdl.

pub mod engine;
pub mod keywords;
pub mod structure;

pub use engine::{AgentAnalyzer, KEYWORD_THRESHOLD, RequiredAgentSet, Signal};
pub use keywords::KeywordProfile;
pub use structure::StructureMarkers;

use crate::config::CrewConfig;
use crate::{Error, Result};
use kdl::KdlDocument;

/// Built-in keyword and marker tables.
const BUILTIN_TABLES: &str = include_str!("defaults.kdl");

/// Parse the built-in tables. Uses the same `keywords` / `markers` node
/// syntax as config.kdl.
fn builtin_tables() -> Result<CrewConfig> {
    let doc: KdlDocument = BUILTIN_TABLES.parse().map_err(|e| {
        Error::Configuration(format!("Failed to parse built-in role tables: {}", e))
    })?;
    Ok(CrewConfig::from_kdl(&doc))
}
