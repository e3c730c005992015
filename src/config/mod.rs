//! Configuration for crewmux.
//!
//! ## config.kdl
//!
//! Located at:
//! - System: `~/.config/crewmux/config.kdl`
//! - Project: `<workspace>/.crewmux/config.kdl`
//!
//! Contains session naming, dispatch and attach timing, the fallback role,
//! the agent program and its arguments, and per-role keyword and marker
//! overrides. See [`schema::CrewConfig`] for the full schema.
//!
//! ## Precedence
//!
//! CLI flag > project config > system config > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, ConfigPaths, Resolved, ResolvedConfig, ValueSource, resolve_config,
    resolve_layers,
};
pub use schema::{CrewConfig, OutputFormat, validate_session_name};
