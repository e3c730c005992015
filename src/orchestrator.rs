//! Launch flow: catalog -> analysis -> session -> dispatch -> attach.
//!
//! [`Orchestrator::plan`] is pure with respect to tmux and backs `--dry-run`.
//! [`Orchestrator::launch`] creates the session and types each agent's
//! launch command into its pane, in pane order, with a fixed pause between
//! panes.

use crate::agents::{AgentCatalog, AgentSource, LaunchDirs, LaunchTemplate};
use crate::analysis::{AgentAnalyzer, Signal};
use crate::config::{ConfigOverrides, ConfigPaths, ResolvedConfig, resolve_config};
use crate::spec::WorkspaceSpec;
use crate::tmux::layout::{LayoutPlan, Topology};
use crate::tmux::runner::{Multiplexer, SystemTmux};
use crate::tmux::session::{Confirm, SessionController, Verification};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// What the user asked for on the command line.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub project_dir: PathBuf,
    /// Defaults to `project_dir`.
    pub workspace_dir: Option<PathBuf>,
    /// Defaults to `~/.config/crewmux/agents`.
    pub agent_dir: Option<PathBuf>,
    pub session: Option<String>,
}

/// Default bundled agent directory (`~/.config/crewmux/agents`).
pub fn default_agent_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("crewmux").join("agents"))
}

/// One agent in a launch plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAgent {
    pub pane: usize,
    pub role: String,
    pub spec_path: PathBuf,
    pub source: AgentSource,
    /// Whether WORKPLAN.md has a task section for this role.
    pub has_tasks: bool,
    pub command: String,
}

/// Everything `launch` would do, computed without touching tmux.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPlan {
    pub session: String,
    pub project_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub project_name: Option<String>,
    pub available: Vec<String>,
    pub signals: Vec<Signal>,
    pub keyword_scores: BTreeMap<String, usize>,
    /// `@mentions` that name no available agent.
    pub unknown_mentions: Vec<String>,
    pub topology: Topology,
    pub agents: Vec<PlannedAgent>,
}

impl LaunchPlan {
    pub fn roles(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.role.clone()).collect()
    }
}

impl Output for LaunchPlan {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Project: {}", self.project_dir.display()),
            format!("Workspace: {}", self.workspace_dir.display()),
        ];
        if let Some(ref name) = self.project_name {
            lines.push(format!("Project name: {}", name));
        }
        lines.push(format!("Session: {}", self.session));
        lines.push(format!("Layout: {}", self.topology));
        if !self.signals.is_empty() {
            let signals: Vec<String> = self
                .signals
                .iter()
                .map(|s| format!("{:?}", s).to_lowercase())
                .collect();
            lines.push(format!("Determined by: {}", signals.join(", ")));
        }
        if !self.keyword_scores.is_empty() {
            lines.push("Keyword scores:".to_string());
            for (role, score) in &self.keyword_scores {
                lines.push(format!("  {}: {}", role, score));
            }
        }
        if !self.unknown_mentions.is_empty() {
            lines.push(format!(
                "Unknown agents mentioned: {}",
                self.unknown_mentions.join(", ")
            ));
        }
        lines.push(String::new());
        lines.push(format!("Required agents ({}):", self.agents.len()));
        for agent in &self.agents {
            let tasks = if agent.has_tasks { "" } else { " (no WORKPLAN tasks)" };
            lines.push(format!(
                "  [{}] {} <- {} ({}){}",
                agent.pane,
                agent.role,
                agent.spec_path.display(),
                agent.source,
                tasks
            ));
        }
        lines.join("\n")
    }
}

/// Outcome of a launch.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchReport {
    pub session: String,
    pub roles: Vec<String>,
    pub verification: Verification,
    /// Panes that received their launch command.
    pub dispatched: Vec<usize>,
    /// Panes that could not be found.
    pub skipped: Vec<usize>,
}

impl Output for LaunchReport {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match self.verification {
            Verification::Fresh => lines.push(format!(
                "All {} agents are now running in tmux.",
                self.dispatched.len()
            )),
            Verification::Verified => {
                lines.push("Reusing existing session; agents are already running.".to_string())
            }
            Verification::Unverified => lines.push(
                "Reusing existing session; its panes could not be matched to the requested agents."
                    .to_string(),
            ),
        }
        if !self.skipped.is_empty() {
            let skipped: Vec<String> = self.skipped.iter().map(|i| i.to_string()).collect();
            lines.push(format!("Skipped panes: {}", skipped.join(", ")));
        }
        lines.push(format!("Session name: {}", self.session));
        lines.push(String::new());
        lines.push("Commands:".to_string());
        lines.push(format!("  Attach:  tmux attach-session -t ={}", self.session));
        lines.push("  Detach:  Press Ctrl+B then D".to_string());
        lines.push(format!("  Kill:    tmux kill-session -t ={}", self.session));
        lines.join("\n")
    }
}

/// Wires the catalog, analyzer and session controller together.
pub struct Orchestrator<M: Multiplexer = SystemTmux> {
    project_dir: PathBuf,
    workspace_dir: PathBuf,
    config: ResolvedConfig,
    catalog: AgentCatalog,
    analyzer: AgentAnalyzer,
    template: LaunchTemplate,
    controller: SessionController<M>,
}

impl Orchestrator<SystemTmux> {
    /// Resolve configuration and discover agents for `options`.
    pub fn new(options: &LaunchOptions) -> Result<Self> {
        let workspace = options
            .workspace_dir
            .clone()
            .unwrap_or_else(|| options.project_dir.clone());
        let mut overrides = ConfigOverrides::new();
        if let Some(ref session) = options.session {
            overrides = overrides.with_session_name(session.clone());
        }
        let config = resolve_config(&ConfigPaths::for_workspace(&workspace), &overrides)?;

        let agent_dir = options
            .agent_dir
            .clone()
            .or_else(default_agent_dir)
            .ok_or_else(|| {
                Error::Configuration(
                    "No agent directory given and no config directory found".to_string(),
                )
            })?;
        let catalog = AgentCatalog::discover(&agent_dir, config.include_user_agents.value)?;
        info!(
            agent_dir = %agent_dir.display(),
            agents = catalog.len(),
            "Discovered agents"
        );

        Self::with_parts(SystemTmux, options, config, catalog)
    }
}

impl<M: Multiplexer> Orchestrator<M> {
    /// Build from already resolved parts.
    pub fn with_parts(
        mux: M,
        options: &LaunchOptions,
        config: ResolvedConfig,
        catalog: AgentCatalog,
    ) -> Result<Self> {
        let project_dir = absolute(&options.project_dir)?;
        let workspace_dir = match options.workspace_dir {
            Some(ref dir) => absolute(dir)?,
            None => project_dir.clone(),
        };
        let analyzer = AgentAnalyzer::from_config(catalog.roles(), &config)?;
        let template = LaunchTemplate::from_config(&config);
        let controller = SessionController::with_multiplexer(mux, config.session_name());

        Ok(Self {
            project_dir,
            workspace_dir,
            config,
            catalog,
            analyzer,
            template,
            controller,
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn controller(&self) -> &SessionController<M> {
        &self.controller
    }

    /// Decide which agents to launch and render their commands.
    pub fn plan(&self) -> Result<LaunchPlan> {
        let workspace = WorkspaceSpec::load(&self.workspace_dir)?;
        let text = workspace.as_ref().and_then(|w| w.workplan.as_deref());
        if text.is_none() {
            info!(
                workspace = %self.workspace_dir.display(),
                "No WORKPLAN.md found, analyzing project structure"
            );
        }

        let required = self
            .analyzer
            .determine_agents(text, Some(&self.project_dir))?;

        let unknown_mentions: Vec<String> = text
            .map(|t| self.analyzer.unknown_mentions(t).into_iter().collect())
            .unwrap_or_default();
        for role in &unknown_mentions {
            warn!(role = %role, "WORKPLAN mentions an agent that is not available");
        }

        if required.is_empty() {
            return Err(Error::NoAgents(
                "Please create a WORKPLAN.md or add agent specs to the agent directory"
                    .to_string(),
            ));
        }

        let dirs = LaunchDirs {
            project: &self.project_dir,
            workspace: &self.workspace_dir,
        };
        let agents = required
            .roles()
            .enumerate()
            .map(|(pane, role)| {
                let spec = self.catalog.get(role).ok_or_else(|| {
                    Error::InvalidInput(format!("Unknown agent: {}", role))
                })?;
                let section = workspace.as_ref().and_then(|w| w.section(role));
                let context = workspace.as_ref().and_then(|w| w.spec.agent_context(role));
                Ok(PlannedAgent {
                    pane,
                    role: role.to_string(),
                    spec_path: spec.path.clone(),
                    source: spec.source,
                    has_tasks: section.is_some(),
                    command: self.template.render(
                        role,
                        &spec.path,
                        dirs,
                        section,
                        context.as_deref(),
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let topology = LayoutPlan::for_count(agents.len())?.topology;
        let keyword_scores = text
            .map(|t| self.analyzer.keyword_scores(t))
            .unwrap_or_default();

        Ok(LaunchPlan {
            session: self.config.session_name().to_string(),
            project_dir: self.project_dir.clone(),
            workspace_dir: self.workspace_dir.clone(),
            project_name: workspace
                .as_ref()
                .filter(|w| w.workplan.is_some())
                .map(|w| w.spec.name.clone()),
            available: self.catalog.roles().map(str::to_string).collect(),
            signals: required.signals().to_vec(),
            keyword_scores,
            unknown_mentions,
            topology,
            agents,
        })
    }

    /// Create the session and start every planned agent in its pane.
    ///
    /// A reused session is left untouched: its agents are assumed to be
    /// running already.
    pub fn launch(&mut self, plan: &LaunchPlan, confirm: &dyn Confirm) -> Result<LaunchReport> {
        let roles = plan.roles();
        info!(session = %plan.session, agents = roles.len(), "Setting up tmux session");
        let handle = self
            .controller
            .create_session(&roles, &self.project_dir, confirm)?;

        let mut report = LaunchReport {
            session: handle.name.clone(),
            roles: roles.clone(),
            verification: handle.verification,
            dispatched: Vec::new(),
            skipped: Vec::new(),
        };

        match handle.verification {
            Verification::Fresh => {}
            Verification::Verified => {
                info!(session = %handle.name, "Session reused, skipping agent dispatch");
                return Ok(report);
            }
            Verification::Unverified => {
                warn!(
                    session = %handle.name,
                    "Session reused but its panes do not match the requested agents; skipping agent dispatch"
                );
                return Ok(report);
            }
        }

        let delay = self.config.dispatch_delay();
        for agent in &plan.agents {
            info!(
                pane = agent.pane,
                total = plan.agents.len(),
                role = %agent.role,
                "Starting agent"
            );
            match self.controller.dispatch_command(agent.pane, &agent.command) {
                Ok(()) => report.dispatched.push(agent.pane),
                Err(Error::PaneNotFound { index, count }) => {
                    warn!(pane = index, panes = count, role = %agent.role, "Pane missing, agent not started");
                    report.skipped.push(index);
                    continue;
                }
                Err(e) => return Err(e),
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }

        Ok(report)
    }

    /// Wait the configured attach delay, then attach unless `cancel` was
    /// raised meanwhile. Returns whether it attached.
    pub fn attach_after_delay(&self, cancel: &AtomicBool) -> Result<bool> {
        if !wait_unless_cancelled(self.config.attach_delay(), cancel) {
            return Ok(false);
        }
        self.controller.attach()?;
        Ok(true)
    }
}

/// Ctrl-C flag for the pre-attach wait.
pub fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
        .map_err(|e| Error::Other(format!("Failed to install Ctrl-C handler: {}", e)))?;
    Ok(flag)
}

/// Sleep for `delay` in short steps. Returns false if `cancel` was raised.
fn wait_unless_cancelled(delay: Duration, cancel: &AtomicBool) -> bool {
    let step = Duration::from_millis(50);
    let start = Instant::now();
    loop {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        let elapsed = start.elapsed();
        if elapsed >= delay {
            return true;
        }
        std::thread::sleep(step.min(delay - elapsed));
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(Error::InvalidInput(format!(
            "Project directory not found: {}",
            path.display()
        )));
    }
    Ok(std::path::absolute(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentSource;
    use crate::test_utils::FakeTmux;
    use crate::tmux::session::FixedAnswer;
    use tempfile::TempDir;

    const WORKPLAN: &str = "**Name**: Shop

## @frontend-architect Tasks
- [ ] Build the storefront

## @backend-architect Tasks
- [ ] Build the cart API

## @ghost-writer Tasks
- [ ] Haunt the docs
";

    struct Fixture {
        project: TempDir,
        agents: TempDir,
    }

    impl Fixture {
        fn new(roles: &[&str]) -> Self {
            let fixture = Self {
                project: TempDir::new().unwrap(),
                agents: TempDir::new().unwrap(),
            };
            for role in roles {
                std::fs::write(fixture.agents.path().join(format!("{}.md", role)), "# agent\n")
                    .unwrap();
            }
            fixture
        }

        fn orchestrator<'a>(&self, fake: &'a FakeTmux) -> Orchestrator<&'a FakeTmux> {
            let mut config = ResolvedConfig::default();
            config.dispatch_delay_ms.value = 0;
            config.attach_delay_ms.value = 0;
            let catalog = AgentCatalog::from_dirs(&[(
                self.agents.path().to_path_buf(),
                AgentSource::Bundled,
            )])
            .unwrap();
            let options = LaunchOptions {
                project_dir: self.project.path().to_path_buf(),
                ..Default::default()
            };
            Orchestrator::with_parts(fake, &options, config, catalog).unwrap()
        }
    }

    #[test]
    fn test_plan_from_workplan() {
        let fixture = Fixture::new(&["frontend-architect", "backend-architect", "fullstack-dev"]);
        std::fs::write(fixture.project.path().join("WORKPLAN.md"), WORKPLAN).unwrap();
        let fake = FakeTmux::new();

        let plan = fixture.orchestrator(&fake).plan().unwrap();

        assert_eq!(plan.roles(), vec!["backend-architect", "frontend-architect"]);
        assert_eq!(plan.signals, vec![Signal::Explicit]);
        assert_eq!(plan.unknown_mentions, vec!["ghost-writer"]);
        assert_eq!(plan.project_name.as_deref(), Some("Shop"));
        assert_eq!(plan.topology, Topology::SideBySide);
        assert!(plan.agents.iter().all(|a| a.has_tasks));
        assert!(plan.agents[0].command.contains("- [ ] Build the cart API"));
        assert!(plan.agents[0].command.contains("## Additional Context"));
        assert!(plan.agents[0].command.contains("**Project**: Shop"));
        assert!(fake.commands().is_empty());
    }

    #[test]
    fn test_plan_from_structure() {
        let fixture = Fixture::new(&["devops-engineer", "fullstack-dev"]);
        std::fs::write(fixture.project.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        let fake = FakeTmux::new();

        let plan = fixture.orchestrator(&fake).plan().unwrap();

        assert_eq!(plan.roles(), vec!["devops-engineer"]);
        assert_eq!(plan.signals, vec![Signal::Structure]);
        assert!(plan.project_name.is_none());
        assert!(!plan.agents[0].has_tasks);
    }

    #[test]
    fn test_plan_without_agents_errors() {
        let fixture = Fixture::new(&["qa-engineer"]);
        let fake = FakeTmux::new();
        assert!(matches!(
            fixture.orchestrator(&fake).plan(),
            Err(Error::NoAgents(_))
        ));
    }

    #[test]
    fn test_plan_with_empty_catalog_errors() {
        let fixture = Fixture::new(&[]);
        let fake = FakeTmux::new();
        assert!(matches!(
            fixture.orchestrator(&fake).plan(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_launch_dispatches_in_pane_order() {
        let fixture = Fixture::new(&["frontend-architect", "backend-architect"]);
        std::fs::write(fixture.project.path().join("WORKPLAN.md"), WORKPLAN).unwrap();
        let fake = FakeTmux::new();
        let mut orchestrator = fixture.orchestrator(&fake);

        let plan = orchestrator.plan().unwrap();
        let report = orchestrator.launch(&plan, &FixedAnswer(true)).unwrap();

        assert_eq!(report.verification, Verification::Fresh);
        assert_eq!(report.dispatched, vec![0, 1]);
        assert!(report.skipped.is_empty());

        let handle = orchestrator.controller().handle().unwrap().clone();
        for agent in &plan.agents {
            let id = handle.pane(agent.pane).unwrap().pane_id.clone().unwrap();
            let pane = fake.pane(&id).unwrap();
            assert_eq!(pane.title, agent.role);
            assert_eq!(pane.keys[pane.keys.len() - 2], agent.command);
            assert_eq!(pane.keys[pane.keys.len() - 1], "Enter");
        }
    }

    #[test]
    fn test_launch_reused_session_skips_dispatch() {
        let fixture = Fixture::new(&["fullstack-dev"]);
        let fake = FakeTmux::with_session("agent-team", 1);
        let mut orchestrator = fixture.orchestrator(&fake);

        let plan = orchestrator.plan().unwrap();
        let report = orchestrator.launch(&plan, &FixedAnswer(false)).unwrap();

        assert_eq!(report.verification, Verification::Unverified);
        assert!(report.dispatched.is_empty());
        assert_eq!(fake.count("send-keys"), 0);
    }

    #[test]
    fn test_launch_skips_missing_panes() {
        let roles = ["a-role", "b-role", "c-role", "d-role"];
        let fixture = Fixture::new(&roles);
        let workplan: String = roles.iter().map(|r| format!("@{}\n", r)).collect();
        std::fs::write(fixture.project.path().join("WORKPLAN.md"), workplan).unwrap();
        let fake = FakeTmux::new().limit_splits(1);
        let mut orchestrator = fixture.orchestrator(&fake);

        let plan = orchestrator.plan().unwrap();
        let report = orchestrator.launch(&plan, &FixedAnswer(true)).unwrap();

        assert_eq!(report.dispatched, vec![0, 1]);
        assert_eq!(report.skipped, vec![2, 3]);
    }

    #[test]
    fn test_attach_cancelled() {
        let fixture = Fixture::new(&["fullstack-dev"]);
        let fake = FakeTmux::new();
        let orchestrator = fixture.orchestrator(&fake);
        let cancel = AtomicBool::new(true);
        assert!(!orchestrator.attach_after_delay(&cancel).unwrap());
        assert_eq!(fake.count("attach-session"), 0);
    }

    #[test]
    fn test_attach_after_delay() {
        let fixture = Fixture::new(&["fullstack-dev"]);
        let fake = FakeTmux::new();
        let mut orchestrator = fixture.orchestrator(&fake);
        let plan = orchestrator.plan().unwrap();
        orchestrator.launch(&plan, &FixedAnswer(true)).unwrap();

        let cancel = AtomicBool::new(false);
        assert!(orchestrator.attach_after_delay(&cancel).unwrap());
        assert_eq!(fake.count("attach-session"), 1);
    }

    #[test]
    fn test_missing_project_dir() {
        let fixture = Fixture::new(&["fullstack-dev"]);
        let options = LaunchOptions {
            project_dir: fixture.project.path().join("missing"),
            ..Default::default()
        };
        let result = Orchestrator::with_parts(
            FakeTmux::new(),
            &options,
            ResolvedConfig::default(),
            AgentCatalog::default(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_report_human_output() {
        let report = LaunchReport {
            session: "agent-team".to_string(),
            roles: vec!["qa-engineer".to_string()],
            verification: Verification::Fresh,
            dispatched: vec![0],
            skipped: Vec::new(),
        };
        let human = report.to_human();
        assert!(human.contains("All 1 agents are now running in tmux."));
        assert!(human.contains("tmux attach-session -t =agent-team"));
        assert!(report.to_json().contains(r#""verification":"fresh""#));
    }

    #[test]
    fn test_wait_unless_cancelled_zero_delay() {
        assert!(wait_unless_cancelled(Duration::ZERO, &AtomicBool::new(false)));
    }
}
