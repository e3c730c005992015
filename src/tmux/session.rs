//! Session layout controller.
//!
//! Owns one tmux session for the duration of a run: creates it with one pane
//! per agent role, labels the panes, records which role lives in which pane,
//! and routes startup commands to panes by their creation-order index.
//!
//! Pane `i` is the `i`-th pane created. The controller captures each pane's
//! tmux id (`%N`) at split time and dispatches by id, so tmux renumbering its
//! positional indices never misroutes a command. Callers must still not close
//! or reorder panes mid-run.

use super::command::{TmuxCommand, pane_index_target, session_target, window_target};
use super::layout::LayoutPlan;
use super::ledger::{self, LEDGER_VAR, LedgerEntry};
use super::runner::{CommandOutput, Multiplexer, SystemTmux};
use super::schema::PaneGeometry;
use crate::{Error, Result};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the single window holding the agent panes.
pub const WINDOW_NAME: &str = "agents";

const PANE_ID_FORMAT: &str = "#{pane_id}";

/// Asks the operator whether an existing session may be destroyed.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Prompt on stderr, read a `y`/`n` answer from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{} (y/n): ", prompt)?;
        stderr.flush()?;

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}

/// Always gives the same answer (`--yes`, tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(self.0)
    }
}

/// How far the pane bindings of a handle can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    /// Created by this controller during this run.
    Fresh,
    /// Pre-existing session whose recorded bindings match the requested roles
    /// and whose recorded panes are all still alive.
    Verified,
    /// Pre-existing session that could not be matched to the requested roles.
    Unverified,
}

/// A pane bound to an agent role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaneBinding {
    /// Creation-order index.
    pub index: usize,
    pub role: String,
    /// tmux pane id (`%N`), when known.
    pub pane_id: Option<String>,
}

impl PaneBinding {
    /// tmux target for this pane. Falls back to the positional index in the
    /// session's current window when the pane id is unknown.
    pub fn target(&self, session: &str) -> String {
        match &self.pane_id {
            Some(id) => id.clone(),
            None => pane_index_target(session, self.index),
        }
    }
}

/// The controller's view of a session: its panes in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionHandle {
    pub name: String,
    pub working_dir: Option<PathBuf>,
    pub panes: Vec<PaneBinding>,
    pub verification: Verification,
}

impl SessionHandle {
    pub fn pane(&self, index: usize) -> Option<&PaneBinding> {
        self.panes.get(index)
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    /// Whether this handle points at a session that existed before this run.
    pub fn is_reused(&self) -> bool {
        self.verification != Verification::Fresh
    }

    pub fn roles(&self) -> Vec<&str> {
        self.panes.iter().map(|p| p.role.as_str()).collect()
    }
}

/// Shell text printing a role banner and setting the terminal title, without
/// clearing the pane.
pub fn banner_command(role: &str) -> String {
    format!(
        "printf '\\033]2;{}\\033\\\\'; echo '=== {} ==='",
        role,
        role.to_uppercase()
    )
}

/// Controller for one named tmux session.
#[derive(Debug)]
pub struct SessionController<M: Multiplexer = SystemTmux> {
    mux: M,
    name: String,
    handle: Option<SessionHandle>,
}

impl SessionController<SystemTmux> {
    /// Controller driving the real tmux binary.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_multiplexer(SystemTmux, name)
    }
}

impl<M: Multiplexer> SessionController<M> {
    pub fn with_multiplexer(mux: M, name: impl Into<String>) -> Self {
        Self {
            mux,
            name: name.into(),
            handle: None,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.name
    }

    /// The handle from the last `create_session`, if any.
    pub fn handle(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }

    /// Run a control command; a non-zero exit is logged, not raised.
    fn run(&self, command: TmuxCommand) -> Result<CommandOutput> {
        debug!(command = %command, "tmux");
        let output = self.mux.run(&command)?;
        if !output.success {
            warn!(command = %command, stderr = %output.stderr, "tmux command failed");
        }
        Ok(output)
    }

    /// Send literal text followed by Enter.
    fn send_line(&self, target: &str, text: &str) -> Result<()> {
        self.run(TmuxCommand::send_keys(Some(target), text, true))?;
        self.run(TmuxCommand::send_keys(Some(target), "Enter", false))?;
        Ok(())
    }

    /// Whether the session exists. Never mutates tmux state.
    pub fn session_exists(&self) -> Result<bool> {
        Ok(self.mux.run(&TmuxCommand::has_session(&self.name))?.success)
    }

    /// Create the session with one pane per role, in `roles` order.
    ///
    /// If the session already exists, `confirm` decides between killing and
    /// recreating it, or reusing it untouched. A reused session's handle is
    /// reconciled against the ledger left by the run that created it.
    ///
    /// Panes are rebalanced with the `tiled` layout after every split, so
    /// panes stay splittable in a default-sized detached session.
    ///
    /// A failed split stops further splitting: the session keeps the panes
    /// created so far and roles past that point have no pane.
    pub fn create_session(
        &mut self,
        roles: &[String],
        working_dir: &Path,
        confirm: &dyn Confirm,
    ) -> Result<SessionHandle> {
        let plan = LayoutPlan::for_count(roles.len())?;

        if self.session_exists()? {
            let prompt = format!(
                "Tmux session '{}' already exists. Kill and recreate?",
                self.name
            );
            if confirm.confirm(&prompt)? {
                self.kill_session()?;
            } else {
                let handle = self.reconcile(roles)?;
                self.handle = Some(handle.clone());
                return Ok(handle);
            }
        }

        let dir = working_dir.to_string_lossy();
        let created = self.run(
            TmuxCommand::new_session(&self.name, true, Some(WINDOW_NAME), Some(&dir))
                .printing(PANE_ID_FORMAT),
        )?;
        let first = created.lines().next().map(str::to_string);
        let Some(first) = first.filter(|_| created.success) else {
            return Err(Error::Multiplexer(format!(
                "Failed to create tmux session '{}': {}",
                self.name, created.stderr
            )));
        };

        self.run(TmuxCommand::set_option(
            Some(&session_target(&self.name)),
            "status-right",
            &format!("#[fg=green]Agents: {} #[fg=cyan]| %H:%M", roles.len()),
        ))?;

        let window = window_target(&self.name);
        let mut pane_ids = vec![first];
        for step in &plan.steps {
            let target = pane_ids[step.target].clone();
            let output = self.run(
                TmuxCommand::split_window(Some(&target), step.split, Some(&dir))
                    .printing(PANE_ID_FORMAT),
            )?;
            match output.lines().next().filter(|_| output.success) {
                Some(id) => {
                    pane_ids.push(id.to_string());
                    // Rebalance so the next split's target is not the halved
                    // newest pane.
                    self.run(TmuxCommand::select_layout(&window, "tiled"))?;
                }
                None => {
                    warn!(
                        session = %self.name,
                        created = pane_ids.len(),
                        requested = roles.len(),
                        "Split failed, leaving session partially laid out"
                    );
                    break;
                }
            }
        }

        self.run(TmuxCommand::select_layout(&window, "tiled"))?;
        self.run(TmuxCommand::set_window_option(
            Some(&window),
            "synchronize-panes",
            "off",
        ))?;

        let panes: Vec<PaneBinding> = roles
            .iter()
            .zip(pane_ids)
            .enumerate()
            .map(|(index, (role, pane_id))| PaneBinding {
                index,
                role: role.clone(),
                pane_id: Some(pane_id),
            })
            .collect();

        for pane in &panes {
            let target = pane.target(&self.name);
            self.run(TmuxCommand::set_pane_title(&target, &pane.role))?;
            self.send_line(&target, &banner_command(&pane.role))?;
        }

        self.record_ledger(&panes)?;

        info!(
            session = %self.name,
            panes = panes.len(),
            topology = %plan.topology,
            "Created tmux session"
        );

        let handle = SessionHandle {
            name: self.name.clone(),
            working_dir: Some(working_dir.to_path_buf()),
            panes,
            verification: Verification::Fresh,
        };
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    fn record_ledger(&self, panes: &[PaneBinding]) -> Result<()> {
        let entries: Vec<LedgerEntry> = panes
            .iter()
            .filter_map(|p| {
                p.pane_id.as_ref().map(|id| LedgerEntry {
                    role: p.role.clone(),
                    pane_id: id.clone(),
                })
            })
            .collect();
        self.run(TmuxCommand::set_environment(
            Some(&session_target(&self.name)),
            LEDGER_VAR,
            &ledger::encode(&entries),
        ))?;
        Ok(())
    }

    fn read_ledger(&self) -> Result<Option<Vec<LedgerEntry>>> {
        let output = self
            .mux
            .run(&TmuxCommand::show_environment(Some(&session_target(&self.name)), LEDGER_VAR))?;
        if !output.success {
            return Ok(None);
        }
        Ok(ledger::from_show_environment(&output.stdout).and_then(ledger::decode))
    }

    /// Build a handle for an existing session without touching it.
    fn reconcile(&self, roles: &[String]) -> Result<SessionHandle> {
        let live = self.live_pane_ids()?;

        let (panes, verification) = match self.read_ledger()? {
            Some(entries) => {
                let matches = entries.len() == roles.len()
                    && entries.iter().zip(roles).all(|(e, role)| &e.role == role)
                    && entries.iter().all(|e| live.contains(&e.pane_id));
                let panes = entries
                    .into_iter()
                    .enumerate()
                    .map(|(index, e)| PaneBinding {
                        index,
                        role: e.role,
                        pane_id: Some(e.pane_id),
                    })
                    .collect();
                let verification = if matches {
                    Verification::Verified
                } else {
                    Verification::Unverified
                };
                (panes, verification)
            }
            None => {
                let panes = roles
                    .iter()
                    .take(live.len())
                    .enumerate()
                    .map(|(index, role)| PaneBinding {
                        index,
                        role: role.clone(),
                        pane_id: None,
                    })
                    .collect();
                (panes, Verification::Unverified)
            }
        };

        match verification {
            Verification::Verified => info!(
                session = %self.name,
                "Reusing existing tmux session, pane bindings verified"
            ),
            _ => warn!(
                session = %self.name,
                requested = ?roles,
                live_panes = live.len(),
                "Reusing existing tmux session whose panes could not be matched to the requested agents"
            ),
        }

        Ok(SessionHandle {
            name: self.name.clone(),
            working_dir: None,
            panes,
            verification,
        })
    }

    fn live_pane_ids(&self) -> Result<Vec<String>> {
        let output = self.run(TmuxCommand::list_panes(&window_target(&self.name), PANE_ID_FORMAT))?;
        if !output.success {
            return Ok(Vec::new());
        }
        Ok(output.lines().map(str::to_string).collect())
    }

    /// Type `command_text` into pane `pane_index` and press Enter.
    ///
    /// The text is sent literally; the caller is responsible for it being
    /// safe to type into a shell.
    pub fn dispatch_command(&self, pane_index: usize, command_text: &str) -> Result<()> {
        let handle = self.handle.as_ref();
        let pane = handle
            .and_then(|h| h.pane(pane_index))
            .ok_or(Error::PaneNotFound {
                index: pane_index,
                count: handle.map_or(0, SessionHandle::len),
            })?;

        debug!(pane = pane_index, role = %pane.role, "Dispatching command");
        self.send_line(&pane.target(&self.name), command_text)
    }

    /// Hand the terminal to tmux until the user detaches.
    pub fn attach(&self) -> Result<()> {
        if !self
            .mux
            .run_interactive(&TmuxCommand::attach_session(&self.name))?
        {
            warn!(session = %self.name, "tmux attach exited with an error");
        }
        Ok(())
    }

    /// Kill the session. No-op if it does not exist.
    pub fn kill_session(&mut self) -> Result<()> {
        if self.session_exists()? {
            self.run(TmuxCommand::kill_session(&self.name))?;
            info!(session = %self.name, "Killed tmux session");
        }
        self.handle = None;
        Ok(())
    }

    /// Number of live panes, zero when the session does not exist.
    pub fn pane_count(&self) -> Result<usize> {
        if !self.session_exists()? {
            return Ok(0);
        }
        Ok(self.live_pane_ids()?.len())
    }

    /// Live pane rectangles in tmux's positional order.
    pub fn pane_geometry(&self) -> Result<Vec<PaneGeometry>> {
        let output = self.run(TmuxCommand::list_panes(
            &window_target(&self.name),
            PaneGeometry::FORMAT,
        ))?;
        if !output.success {
            return Ok(Vec::new());
        }
        output.lines().map(PaneGeometry::parse).collect()
    }
}
