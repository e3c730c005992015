//! In-memory stand-in for tmux.
//!
//! `FakeTmux` understands the subset of tmux the session controller uses.
//! Like real tmux it inserts a split's new pane directly after its target in
//! pane-index order, so positional indices drift away from creation order,
//! and it lays panes out with tmux's `tiled` algorithm. Sessions start at
//! tmux's detached default of 80x24 and a split fails with "no space for new
//! pane" once the target is too small to halve. Session targets resolve like
//! tmux: `=name` matches exactly, a bare name falls back to a unique prefix.

#![allow(dead_code)]

use crate::Result;
use crate::tmux::command::TmuxCommand;
use crate::tmux::layout::tiled_shape;
use crate::tmux::runner::{CommandOutput, Multiplexer};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

const WINDOW_WIDTH: usize = 80;
const WINDOW_HEIGHT: usize = 24;
const PANE_MINIMUM: usize = 1;

/// Flags that consume the following argument.
const VALUE_FLAGS: &[&str] = &["-t", "-s", "-n", "-c", "-F", "-T"];

#[derive(Debug, Clone, Default)]
pub struct FakePane {
    pub id: String,
    pub title: String,
    pub keys: Vec<String>,
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeSession {
    pub panes: Vec<FakePane>,
    pub env: HashMap<String, String>,
    pub options: HashMap<String, String>,
    pub window_options: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct FakeState {
    sessions: BTreeMap<String, FakeSession>,
    next_pane: usize,
    commands: Vec<Vec<String>>,
    split_limit: Option<usize>,
    splits: usize,
}

impl FakeState {
    fn new_pane(&mut self) -> FakePane {
        let id = format!("%{}", self.next_pane);
        self.next_pane += 1;
        FakePane {
            id,
            ..Default::default()
        }
    }

    fn find_pane(&self, target: &str) -> Option<(String, usize)> {
        if target.starts_with('%') {
            return self.sessions.iter().find_map(|(name, s)| {
                s.panes
                    .iter()
                    .position(|p| p.id == target)
                    .map(|pos| (name.clone(), pos))
            });
        }

        let (session, rest) = target.split_once(':').unwrap_or((target, ""));
        let index = rest
            .rsplit_once('.')
            .and_then(|(_, i)| i.parse::<usize>().ok())
            .unwrap_or(0);
        let session = self.resolve_session(session)?;
        let s = self.sessions.get(&session)?;
        (index < s.panes.len()).then_some((session, index))
    }

    /// Session named by the session part of `target`.
    fn resolve_session(&self, target: &str) -> Option<String> {
        let name = target.split(':').next().unwrap_or(target);
        if let Some(exact) = name.strip_prefix('=') {
            return self.sessions.contains_key(exact).then(|| exact.to_string());
        }
        if self.sessions.contains_key(name) {
            return Some(name.to_string());
        }
        let mut prefixed = self.sessions.keys().filter(|k| k.starts_with(name));
        match (prefixed.next(), prefixed.next()) {
            (Some(only), None) => Some(only.clone()),
            _ => None,
        }
    }

    fn session_mut(&mut self, target: &str) -> Option<&mut FakeSession> {
        let name = self.resolve_session(target)?;
        self.sessions.get_mut(&name)
    }
}

struct Parsed {
    flags: HashMap<String, Option<String>>,
    positionals: Vec<String>,
}

impl Parsed {
    fn new(args: &[String]) -> Self {
        let mut flags = HashMap::new();
        let mut positionals = Vec::new();
        let mut iter = args.iter().skip(2);
        while let Some(arg) = iter.next() {
            if VALUE_FLAGS.contains(&arg.as_str()) {
                flags.insert(arg.clone(), iter.next().cloned());
            } else if positionals.is_empty() && arg.len() == 2 && arg.starts_with('-') {
                flags.insert(arg.clone(), None);
            } else {
                positionals.push(arg.clone());
            }
        }
        Self { flags, positionals }
    }

    fn value(&self, flag: &str) -> &str {
        self.flags
            .get(flag)
            .and_then(|v| v.as_deref())
            .unwrap_or_default()
    }

    fn has(&self, flag: &str) -> bool {
        self.flags.contains_key(flag)
    }

}

/// In-memory tmux server.
#[derive(Debug, Default)]
pub struct FakeTmux {
    state: RefCell<FakeState>,
}

impl FakeTmux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a session that already has `panes` panes and no ledger.
    pub fn with_session(name: &str, panes: usize) -> Self {
        let fake = Self::new();
        {
            let mut state = fake.state.borrow_mut();
            let mut panes: Vec<FakePane> = (0..panes).map(|_| state.new_pane()).collect();
            tile(&mut panes);
            state.sessions.insert(
                name.to_string(),
                FakeSession {
                    panes,
                    ..Default::default()
                },
            );
        }
        fake
    }

    /// Make every split after the first `limit` fail like tmux's
    /// "no space for new pane".
    pub fn limit_splits(self, limit: usize) -> Self {
        self.state.borrow_mut().split_limit = Some(limit);
        self
    }

    pub fn session(&self, name: &str) -> Option<FakeSession> {
        self.state.borrow().sessions.get(name).cloned()
    }

    pub fn pane(&self, id: &str) -> Option<FakePane> {
        self.state
            .borrow()
            .sessions
            .values()
            .flat_map(|s| s.panes.iter())
            .find(|p| p.id == id)
            .cloned()
    }

    /// Every command run so far, space-joined.
    pub fn commands(&self) -> Vec<String> {
        self.state
            .borrow()
            .commands
            .iter()
            .map(|c| c.join(" "))
            .collect()
    }

    /// How many times a tmux subcommand was run.
    pub fn count(&self, subcommand: &str) -> usize {
        self.state
            .borrow()
            .commands
            .iter()
            .filter(|c| c.get(1).is_some_and(|s| s == subcommand))
            .count()
    }

    pub fn kill_all(&self) {
        self.state.borrow_mut().sessions.clear();
    }
}

fn tile(panes: &mut [FakePane]) {
    let count = panes.len();
    let (rows, cols) = tiled_shape(count);
    let cell_height = (WINDOW_HEIGHT - (rows - 1)) / rows;

    for (i, pane) in panes.iter_mut().enumerate() {
        let row = i / cols;
        let col = i % cols;
        let in_row = cols.min(count - row * cols);
        let cell_width = (WINDOW_WIDTH - (in_row - 1)) / in_row;
        pane.left = col * (cell_width + 1);
        pane.top = row * (cell_height + 1);
        pane.width = cell_width;
        pane.height = cell_height;
    }
}

/// Split `target` in half like tmux, giving the new half to `pane`. Returns
/// false when `target` is too small to hold two panes and a border.
fn halve(target: &mut FakePane, pane: &mut FakePane, horizontal: bool) -> bool {
    let size = if horizontal { target.width } else { target.height };
    if size < 2 * PANE_MINIMUM + 1 {
        return false;
    }
    let new_size = (size - 1) / 2;
    let kept = size - 1 - new_size;
    if horizontal {
        target.width = kept;
        pane.left = target.left + kept + 1;
        pane.top = target.top;
        pane.width = new_size;
        pane.height = target.height;
    } else {
        target.height = kept;
        pane.left = target.left;
        pane.top = target.top + kept + 1;
        pane.width = target.width;
        pane.height = new_size;
    }
    true
}

fn render(format: &str, index: usize, pane: &FakePane) -> String {
    format
        .replace("#{pane_id}", &pane.id)
        .replace("#{pane_index}", &index.to_string())
        .replace("#{pane_left}", &pane.left.to_string())
        .replace("#{pane_top}", &pane.top.to_string())
        .replace("#{pane_width}", &pane.width.to_string())
        .replace("#{pane_height}", &pane.height.to_string())
        .replace("#{pane_title}", &pane.title)
}

impl Multiplexer for FakeTmux {
    fn run(&self, command: &TmuxCommand) -> Result<CommandOutput> {
        let args = command.args().to_vec();
        let parsed = Parsed::new(&args);
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.commands.push(args);

        let output = match command.name() {
            "has-session" => {
                if state.resolve_session(parsed.value("-t")).is_some() {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed("can't find session")
                }
            }
            "new-session" => {
                let name = parsed.value("-s").to_string();
                if state.sessions.contains_key(&name) {
                    CommandOutput::failed(format!("duplicate session: {}", name))
                } else {
                    let mut pane = state.new_pane();
                    pane.width = WINDOW_WIDTH;
                    pane.height = WINDOW_HEIGHT;
                    let id = pane.id.clone();
                    state.sessions.insert(
                        name,
                        FakeSession {
                            panes: vec![pane],
                            ..Default::default()
                        },
                    );
                    CommandOutput::ok(if parsed.has("-P") {
                        format!("{}\n", id)
                    } else {
                        String::new()
                    })
                }
            }
            "split-window" => match state.find_pane(parsed.value("-t")) {
                None => CommandOutput::failed("can't find pane"),
                Some(_) if state.split_limit.is_some_and(|l| state.splits >= l) => {
                    CommandOutput::failed("no space for new pane")
                }
                Some((session, pos)) => {
                    let mut pane = state.new_pane();
                    let id = pane.id.clone();
                    let split = state
                        .sessions
                        .get_mut(&session)
                        .and_then(|s| s.panes.get_mut(pos))
                        .is_some_and(|target| halve(target, &mut pane, parsed.has("-h")));
                    if split {
                        state.splits += 1;
                        if let Some(s) = state.sessions.get_mut(&session) {
                            s.panes.insert(pos + 1, pane);
                        }
                        CommandOutput::ok(if parsed.has("-P") {
                            format!("{}\n", id)
                        } else {
                            String::new()
                        })
                    } else {
                        CommandOutput::failed("no space for new pane")
                    }
                }
            },
            "select-layout" => match state.session_mut(parsed.value("-t")) {
                Some(s) => {
                    if parsed.positionals.first().is_some_and(|l| l == "tiled") {
                        tile(&mut s.panes);
                    }
                    CommandOutput::ok("")
                }
                None => CommandOutput::failed("can't find session"),
            },
            "set-option" | "set-window-option" => {
                let is_window = command.name() == "set-window-option";
                match (
                    state.session_mut(parsed.value("-t")),
                    parsed.positionals.as_slice(),
                ) {
                    (Some(s), [option, value]) => {
                        let table = if is_window {
                            &mut s.window_options
                        } else {
                            &mut s.options
                        };
                        table.insert(option.clone(), value.clone());
                        CommandOutput::ok("")
                    }
                    _ => CommandOutput::failed("invalid option"),
                }
            }
            "select-pane" | "send-keys" => match state.find_pane(parsed.value("-t")) {
                Some((session, pos)) => {
                    if let Some(pane) = state
                        .sessions
                        .get_mut(&session)
                        .and_then(|s| s.panes.get_mut(pos))
                    {
                        if command.name() == "send-keys" {
                            pane.keys.extend(parsed.positionals.iter().cloned());
                        } else if parsed.has("-T") {
                            pane.title = parsed.value("-T").to_string();
                        }
                    }
                    CommandOutput::ok("")
                }
                None => CommandOutput::failed("can't find pane"),
            },
            "list-panes" => match state.session_mut(parsed.value("-t")) {
                Some(s) => {
                    let format = parsed.value("-F");
                    let lines: Vec<String> = s
                        .panes
                        .iter()
                        .enumerate()
                        .map(|(i, p)| render(format, i, p))
                        .collect();
                    CommandOutput::ok(lines.join("\n"))
                }
                None => CommandOutput::failed("can't find session"),
            },
            "set-environment" => match (
                state.session_mut(parsed.value("-t")),
                parsed.positionals.as_slice(),
            ) {
                (Some(s), [name, value]) => {
                    s.env.insert(name.clone(), value.clone());
                    CommandOutput::ok("")
                }
                _ => CommandOutput::failed("invalid environment"),
            },
            "show-environment" => {
                let value = state.session_mut(parsed.value("-t")).and_then(|s| {
                    let name = parsed.positionals.first()?;
                    s.env.get(name).map(|v| format!("{}={}\n", name, v))
                });
                match value {
                    Some(line) => CommandOutput::ok(line),
                    None => CommandOutput::failed("unknown variable"),
                }
            }
            "kill-session" => match state
                .resolve_session(parsed.value("-t"))
                .and_then(|name| state.sessions.remove(&name))
            {
                Some(_) => CommandOutput::ok(""),
                None => CommandOutput::failed("can't find session"),
            },
            other => CommandOutput::failed(format!("unknown command: {}", other)),
        };

        Ok(output)
    }

    fn run_interactive(&self, command: &TmuxCommand) -> Result<bool> {
        let parsed = Parsed::new(command.args());
        let mut state = self.state.borrow_mut();
        state.commands.push(command.args().to_vec());
        Ok(state.resolve_session(parsed.value("-t")).is_some())
    }
}
