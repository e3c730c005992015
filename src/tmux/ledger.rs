//! Pane-to-role ledger stored in the tmux session environment.
//!
//! The ledger survives this process, so a later run that finds the session
//! still alive can check whether the panes it would reuse are the ones it
//! expects. Encoded as `role=%id` pairs joined by commas; roles are
//! restricted to word characters and hyphens, pane ids to `%` plus digits.

/// Session environment variable holding the ledger.
pub const LEDGER_VAR: &str = "CREWMUX_PANE_ROLES";

/// One recorded pane: the role bound to it and its tmux pane id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub role: String,
    pub pane_id: String,
}

/// Encode entries in pane-index order.
pub fn encode(entries: &[LedgerEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}={}", e.role, e.pane_id))
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a ledger value. Returns `None` if any pair is malformed.
pub fn decode(value: &str) -> Option<Vec<LedgerEntry>> {
    let value = value.trim();
    if value.is_empty() {
        return Some(Vec::new());
    }

    value
        .split(',')
        .map(|pair| {
            let (role, pane_id) = pair.split_once('=')?;
            if role.is_empty() || !pane_id.starts_with('%') {
                return None;
            }
            Some(LedgerEntry {
                role: role.to_string(),
                pane_id: pane_id.to_string(),
            })
        })
        .collect()
}

/// Extract the ledger value from `show-environment` output (`NAME=value`).
/// A removed variable prints as `-NAME` and yields `None`.
pub fn from_show_environment(stdout: &str) -> Option<&str> {
    let prefix = format!("{}=", LEDGER_VAR);
    stdout
        .lines()
        .find_map(|line| line.trim_end().strip_prefix(prefix.as_str()))
}
