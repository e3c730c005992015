//! Tmux command generation.
//!
//! This module provides a builder for tmux invocations. It does not execute
//! anything; execution goes through [`crate::tmux::runner::Multiplexer`].
//!
//! tmux resolves a bare session name by prefix and then by pattern when no
//! session has exactly that name, so `-t crew` can hit `crew-old`. Commands
//! addressing a session by name use the exact forms from [`session_target`]
//! and [`window_target`].

use crate::tmux::schema::Split;

/// Exact-match target for the session called `name`.
pub fn session_target(name: &str) -> String {
    format!("={}", name)
}

/// Exact-match target for the current window of the session called `name`.
pub fn window_target(name: &str) -> String {
    format!("={}:", name)
}

/// Exact-match target for pane `index` of that window, by position.
pub fn pane_index_target(name: &str, index: usize) -> String {
    format!("={}:.{}", name, index)
}

/// Builder for tmux command lines.
#[derive(Debug, Clone)]
pub struct TmuxCommand {
    args: Vec<String>,
}

impl TmuxCommand {
    fn new(command: &str) -> Self {
        Self {
            args: vec!["tmux".to_string(), command.to_string()],
        }
    }

    fn flag(mut self, flag: &str) -> Self {
        self.args.push(flag.to_string());
        self
    }

    fn flag_with_value(mut self, flag: &str, value: &str) -> Self {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
        self
    }

    fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// The subcommand name, e.g. `split-window`.
    pub fn name(&self) -> &str {
        &self.args[1]
    }

    /// Ask tmux to print information about the created pane or session.
    ///
    /// # Example
    /// ```
    /// use crewmux::tmux::command::TmuxCommand;
    /// let cmd = TmuxCommand::new_session("crew", true, None, None).printing("#{pane_id}");
    /// assert_eq!(cmd.to_string(), "tmux new-session -d -s crew -P -F #{pane_id}");
    /// ```
    pub fn printing(self, format: &str) -> Self {
        self.flag("-P").flag_with_value("-F", format)
    }

    /// Create a new tmux session.
    ///
    /// # Example
    /// ```
    /// use crewmux::tmux::command::TmuxCommand;
    /// let cmd = TmuxCommand::new_session("crew", true, Some("agents"), Some("/workspace"));
    /// assert_eq!(cmd.to_string(), "tmux new-session -d -s crew -n agents -c /workspace");
    /// ```
    pub fn new_session(
        session_name: &str,
        detached: bool,
        window_name: Option<&str>,
        start_directory: Option<&str>,
    ) -> Self {
        let mut cmd = Self::new("new-session");
        if detached {
            cmd = cmd.flag("-d");
        }
        cmd = cmd.flag_with_value("-s", session_name);
        if let Some(window) = window_name {
            cmd = cmd.flag_with_value("-n", window);
        }
        if let Some(dir) = start_directory {
            cmd = cmd.flag_with_value("-c", dir);
        }
        cmd
    }

    /// Split a pane.
    ///
    /// # Example
    /// ```
    /// use crewmux::tmux::command::TmuxCommand;
    /// use crewmux::tmux::schema::Split;
    /// let cmd = TmuxCommand::split_window(Some("%3"), Split::Horizontal, Some("/workspace"));
    /// assert_eq!(cmd.to_string(), "tmux split-window -t %3 -h -c /workspace");
    /// ```
    pub fn split_window(target: Option<&str>, split: Split, start_directory: Option<&str>) -> Self {
        let mut cmd = Self::new("split-window");
        if let Some(t) = target {
            cmd = cmd.flag_with_value("-t", t);
        }
        cmd = cmd.flag(split.flag());
        if let Some(dir) = start_directory {
            cmd = cmd.flag_with_value("-c", dir);
        }
        cmd
    }

    /// Apply a preset layout (`tiled`, `even-horizontal`, ...) to a window.
    pub fn select_layout(target: &str, layout: &str) -> Self {
        Self::new("select-layout")
            .flag_with_value("-t", target)
            .arg(layout)
    }

    /// Make a pane the active one.
    pub fn select_pane(target: &str) -> Self {
        Self::new("select-pane").flag_with_value("-t", target)
    }

    /// Set a pane's title (shown by `#{pane_title}` and pane border formats).
    pub fn set_pane_title(target: &str, title: &str) -> Self {
        Self::select_pane(target).flag_with_value("-T", title)
    }

    /// Set a session option.
    ///
    /// # Example
    /// ```
    /// use crewmux::tmux::command::TmuxCommand;
    /// let cmd = TmuxCommand::set_option(Some("crew"), "status-right", "hi");
    /// assert_eq!(cmd.to_string(), "tmux set-option -t crew status-right hi");
    /// ```
    pub fn set_option(target: Option<&str>, option: &str, value: &str) -> Self {
        let mut cmd = Self::new("set-option");
        if let Some(t) = target {
            cmd = cmd.flag_with_value("-t", t);
        }
        cmd.arg(option).arg(value)
    }

    /// Set a window option.
    pub fn set_window_option(target: Option<&str>, option: &str, value: &str) -> Self {
        let mut cmd = Self::new("set-window-option");
        if let Some(t) = target {
            cmd = cmd.flag_with_value("-t", t);
        }
        cmd.arg(option).arg(value)
    }

    /// Send keys to a pane.
    ///
    /// # Example
    /// ```
    /// use crewmux::tmux::command::TmuxCommand;
    /// let cmd = TmuxCommand::send_keys(Some("%1"), "echo hello", true);
    /// assert_eq!(cmd.to_string(), "tmux send-keys -t %1 -l echo hello");
    /// ```
    pub fn send_keys(target: Option<&str>, keys: &str, literal: bool) -> Self {
        let mut cmd = Self::new("send-keys");
        if let Some(t) = target {
            cmd = cmd.flag_with_value("-t", t);
        }
        if literal {
            cmd = cmd.flag("-l");
        }
        cmd.arg(keys)
    }

    /// Set an environment variable on a session.
    pub fn set_environment(target: Option<&str>, name: &str, value: &str) -> Self {
        let mut cmd = Self::new("set-environment");
        if let Some(t) = target {
            cmd = cmd.flag_with_value("-t", t);
        }
        cmd.arg(name).arg(value)
    }

    /// Get an environment variable from a session.
    pub fn show_environment(target: Option<&str>, name: &str) -> Self {
        let mut cmd = Self::new("show-environment");
        if let Some(t) = target {
            cmd = cmd.flag_with_value("-t", t);
        }
        cmd.arg(name)
    }

    /// List the panes of a session's current window.
    pub fn list_panes(target: &str, format: &str) -> Self {
        Self::new("list-panes")
            .flag_with_value("-t", target)
            .flag_with_value("-F", format)
    }

    /// Check if a session with exactly this name exists.
    pub fn has_session(session_name: &str) -> Self {
        Self::new("has-session").flag_with_value("-t", &session_target(session_name))
    }

    /// Destroy the session with exactly this name and all of its panes.
    pub fn kill_session(session_name: &str) -> Self {
        Self::new("kill-session").flag_with_value("-t", &session_target(session_name))
    }

    /// Attach to the session with exactly this name.
    pub fn attach_session(session_name: &str) -> Self {
        Self::new("attach-session").flag_with_value("-t", &session_target(session_name))
    }

    /// Get the arguments as a slice for execution.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl std::fmt::Display for TmuxCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}
