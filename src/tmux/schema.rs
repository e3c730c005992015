//! Value types shared by the layout planner and the session controller.

use crate::{Error, Result};
use serde::Serialize;

/// Split orientation for panes.
///
/// Follows tmux naming: a horizontal split (`-h`) places the new pane to the
/// right of its target, a vertical split (`-v`) places it below.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Horizontal,
    Vertical,
}

impl Split {
    /// The tmux `split-window` flag for this orientation.
    pub fn flag(self) -> &'static str {
        match self {
            Split::Horizontal => "-h",
            Split::Vertical => "-v",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Horizontal => write!(f, "horizontal"),
            Split::Vertical => write!(f, "vertical"),
        }
    }
}

/// Position and size of a live pane, in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaneGeometry {
    pub index: usize,
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

impl PaneGeometry {
    /// `list-panes -F` format producing lines parseable by [`PaneGeometry::parse`].
    pub const FORMAT: &'static str =
        "#{pane_index} #{pane_left} #{pane_top} #{pane_width} #{pane_height}";

    /// Parse one line of `list-panes -F FORMAT` output.
    pub fn parse(line: &str) -> Result<Self> {
        let fields = line
            .split_whitespace()
            .map(|f| f.parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Multiplexer(format!("Bad pane geometry '{}': {}", line, e)))?;

        match fields.as_slice() {
            [index, left, top, width, height] => Ok(Self {
                index: *index,
                left: *left,
                top: *top,
                width: *width,
                height: *height,
            }),
            _ => Err(Error::Multiplexer(format!(
                "Bad pane geometry '{}': expected 5 fields",
                line
            ))),
        }
    }
}
