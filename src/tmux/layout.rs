//! Pane topology planning.
//!
//! A [`LayoutPlan`] is a pure function of the pane count: which pane to split,
//! in which direction, and in what order. Pane `i` of the plan is the `i`-th
//! pane created, so binding `roles[i]` to plan pane `i` keeps roles in
//! creation order no matter how tmux later numbers the panes.

use super::schema::{PaneGeometry, Split};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Shape of the split sequence chosen for a pane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Topology {
    /// One pane, no split.
    Single,
    /// Two panes, one horizontal split.
    SideBySide,
    /// Row-major grid; cells beyond the pane count are never created.
    Grid { rows: usize, cols: usize },
    /// Alternating splits of the newest pane.
    Sequential,
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topology::Single => write!(f, "single pane"),
            Topology::SideBySide => write!(f, "side by side"),
            Topology::Grid { rows, cols } => write!(f, "{}x{} grid", rows, cols),
            Topology::Sequential => write!(f, "sequential tiling"),
        }
    }
}

/// One split: divide plan pane `target`, creating the next plan pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitStep {
    pub target: usize,
    pub split: Split,
}

/// Ordered split sequence for a given pane count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutPlan {
    pub topology: Topology,
    pub pane_count: usize,
    pub steps: Vec<SplitStep>,
}

impl LayoutPlan {
    /// Plan the splits for `count` panes.
    ///
    /// | count | topology |
    /// |-------|----------|
    /// | 1     | single   |
    /// | 2     | side by side |
    /// | 3-4   | 2x2 grid |
    /// | 5-6   | 2x3 grid |
    /// | 7+    | sequential, even pane index splits horizontally, odd vertically |
    pub fn for_count(count: usize) -> Result<Self> {
        let topology = match count {
            0 => {
                return Err(Error::InvalidLayout(
                    "cannot lay out a session with zero panes".to_string(),
                ));
            }
            1 => Topology::Single,
            2 => Topology::SideBySide,
            3..=4 => Topology::Grid { rows: 2, cols: 2 },
            5..=6 => Topology::Grid { rows: 2, cols: 3 },
            _ => Topology::Sequential,
        };

        let steps = match topology {
            Topology::Single => Vec::new(),
            Topology::SideBySide => vec![SplitStep {
                target: 0,
                split: Split::Horizontal,
            }],
            Topology::Grid { rows, cols } => grid_steps(count, rows, cols),
            Topology::Sequential => (1..count)
                .map(|i| SplitStep {
                    target: i - 1,
                    split: if i % 2 == 0 {
                        Split::Horizontal
                    } else {
                        Split::Vertical
                    },
                })
                .collect(),
        };

        Ok(Self {
            topology,
            pane_count: count,
            steps,
        })
    }
}

/// First row by horizontal splits, then each lower cell by splitting the cell
/// above it vertically. Stops once `count` panes exist.
fn grid_steps(count: usize, rows: usize, cols: usize) -> Vec<SplitStep> {
    let mut steps = Vec::new();
    let mut created = 1;

    for col in 1..cols {
        if created == count {
            return steps;
        }
        steps.push(SplitStep {
            target: col - 1,
            split: Split::Horizontal,
        });
        created += 1;
    }

    for row in 1..rows {
        for col in 0..cols {
            if created == count {
                return steps;
            }
            steps.push(SplitStep {
                target: (row - 1) * cols + col,
                split: Split::Vertical,
            });
            created += 1;
        }
    }

    steps
}

/// Rows and columns tmux's `tiled` layout uses for `count` panes.
pub fn tiled_shape(count: usize) -> (usize, usize) {
    let (mut rows, mut cols) = (1, 1);
    while rows * cols < count {
        rows += 1;
        if rows * cols < count {
            cols += 1;
        }
    }
    (rows, cols)
}

/// Whether live panes form a full rectangular grid: every pane occupies
/// exactly one (column, row) cell, all cells are filled, widths agree within
/// a column and heights agree within a row.
pub fn is_rectangular_grid(panes: &[PaneGeometry]) -> bool {
    if panes.is_empty() {
        return false;
    }

    let lefts: BTreeSet<usize> = panes.iter().map(|p| p.left).collect();
    let tops: BTreeSet<usize> = panes.iter().map(|p| p.top).collect();
    if lefts.len() * tops.len() != panes.len() {
        return false;
    }

    let cells: BTreeSet<(usize, usize)> = panes.iter().map(|p| (p.left, p.top)).collect();
    if cells.len() != panes.len() {
        return false;
    }

    let mut col_widths: BTreeMap<usize, usize> = BTreeMap::new();
    let mut row_heights: BTreeMap<usize, usize> = BTreeMap::new();
    for pane in panes {
        if *col_widths.entry(pane.left).or_insert(pane.width) != pane.width {
            return false;
        }
        if *row_heights.entry(pane.top).or_insert(pane.height) != pane.height {
            return false;
        }
    }

    true
}
