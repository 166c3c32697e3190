// SPDX-License-Identifier: MIT OR Apache-2.0
//! Alignment snapping ("magnet") for dragged nodes.

use crate::graph::Graph;
use egui::Rect;

/// Default snap distance in canvas units
pub const DEFAULT_TOLERANCE: f32 = 5.0;

/// A snap on one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisMatch {
    /// Guide line position
    pub line: f32,
    /// Distance from the guide line to the matched edge; shift by `-offset` to align
    pub offset: f32,
}

/// Snap result for both axes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MagnetMatch {
    /// Vertical guide line
    pub x: Option<AxisMatch>,
    /// Horizontal guide line
    pub y: Option<AxisMatch>,
}

/// Candidate alignment lines collected from the nodes that are not being dragged
#[derive(Debug, Clone)]
pub struct MagnetGuide {
    xs: Vec<f32>,
    ys: Vec<f32>,
    /// Snap distance
    pub tolerance: f32,
    current: MagnetMatch,
}

impl Default for MagnetGuide {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl MagnetGuide {
    /// Create an empty guide
    pub fn new(tolerance: f32) -> Self {
        Self {
            xs: Vec::new(),
            ys: Vec::new(),
            tolerance,
            current: MagnetMatch::default(),
        }
    }

    /// Collect left/center/right and top/middle/bottom lines of every unselected node
    pub fn prime(&mut self, graph: &Graph) {
        self.xs.clear();
        self.ys.clear();
        self.current = MagnetMatch::default();
        for node in graph.nodes().filter(|node| !node.is_selected()) {
            let rect = node.rect();
            self.xs.extend([rect.left(), rect.center().x, rect.right()]);
            self.ys.extend([rect.top(), rect.center().y, rect.bottom()]);
        }
    }

    /// Match the dragged node's rectangle against the collected lines.
    ///
    /// Center is tried before the near edge and the near edge before the far
    /// edge; the first line within tolerance wins.
    pub fn check(&mut self, rect: Rect) -> MagnetMatch {
        self.current = MagnetMatch {
            x: first_match([rect.center().x, rect.left(), rect.right()], &self.xs, self.tolerance),
            y: first_match([rect.center().y, rect.top(), rect.bottom()], &self.ys, self.tolerance),
        };
        self.current
    }

    /// Result of the last check, for guide drawing
    pub fn current(&self) -> MagnetMatch {
        self.current
    }

    /// Forget the last match
    pub fn clear(&mut self) {
        self.current = MagnetMatch::default();
    }
}

fn first_match(edges: [f32; 3], lines: &[f32], tolerance: f32) -> Option<AxisMatch> {
    edges.into_iter().find_map(|edge| {
        lines
            .iter()
            .find(|&&line| (edge - line).abs() <= tolerance)
            .map(|&line| AxisMatch {
                line,
                offset: edge - line,
            })
    })
}
