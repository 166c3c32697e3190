// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canvas to screen transform, panning and zooming.
//!
//! `screen = canvas * scale + offset`. Panning can be animated: the target
//! offset is set immediately and [`Viewport::advance`] walks the visible
//! offset toward it one bounded step per frame.

use egui::{Pos2, Rect, Vec2};

/// Smallest allowed scale
pub const MIN_SCALE: f32 = 0.2;
/// Largest allowed scale
pub const MAX_SCALE: f32 = 2.5;
/// Part of the valid bounds that must stay reachable when panning
pub const PAN_MARGIN: f32 = 50.0;
/// Offset the view returns to when the canvas is emptied
pub const HOME_OFFSET: Vec2 = Vec2::new(10.0, 10.0);

/// Which offset axes a pan applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanAxes {
    /// Horizontal
    pub x: bool,
    /// Vertical
    pub y: bool,
}

impl PanAxes {
    /// Both axes
    pub const BOTH: PanAxes = PanAxes { x: true, y: true };
    /// Horizontal only
    pub const X: PanAxes = PanAxes { x: true, y: false };
    /// Vertical only
    pub const Y: PanAxes = PanAxes { x: false, y: true };
}

/// Viewport state
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    offset: Vec2,
    target: Vec2,
    scale: f32,
    valid_bounds: Option<Rect>,
    view_size: Vec2,
    /// Send the view home when panning an empty canvas
    pub reset_when_empty: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            target: Vec2::ZERO,
            scale: 1.0,
            valid_bounds: None,
            view_size: Vec2::new(800.0, 600.0),
            reset_when_empty: true,
        }
    }
}

impl Viewport {
    /// Create a viewport for a view of the given size
    pub fn new(view_size: Vec2) -> Self {
        Self {
            view_size,
            ..Self::default()
        }
    }

    /// Current visible offset
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Offset the pan animation is heading for
    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Current scale
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Canvas rectangle that panning keeps reachable, `None` when the canvas is empty
    pub fn valid_bounds(&self) -> Option<Rect> {
        self.valid_bounds
    }

    /// Size of the host view in screen units
    pub fn view_size(&self) -> Vec2 {
        self.view_size
    }

    /// Update the host view size
    pub fn set_view_size(&mut self, size: Vec2) {
        self.view_size = size;
    }

    /// Canvas point to screen point
    pub fn canvas_to_screen(&self, point: Pos2) -> Pos2 {
        Pos2::new(point.x * self.scale, point.y * self.scale) + self.offset
    }

    /// Screen point to canvas point
    pub fn screen_to_canvas(&self, point: Pos2) -> Pos2 {
        let p = point - self.offset;
        Pos2::new(p.x / self.scale, p.y / self.scale)
    }

    /// Canvas rectangle to screen rectangle
    pub fn canvas_to_screen_rect(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.canvas_to_screen(rect.min), self.canvas_to_screen(rect.max))
    }

    /// Screen rectangle to canvas rectangle
    pub fn screen_to_canvas_rect(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.screen_to_canvas(rect.min), self.screen_to_canvas(rect.max))
    }

    /// Canvas length to screen length
    pub fn canvas_len(&self, len: f32) -> f32 {
        len * self.scale
    }

    /// Recompute the valid bounds from node rectangles
    pub fn rebuild_bounds(&mut self, rects: impl IntoIterator<Item = Rect>, margin: f32) {
        self.valid_bounds = rects
            .into_iter()
            .reduce(|acc, rect| acc.union(rect))
            .map(|rect| rect.expand(margin));
    }

    /// Pan to an absolute offset.
    ///
    /// The offset is clamped so the valid bounds, shrunk by [`PAN_MARGIN`],
    /// keep overlapping the view. On an empty canvas this does not pan: the
    /// scale resets to 1 and, with `reset_when_empty`, the view heads home.
    /// Returns whether the pan was applied.
    pub fn move_to(&mut self, x: f32, y: f32, animated: bool, axes: PanAxes) -> bool {
        let Some(bounds) = self.valid_bounds else {
            self.scale = 1.0;
            if self.reset_when_empty {
                self.target = HOME_OFFSET;
            }
            return false;
        };
        let left = (bounds.left() + PAN_MARGIN) * self.scale;
        let top = (bounds.top() + PAN_MARGIN) * self.scale;
        let right = (bounds.right() - PAN_MARGIN) * self.scale;
        let bottom = (bounds.bottom() - PAN_MARGIN) * self.scale;

        let mut x = x;
        let mut y = y;
        if right + x < 0.0 {
            x = -right;
        }
        if self.view_size.x - left < x {
            x = self.view_size.x - left;
        }
        if bottom + y < 0.0 {
            y = -bottom;
        }
        if self.view_size.y - top < y {
            y = self.view_size.y - top;
        }

        if animated {
            if axes.x {
                self.target.x = x;
            }
            if axes.y {
                self.target.y = y;
            }
        } else {
            self.offset = Vec2::new(x, y);
            self.target = self.offset;
        }
        true
    }

    /// Pan relative to the current target offset
    pub fn pan_by(&mut self, dx: f32, dy: f32, animated: bool) -> bool {
        let base = if animated { self.target } else { self.offset };
        self.move_to(base.x + dx, base.y + dy, animated, PanAxes::BOTH)
    }

    /// Set the offset directly, without clamping or animation
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
        self.target = offset;
    }

    /// Zoom to `scale`, keeping the canvas point under `pivot` (screen) fixed.
    /// Returns whether the scale changed.
    pub fn zoom(&mut self, scale: f32, pivot: Pos2) -> bool {
        if self.valid_bounds.is_none() {
            self.scale = 1.0;
            return false;
        }
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        if scale == self.scale {
            return false;
        }
        let anchor = self.screen_to_canvas(pivot);
        self.scale = scale;
        let drift = self.canvas_to_screen(anchor) - pivot;
        self.offset -= drift;
        self.target -= drift;
        true
    }

    /// One pan animation step toward the target. Returns whether the offset moved.
    pub fn advance(&mut self) -> bool {
        let moved_x = step_toward(&mut self.offset.x, self.target.x);
        let moved_y = step_toward(&mut self.offset.y, self.target.y);
        moved_x || moved_y
    }

    /// Whether a pan animation is in progress
    pub fn is_animating(&self) -> bool {
        self.offset != self.target
    }
}

fn step_toward(value: &mut f32, target: f32) -> bool {
    if *value == target {
        return false;
    }
    let gap = target - *value;
    let distance = gap.abs();
    if distance < 1.0 {
        *value = target;
        return true;
    }
    let step = if distance <= 4.0 {
        1.0
    } else if distance <= 12.0 {
        2.0
    } else if distance <= 30.0 {
        3.0
    } else {
        distance / 10.0
    };
    *value += step.copysign(gap);
    true
}
