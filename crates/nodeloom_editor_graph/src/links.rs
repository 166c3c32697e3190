// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link path cache.
//!
//! Every connection is drawn as a horizontal-biased cubic bezier from the
//! output anchor to the input anchor. Paths are cached per connection and
//! flattened into a polyline for hover tests. The cache is rebuilt from scratch
//! when the graph topology changes and patched per link when anchors move.

use crate::graph::Graph;
use crate::port::PortId;
use egui::Pos2;
use indexmap::IndexMap;

/// Default curvature factor
pub const DEFAULT_CURVATURE: f32 = 0.3;
/// Smallest control offset for a curved link
pub const MIN_CONTROL_OFFSET: f32 = 30.0;
/// Default hover stroke width
pub const DEFAULT_HOVER_WIDTH: f32 = 4.0;
/// Polyline segments per link
pub const FLATTEN_SEGMENTS: usize = 24;

/// Identifies one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkKey {
    /// Output side
    pub output: PortId,
    /// Input side
    pub input: PortId,
}

/// Shape parameters shared by every link
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkStyle {
    curvature: f32,
    /// Smallest control offset when curvature is not zero
    pub min_offset: f32,
    /// Largest control offset
    pub max_offset: f32,
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self {
            curvature: DEFAULT_CURVATURE,
            min_offset: MIN_CONTROL_OFFSET,
            max_offset: f32::INFINITY,
        }
    }
}

impl LinkStyle {
    /// Create a style; curvature is clamped to `[0, 1]`
    pub fn new(curvature: f32, max_offset: f32) -> Self {
        Self {
            curvature: curvature.clamp(0.0, 1.0),
            max_offset,
            ..Self::default()
        }
    }

    /// Curvature factor
    pub fn curvature(&self) -> f32 {
        self.curvature
    }

    /// Horizontal control point offset for a link spanning `dx`
    pub fn control_offset(&self, dx: f32) -> f32 {
        let mut n = dx.abs() * self.curvature;
        if self.curvature != 0.0 && n < self.min_offset {
            n = self.min_offset;
        }
        n.min(self.max_offset)
    }
}

/// Cubic bezier curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    /// Start point
    pub p0: Pos2,
    /// First control point
    pub p1: Pos2,
    /// Second control point
    pub p2: Pos2,
    /// End point
    pub p3: Pos2,
}

impl CubicBezier {
    /// Link curve from an output anchor to an input anchor
    pub fn from_anchors(start: Pos2, end: Pos2, style: &LinkStyle) -> Self {
        let n = style.control_offset(start.x - end.x);
        Self {
            p0: start,
            p1: Pos2::new(start.x + n, start.y),
            p2: Pos2::new(end.x - n, end.y),
            p3: end,
        }
    }

    /// Evaluate the curve at `t` in `[0, 1]`
    pub fn eval(&self, t: f32) -> Pos2 {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Pos2::new(
            a * self.p0.x + b * self.p1.x + c * self.p2.x + d * self.p3.x,
            a * self.p0.y + b * self.p1.y + c * self.p2.y + d * self.p3.y,
        )
    }

    /// Sample the curve into `segments + 1` points
    pub fn flatten(&self, segments: usize) -> Vec<Pos2> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.eval(i as f32 / segments as f32))
            .collect()
    }
}

fn distance_to_segment_sq(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let ap = point - a;
    let len_sq = ab.length_sq();
    if len_sq < f32::EPSILON {
        return ap.length_sq();
    }
    let t = (ap.dot(ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).length_sq()
}

#[derive(Debug, Clone)]
struct CachedLink {
    curve: CubicBezier,
    points: Vec<Pos2>,
}

impl CachedLink {
    fn new(curve: CubicBezier, segments: usize) -> Self {
        Self {
            points: curve.flatten(segments),
            curve,
        }
    }
}

/// Cached link geometry in canvas units
#[derive(Debug, Clone)]
pub struct LinkCache {
    paths: IndexMap<LinkKey, CachedLink>,
    built_version: Option<u64>,
    style: LinkStyle,
    /// Stroke width used for hover tests
    pub hover_width: f32,
    segments: usize,
}

impl Default for LinkCache {
    fn default() -> Self {
        Self::new(LinkStyle::default())
    }
}

impl LinkCache {
    /// Create an empty cache
    pub fn new(style: LinkStyle) -> Self {
        Self {
            paths: IndexMap::new(),
            built_version: None,
            style,
            hover_width: DEFAULT_HOVER_WIDTH,
            segments: FLATTEN_SEGMENTS,
        }
    }

    /// Current style
    pub fn style(&self) -> &LinkStyle {
        &self.style
    }

    /// Change the curvature; clamps to `[0, 1]` and marks the cache stale
    pub fn set_curvature(&mut self, curvature: f32) {
        self.style.curvature = curvature.clamp(0.0, 1.0);
        self.invalidate();
    }

    /// Replace the style and mark the cache stale
    pub fn set_style(&mut self, style: LinkStyle) {
        self.style = style;
        self.invalidate();
    }

    /// Force a full rebuild on the next refresh
    pub fn invalidate(&mut self) {
        self.built_version = None;
    }

    /// Whether the next refresh will rebuild everything
    pub fn is_stale(&self, graph: &Graph) -> bool {
        self.built_version != Some(graph.topology_version())
    }

    /// Bring the cache up to date with the graph.
    ///
    /// Rebuilds every path when the topology changed since the last build,
    /// otherwise only recomputes links whose anchors moved. Returns whether
    /// any path changed.
    pub fn refresh(&mut self, graph: &Graph) -> bool {
        if self.is_stale(graph) {
            self.paths.clear();
            for (output, input) in graph.connections() {
                if let Some(curve) = self.curve_for(graph, output, input) {
                    self.paths
                        .insert(LinkKey { output, input }, CachedLink::new(curve, self.segments));
                }
            }
            self.built_version = Some(graph.topology_version());
            tracing::debug!("Rebuilt {} link paths", self.paths.len());
            return true;
        }

        let mut changed = false;
        let style = self.style;
        let segments = self.segments;
        for (key, cached) in &mut self.paths {
            let Some(curve) = curve_between(graph, key.output, key.input, &style) else {
                continue;
            };
            if curve != cached.curve {
                *cached = CachedLink::new(curve, segments);
                changed = true;
            }
        }
        changed
    }

    fn curve_for(&self, graph: &Graph, output: PortId, input: PortId) -> Option<CubicBezier> {
        curve_between(graph, output, input, &self.style)
    }

    /// Cached paths in connection order
    pub fn paths(&self) -> impl Iterator<Item = (LinkKey, &CubicBezier)> {
        self.paths.iter().map(|(key, cached)| (*key, &cached.curve))
    }

    /// Number of cached paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the cache holds no paths
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// First link whose stroke, widened to the hover width, contains `point`
    pub fn hit(&self, point: Pos2) -> Option<LinkKey> {
        let reach = self.hover_width / 2.0;
        let reach_sq = reach * reach;
        self.paths.iter().find_map(|(key, cached)| {
            cached
                .points
                .windows(2)
                .any(|w| distance_to_segment_sq(point, w[0], w[1]) <= reach_sq)
                .then_some(*key)
        })
    }
}

fn curve_between(graph: &Graph, output: PortId, input: PortId, style: &LinkStyle) -> Option<CubicBezier> {
    let start = graph.port_geometry(output, 0.0)?.anchor;
    let end = graph.port_geometry(input, 0.0)?.anchor;
    Some(CubicBezier::from_anchors(start, end, style))
}
