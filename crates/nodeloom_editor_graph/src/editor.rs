// SPDX-License-Identifier: MIT OR Apache-2.0
//! The node editor façade.
//!
//! [`NodeEditor`] owns the graph together with the viewport, link cache,
//! magnet guide and interaction state, and is the single entry point a host
//! talks to. Every mutation that observers care about goes through here so
//! the matching [`EditorEvent`] is emitted.

use crate::config::EditorConfig;
use crate::events::{EditorEvent, EditorObserver, Notifier};
use crate::graph::Graph;
use crate::interaction::InteractionState;
use crate::links::LinkCache;
use crate::magnet::MagnetGuide;
use crate::node::{Node, NodeId, NodeRegistry, RegistryError};
use crate::persistence::{self, LoadError, LoadSummary, SaveError};
use crate::port::PortId;
use crate::validation::{self, ConnectionStatus};
use crate::viewport::{PanAxes, Viewport};
use egui::{Pos2, Vec2};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::{Duration, Instant};

/// Time an alert takes to fade out after its hold time
pub const ALERT_FADE: Duration = Duration::from_millis(1000);

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertLevel {
    /// Informational
    #[default]
    Info,
    /// Something the user should look at
    Warning,
    /// An operation failed
    Error,
}

/// Where an alert is placed in the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertLocation {
    /// Left edge, vertically centered
    Left,
    /// Top edge, horizontally centered
    Top,
    /// Right edge, vertically centered
    Right,
    /// Bottom edge, horizontally centered
    Bottom,
    /// Center of the view
    #[default]
    Center,
    /// Top-left corner
    LeftTop,
    /// Top-right corner
    RightTop,
    /// Bottom-right corner
    RightBottom,
    /// Bottom-left corner
    LeftBottom,
}

/// A transient message drawn over the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Message
    pub text: String,
    /// Severity
    pub level: AlertLevel,
    /// Placement
    pub location: AlertLocation,
    /// When the alert was shown
    pub shown_at: Instant,
    /// How long it stays fully opaque
    pub hold: Duration,
}

impl Alert {
    /// Opacity at `now`: 1 during the hold time, then a linear fade to 0
    pub fn opacity(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.shown_at);
        let Some(fading) = elapsed.checked_sub(self.hold) else {
            return 1.0;
        };
        (1.0 - fading.as_secs_f32() / ALERT_FADE.as_secs_f32()).max(0.0)
    }

    /// Whether the alert has fully faded at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        self.opacity(now) <= 0.0
    }
}

/// Interactive node graph editor
#[derive(Debug)]
pub struct NodeEditor {
    pub(crate) graph: Graph,
    pub(crate) viewport: Viewport,
    pub(crate) links: LinkCache,
    pub(crate) magnet: MagnetGuide,
    pub(crate) notifier: Notifier,
    pub(crate) interaction: InteractionState,
    pub(crate) registry: NodeRegistry,
    pub(crate) config: EditorConfig,
    alert: Option<Alert>,
}

impl Default for NodeEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl NodeEditor {
    /// Create an empty editor
    pub fn new(config: EditorConfig) -> Self {
        let mut editor = Self {
            graph: Graph::default(),
            viewport: Viewport::default(),
            links: LinkCache::default(),
            magnet: MagnetGuide::default(),
            notifier: Notifier::new(),
            interaction: InteractionState::default(),
            registry: NodeRegistry::new(),
            config: EditorConfig::default(),
            alert: None,
        };
        editor.apply_config(config);
        editor
    }

    /// Use the given node type registry
    pub fn with_registry(mut self, registry: NodeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the configuration and push it into every component
    pub fn apply_config(&mut self, config: EditorConfig) {
        self.graph.rules = config.connection_rules();
        self.viewport.reset_when_empty = config.reset_view_when_empty;
        self.links.set_style(config.link_style());
        self.links.hover_width = config.link_hover_width;
        self.magnet.tolerance = config.magnet_tolerance;
        self.config = config;
        self.rebuild_bounds();
    }

    /// Current configuration
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable graph access.
    ///
    /// Changes made here bypass notifications; call [`Self::rebuild_bounds`]
    /// after moving or resizing nodes.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// The viewport
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Mutable viewport access
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// The link path cache
    pub fn links(&self) -> &LinkCache {
        &self.links
    }

    /// The magnet guide
    pub fn magnet(&self) -> &MagnetGuide {
        &self.magnet
    }

    /// Gesture state
    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// Node type registry
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Mutable node type registry
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    /// Register an observer
    pub fn subscribe(&mut self, observer: Box<dyn EditorObserver>) {
        self.notifier.subscribe(observer);
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.notifier.drain()
    }

    // Nodes

    /// Add a node on top of the z-order
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = self.graph.add_node(node);
        self.rebuild_bounds();
        self.notifier.emit(EditorEvent::NodeAdded(id));
        id
    }

    /// Remove a node after disconnecting all of its ports
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.graph.node(node_id)?;
        let was_selected = self.graph.is_selected(node_id);
        let was_active = self.graph.active() == Some(node_id);

        validation::detach_node(&mut self.graph, &mut self.notifier, node_id);
        let node = self.graph.remove_node(node_id)?;

        if self.interaction.hovered_node == Some(node_id) {
            self.interaction.hovered_node = None;
        }
        let hovered_link_gone = self
            .interaction
            .hovered_link
            .is_some_and(|link| node.ports().any(|p| p.id == link.output || p.id == link.input));
        if hovered_link_gone {
            self.clear_link_hover();
        }
        if self.interaction.routed == Some(node_id) {
            self.interaction.routed = None;
        }
        self.interaction.drag_snapshot.shift_remove(&node_id);
        self.rebuild_bounds();

        self.notifier.emit(EditorEvent::NodeRemoved(node_id));
        if was_active {
            self.notifier.emit(EditorEvent::ActiveChanged {
                previous: Some(node_id),
                current: None,
            });
        }
        if was_selected {
            self.notifier.emit(EditorEvent::SelectionChanged);
        }
        tracing::debug!("Removed node '{}'", node.title);
        Some(node)
    }

    /// Create a node of a registered type with its top-left corner under a screen point
    pub fn drop_node(&mut self, type_id: &str, screen: Pos2) -> Result<NodeId, RegistryError> {
        let mut node = self.registry.create_node(type_id)?;
        node.position = self.viewport.screen_to_canvas(screen);
        Ok(self.add_node(node))
    }

    // Connections

    /// Check whether `a` may connect to `b`
    pub fn can_connect(&self, a: PortId, b: PortId) -> ConnectionStatus {
        validation::can_connect(&self.graph, a, b)
    }

    /// Connect two ports through the full validation and hook protocol
    pub fn connect(&mut self, initiator: PortId, target: PortId) -> ConnectionStatus {
        validation::connect(&mut self.graph, &mut self.notifier, initiator, target)
    }

    /// Disconnect two ports
    pub fn disconnect(&mut self, initiator: PortId, target: PortId) -> ConnectionStatus {
        validation::disconnect(&mut self.graph, &mut self.notifier, initiator, target)
    }

    /// Disconnect every peer of a port
    pub fn disconnect_all(&mut self, port: PortId) -> usize {
        validation::disconnect_all(&mut self.graph, &mut self.notifier, port)
    }

    // Selection

    /// Make a node active and selected, or clear the active node with `None`
    pub fn set_active(&mut self, node_id: Option<NodeId>) {
        let previous = self.graph.active();
        if let Some(id) = node_id {
            if self.graph.node(id).is_none() {
                return;
            }
            if self.graph.set_selected(id, true) {
                self.notifier.emit(EditorEvent::SelectionChanged);
            }
        }
        if self.graph.set_active(node_id) {
            self.notifier.emit(EditorEvent::ActiveChanged {
                previous,
                current: node_id,
            });
        }
    }

    /// Add or remove a node from the selection
    pub fn set_selected(&mut self, node_id: NodeId, selected: bool) {
        if self.graph.set_selected(node_id, selected) {
            self.notifier.emit(EditorEvent::SelectionChanged);
        }
    }

    /// Deselect everything
    pub fn clear_selection(&mut self) {
        if self.graph.clear_selection() {
            self.notifier.emit(EditorEvent::SelectionChanged);
        }
    }

    // Canvas

    /// Pan to an absolute offset
    pub fn move_canvas(&mut self, x: f32, y: f32, animated: bool, axes: PanAxes) -> bool {
        let moved = self.viewport.move_to(x, y, animated, axes);
        if moved {
            self.notifier.emit(EditorEvent::CanvasMoved {
                offset: self.viewport.target(),
            });
        }
        moved
    }

    /// Pan relative to the current target offset
    pub fn pan_by(&mut self, dx: f32, dy: f32, animated: bool) -> bool {
        let base = if animated {
            self.viewport.target()
        } else {
            self.viewport.offset()
        };
        self.move_canvas(base.x + dx, base.y + dy, animated, PanAxes::BOTH)
    }

    /// Zoom keeping the canvas point under `pivot` (screen) fixed
    pub fn zoom(&mut self, scale: f32, pivot: Pos2) -> bool {
        let zoomed = self.viewport.zoom(scale, pivot);
        if zoomed {
            self.notifier.emit(EditorEvent::CanvasZoomed {
                scale: self.viewport.scale(),
            });
        }
        zoomed
    }

    /// Zoom around the center of the view
    pub fn zoom_at_center(&mut self, scale: f32) -> bool {
        let center = (self.viewport.view_size() / 2.0).to_pos2();
        self.zoom(scale, center)
    }

    /// Update the host view size
    pub fn set_view_size(&mut self, size: Vec2) {
        self.viewport.set_view_size(size);
    }

    /// Recompute the pannable area from the current node rectangles
    pub fn rebuild_bounds(&mut self) {
        let margin = self.config.bounds_margin;
        self.viewport
            .rebuild_bounds(self.graph.nodes().map(Node::rect), margin);
    }

    /// Change the link curvature
    pub fn set_curvature(&mut self, curvature: f32) {
        self.config.curvature = curvature.clamp(0.0, 1.0);
        self.links.set_curvature(curvature);
    }

    /// Bring the link path cache up to date
    pub fn refresh_links(&mut self) -> bool {
        self.links.refresh(&self.graph)
    }

    /// Advance animations. Returns whether anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.viewport.advance();
        if let Some(alert) = &self.alert {
            changed = true;
            if alert.is_expired(now) {
                self.alert = None;
            }
        }
        changed
    }

    // Alerts

    /// Show an alert in the center of the view for the configured duration
    pub fn show_alert(&mut self, text: impl Into<String>, level: AlertLevel) {
        let hold = Duration::from_millis(self.config.alert_duration_ms);
        self.show_alert_with(text, level, hold, AlertLocation::Center);
    }

    /// Show an alert with an explicit hold time and placement
    pub fn show_alert_with(&mut self, text: impl Into<String>, level: AlertLevel, hold: Duration, location: AlertLocation) {
        let text = text.into();
        self.notifier.emit(EditorEvent::Alert {
            text: text.clone(),
            level,
        });
        self.alert = Some(Alert {
            text,
            level,
            location,
            shown_at: Instant::now(),
            hold,
        });
    }

    /// The alert currently shown
    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    // Persistence

    /// Serialize the canvas into a byte buffer
    pub fn save_to_bytes(&self) -> Result<Vec<u8>, SaveError> {
        persistence::canvas_bytes(&self.graph, &self.viewport)
    }

    /// Save the canvas to a file
    pub fn save(&self, path: &Path) -> Result<(), SaveError> {
        let file = File::create(path)?;
        persistence::save_canvas(BufWriter::new(file), &self.graph, &self.viewport)?;
        tracing::info!("Saved canvas to {:?}", path);
        Ok(())
    }

    /// Load a canvas from bytes, adding its nodes to the current graph
    pub fn load_from_bytes(&mut self, bytes: &[u8]) -> Result<LoadSummary, LoadError> {
        persistence::load_canvas(bytes, self)
    }

    /// Load a canvas file, adding its nodes to the current graph
    pub fn load(&mut self, path: &Path) -> Result<LoadSummary, LoadError> {
        let file = File::open(path)?;
        let summary = persistence::load_canvas(BufReader::new(file), self)?;
        tracing::info!("Loaded canvas from {:?}", path);
        Ok(summary)
    }
}
