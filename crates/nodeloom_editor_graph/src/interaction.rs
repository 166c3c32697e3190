// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer, wheel and keyboard handling.
//!
//! The host forwards raw input in screen coordinates relative to the canvas
//! view. Each gesture runs through a small state machine ([`CanvasAction`])
//! that always returns to [`CanvasAction::Idle`] on pointer-up or cancel.

use crate::editor::NodeEditor;
use crate::events::{EditorEvent, NodeMovement, NodePointerKind};
use crate::hit_test::{nodes_in_rect, pick, HitTarget};
use crate::links::LinkKey;
use crate::node::NodeId;
use crate::port::PortId;
use crate::viewport::PanAxes;
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexMap;
use std::time::Instant;

/// Zoom change per wheel notch
pub const ZOOM_STEP: f32 = 0.1;

/// Pointer button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Left button
    Primary,
    /// Right button
    Secondary,
    /// Wheel button
    Middle,
}

/// Modifier keys held during an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Control (command on macOS)
    pub ctrl: bool,
    /// Shift
    pub shift: bool,
    /// Alt
    pub alt: bool,
}

impl Modifiers {
    /// No modifiers
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };
    /// Control only
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
        alt: false,
    };
}

/// Wheel movement. Positive `y` scrolls up, positive `x` scrolls right.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelDelta {
    /// Horizontal component
    pub x: f32,
    /// Vertical component
    pub y: f32,
}

/// A key press or release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    /// Key name as reported by the host
    pub key: String,
    /// Pressed or released
    pub pressed: bool,
    /// Modifiers held
    pub modifiers: Modifiers,
}

/// Current gesture
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CanvasAction {
    /// No gesture in progress
    #[default]
    Idle,
    /// Dragging the selection by a title bar
    MovingNodes,
    /// Dragging a new link out of a port
    ConnectingOption {
        /// Port the drag started on
        port: PortId,
        /// Link anchor of that port, canvas units
        anchor: Pos2,
        /// Pointer position, canvas units
        current: Pos2,
    },
    /// Rubber-band selection
    RectSelecting {
        /// Selection rectangle, canvas units
        rect: Rect,
    },
    /// A mark's detail popup is open
    ShowingMarkDetail {
        /// Marked node
        node: NodeId,
    },
}

/// Gesture bookkeeping between input events
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    action: CanvasAction,
    down_screen: Pos2,
    down_canvas: Pos2,
    offset_at_down: Vec2,
    pointer_canvas: Pos2,
    pub(crate) hovered_node: Option<NodeId>,
    pub(crate) hovered_link: Option<LinkKey>,
    pub(crate) routed: Option<NodeId>,
    suppress_release: bool,
    pub(crate) drag_snapshot: IndexMap<NodeId, Pos2>,
    last_wheel: Option<Instant>,
    last_hwheel: Option<Instant>,
}

impl InteractionState {
    /// Current gesture
    pub fn action(&self) -> &CanvasAction {
        &self.action
    }

    /// Node under the pointer
    pub fn hovered_node(&self) -> Option<NodeId> {
        self.hovered_node
    }

    /// Link under the pointer
    pub fn hovered_link(&self) -> Option<LinkKey> {
        self.hovered_link
    }

    /// Last pointer position in canvas units
    pub fn pointer(&self) -> Pos2 {
        self.pointer_canvas
    }

    /// Node receiving pointer events after a body click
    pub fn routed_node(&self) -> Option<NodeId> {
        self.routed
    }
}

/// Pan distance for a wheel notch; faster scrolling moves further
fn wheel_step(last: Option<Instant>, now: Instant) -> f32 {
    let Some(last) = last else {
        return 2.0;
    };
    match now.saturating_duration_since(last).as_millis() {
        0..=30 => 40.0,
        31..=100 => 20.0,
        101..=150 => 10.0,
        151..=300 => 4.0,
        _ => 2.0,
    }
}

impl NodeEditor {
    /// Pointer pressed at a screen position
    pub fn pointer_down(&mut self, screen: Pos2, button: PointerButton, modifiers: Modifiers) {
        let canvas = self.viewport.screen_to_canvas(screen);
        let ia = &mut self.interaction;
        ia.action = CanvasAction::Idle;
        ia.down_screen = screen;
        ia.down_canvas = canvas;
        ia.pointer_canvas = canvas;
        ia.offset_at_down = self.viewport.offset();
        self.magnet.clear();

        if button == PointerButton::Middle {
            return;
        }
        if button == PointerButton::Secondary {
            if let Some(link) = self.interaction.hovered_link.take() {
                self.notifier.emit(EditorEvent::LinkHoverChanged(None));
                self.links.refresh(&self.graph);
                if self.links.hit(canvas) == Some(link) {
                    self.disconnect(link.output, link.input);
                    self.interaction.suppress_release = true;
                    return;
                }
            }
        }

        match pick(&self.graph, canvas, self.config.port_hit_margin) {
            HitTarget::Mark { node } => {
                let text = self
                    .graph
                    .node(node)
                    .and_then(|n| n.mark.clone())
                    .unwrap_or_default();
                self.interaction.action = CanvasAction::ShowingMarkDetail { node };
                self.notifier.emit(EditorEvent::MarkDetail { node, text });
            }
            HitTarget::Port { node, port, over_body } => {
                if over_body {
                    if let Some(n) = self.graph.node_mut(node) {
                        n.active_control = None;
                    }
                }
                let Some(geometry) = self.graph.port_geometry(port, 0.0) else {
                    return;
                };
                self.interaction.action = CanvasAction::ConnectingOption {
                    port,
                    anchor: geometry.anchor,
                    current: canvas,
                };
            }
            HitTarget::Node { node, in_title } => {
                self.route_pointer(node, NodePointerKind::Down, canvas, Some(button));
                if button != PointerButton::Primary {
                    return;
                }
                if modifiers.ctrl {
                    self.toggle_selected(node);
                    return;
                }
                if !self.graph.is_selected(node) {
                    self.clear_selection();
                }
                self.set_active(Some(node));
                if in_title {
                    self.begin_drag();
                } else {
                    self.interaction.routed = Some(node);
                }
            }
            HitTarget::None => {
                if button != PointerButton::Primary {
                    return;
                }
                self.set_active(None);
                self.clear_selection();
                self.interaction.routed = None;
                self.interaction.action = CanvasAction::RectSelecting {
                    rect: Rect::from_min_max(canvas, canvas),
                };
            }
        }
    }

    fn toggle_selected(&mut self, node: NodeId) {
        if self.graph.is_selected(node) {
            if self.graph.active() == Some(node) {
                self.set_active(None);
            }
            self.set_selected(node, false);
        } else {
            self.set_selected(node, true);
        }
    }

    fn begin_drag(&mut self) {
        let snapshot: IndexMap<NodeId, Pos2> = self
            .graph
            .selection()
            .filter_map(|id| self.graph.node(id))
            .filter(|node| !node.lock_location)
            .map(|node| (node.id, node.position))
            .collect();
        self.interaction.drag_snapshot = snapshot;
        if self.config.show_magnet {
            self.magnet.prime(&self.graph);
        }
        self.interaction.action = CanvasAction::MovingNodes;
    }

    fn route_pointer(&mut self, node: NodeId, kind: NodePointerKind, canvas: Pos2, button: Option<PointerButton>) {
        let Some(origin) = self.graph.node(node).map(|n| n.position) else {
            return;
        };
        self.notifier.emit(EditorEvent::NodePointer {
            node,
            kind,
            local: (canvas - origin).to_pos2(),
            button,
        });
    }

    /// Pointer moved to a screen position, with the button currently held, if any
    pub fn pointer_move(&mut self, screen: Pos2, held: Option<PointerButton>) {
        let canvas = self.viewport.screen_to_canvas(screen);
        self.interaction.pointer_canvas = canvas;

        if held == Some(PointerButton::Middle) {
            let offset = self.interaction.offset_at_down + (screen - self.interaction.down_screen);
            self.viewport.set_offset(offset);
            self.notifier.emit(EditorEvent::CanvasMoved { offset });
            return;
        }
        if held == Some(PointerButton::Primary) {
            self.clear_link_hover();
        }
        if let Some(node) = self.interaction.routed {
            self.route_pointer(node, NodePointerKind::Move, canvas, held);
            return;
        }
        if held == Some(PointerButton::Primary) {
            match &mut self.interaction.action {
                CanvasAction::MovingNodes => {
                    self.drag_selection(screen);
                    return;
                }
                CanvasAction::ConnectingOption { current, .. } => {
                    *current = canvas;
                    return;
                }
                CanvasAction::RectSelecting { rect } => {
                    let selection = Rect::from_two_pos(self.interaction.down_canvas, canvas);
                    *rect = selection;
                    self.select_in_rect(selection);
                    return;
                }
                CanvasAction::Idle | CanvasAction::ShowingMarkDetail { .. } => {}
            }
        }
        self.update_hover(canvas);
    }

    fn drag_selection(&mut self, screen: Pos2) {
        let delta = (screen - self.interaction.down_screen) / self.viewport.scale();
        for (id, start) in &self.interaction.drag_snapshot {
            if let Some(node) = self.graph.node_mut(*id) {
                node.position = *start + delta;
            }
        }
        if !self.config.show_magnet {
            return;
        }
        let Some(active) = self.graph.active() else {
            return;
        };
        if !self.interaction.drag_snapshot.contains_key(&active) {
            return;
        }
        let Some(rect) = self.graph.node(active).map(|n| n.rect()) else {
            return;
        };
        let snap = self.magnet.check(rect);
        let shift = Vec2::new(
            snap.x.map_or(0.0, |m| m.offset),
            snap.y.map_or(0.0, |m| m.offset),
        );
        if shift == Vec2::ZERO {
            return;
        }
        for id in self.interaction.drag_snapshot.keys() {
            if let Some(node) = self.graph.node_mut(*id) {
                node.position -= shift;
            }
        }
    }

    fn select_in_rect(&mut self, rect: Rect) {
        let inside = nodes_in_rect(&self.graph, rect);
        let ids: Vec<NodeId> = self.graph.node_ids().collect();
        let mut changed = false;
        for id in ids {
            changed |= self.graph.set_selected(id, inside.contains(&id));
        }
        if changed {
            self.notifier.emit(EditorEvent::SelectionChanged);
        }
    }

    fn update_hover(&mut self, canvas: Pos2) {
        let target = pick(&self.graph, canvas, self.config.port_hit_margin).node();
        if target != self.interaction.hovered_node {
            let left = self.interaction.hovered_node;
            self.interaction.hovered_node = target;
            self.notifier.emit(EditorEvent::HoverChanged { entered: target, left });
        }
        if let Some(node) = target {
            self.route_pointer(node, NodePointerKind::Move, canvas, None);
        }
        let link = if target.is_some() {
            None
        } else {
            self.links.refresh(&self.graph);
            self.links.hit(canvas)
        };
        if link != self.interaction.hovered_link {
            self.interaction.hovered_link = link;
            self.notifier.emit(EditorEvent::LinkHoverChanged(link));
        }
    }

    /// Pointer released at a screen position
    pub fn pointer_up(&mut self, screen: Pos2, button: PointerButton) {
        let canvas = self.viewport.screen_to_canvas(screen);
        self.interaction.pointer_canvas = canvas;

        match std::mem::take(&mut self.interaction.action) {
            CanvasAction::MovingNodes => self.finish_drag(),
            CanvasAction::ConnectingOption { port, .. } => {
                if screen != self.interaction.down_screen {
                    self.finish_connect(port, canvas);
                }
            }
            CanvasAction::Idle | CanvasAction::RectSelecting { .. } | CanvasAction::ShowingMarkDetail { .. } => {}
        }

        if !self.interaction.suppress_release {
            if let Some(active) = self.graph.active() {
                self.route_pointer(active, NodePointerKind::Up, canvas, Some(button));
            }
            self.interaction.routed = None;
        }
        self.interaction.suppress_release = false;
        self.magnet.clear();
    }

    fn finish_drag(&mut self) {
        let mut movements = Vec::new();
        for (id, old) in &mut self.interaction.drag_snapshot {
            let Some(new) = self.graph.node(*id).map(|n| n.position) else {
                continue;
            };
            movements.push(NodeMovement { node: *id, old: *old, new });
            *old = new;
        }
        if movements.iter().any(|m| m.old != m.new) {
            self.rebuild_bounds();
            self.notifier.emit(EditorEvent::NodesMoved(movements));
        }
    }

    fn finish_connect(&mut self, down_port: PortId, canvas: Pos2) {
        let HitTarget::Port { port: found, .. } = pick(&self.graph, canvas, self.config.port_hit_margin) else {
            return;
        };
        let down_is_input = self.graph.port(down_port).is_some_and(|p| p.is_input());
        if down_is_input {
            self.connect(found, down_port);
        } else {
            self.connect(down_port, found);
        }
    }

    /// Wheel input. The vertical wheel zooms around the view center when zoom
    /// is unlocked (or ctrl is held) and pans vertically otherwise; the
    /// horizontal wheel pans horizontally unless ctrl is held.
    pub fn wheel(&mut self, delta: WheelDelta, modifiers: Modifiers, now: Instant) {
        if delta.y != 0.0 {
            if !self.config.require_ctrl_for_zoom || modifiers.ctrl {
                let step = if delta.y < 0.0 { -ZOOM_STEP } else { ZOOM_STEP };
                let center = (self.viewport.view_size() / 2.0).to_pos2();
                self.zoom(self.viewport.scale() + step, center);
            } else {
                let step = wheel_step(self.interaction.last_wheel, now);
                self.interaction.last_wheel = Some(now);
                let target = self.viewport.target();
                let dy = if delta.y < 0.0 { -step } else { step };
                self.move_canvas(target.x, target.y + dy, true, PanAxes::Y);
            }
        }
        if delta.x != 0.0 && !modifiers.ctrl {
            let step = wheel_step(self.interaction.last_hwheel, now);
            self.interaction.last_hwheel = Some(now);
            let target = self.viewport.target();
            let dx = if delta.x > 0.0 { -step } else { step };
            self.move_canvas(target.x + dx, target.y, true, PanAxes::X);
        }
    }

    /// Key input, routed to the active node
    pub fn key(&mut self, input: KeyInput) {
        if !input.pressed {
            self.interaction.routed = None;
        }
        if let Some(node) = self.graph.active() {
            self.notifier.emit(EditorEvent::NodeKey { node, key: input });
        }
    }

    /// The pointer left the canvas view
    pub fn pointer_left(&mut self) {
        if let Some(left) = self.interaction.hovered_node.take() {
            self.notifier.emit(EditorEvent::HoverChanged { entered: None, left: Some(left) });
        }
        self.clear_link_hover();
    }

    pub(crate) fn clear_link_hover(&mut self) {
        if self.interaction.hovered_link.take().is_some() {
            self.notifier.emit(EditorEvent::LinkHoverChanged(None));
        }
    }

    /// Abandon the current gesture
    pub fn cancel(&mut self) {
        self.interaction.action = CanvasAction::Idle;
        self.interaction.routed = None;
        self.interaction.suppress_release = false;
        self.magnet.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::node::Node;
    use crate::port::{DataType, Port};
    use std::time::Duration;

    fn editor_with(nodes: Vec<Node>) -> (NodeEditor, Vec<NodeId>) {
        let mut editor = NodeEditor::new(EditorConfig::default());
        let ids = nodes.into_iter().map(|n| editor.add_node(n)).collect();
        editor.drain_events();
        (editor, ids)
    }

    fn boxed(x: f32, y: f32) -> Node {
        Node::new("box")
            .with_position(x, y)
            .with_size(100.0, 60.0)
            .with_input(Port::input("in", DataType::ANY))
            .with_output(Port::output("out", DataType::ANY))
    }

    #[test]
    fn test_title_drag_moves_selection_and_reports_once() {
        let (mut editor, ids) = editor_with(vec![boxed(0.0, 0.0), boxed(400.0, 300.0)]);
        editor.pointer_down(Pos2::new(50.0, 10.0), PointerButton::Primary, Modifiers::NONE);
        assert_eq!(editor.interaction().action(), &CanvasAction::MovingNodes);

        editor.pointer_move(Pos2::new(90.0, 30.0), Some(PointerButton::Primary));
        editor.pointer_move(Pos2::new(150.0, 110.0), Some(PointerButton::Primary));
        editor.pointer_up(Pos2::new(150.0, 110.0), PointerButton::Primary);

        assert_eq!(editor.graph().node(ids[0]).unwrap().position, Pos2::new(100.0, 100.0));
        let moved: Vec<_> = editor
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                EditorEvent::NodesMoved(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0][0].old, Pos2::ZERO);
        assert_eq!(moved[0][0].new, Pos2::new(100.0, 100.0));
        assert_eq!(editor.interaction().action(), &CanvasAction::Idle);
    }

    #[test]
    fn test_click_without_move_reports_nothing() {
        let (mut editor, _) = editor_with(vec![boxed(0.0, 0.0)]);
        editor.pointer_down(Pos2::new(50.0, 10.0), PointerButton::Primary, Modifiers::NONE);
        editor.pointer_up(Pos2::new(50.0, 10.0), PointerButton::Primary);
        assert!(!editor
            .drain_events()
            .iter()
            .any(|e| matches!(e, EditorEvent::NodesMoved(_))));
    }

    #[test]
    fn test_locked_location_is_not_dragged() {
        let mut locked = boxed(0.0, 0.0);
        locked.lock_location = true;
        let (mut editor, ids) = editor_with(vec![locked]);
        editor.pointer_down(Pos2::new(50.0, 10.0), PointerButton::Primary, Modifiers::NONE);
        editor.pointer_move(Pos2::new(250.0, 10.0), Some(PointerButton::Primary));
        editor.pointer_up(Pos2::new(250.0, 10.0), PointerButton::Primary);
        assert_eq!(editor.graph().node(ids[0]).unwrap().position, Pos2::ZERO);
    }

    #[test]
    fn test_ctrl_click_toggles_selection() {
        let (mut editor, ids) = editor_with(vec![boxed(0.0, 0.0), boxed(200.0, 0.0)]);
        editor.pointer_down(Pos2::new(50.0, 40.0), PointerButton::Primary, Modifiers::NONE);
        editor.pointer_up(Pos2::new(50.0, 40.0), PointerButton::Primary);
        editor.pointer_down(Pos2::new(250.0, 40.0), PointerButton::Primary, Modifiers::CTRL);
        editor.pointer_up(Pos2::new(250.0, 40.0), PointerButton::Primary);
        assert_eq!(editor.graph().selection().collect::<Vec<_>>(), ids);

        editor.pointer_down(Pos2::new(50.0, 40.0), PointerButton::Primary, Modifiers::CTRL);
        assert_eq!(editor.graph().selection().collect::<Vec<_>>(), vec![ids[1]]);
        assert_eq!(editor.graph().active(), None);
    }

    #[test]
    fn test_body_click_routes_pointer_to_node() {
        let (mut editor, ids) = editor_with(vec![boxed(0.0, 0.0)]);
        editor.pointer_down(Pos2::new(30.0, 40.0), PointerButton::Primary, Modifiers::NONE);
        assert_eq!(editor.interaction().routed_node(), Some(ids[0]));
        editor.pointer_move(Pos2::new(35.0, 45.0), Some(PointerButton::Primary));
        editor.pointer_up(Pos2::new(35.0, 45.0), PointerButton::Primary);

        let routed: Vec<_> = editor
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                EditorEvent::NodePointer { kind, local, .. } => Some((kind, local)),
                _ => None,
            })
            .collect();
        assert_eq!(
            routed,
            vec![
                (NodePointerKind::Down, Pos2::new(30.0, 40.0)),
                (NodePointerKind::Move, Pos2::new(35.0, 45.0)),
                (NodePointerKind::Up, Pos2::new(35.0, 45.0)),
            ]
        );
        assert_eq!(editor.interaction().routed_node(), None);
    }

    #[test]
    fn test_drag_from_input_connects_output_to_it() {
        let (mut editor, ids) = editor_with(vec![boxed(0.0, 0.0), boxed(300.0, 0.0)]);
        let input = editor.graph().node(ids[1]).unwrap().inputs()[0].id;
        let output = editor.graph().node(ids[0]).unwrap().outputs()[0].id;

        // input dot of the second node is centered at (300, 30), the output of the first at (100, 30)
        editor.pointer_down(Pos2::new(300.0, 30.0), PointerButton::Primary, Modifiers::NONE);
        assert!(matches!(
            editor.interaction().action(),
            CanvasAction::ConnectingOption { port, .. } if *port == input
        ));
        editor.pointer_move(Pos2::new(101.0, 30.0), Some(PointerButton::Primary));
        editor.pointer_up(Pos2::new(101.0, 30.0), PointerButton::Primary);

        assert_eq!(editor.graph().connections(), vec![(output, input)]);
        let connected = editor.drain_events().into_iter().find_map(|e| match e {
            EditorEvent::OptionConnected { initiator, .. } => Some(initiator),
            _ => None,
        });
        assert_eq!(connected, Some(output));
    }

    #[test]
    fn test_release_on_press_point_does_not_connect() {
        let (mut editor, _) = editor_with(vec![boxed(0.0, 0.0), boxed(300.0, 0.0)]);
        editor.pointer_down(Pos2::new(300.0, 30.0), PointerButton::Primary, Modifiers::NONE);
        editor.pointer_up(Pos2::new(300.0, 30.0), PointerButton::Primary);
        assert_eq!(editor.graph().connection_count(), 0);
    }

    #[test]
    fn test_rect_selection_selects_intersecting_nodes() {
        let (mut editor, ids) = editor_with(vec![
            boxed(0.0, 100.0),
            boxed(150.0, 100.0),
            boxed(300.0, 100.0),
            boxed(0.0, 400.0),
        ]);
        editor.pointer_down(Pos2::new(-50.0, 20.0), PointerButton::Primary, Modifiers::NONE);
        assert!(matches!(editor.interaction().action(), CanvasAction::RectSelecting { .. }));
        editor.pointer_move(Pos2::new(320.0, 130.0), Some(PointerButton::Primary));

        let selected: Vec<_> = editor.graph().selection().collect();
        assert_eq!(selected, ids[..3].to_vec());
        editor.pointer_up(Pos2::new(320.0, 130.0), PointerButton::Primary);
        assert_eq!(editor.interaction().action(), &CanvasAction::Idle);
    }

    #[test]
    fn test_right_click_on_hovered_link_disconnects() {
        let (mut editor, ids) = editor_with(vec![boxed(0.0, 0.0), boxed(300.0, 0.0)]);
        let output = editor.graph().node(ids[0]).unwrap().outputs()[0].id;
        let input = editor.graph().node(ids[1]).unwrap().inputs()[0].id;
        editor.connect(output, input);

        editor.pointer_move(Pos2::new(200.0, 30.0), None);
        assert_eq!(
            editor.interaction().hovered_link(),
            Some(LinkKey { output, input })
        );
        editor.drain_events();
        editor.pointer_down(Pos2::new(200.0, 30.0), PointerButton::Secondary, Modifiers::NONE);
        editor.pointer_up(Pos2::new(200.0, 30.0), PointerButton::Secondary);

        assert_eq!(editor.graph().connection_count(), 0);
        assert!(!editor
            .drain_events()
            .iter()
            .any(|e| matches!(e, EditorEvent::NodePointer { .. })));
    }

    #[test]
    fn test_hover_enter_and_leave() {
        let (mut editor, ids) = editor_with(vec![boxed(0.0, 0.0)]);
        editor.pointer_move(Pos2::new(50.0, 40.0), None);
        editor.pointer_left();
        let hovers: Vec<_> = editor
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, EditorEvent::HoverChanged { .. }))
            .collect();
        assert_eq!(
            hovers,
            vec![
                EditorEvent::HoverChanged { entered: Some(ids[0]), left: None },
                EditorEvent::HoverChanged { entered: None, left: Some(ids[0]) },
            ]
        );
    }

    #[test]
    fn test_hover_moves_reach_hovered_node() {
        let (mut editor, ids) = editor_with(vec![boxed(10.0, 10.0)]);
        editor.pointer_move(Pos2::new(50.0, 40.0), None);
        editor.pointer_move(Pos2::new(60.0, 45.0), None);
        editor.pointer_move(Pos2::new(600.0, 450.0), None);

        let moves: Vec<_> = editor
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                EditorEvent::NodePointer { node, kind, local, button } => Some((node, kind, local, button)),
                _ => None,
            })
            .collect();
        assert_eq!(
            moves,
            vec![
                (ids[0], NodePointerKind::Move, Pos2::new(40.0, 30.0), None),
                (ids[0], NodePointerKind::Move, Pos2::new(50.0, 35.0), None),
            ]
        );
    }

    #[test]
    fn test_primary_drag_clears_link_hover() {
        let (mut editor, ids) = editor_with(vec![boxed(0.0, 0.0), boxed(300.0, 0.0)]);
        let output = editor.graph().node(ids[0]).unwrap().outputs()[0].id;
        let input = editor.graph().node(ids[1]).unwrap().inputs()[0].id;
        editor.connect(output, input);

        editor.pointer_move(Pos2::new(200.0, 30.0), None);
        assert!(editor.interaction().hovered_link().is_some());
        editor.drain_events();

        editor.pointer_down(Pos2::new(200.0, 30.0), PointerButton::Primary, Modifiers::NONE);
        editor.pointer_move(Pos2::new(200.0, 500.0), Some(PointerButton::Primary));
        assert_eq!(editor.interaction().hovered_link(), None);
        assert!(editor
            .drain_events()
            .contains(&EditorEvent::LinkHoverChanged(None)));
        editor.pointer_up(Pos2::new(200.0, 500.0), PointerButton::Primary);

        editor.pointer_down(Pos2::new(200.0, 500.0), PointerButton::Secondary, Modifiers::NONE);
        editor.pointer_up(Pos2::new(200.0, 500.0), PointerButton::Secondary);
        assert_eq!(editor.graph().connection_count(), 1);
    }

    #[test]
    fn test_right_click_away_from_stale_hover_keeps_link() {
        let (mut editor, ids) = editor_with(vec![boxed(0.0, 0.0), boxed(300.0, 0.0)]);
        let output = editor.graph().node(ids[0]).unwrap().outputs()[0].id;
        let input = editor.graph().node(ids[1]).unwrap().inputs()[0].id;
        editor.connect(output, input);

        editor.pointer_move(Pos2::new(200.0, 30.0), None);
        assert!(editor.interaction().hovered_link().is_some());
        editor.pointer_down(Pos2::new(200.0, 400.0), PointerButton::Secondary, Modifiers::NONE);
        editor.pointer_up(Pos2::new(200.0, 400.0), PointerButton::Secondary);

        assert_eq!(editor.graph().connection_count(), 1);
        assert_eq!(editor.interaction().hovered_link(), None);
    }

    #[test]
    fn test_mark_click_shows_detail_until_release() {
        let (mut editor, ids) = editor_with(vec![boxed(0.0, 0.0).with_mark("check inputs")]);
        let mark = editor.graph().node(ids[0]).unwrap().mark_rect().unwrap();
        editor.pointer_down(mark.center(), PointerButton::Primary, Modifiers::NONE);
        assert_eq!(
            editor.interaction().action(),
            &CanvasAction::ShowingMarkDetail { node: ids[0] }
        );
        editor.pointer_up(mark.center(), PointerButton::Primary);
        assert_eq!(editor.interaction().action(), &CanvasAction::Idle);
    }

    #[test]
    fn test_wheel_zoom_needs_ctrl_by_default() {
        let (mut editor, _) = editor_with(vec![boxed(0.0, 0.0)]);
        let now = Instant::now();
        editor.wheel(WheelDelta { x: 0.0, y: 1.0 }, Modifiers::NONE, now);
        assert_eq!(editor.viewport().scale(), 1.0);

        editor.wheel(WheelDelta { x: 0.0, y: 1.0 }, Modifiers::CTRL, now);
        assert!((editor.viewport().scale() - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_wheel_step_accelerates() {
        let start = Instant::now();
        assert_eq!(wheel_step(None, start), 2.0);
        assert_eq!(wheel_step(Some(start), start + Duration::from_millis(20)), 40.0);
        assert_eq!(wheel_step(Some(start), start + Duration::from_millis(120)), 10.0);
        assert_eq!(wheel_step(Some(start), start + Duration::from_secs(1)), 2.0);
    }

    #[test]
    fn test_middle_drag_pans() {
        let (mut editor, _) = editor_with(vec![boxed(0.0, 0.0)]);
        let start = editor.viewport().offset();
        editor.pointer_down(Pos2::new(10.0, 10.0), PointerButton::Middle, Modifiers::NONE);
        editor.pointer_move(Pos2::new(40.0, 25.0), Some(PointerButton::Middle));
        assert_eq!(editor.viewport().offset(), start + Vec2::new(30.0, 15.0));
    }

    #[test]
    fn test_cancel_discards_pending_connection() {
        let (mut editor, _) = editor_with(vec![boxed(0.0, 0.0), boxed(300.0, 0.0)]);
        editor.pointer_down(Pos2::new(300.0, 30.0), PointerButton::Primary, Modifiers::NONE);
        editor.cancel();
        editor.pointer_up(Pos2::new(101.0, 30.0), PointerButton::Primary);
        assert_eq!(editor.graph().connection_count(), 0);
    }
}
