// SPDX-License-Identifier: MIT OR Apache-2.0
//! egui canvas view.
//!
//! Translates egui input into [`NodeEditor`] calls and paints the editor's
//! geometry. The view keeps no graph state of its own.

use crate::editor::{AlertLevel, AlertLocation, NodeEditor};
use crate::interaction::{CanvasAction, KeyInput, Modifiers, PointerButton, WheelDelta};
use crate::links::{CubicBezier, FLATTEN_SEGMENTS};
use crate::node::{Node, DOT_SIZE};
use crate::port::PortDirection;
use egui::{Align2, Color32, FontId, Pos2, Rect, Shape, Stroke, Vec2};
use std::time::Instant;

const NODE_ROUNDING: f32 = 4.0;
const LINK_THICKNESS: f32 = 2.0;
const GRID_SPACING: f32 = 20.0;
const ALERT_MARGIN: f32 = 12.0;

const NODE_COLOR: Color32 = Color32::from_rgb(45, 45, 48);
const TITLE_COLOR: Color32 = Color32::from_rgb(70, 100, 130);
const SELECTED_COLOR: Color32 = Color32::from_rgb(100, 150, 255);
const ACTIVE_COLOR: Color32 = Color32::from_rgb(255, 200, 80);
const LINK_COLOR: Color32 = Color32::from_rgb(160, 160, 170);
const LINK_HOVER_COLOR: Color32 = Color32::from_rgb(255, 120, 80);
const MARK_COLOR: Color32 = Color32::from_rgb(230, 140, 40);
const GUIDE_COLOR: Color32 = Color32::from_rgb(80, 200, 120);

/// Map an egui pointer button; extra buttons are ignored
pub fn map_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        egui::PointerButton::Middle => Some(PointerButton::Middle),
        egui::PointerButton::Extra1 | egui::PointerButton::Extra2 => None,
    }
}

/// Map egui modifiers; command counts as ctrl
pub fn map_modifiers(modifiers: egui::Modifiers) -> Modifiers {
    Modifiers {
        ctrl: modifiers.ctrl || modifiers.command,
        shift: modifiers.shift,
        alt: modifiers.alt,
    }
}

fn held_button(pointer: &egui::PointerState) -> Option<PointerButton> {
    [
        egui::PointerButton::Middle,
        egui::PointerButton::Primary,
        egui::PointerButton::Secondary,
    ]
    .into_iter()
    .find(|&button| pointer.button_down(button))
    .and_then(map_button)
}

/// Anchor point and alignment for an alert inside `rect`
pub fn alert_anchor(location: AlertLocation, rect: Rect) -> (Pos2, Align2) {
    let m = ALERT_MARGIN;
    match location {
        AlertLocation::Left => (rect.left_center() + Vec2::new(m, 0.0), Align2::LEFT_CENTER),
        AlertLocation::Top => (rect.center_top() + Vec2::new(0.0, m), Align2::CENTER_TOP),
        AlertLocation::Right => (rect.right_center() - Vec2::new(m, 0.0), Align2::RIGHT_CENTER),
        AlertLocation::Bottom => (rect.center_bottom() - Vec2::new(0.0, m), Align2::CENTER_BOTTOM),
        AlertLocation::Center => (rect.center(), Align2::CENTER_CENTER),
        AlertLocation::LeftTop => (rect.left_top() + Vec2::splat(m), Align2::LEFT_TOP),
        AlertLocation::RightTop => (rect.right_top() + Vec2::new(-m, m), Align2::RIGHT_TOP),
        AlertLocation::RightBottom => (rect.right_bottom() - Vec2::splat(m), Align2::RIGHT_BOTTOM),
        AlertLocation::LeftBottom => (rect.left_bottom() + Vec2::new(m, -m), Align2::LEFT_BOTTOM),
    }
}

fn alert_color(level: AlertLevel) -> Color32 {
    match level {
        AlertLevel::Info => Color32::from_rgb(60, 120, 200),
        AlertLevel::Warning => Color32::from_rgb(200, 150, 40),
        AlertLevel::Error => Color32::from_rgb(200, 60, 60),
    }
}

/// Canvas widget for a [`NodeEditor`]
#[derive(Debug, Clone)]
pub struct CanvasView {
    /// Draw the background grid
    pub show_grid: bool,
    captured: Option<PointerButton>,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasView {
    /// Create a canvas view
    pub fn new() -> Self {
        Self {
            show_grid: true,
            captured: None,
        }
    }

    /// Handle input and draw the editor into the available space
    pub fn show(&mut self, ui: &mut egui::Ui, editor: &mut NodeEditor) -> egui::Response {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        editor.set_view_size(rect.size());
        self.handle_input(ui, &response, rect, editor);

        if editor.tick(Instant::now()) {
            ui.ctx().request_repaint();
        }
        editor.refresh_links();

        if self.show_grid {
            draw_grid(&painter, rect, editor);
        }
        draw_links(&painter, rect, editor);
        draw_pending_link(&painter, rect, editor);
        for node in editor.graph().nodes() {
            draw_node(&painter, rect, editor, node);
        }
        draw_overlays(&painter, rect, editor);
        draw_alert(&painter, rect, editor);

        response
    }

    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect, editor: &mut NodeEditor) {
        let (events, modifiers, scroll, held) = ui.input(|i| {
            (
                i.events.clone(),
                i.modifiers,
                i.raw_scroll_delta,
                held_button(&i.pointer),
            )
        });
        let local = |pos: Pos2| (pos - rect.min).to_pos2();

        for event in events {
            match event {
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    modifiers,
                } => {
                    let Some(button) = map_button(button) else {
                        continue;
                    };
                    if pressed && rect.contains(pos) {
                        self.captured = Some(button);
                        editor.pointer_down(local(pos), button, map_modifiers(modifiers));
                    } else if !pressed && self.captured == Some(button) {
                        self.captured = None;
                        editor.pointer_up(local(pos), button);
                    }
                }
                egui::Event::PointerMoved(pos) => {
                    if rect.contains(pos) || self.captured.is_some() {
                        editor.pointer_move(local(pos), held);
                    } else {
                        editor.pointer_left();
                    }
                }
                egui::Event::PointerGone => {
                    editor.pointer_left();
                }
                egui::Event::Key {
                    key, pressed, modifiers, ..
                } if response.hovered() => {
                    editor.key(KeyInput {
                        key: key.name().to_string(),
                        pressed,
                        modifiers: map_modifiers(modifiers),
                    });
                }
                _ => {}
            }
        }

        if response.hovered() && scroll != Vec2::ZERO {
            let delta = WheelDelta {
                x: scroll.x,
                y: scroll.y,
            };
            editor.wheel(delta, map_modifiers(modifiers), Instant::now());
        }
    }
}

fn to_screen(rect: Rect, editor: &NodeEditor, point: Pos2) -> Pos2 {
    rect.min + editor.viewport().canvas_to_screen(point).to_vec2()
}

fn to_screen_rect(rect: Rect, editor: &NodeEditor, canvas: Rect) -> Rect {
    Rect::from_min_max(to_screen(rect, editor, canvas.min), to_screen(rect, editor, canvas.max))
}

fn draw_grid(painter: &egui::Painter, rect: Rect, editor: &NodeEditor) {
    let spacing = editor.viewport().canvas_len(GRID_SPACING);
    if spacing < 4.0 {
        return;
    }
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 60, 60, 100));
    let offset = editor.viewport().offset();

    let mut x = rect.left() + offset.x.rem_euclid(spacing);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += spacing;
    }
    let mut y = rect.top() + offset.y.rem_euclid(spacing);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += spacing;
    }
}

fn draw_curve(painter: &egui::Painter, rect: Rect, editor: &NodeEditor, curve: &CubicBezier, color: Color32) {
    let points = curve
        .flatten(FLATTEN_SEGMENTS)
        .into_iter()
        .map(|p| to_screen(rect, editor, p))
        .collect();
    let width = editor.viewport().canvas_len(LINK_THICKNESS).max(1.0);
    painter.add(Shape::line(points, Stroke::new(width, color)));
}

fn draw_links(painter: &egui::Painter, rect: Rect, editor: &NodeEditor) {
    let hovered = editor.interaction().hovered_link();
    for (key, curve) in editor.links().paths() {
        let color = if hovered == Some(key) {
            LINK_HOVER_COLOR
        } else {
            LINK_COLOR
        };
        draw_curve(painter, rect, editor, curve, color);
    }
}

fn draw_pending_link(painter: &egui::Painter, rect: Rect, editor: &NodeEditor) {
    let CanvasAction::ConnectingOption { port, anchor, current } = editor.interaction().action() else {
        return;
    };
    let style = editor.links().style();
    let curve = match editor.graph().port_direction(*port) {
        Some(PortDirection::Input) => CubicBezier::from_anchors(*current, *anchor, style),
        _ => CubicBezier::from_anchors(*anchor, *current, style),
    };
    draw_curve(painter, rect, editor, &curve, SELECTED_COLOR);
}

fn draw_node(painter: &egui::Painter, rect: Rect, editor: &NodeEditor, node: &Node) {
    let viewport = editor.viewport();
    let body = to_screen_rect(rect, editor, node.rect());
    if !body.intersects(rect) {
        return;
    }
    let rounding = viewport.canvas_len(NODE_ROUNDING);
    painter.rect_filled(body, rounding, NODE_COLOR);

    let title = to_screen_rect(rect, editor, node.title_rect());
    painter.rect_filled(title, rounding, TITLE_COLOR);
    painter.text(
        title.left_center() + Vec2::new(viewport.canvas_len(6.0), 0.0),
        Align2::LEFT_CENTER,
        &node.title,
        FontId::proportional(viewport.canvas_len(12.0)),
        Color32::WHITE,
    );

    if node.is_active() {
        painter.rect_stroke(body, rounding, Stroke::new(2.0, ACTIVE_COLOR));
    } else if node.is_selected() {
        painter.rect_stroke(body, rounding, Stroke::new(2.0, SELECTED_COLOR));
    }

    if let Some(mark) = node.mark_rect() {
        painter.rect_filled(to_screen_rect(rect, editor, mark), 2.0, MARK_COLOR);
    }

    let label_font = FontId::proportional(viewport.canvas_len(10.0));
    let label_pad = viewport.canvas_len(DOT_SIZE);
    for direction in [PortDirection::Input, PortDirection::Output] {
        let ports = match direction {
            PortDirection::Input => node.inputs(),
            PortDirection::Output => node.outputs(),
        };
        for (index, port) in ports.iter().enumerate() {
            if port.is_empty() {
                continue;
            }
            let geometry = node.port_geometry(direction, index, 0.0);
            let center = to_screen(rect, editor, geometry.dot.center());
            let radius = viewport.canvas_len(DOT_SIZE / 2.0);
            if port.connection_count() > 0 {
                painter.circle_filled(center, radius, LINK_COLOR);
            } else {
                painter.circle_stroke(center, radius, Stroke::new(1.0, LINK_COLOR));
            }
            let (pos, align) = match direction {
                PortDirection::Input => (center + Vec2::new(label_pad, 0.0), Align2::LEFT_CENTER),
                PortDirection::Output => (center - Vec2::new(label_pad, 0.0), Align2::RIGHT_CENTER),
            };
            painter.text(pos, align, &port.name, label_font.clone(), Color32::from_gray(200));
        }
    }
}

fn draw_overlays(painter: &egui::Painter, rect: Rect, editor: &NodeEditor) {
    match editor.interaction().action() {
        CanvasAction::MovingNodes => {
            let guides = editor.magnet().current();
            let stroke = Stroke::new(1.0, GUIDE_COLOR);
            if let Some(m) = guides.x {
                let x = to_screen(rect, editor, Pos2::new(m.line, 0.0)).x;
                painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
            }
            if let Some(m) = guides.y {
                let y = to_screen(rect, editor, Pos2::new(0.0, m.line)).y;
                painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
            }
        }
        CanvasAction::RectSelecting { rect: selection } => {
            let screen = to_screen_rect(rect, editor, *selection);
            painter.rect_filled(screen, 0.0, Color32::from_rgba_unmultiplied(100, 150, 255, 30));
            painter.rect_stroke(screen, 0.0, Stroke::new(1.0, SELECTED_COLOR));
        }
        CanvasAction::ShowingMarkDetail { node } => {
            let Some(node) = editor.graph().node(*node) else {
                return;
            };
            let (Some(mark), Some(text)) = (node.mark_rect(), node.mark.as_deref()) else {
                return;
            };
            let anchor = to_screen(rect, editor, mark.right_top());
            let galley = painter.layout_no_wrap(text.to_string(), FontId::proportional(11.0), Color32::WHITE);
            let bubble = Rect::from_min_size(anchor + Vec2::new(4.0, 0.0), galley.size() + Vec2::splat(8.0));
            painter.rect_filled(bubble, 3.0, Color32::from_rgba_unmultiplied(20, 20, 20, 230));
            painter.rect_stroke(bubble, 3.0, Stroke::new(1.0, MARK_COLOR));
            painter.galley(bubble.min + Vec2::splat(4.0), galley, Color32::WHITE);
        }
        CanvasAction::Idle | CanvasAction::ConnectingOption { .. } => {}
    }
}

fn draw_alert(painter: &egui::Painter, rect: Rect, editor: &NodeEditor) {
    let Some(alert) = editor.alert() else {
        return;
    };
    let opacity = alert.opacity(Instant::now());
    if opacity <= 0.0 {
        return;
    }
    let (anchor, align) = alert_anchor(alert.location, rect);
    let galley = painter.layout_no_wrap(alert.text.clone(), FontId::proportional(13.0), Color32::WHITE);
    let size = galley.size() + Vec2::new(16.0, 10.0);
    let bubble = align.anchor_size(anchor, size);
    painter.rect_filled(bubble, 4.0, alert_color(alert.level).gamma_multiply(opacity));
    painter.galley(
        bubble.center() - galley.size() / 2.0,
        galley,
        Color32::WHITE.gamma_multiply(opacity),
    );
}
