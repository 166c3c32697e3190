// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph editing engine for Nodeloom.
//!
//! This crate provides everything behind an interactive node canvas:
//! - Typed ports and nodes with a pluggable type registry
//! - Connection validation with cancelable hooks and cycle detection
//! - Pan/zoom viewport with animated panning
//! - Hit testing, rectangle selection and alignment snapping
//! - Cached link geometry for hover tests
//! - The `STND` canvas file format
//!
//! ## Architecture
//!
//! [`NodeEditor`] owns the [`Graph`] and drives it from host input. The
//! [`ui::CanvasView`] widget adapts egui to that input contract, but any host
//! can call the pointer, wheel and key handlers directly.

pub mod port;
pub mod node;
pub mod graph;
pub mod validation;
pub mod events;
pub mod viewport;
pub mod magnet;
pub mod links;
pub mod interaction;
pub mod editor;
pub mod persistence;
pub mod config;
pub mod ui;

pub use config::{ConfigError, EditorConfig};
pub use editor::{Alert, AlertLevel, AlertLocation, NodeEditor};
pub use events::{EditorEvent, EditorObserver, HookScope, Proceed};
pub use graph::Graph;
pub use hit_test::HitTarget;
pub use interaction::{CanvasAction, KeyInput, Modifiers, PointerButton, WheelDelta};
pub use links::LinkKey;
pub use node::{Node, NodeFactory, NodeId, NodeRegistry, RegistryError};
pub use persistence::{LoadError, LoadSummary, SaveError};
pub use port::{DataType, Port, PortDirection, PortId, PortKind};
pub use validation::{ConnectionPolicy, ConnectionRules, ConnectionStatus};
pub use viewport::Viewport;
