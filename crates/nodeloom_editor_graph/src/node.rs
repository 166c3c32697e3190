// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions, layout geometry, and the node type registry.

use crate::port::{Port, PortDirection, PortId};
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Height of the title strip in canvas units
pub const TITLE_HEIGHT: f32 = 20.0;
/// Height of one port row
pub const ITEM_HEIGHT: f32 = 20.0;
/// Side length of a port dot
pub const DOT_SIZE: f32 = 10.0;
/// Side length of the mark badge
pub const MARK_SIZE: f32 = 10.0;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered key/value byte records attached to a node.
///
/// Values are opaque to the editor; the typed accessors encode through
/// bincode so nodes can stash their own state for persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    records: IndexMap<String, Vec<u8>>,
}

impl PropertyBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a typed value
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<(), bincode::Error> {
        let bytes = bincode::serialize(value)?;
        self.records.insert(key.into(), bytes);
        Ok(())
    }

    /// Read a typed value, `Ok(None)` when absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, bincode::Error> {
        self.records
            .get(key)
            .map(|bytes| bincode::deserialize(bytes))
            .transpose()
    }

    /// Store raw bytes
    pub fn set_raw(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.records.insert(key.into(), value);
    }

    /// Raw bytes for a key
    pub fn raw(&self, key: &str) -> Option<&[u8]> {
        self.records.get(key).map(Vec::as_slice)
    }

    /// Remove a record
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.records.shift_remove(key)
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.records.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Screen-independent geometry of one port, in canvas units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortGeometry {
    /// Drawn dot square
    pub dot: Rect,
    /// Dot inflated by the hit margin
    pub hit: Rect,
    /// Point where links attach
    pub anchor: Pos2,
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Registry type ID this node was created from
    pub type_id: String,
    /// Display title
    pub title: String,
    /// Top-left corner in canvas units
    pub position: Pos2,
    /// Width and height in canvas units
    pub size: Vec2,
    /// Refuse new connections and disconnections on this node
    pub lock_option: bool,
    /// Refuse dragging this node
    pub lock_location: bool,
    /// Annotation text
    pub mark: Option<String>,
    /// Index of the node-internal control that has input focus
    pub active_control: Option<usize>,
    /// Persisted custom state
    pub properties: PropertyBag,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    selected: bool,
    active: bool,
}

impl Node {
    /// Create an empty node with a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            type_id: String::new(),
            title: title.into(),
            position: Pos2::ZERO,
            size: Vec2::new(120.0, 60.0),
            lock_option: false,
            lock_location: false,
            mark: None,
            active_control: None,
            properties: PropertyBag::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            selected: false,
            active: false,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Pos2::new(x, y);
        self
    }

    /// Set the size
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Vec2::new(width, height);
        self
    }

    /// Append an input port
    pub fn with_input(mut self, mut port: Port) -> Self {
        port.direction = PortDirection::Input;
        self.inputs.push(port);
        self
    }

    /// Append an output port
    pub fn with_output(mut self, mut port: Port) -> Self {
        port.direction = PortDirection::Output;
        self.outputs.push(port);
        self
    }

    /// Set the mark annotation
    pub fn with_mark(mut self, mark: impl Into<String>) -> Self {
        self.mark = Some(mark.into());
        self
    }

    /// Input ports in order
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    /// Output ports in order
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// All ports, inputs first
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        self.ports().find(|p| p.id == port_id)
    }

    pub(crate) fn port_mut(&mut self, port_id: PortId) -> Option<&mut Port> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| p.id == port_id)
    }

    pub(crate) fn ports_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.inputs.iter_mut().chain(self.outputs.iter_mut())
    }

    /// Whether the node is in the selection set
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Whether the node is the active node
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_selected_flag(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub(crate) fn set_active_flag(&mut self, active: bool) {
        self.active = active;
    }

    /// Body rectangle
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position, self.size)
    }

    /// Title strip; dragging here moves the node
    pub fn title_rect(&self) -> Rect {
        Rect::from_min_size(self.position, Vec2::new(self.size.x, TITLE_HEIGHT))
    }

    /// Mark badge in the top-right corner of the title, if a mark is set
    pub fn mark_rect(&self) -> Option<Rect> {
        self.mark.as_ref()?;
        let min = Pos2::new(
            self.position.x + self.size.x - MARK_SIZE - 2.0,
            self.position.y + (TITLE_HEIGHT - MARK_SIZE) / 2.0,
        );
        Some(Rect::from_min_size(min, Vec2::splat(MARK_SIZE)))
    }

    /// Geometry of the port at `index` in the given direction.
    ///
    /// Input dots sit outside the left edge, output dots outside the right
    /// edge, one row per port below the title.
    pub fn port_geometry(&self, direction: PortDirection, index: usize, hit_margin: f32) -> PortGeometry {
        let row_top = self.position.y + TITLE_HEIGHT + index as f32 * ITEM_HEIGHT;
        let dot_top = row_top + (ITEM_HEIGHT - DOT_SIZE) / 2.0;
        let dot_left = match direction {
            PortDirection::Input => self.position.x - DOT_SIZE / 2.0,
            PortDirection::Output => self.position.x + self.size.x - DOT_SIZE / 2.0,
        };
        let dot = Rect::from_min_size(Pos2::new(dot_left, dot_top), Vec2::splat(DOT_SIZE));
        let anchor = match direction {
            PortDirection::Input => Pos2::new(dot.left(), dot.center().y),
            PortDirection::Output => Pos2::new(dot.right(), dot.center().y),
        };
        PortGeometry {
            dot,
            hit: dot.expand(hit_margin),
            anchor,
        }
    }

    /// Locate a port on this node: direction and row index
    pub fn port_slot(&self, port_id: PortId) -> Option<(PortDirection, usize)> {
        if let Some(i) = self.inputs.iter().position(|p| p.id == port_id) {
            return Some((PortDirection::Input, i));
        }
        self.outputs
            .iter()
            .position(|p| p.id == port_id)
            .map(|i| (PortDirection::Output, i))
    }
}

/// Errors raised by node factories
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No factory registered for the type ID
    #[error("No node type registered for '{0}'")]
    UnknownType(String),
    /// Stored property could not be decoded
    #[error("Invalid property '{key}': {source}")]
    Property {
        /// Property key
        key: String,
        /// Decode failure
        #[source]
        source: bincode::Error,
    },
    /// Factory-specific failure
    #[error("{0}")]
    Custom(String),
}

/// Creates nodes of one registered type.
///
/// `load` runs after the standard fields and property records have been
/// restored onto a fresh node; `load_completed` runs once the whole canvas
/// has finished loading.
pub trait NodeFactory: Send + Sync {
    /// Build a fresh node of this type
    fn create(&self) -> Node;

    /// Apply restored property records
    fn load(&self, _node: &mut Node) -> Result<(), RegistryError> {
        Ok(())
    }

    /// Post-load fix-up
    fn load_completed(&self, _node: &mut Node) {}
}

impl<F> NodeFactory for F
where
    F: Fn() -> Node + Send + Sync,
{
    fn create(&self) -> Node {
        self()
    }
}

/// Registry of node types keyed by type ID
#[derive(Clone, Default)]
pub struct NodeRegistry {
    factories: IndexMap<String, Arc<dyn NodeFactory>>,
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a type ID, replacing any previous one
    pub fn register(&mut self, type_id: impl Into<String>, factory: impl NodeFactory + 'static) {
        self.factories.insert(type_id.into(), Arc::new(factory));
    }

    /// Look up a factory
    pub fn resolve(&self, type_id: &str) -> Option<Arc<dyn NodeFactory>> {
        self.factories.get(type_id).cloned()
    }

    /// Create a node of the given type with its type ID stamped
    pub fn create_node(&self, type_id: &str) -> Result<Node, RegistryError> {
        let factory = self
            .resolve(type_id)
            .ok_or_else(|| RegistryError::UnknownType(type_id.to_string()))?;
        let mut node = factory.create();
        node.type_id = type_id.to_string();
        Ok(node)
    }

    /// Registered type IDs
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
