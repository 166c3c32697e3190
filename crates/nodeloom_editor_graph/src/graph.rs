// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and the connections between their ports.
//!
//! Node insertion order doubles as z-order: the last node is drawn on top and
//! wins hit tests. Connections are stored on the ports themselves and are only
//! created or removed through [`crate::validation`].

use crate::node::{Node, NodeId, PortGeometry};
use crate::port::{Port, PortDirection, PortId, TypeHierarchy};
use crate::validation::ConnectionRules;
use egui::Rect;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

/// A node graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Declared subtype relations
    pub types: TypeHierarchy,
    /// Structural connection rules
    pub rules: ConnectionRules,
    nodes: IndexMap<NodeId, Node>,
    port_owners: HashMap<PortId, NodeId>,
    selected: IndexSet<NodeId>,
    active: Option<NodeId>,
    topology_version: u64,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: TypeHierarchy::new(),
            rules: ConnectionRules::default(),
            nodes: IndexMap::new(),
            port_owners: HashMap::new(),
            selected: IndexSet::new(),
            active: None,
            topology_version: 0,
        }
    }

    /// Add a node on top of the z-order
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = node.id;
        for port in node.ports_mut() {
            port.set_owner(Some(id));
            if !port.is_empty() {
                self.port_owners.insert(port.id, id);
            }
        }
        node.set_selected_flag(false);
        node.set_active_flag(false);
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node. Callers must detach its ports first.
    pub(crate) fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let mut node = self.nodes.shift_remove(&node_id)?;
        for port in node.ports_mut() {
            self.port_owners.remove(&port.id);
            port.set_owner(None);
        }
        self.selected.shift_remove(&node_id);
        if self.active == Some(node_id) {
            self.active = None;
        }
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Nodes bottom to top
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.nodes.values()
    }

    /// Node IDs bottom to top
    pub fn node_ids(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Owning node of a port
    pub fn port_owner(&self, port_id: PortId) -> Option<NodeId> {
        self.port_owners.get(&port_id).copied()
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        let owner = self.port_owner(port_id)?;
        self.nodes.get(&owner)?.port(port_id)
    }

    pub(crate) fn port_mut(&mut self, port_id: PortId) -> Option<&mut Port> {
        let owner = self.port_owner(port_id)?;
        self.nodes.get_mut(&owner)?.port_mut(port_id)
    }

    /// Geometry of a port in canvas units
    pub fn port_geometry(&self, port_id: PortId, hit_margin: f32) -> Option<PortGeometry> {
        let node = self.node(self.port_owner(port_id)?)?;
        let (direction, index) = node.port_slot(port_id)?;
        Some(node.port_geometry(direction, index, hit_margin))
    }

    /// All connections as `(output, input)` pairs, in node order
    pub fn connections(&self) -> Vec<(PortId, PortId)> {
        self.nodes
            .values()
            .flat_map(|node| node.outputs().iter())
            .filter(|port| !port.is_empty())
            .flat_map(|port| port.connected().map(move |peer| (port.id, peer)))
            .collect()
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.nodes
            .values()
            .flat_map(|node| node.outputs().iter())
            .map(Port::connection_count)
            .sum()
    }

    /// Counter bumped on every connect or disconnect
    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    /// Insert each port into the other's connected-set
    pub(crate) fn link(&mut self, a: PortId, b: PortId) {
        if let Some(port) = self.port_mut(a) {
            port.insert_peer(b);
        }
        if let Some(port) = self.port_mut(b) {
            port.insert_peer(a);
        }
        self.topology_version += 1;
    }

    /// Remove each port from the other's connected-set
    pub(crate) fn unlink(&mut self, a: PortId, b: PortId) -> bool {
        let removed_a = self.port_mut(a).is_some_and(|port| port.remove_peer(b));
        let removed_b = self.port_mut(b).is_some_and(|port| port.remove_peer(a));
        if removed_a || removed_b {
            self.topology_version += 1;
        }
        removed_a || removed_b
    }

    /// Selected nodes in selection order
    pub fn selection(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.selected.iter().copied()
    }

    /// Whether a node is selected
    pub fn is_selected(&self, node_id: NodeId) -> bool {
        self.selected.contains(&node_id)
    }

    /// Add or remove a node from the selection. Returns whether anything changed.
    pub fn set_selected(&mut self, node_id: NodeId, selected: bool) -> bool {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return false;
        };
        node.set_selected_flag(selected);
        if selected {
            self.selected.insert(node_id)
        } else {
            self.selected.shift_remove(&node_id)
        }
    }

    /// Clear the selection. Returns whether anything changed.
    pub fn clear_selection(&mut self) -> bool {
        if self.selected.is_empty() {
            return false;
        }
        for id in self.selected.drain(..) {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.set_selected_flag(false);
            }
        }
        true
    }

    /// The active node
    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    /// Change the active node, raising it to the top of the z-order.
    /// Returns whether the active node changed.
    pub fn set_active(&mut self, node_id: Option<NodeId>) -> bool {
        if self.active == node_id {
            return false;
        }
        if let Some(id) = node_id {
            if !self.nodes.contains_key(&id) {
                return false;
            }
        }
        if let Some(previous) = self.active.and_then(|id| self.nodes.get_mut(&id)) {
            previous.set_active_flag(false);
        }
        self.active = node_id;
        if let Some(id) = node_id {
            if let Some(mut node) = self.nodes.shift_remove(&id) {
                node.set_active_flag(true);
                self.nodes.insert(id, node);
            }
        }
        true
    }

    /// Bounding rectangle of every node, `None` when empty
    pub fn bounds(&self) -> Option<Rect> {
        self.nodes
            .values()
            .map(Node::rect)
            .reduce(|acc, rect| acc.union(rect))
    }

    /// Non-empty ports in node order, inputs before outputs within a node
    pub(crate) fn ports_in_order(&self) -> impl Iterator<Item = &Port> {
        self.nodes.values().flat_map(|node| {
            node.inputs()
                .iter()
                .chain(node.outputs().iter())
                .filter(|port| !port.is_empty())
        })
    }

    /// Output-side neighbours of a node: owners of the inputs its outputs feed
    pub(crate) fn downstream(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(&node_id)
            .into_iter()
            .flat_map(|node| node.outputs().iter())
            .flat_map(Port::connected)
            .filter_map(|peer| self.port_owner(peer))
    }

    /// Whether the port points in the given direction
    pub fn port_direction(&self, port_id: PortId) -> Option<PortDirection> {
        self.port(port_id).map(|port| port.direction)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
