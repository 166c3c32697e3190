// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::node::NodeId;
use crate::validation::{ConnectionPolicy, PassthroughPolicy, StandardPolicy};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

impl PortId {
    /// The sentinel "empty port". Used as a layout spacer, never connectable.
    pub const EMPTY: PortId = PortId(Uuid::nil());

    /// Create a new random port ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Whether this is the empty sentinel
    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl PortDirection {
    /// The other direction
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Declared data type tag of a port.
///
/// Types are plain names. [`DataType::ANY`] is the universal wildcard; any
/// other relation between types is declared in a [`TypeHierarchy`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType(Cow<'static, str>);

impl DataType {
    /// The universal wildcard type
    pub const ANY: DataType = DataType(Cow::Borrowed("any"));

    /// Create a named data type
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Create a data type from a static name
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this is the wildcard type
    pub fn is_wildcard(&self) -> bool {
        *self == Self::ANY
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared subtype relations between data types.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    parents: HashMap<DataType, DataType>,
}

impl TypeHierarchy {
    /// Create an empty hierarchy
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `child` as a direct subtype of `parent`
    pub fn declare_subtype(&mut self, child: DataType, parent: DataType) {
        self.parents.insert(child, parent);
    }

    /// Whether `child` is a strict subtype of `parent`.
    ///
    /// Every non-wildcard type is a subtype of [`DataType::ANY`]. A type is
    /// never a subtype of itself.
    pub fn is_subtype(&self, child: &DataType, parent: &DataType) -> bool {
        if child == parent {
            return false;
        }
        if parent.is_wildcard() {
            return !child.is_wildcard();
        }
        let mut seen = HashSet::new();
        let mut current = child;
        while let Some(next) = self.parents.get(current) {
            if next == parent {
                return true;
            }
            if !seen.insert(next) {
                break;
            }
            current = next;
        }
        false
    }
}

/// Connect behavior variant of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortKind {
    /// Regular typed port
    #[default]
    Standard,
    /// Wildcard port that adopts the type of its first real peer, mirrored
    /// onto the paired port on the other side of the node
    Passthrough(PassthroughPolicy),
}

impl PortKind {
    /// The connection policy implementing this kind
    pub fn policy(&self) -> &dyn ConnectionPolicy {
        match self {
            Self::Standard => &StandardPolicy,
            Self::Passthrough(policy) => policy,
        }
    }
}

/// A port on a node
#[derive(Debug, Clone)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Port name
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Declared data type
    pub data_type: DataType,
    /// Whether at most one peer is allowed
    pub single: bool,
    /// Connect behavior
    pub kind: PortKind,
    owner: Option<NodeId>,
    connected: IndexSet<PortId>,
}

impl Port {
    /// Create a new port
    pub fn new(
        id: PortId,
        name: impl Into<String>,
        data_type: DataType,
        direction: PortDirection,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
            data_type,
            single: direction == PortDirection::Input,
            kind: PortKind::Standard,
            owner: None,
            connected: IndexSet::new(),
        }
    }

    /// Create a new input port (single-connection by default)
    pub fn input(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(PortId::new(), name, data_type, PortDirection::Input)
    }

    /// Create a new output port (multi-connection by default)
    pub fn output(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(PortId::new(), name, data_type, PortDirection::Output)
    }

    /// The empty spacer port
    pub fn empty(direction: PortDirection) -> Self {
        Self::new(PortId::EMPTY, "", DataType::ANY, direction)
    }

    /// Create a linked passthrough input/output pair, both typed as the wildcard
    pub fn passthrough_pair(
        input_name: impl Into<String>,
        output_name: impl Into<String>,
        single_input: bool,
    ) -> (Port, Port) {
        let input_id = PortId::new();
        let output_id = PortId::new();
        let mut input = Self::new(input_id, input_name, DataType::ANY, PortDirection::Input);
        input.single = single_input;
        input.kind = PortKind::Passthrough(PassthroughPolicy { pair: output_id });
        let mut output = Self::new(output_id, output_name, DataType::ANY, PortDirection::Output);
        output.kind = PortKind::Passthrough(PassthroughPolicy { pair: input_id });
        (input, output)
    }

    /// Set the single-connection flag
    pub fn with_single(mut self, single: bool) -> Self {
        self.single = single;
        self
    }

    /// Whether this is an input port
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Whether this is the empty spacer
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// Owning node, if attached to one
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    /// Connected peers
    pub fn connected(&self) -> impl Iterator<Item = PortId> + '_ {
        self.connected.iter().copied()
    }

    /// Number of connected peers
    pub fn connection_count(&self) -> usize {
        self.connected.len()
    }

    /// Whether `other` is a peer of this port
    pub fn is_connected_to(&self, other: PortId) -> bool {
        self.connected.contains(&other)
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }

    pub(crate) fn insert_peer(&mut self, peer: PortId) -> bool {
        self.connected.insert(peer)
    }

    pub(crate) fn remove_peer(&mut self, peer: PortId) -> bool {
        self.connected.shift_remove(&peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_port_id_is_nil() {
        assert!(PortId::EMPTY.is_empty());
        assert!(!PortId::new().is_empty());
        assert!(Port::empty(PortDirection::Input).is_empty());
    }

    #[test]
    fn test_default_single_flags() {
        assert!(Port::input("in", DataType::ANY).single);
        assert!(!Port::output("out", DataType::ANY).single);
    }

    #[test]
    fn test_subtype_chain() {
        let number = DataType::new("number");
        let float = DataType::new("float");
        let half = DataType::new("half");
        let mut types = TypeHierarchy::new();
        types.declare_subtype(float.clone(), number.clone());
        types.declare_subtype(half.clone(), float.clone());

        assert!(types.is_subtype(&half, &number));
        assert!(types.is_subtype(&float, &number));
        assert!(!types.is_subtype(&number, &float));
        assert!(!types.is_subtype(&float, &float));
    }

    #[test]
    fn test_everything_is_subtype_of_wildcard() {
        let types = TypeHierarchy::new();
        assert!(types.is_subtype(&DataType::new("string"), &DataType::ANY));
        assert!(!types.is_subtype(&DataType::ANY, &DataType::ANY));
        assert!(!types.is_subtype(&DataType::ANY, &DataType::new("string")));
    }

    #[test]
    fn test_cyclic_declarations_terminate() {
        let a = DataType::new("a");
        let b = DataType::new("b");
        let mut types = TypeHierarchy::new();
        types.declare_subtype(a.clone(), b.clone());
        types.declare_subtype(b.clone(), a.clone());
        assert!(!types.is_subtype(&a, &DataType::new("c")));
    }

    #[test]
    fn test_passthrough_pair_links_both_sides() {
        let (input, output) = Port::passthrough_pair("in", "out", true);
        assert!(input.data_type.is_wildcard());
        assert_eq!(
            input.kind,
            PortKind::Passthrough(PassthroughPolicy { pair: output.id })
        );
        assert_eq!(
            output.kind,
            PortKind::Passthrough(PassthroughPolicy { pair: input.id })
        );
    }
}
