// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection validation and the connect/disconnect commit path.
//!
//! Policy rejections are ordinary [`ConnectionStatus`] values, never errors.
//! Every connect or disconnect attempt, successful or not, is reported through
//! an [`EditorEvent`] carrying its status.

use crate::events::{ConnectionRequest, EditorEvent, Notifier};
use crate::graph::Graph;
use crate::node::NodeId;
use crate::port::{DataType, Port, PortId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Result of a connection check or operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// A port has no owning node
    NoOwner,
    /// Both ports belong to the same node
    SameOwner,
    /// Both ports are inputs or both are outputs
    SameInputOrOutput,
    /// Data types are incompatible
    ErrorType,
    /// The initiating port only accepts one peer and already has it
    SingleOption,
    /// The connection would close a cycle
    Loop,
    /// The ports are already connected
    Exists,
    /// A port is the empty spacer
    EmptyOption,
    /// Connectable, or connected
    Connected,
    /// Disconnected
    Disconnected,
    /// An owning node is locked
    Locked,
    /// An observer vetoed the operation
    Reject,
    /// A connect is pending
    Connecting,
    /// A disconnect is pending
    Disconnecting,
}

impl ConnectionStatus {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoOwner => "No owner",
            Self::SameOwner => "Same owner",
            Self::SameInputOrOutput => "Both are input or output options",
            Self::ErrorType => "Different data types",
            Self::SingleOption => "Single connection node",
            Self::Loop => "Circular path",
            Self::Exists => "Existing connection",
            Self::EmptyOption => "Empty option",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Locked => "Node is locked",
            Self::Reject => "Operation denied",
            Self::Connecting => "Connecting",
            Self::Disconnecting => "Disconnecting",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Graph-wide structural rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionRules {
    /// Permit connections that close a cycle
    pub allow_loops: bool,
    /// Permit a wildcard output to feed a typed input
    pub allow_untyped_to_typed: bool,
}

/// Per-port connect behavior.
///
/// The default methods implement the standard rules; variants override the
/// pieces they change.
pub trait ConnectionPolicy {
    /// Check whether `this` may connect to `other`
    fn can_connect(&self, graph: &Graph, this: &Port, other: &Port) -> ConnectionStatus {
        standard_can_connect(graph, this, other)
    }

    /// Called on the initiating port before checks run. Returns the type to
    /// restore if the connect fails.
    fn prepare_connect(&self, _graph: &mut Graph, _this: PortId, _other: PortId) -> Option<DataType> {
        None
    }

    /// Called after a connection involving `this` was committed
    fn connected(&self, _graph: &mut Graph, _this: PortId, _peer: PortId) {}

    /// Called after a connection involving `this` was removed
    fn disconnected(&self, _graph: &mut Graph, _this: PortId, _peer: PortId) {}
}

/// The standard typed-port rules
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPolicy;

impl ConnectionPolicy for StandardPolicy {}

/// Wildcard port that takes on the type of its first real peer.
///
/// The type is mirrored onto `pair`, the port on the opposite side of the same
/// node, and both widen back to the wildcard once neither has peers left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassthroughPolicy {
    /// The paired port on the other side of the node
    pub pair: PortId,
}

impl ConnectionPolicy for PassthroughPolicy {
    fn can_connect(&self, graph: &Graph, this: &Port, other: &Port) -> ConnectionStatus {
        if other.is_empty() {
            return ConnectionStatus::EmptyOption;
        }
        if !this.data_type.is_wildcard() {
            return standard_can_connect(graph, this, other);
        }
        let (this_owner, other_owner) = match structural_checks(graph, this, other) {
            Ok(owners) => owners,
            Err(status) => return status,
        };
        if other.is_input() && path_exists(graph, other_owner, this_owner) {
            return ConnectionStatus::Loop;
        }
        if this.is_connected_to(other.id) {
            return ConnectionStatus::Exists;
        }
        if other.data_type.is_wildcard() {
            return ConnectionStatus::ErrorType;
        }
        if !this.is_input() {
            return ConnectionStatus::Connected;
        }
        let already_fed = graph
            .node(this_owner)
            .is_some_and(|node| node.inputs().iter().any(|input| input.is_connected_to(other.id)));
        if already_fed {
            ConnectionStatus::Exists
        } else {
            ConnectionStatus::Connected
        }
    }

    fn prepare_connect(&self, graph: &mut Graph, this: PortId, other: PortId) -> Option<DataType> {
        let peer_type = graph.port(other)?.data_type.clone();
        let port = graph.port_mut(this)?;
        if !port.data_type.is_wildcard() {
            return None;
        }
        port.data_type = peer_type;
        Some(DataType::ANY)
    }

    fn connected(&self, graph: &mut Graph, this: PortId, peer: PortId) {
        let Some(peer_type) = graph.port(peer).map(|p| p.data_type.clone()) else {
            return;
        };
        let Some(port) = graph.port_mut(this) else {
            return;
        };
        if port.data_type.is_wildcard() {
            port.data_type = peer_type;
        }
        let narrowed = port.data_type.clone();
        if let Some(pair) = graph.port_mut(self.pair) {
            if pair.data_type.is_wildcard() {
                pair.data_type = narrowed;
            }
        }
    }

    fn disconnected(&self, graph: &mut Graph, this: PortId, _peer: PortId) {
        let idle = |id| graph.port(id).map_or(true, |p: &Port| p.connection_count() == 0);
        if !(idle(this) && idle(self.pair)) {
            return;
        }
        for id in [this, self.pair] {
            if let Some(port) = graph.port_mut(id) {
                port.data_type = DataType::ANY;
            }
        }
    }
}

/// Direction, ownership, lock and single-peer checks shared by every policy.
/// Returns the owning nodes of `this` and `other`.
fn structural_checks(graph: &Graph, this: &Port, other: &Port) -> Result<(NodeId, NodeId), ConnectionStatus> {
    if this.direction == other.direction {
        return Err(ConnectionStatus::SameInputOrOutput);
    }
    let (Some(this_owner), Some(other_owner)) = (this.owner(), other.owner()) else {
        return Err(ConnectionStatus::NoOwner);
    };
    if this_owner == other_owner {
        return Err(ConnectionStatus::SameOwner);
    }
    let (Some(this_node), Some(other_node)) = (graph.node(this_owner), graph.node(other_owner)) else {
        return Err(ConnectionStatus::NoOwner);
    };
    if this_node.lock_option || other_node.lock_option {
        return Err(ConnectionStatus::Locked);
    }
    if this.single && this.connection_count() > 0 {
        return Err(ConnectionStatus::SingleOption);
    }
    Ok((this_owner, other_owner))
}

/// The standard check sequence from the point of view of `this`.
///
/// The type rule is only evaluated when `this` is the input. Checking from the
/// output side never reports `ErrorType`; [`connect`] runs both directions so a
/// committed connection is always type-checked.
pub fn standard_can_connect(graph: &Graph, this: &Port, other: &Port) -> ConnectionStatus {
    if this.is_empty() || other.is_empty() {
        return ConnectionStatus::EmptyOption;
    }
    let (this_owner, other_owner) = match structural_checks(graph, this, other) {
        Ok(owners) => owners,
        Err(status) => return status,
    };
    if !graph.rules.allow_loops && other.is_input() && path_exists(graph, other_owner, this_owner) {
        return ConnectionStatus::Loop;
    }
    if this.is_connected_to(other.id) {
        return ConnectionStatus::Exists;
    }
    if this.is_input() && !accepts_type(graph, &this.data_type, &other.data_type) {
        return ConnectionStatus::ErrorType;
    }
    ConnectionStatus::Connected
}

/// Whether an input typed `input` accepts data from an output typed `output`
pub fn accepts_type(graph: &Graph, input: &DataType, output: &DataType) -> bool {
    output == input
        || graph.types.is_subtype(output, input)
        || (graph.rules.allow_untyped_to_typed && output.is_wildcard())
}

/// Check whether `a` may connect to `b`, dispatching on `a`'s port kind
pub fn can_connect(graph: &Graph, a: PortId, b: PortId) -> ConnectionStatus {
    if a.is_empty() || b.is_empty() {
        return ConnectionStatus::EmptyOption;
    }
    let (Some(this), Some(other)) = (graph.port(a), graph.port(b)) else {
        return ConnectionStatus::NoOwner;
    };
    this.kind.policy().can_connect(graph, this, other)
}

/// Whether following output-to-input edges from `from` reaches `to`
pub fn path_exists(graph: &Graph, from: NodeId, to: NodeId) -> bool {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([from]);
    while let Some(current) = queue.pop_front() {
        for next in graph.downstream(current) {
            if next == to {
                return true;
            }
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    false
}

/// Connect `initiator` to `target`.
///
/// Observers may veto first. Both directions must then pass their checks
/// before the connection is committed.
pub fn connect(graph: &mut Graph, notifier: &mut Notifier, initiator: PortId, target: PortId) -> ConnectionStatus {
    let request = ConnectionRequest { initiator, target };
    let status = try_connect(graph, notifier, request);
    tracing::debug!("Connect {:?} -> {:?}: {}", initiator, target, status);
    notifier.emit(EditorEvent::OptionConnected {
        initiator,
        target,
        status,
    });
    status
}

fn try_connect(graph: &mut Graph, notifier: &mut Notifier, request: ConnectionRequest) -> ConnectionStatus {
    let ConnectionRequest { initiator, target } = request;
    if !notifier.ask_connecting(request).proceed {
        return ConnectionStatus::Reject;
    }

    let initiator_kind = graph.port(initiator).map(|p| p.kind).unwrap_or_default();
    let target_kind = graph.port(target).map(|p| p.kind).unwrap_or_default();
    let restore = initiator_kind.policy().prepare_connect(graph, initiator, target);

    let mut status = can_connect(graph, initiator, target);
    if status == ConnectionStatus::Connected {
        status = can_connect(graph, target, initiator);
    }
    if status != ConnectionStatus::Connected {
        if let (Some(data_type), Some(port)) = (restore, graph.port_mut(initiator)) {
            port.data_type = data_type;
        }
        return status;
    }

    graph.link(target, initiator);
    target_kind.policy().connected(graph, target, initiator);
    initiator_kind.policy().connected(graph, initiator, target);
    ConnectionStatus::Connected
}

/// Disconnect `initiator` from `target`.
///
/// Refused with `Locked` only when both owning nodes are locked.
pub fn disconnect(graph: &mut Graph, notifier: &mut Notifier, initiator: PortId, target: PortId) -> ConnectionStatus {
    let request = ConnectionRequest { initiator, target };
    if !notifier.ask_disconnecting(request).proceed {
        return report_disconnect(notifier, request, ConnectionStatus::Reject);
    }
    let owners = graph
        .port_owner(initiator)
        .zip(graph.port_owner(target))
        .and_then(|(a, b)| graph.node(a).zip(graph.node(b)));
    let Some((a, b)) = owners else {
        return report_disconnect(notifier, request, ConnectionStatus::NoOwner);
    };
    if a.lock_option && b.lock_option {
        return report_disconnect(notifier, request, ConnectionStatus::Locked);
    }
    unlink_pair(graph, initiator, target);
    report_disconnect(notifier, request, ConnectionStatus::Disconnected)
}

fn report_disconnect(notifier: &mut Notifier, request: ConnectionRequest, status: ConnectionStatus) -> ConnectionStatus {
    tracing::debug!("Disconnect {:?} -> {:?}: {}", request.initiator, request.target, status);
    notifier.emit(EditorEvent::OptionDisconnected {
        initiator: request.initiator,
        target: request.target,
        status,
    });
    status
}

fn unlink_pair(graph: &mut Graph, a: PortId, b: PortId) {
    graph.unlink(a, b);
    let a_kind = graph.port(a).map(|p| p.kind).unwrap_or_default();
    let b_kind = graph.port(b).map(|p| p.kind).unwrap_or_default();
    b_kind.policy().disconnected(graph, b, a);
    a_kind.policy().disconnected(graph, a, b);
}

/// Disconnect every peer of `port`, iterating a snapshot of its connected-set.
/// Returns how many connections were removed.
pub fn disconnect_all(graph: &mut Graph, notifier: &mut Notifier, port: PortId) -> usize {
    let peers: Vec<PortId> = graph
        .port(port)
        .map(|p| p.connected().collect())
        .unwrap_or_default();
    peers
        .into_iter()
        .filter(|&peer| disconnect(graph, notifier, port, peer) == ConnectionStatus::Disconnected)
        .count()
}

/// Remove every connection of a node without consulting hooks or locks.
/// Used before the node itself is removed.
pub(crate) fn detach_node(graph: &mut Graph, notifier: &mut Notifier, node_id: NodeId) {
    let pairs: Vec<(PortId, PortId)> = graph
        .node(node_id)
        .into_iter()
        .flat_map(|node| node.ports())
        .flat_map(|port| port.connected().map(move |peer| (port.id, peer)))
        .collect();
    for (port, peer) in pairs {
        unlink_pair(graph, port, peer);
        report_disconnect(
            notifier,
            ConnectionRequest {
                initiator: port,
                target: peer,
            },
            ConnectionStatus::Disconnected,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EditorObserver, HookScope, Proceed};
    use crate::node::Node;

    fn typed_node(title: &str, input: DataType, output: DataType) -> Node {
        Node::new(title)
            .with_input(Port::input("in", input))
            .with_output(Port::output("out", output))
    }

    fn io(graph: &Graph, node: NodeId) -> (PortId, PortId) {
        let node = graph.node(node).unwrap();
        (node.inputs()[0].id, node.outputs()[0].id)
    }

    fn pair() -> (Graph, Notifier, NodeId, NodeId) {
        let mut graph = Graph::default();
        let a = graph.add_node(typed_node("a", DataType::ANY, DataType::ANY));
        let b = graph.add_node(typed_node("b", DataType::ANY, DataType::ANY));
        (graph, Notifier::new(), a, b)
    }

    #[test]
    fn test_same_direction_always_rejected() {
        let mut graph = Graph::default();
        let a = graph.add_node(typed_node("a", DataType::new("int"), DataType::new("int")));
        let b = graph.add_node(typed_node("b", DataType::new("str"), DataType::new("int")));
        let (a_in, a_out) = io(&graph, a);
        let (b_in, b_out) = io(&graph, b);

        assert_eq!(can_connect(&graph, a_in, b_in), ConnectionStatus::SameInputOrOutput);
        assert_eq!(can_connect(&graph, a_out, b_out), ConnectionStatus::SameInputOrOutput);
    }

    #[test]
    fn test_empty_port_checked_first() {
        let (graph, _, a, _) = pair();
        let (a_in, _) = io(&graph, a);
        assert_eq!(can_connect(&graph, a_in, PortId::EMPTY), ConnectionStatus::EmptyOption);
        assert_eq!(can_connect(&graph, PortId::EMPTY, a_in), ConnectionStatus::EmptyOption);
    }

    #[test]
    fn test_same_owner_and_lock() {
        let (mut graph, mut notifier, a, b) = pair();
        let (a_in, a_out) = io(&graph, a);
        let (b_in, _) = io(&graph, b);
        assert_eq!(can_connect(&graph, a_out, a_in), ConnectionStatus::SameOwner);

        graph.node_mut(b).unwrap().lock_option = true;
        assert_eq!(connect(&mut graph, &mut notifier, a_out, b_in), ConnectionStatus::Locked);
    }

    #[test]
    fn test_single_option_rejects_second_peer() {
        let (mut graph, mut notifier, a, b) = pair();
        let c = graph.add_node(typed_node("c", DataType::ANY, DataType::ANY));
        let (_, a_out) = io(&graph, a);
        let (_, b_out) = io(&graph, b);
        let (c_in, _) = io(&graph, c);

        assert_eq!(connect(&mut graph, &mut notifier, c_in, a_out), ConnectionStatus::Connected);
        assert_eq!(connect(&mut graph, &mut notifier, c_in, b_out), ConnectionStatus::SingleOption);
        assert_eq!(connect(&mut graph, &mut notifier, b_out, c_in), ConnectionStatus::SingleOption);
    }

    #[test]
    fn test_loop_detected() {
        let (mut graph, mut notifier, a, b) = pair();
        let (a_in, a_out) = io(&graph, a);
        let (b_in, b_out) = io(&graph, b);

        assert_eq!(connect(&mut graph, &mut notifier, b_out, a_in), ConnectionStatus::Connected);
        assert_eq!(connect(&mut graph, &mut notifier, a_out, b_in), ConnectionStatus::Loop);

        graph.rules.allow_loops = true;
        assert_eq!(connect(&mut graph, &mut notifier, a_out, b_in), ConnectionStatus::Connected);
    }

    #[test]
    fn test_path_search_terminates_on_cycles() {
        let (mut graph, mut notifier, a, b) = pair();
        graph.rules.allow_loops = true;
        let c = graph.add_node(typed_node("c", DataType::ANY, DataType::ANY));
        let (a_in, a_out) = io(&graph, a);
        let (b_in, b_out) = io(&graph, b);
        connect(&mut graph, &mut notifier, a_out, b_in);
        connect(&mut graph, &mut notifier, b_out, a_in);

        assert!(path_exists(&graph, a, b));
        assert!(path_exists(&graph, a, a));
        assert!(!path_exists(&graph, a, c));
    }

    #[test]
    fn test_existing_connection() {
        let (mut graph, mut notifier, a, b) = pair();
        let (_, a_out) = io(&graph, a);
        let b_in = graph.node(b).unwrap().inputs()[0].id;
        graph.port_mut(b_in).unwrap().single = false;

        assert_eq!(connect(&mut graph, &mut notifier, a_out, b_in), ConnectionStatus::Connected);
        assert_eq!(connect(&mut graph, &mut notifier, a_out, b_in), ConnectionStatus::Exists);
    }

    #[test]
    fn test_type_rule_only_checked_from_input_side() {
        let mut graph = Graph::default();
        let a = graph.add_node(typed_node("a", DataType::ANY, DataType::new("string")));
        let b = graph.add_node(typed_node("b", DataType::new("float"), DataType::ANY));
        let (_, a_out) = io(&graph, a);
        let (b_in, _) = io(&graph, b);
        let mut notifier = Notifier::new();

        assert_eq!(can_connect(&graph, a_out, b_in), ConnectionStatus::Connected);
        assert_eq!(can_connect(&graph, b_in, a_out), ConnectionStatus::ErrorType);
        assert_eq!(connect(&mut graph, &mut notifier, a_out, b_in), ConnectionStatus::ErrorType);
    }

    #[test]
    fn test_subtype_and_untyped_rules() {
        let mut graph = Graph::default();
        graph.types.declare_subtype(DataType::new("int"), DataType::new("number"));
        let src = graph.add_node(typed_node("src", DataType::ANY, DataType::new("int")));
        let wild = graph.add_node(typed_node("wild", DataType::ANY, DataType::ANY));
        let dst = graph.add_node(typed_node("dst", DataType::new("number"), DataType::ANY));
        let (_, src_out) = io(&graph, src);
        let (_, wild_out) = io(&graph, wild);
        let (dst_in, _) = io(&graph, dst);

        assert_eq!(can_connect(&graph, dst_in, src_out), ConnectionStatus::Connected);
        assert_eq!(can_connect(&graph, dst_in, wild_out), ConnectionStatus::ErrorType);
        graph.rules.allow_untyped_to_typed = true;
        assert_eq!(can_connect(&graph, dst_in, wild_out), ConnectionStatus::Connected);
    }

    struct VetoAll;

    impl EditorObserver for VetoAll {
        fn connecting(&mut self, scope: HookScope, _request: &ConnectionRequest) -> Proceed {
            Proceed {
                proceed: scope != HookScope::Editor,
            }
        }

        fn disconnecting(&mut self, _scope: HookScope, _request: &ConnectionRequest) -> Proceed {
            Proceed::NO
        }
    }

    #[test]
    fn test_veto_reports_reject() {
        let (mut graph, mut notifier, a, b) = pair();
        let (_, a_out) = io(&graph, a);
        let (b_in, _) = io(&graph, b);
        notifier.subscribe(Box::new(VetoAll));

        assert_eq!(connect(&mut graph, &mut notifier, a_out, b_in), ConnectionStatus::Reject);
        assert_eq!(graph.connection_count(), 0);
        assert_eq!(
            notifier.drain(),
            vec![EditorEvent::OptionConnected {
                initiator: a_out,
                target: b_in,
                status: ConnectionStatus::Reject,
            }]
        );
    }

    #[test]
    fn test_disconnect_locked_only_when_both_locked() {
        let (mut graph, mut notifier, a, b) = pair();
        let (_, a_out) = io(&graph, a);
        let (b_in, _) = io(&graph, b);
        connect(&mut graph, &mut notifier, a_out, b_in);

        graph.node_mut(a).unwrap().lock_option = true;
        graph.node_mut(b).unwrap().lock_option = true;
        assert_eq!(disconnect(&mut graph, &mut notifier, a_out, b_in), ConnectionStatus::Locked);

        graph.node_mut(b).unwrap().lock_option = false;
        assert_eq!(disconnect(&mut graph, &mut notifier, b_in, a_out), ConnectionStatus::Disconnected);
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_disconnect_all_clears_both_sides() {
        let (mut graph, mut notifier, a, _) = pair();
        let (_, a_out) = io(&graph, a);
        let mut inputs = Vec::new();
        for i in 0..3 {
            let id = graph.add_node(typed_node(&format!("t{i}"), DataType::ANY, DataType::ANY));
            let (input, _) = io(&graph, id);
            connect(&mut graph, &mut notifier, a_out, input);
            inputs.push(input);
        }
        assert_eq!(graph.port(a_out).unwrap().connection_count(), 3);

        assert_eq!(disconnect_all(&mut graph, &mut notifier, a_out), 3);
        assert_eq!(graph.port(a_out).unwrap().connection_count(), 0);
        for input in inputs {
            assert_eq!(graph.port(input).unwrap().connection_count(), 0);
        }
    }

    fn passthrough_node(graph: &mut Graph) -> (NodeId, PortId, PortId) {
        let (input, output) = Port::passthrough_pair("in", "out", true);
        let (in_id, out_id) = (input.id, output.id);
        let id = graph.add_node(Node::new("pass").with_input(input).with_output(output));
        (id, in_id, out_id)
    }

    #[test]
    fn test_passthrough_narrows_and_widens() {
        let mut graph = Graph::default();
        let mut notifier = Notifier::new();
        let src = graph.add_node(typed_node("src", DataType::ANY, DataType::new("int")));
        let (_, src_out) = io(&graph, src);
        let (_, pass_in, pass_out) = passthrough_node(&mut graph);

        assert_eq!(connect(&mut graph, &mut notifier, src_out, pass_in), ConnectionStatus::Connected);
        assert_eq!(graph.port(pass_in).unwrap().data_type, DataType::new("int"));
        assert_eq!(graph.port(pass_out).unwrap().data_type, DataType::new("int"));

        disconnect(&mut graph, &mut notifier, src_out, pass_in);
        assert!(graph.port(pass_in).unwrap().data_type.is_wildcard());
        assert!(graph.port(pass_out).unwrap().data_type.is_wildcard());
    }

    #[test]
    fn test_passthrough_restores_wildcard_on_failure() {
        let mut graph = Graph::default();
        let mut notifier = Notifier::new();
        let (pass, _, pass_out) = passthrough_node(&mut graph);
        let dst = graph.add_node(typed_node("dst", DataType::new("float"), DataType::ANY));
        let (dst_in, _) = io(&graph, dst);
        graph.node_mut(dst).unwrap().lock_option = true;

        assert_eq!(connect(&mut graph, &mut notifier, pass_out, dst_in), ConnectionStatus::Locked);
        assert!(graph.port(pass_out).unwrap().data_type.is_wildcard());
        assert!(graph.node(pass).is_some());
    }

    #[test]
    fn test_passthrough_rejects_wildcard_peer() {
        let mut graph = Graph::default();
        let (_, pass_in, _) = passthrough_node(&mut graph);
        let src = graph.add_node(typed_node("src", DataType::ANY, DataType::ANY));
        let (_, src_out) = io(&graph, src);

        assert_eq!(can_connect(&graph, pass_in, src_out), ConnectionStatus::ErrorType);
    }

    #[test]
    fn test_passthrough_checks_loops_regardless_of_rules() {
        let mut graph = Graph::default();
        graph.rules.allow_loops = true;
        graph.rules.allow_untyped_to_typed = true;
        let mut notifier = Notifier::new();
        let (input, output) = Port::passthrough_pair("in", "out", true);
        let extra = Port::input("extra", DataType::new("int"));
        let (pass_out, extra_id) = (output.id, extra.id);
        graph.add_node(Node::new("pass").with_input(input).with_input(extra).with_output(output));
        let other = graph.add_node(typed_node("o", DataType::new("int"), DataType::new("int")));
        let (other_in, other_out) = io(&graph, other);

        assert_eq!(connect(&mut graph, &mut notifier, other_out, extra_id), ConnectionStatus::Connected);
        assert_eq!(connect(&mut graph, &mut notifier, other_in, pass_out), ConnectionStatus::Loop);
        assert!(graph.port(pass_out).unwrap().data_type.is_wildcard());
    }

    #[test]
    fn test_detach_node_ignores_locks() {
        let (mut graph, mut notifier, a, b) = pair();
        let (_, a_out) = io(&graph, a);
        let (b_in, _) = io(&graph, b);
        connect(&mut graph, &mut notifier, a_out, b_in);
        graph.node_mut(a).unwrap().lock_option = true;
        graph.node_mut(b).unwrap().lock_option = true;

        detach_node(&mut graph, &mut notifier, a);
        assert_eq!(graph.connection_count(), 0);
        assert_eq!(graph.port(b_in).unwrap().connection_count(), 0);
    }
}
