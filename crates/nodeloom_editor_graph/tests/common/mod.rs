// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use nodeloom_editor_graph::events::ConnectionRequest;
use nodeloom_editor_graph::{
    DataType, EditorConfig, EditorEvent, EditorObserver, HookScope, Node, NodeEditor, NodeFactory, NodeId,
    NodeRegistry, Port, PortId, Proceed, RegistryError,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Type id of the plain one-in one-out test node
pub const IO_TYPE: &str = "test.io";
/// Type id of the node whose factory validates a stored property
pub const COUNTER_TYPE: &str = "test.counter";

/// A 100x60 node with one wildcard input and one wildcard output
pub fn io_node(title: &str) -> Node {
    Node::new(title)
        .with_size(100.0, 60.0)
        .with_input(Port::input("in", DataType::ANY))
        .with_output(Port::output("out", DataType::ANY))
}

/// Factory that insists on a `Count` property and bumps it on load completion
pub struct CounterFactory;

impl NodeFactory for CounterFactory {
    fn create(&self) -> Node {
        io_node("Counter")
    }

    fn load(&self, node: &mut Node) -> Result<(), RegistryError> {
        let count = node
            .properties
            .get::<u32>("Count")
            .map_err(|source| RegistryError::Property {
                key: "Count".into(),
                source,
            })?;
        match count {
            Some(_) => Ok(()),
            None => Err(RegistryError::Custom("missing Count".into())),
        }
    }

    fn load_completed(&self, node: &mut Node) {
        node.active_control = Some(0);
    }
}

/// Registry with the test node types
pub fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(IO_TYPE, || io_node("IO"));
    registry.register(COUNTER_TYPE, CounterFactory);
    registry
}

/// Editor with the test registry and default config
pub fn editor() -> NodeEditor {
    NodeEditor::new(EditorConfig::default()).with_registry(registry())
}

/// Add an IO node at a canvas position
pub fn place(editor: &mut NodeEditor, title: &str, x: f32, y: f32) -> NodeId {
    editor.add_node(io_node(title).with_position(x, y))
}

/// First input and first output of a node
pub fn ports(editor: &NodeEditor, node: NodeId) -> (PortId, PortId) {
    let node = editor.graph().node(node).expect("node exists");
    (node.inputs()[0].id, node.outputs()[0].id)
}

/// Records every event it is notified of
#[derive(Default, Clone)]
pub struct Recorder {
    pub events: Rc<RefCell<Vec<EditorEvent>>>,
}

impl EditorObserver for Recorder {
    fn notify(&mut self, event: &EditorEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Vetoes any connect that touches the given port
pub struct Gatekeeper {
    pub guarded: PortId,
    pub asked: Rc<RefCell<usize>>,
}

impl EditorObserver for Gatekeeper {
    fn connecting(&mut self, scope: HookScope, _request: &ConnectionRequest) -> Proceed {
        *self.asked.borrow_mut() += 1;
        if scope == HookScope::Port(self.guarded) {
            Proceed::NO
        } else {
            Proceed::YES
        }
    }
}
