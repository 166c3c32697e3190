// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor notifications and cancelable pre-commit hooks.
//!
//! Committed changes are broadcast as [`EditorEvent`]s to every subscribed
//! [`EditorObserver`] and queued for hosts that prefer polling. Connecting and
//! disconnecting go through a two-phase protocol: observers are asked first and
//! any of them can veto by answering [`Proceed::NO`].

use crate::editor::AlertLevel;
use crate::interaction::{KeyInput, PointerButton};
use crate::links::LinkKey;
use crate::node::NodeId;
use crate::port::PortId;
use crate::validation::ConnectionStatus;
use egui::{Pos2, Vec2};
use std::fmt;

/// Answer to a cancelable pre-commit hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proceed {
    /// Whether the operation may continue
    pub proceed: bool,
}

impl Proceed {
    /// Allow the operation
    pub const YES: Proceed = Proceed { proceed: true };
    /// Veto the operation
    pub const NO: Proceed = Proceed { proceed: false };
}

impl Default for Proceed {
    fn default() -> Self {
        Self::YES
    }
}

/// Who a hook is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    /// The editor as a whole
    Editor,
    /// One of the two ports involved
    Port(PortId),
}

/// A pending connect or disconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRequest {
    /// Port that started the operation
    pub initiator: PortId,
    /// The other port
    pub target: PortId,
}

/// Old and new position of one node after a drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMovement {
    /// Moved node
    pub node: NodeId,
    /// Position when the drag started
    pub old: Pos2,
    /// Position when the drag ended
    pub new: Pos2,
}

/// Phase of a pointer event routed to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePointerKind {
    /// Button pressed
    Down,
    /// Pointer moved
    Move,
    /// Button released
    Up,
}

/// Notifications emitted by the editor
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A node was added
    NodeAdded(NodeId),
    /// A node was removed
    NodeRemoved(NodeId),
    /// The active node changed
    ActiveChanged {
        /// Previously active node
        previous: Option<NodeId>,
        /// Newly active node
        current: Option<NodeId>,
    },
    /// The selection set changed
    SelectionChanged,
    /// The pointer entered or left a node
    HoverChanged {
        /// Node now under the pointer
        entered: Option<NodeId>,
        /// Node the pointer left
        left: Option<NodeId>,
    },
    /// The hovered link changed
    LinkHoverChanged(Option<LinkKey>),
    /// The canvas offset changed
    CanvasMoved {
        /// New offset
        offset: Vec2,
    },
    /// The canvas scale changed
    CanvasZoomed {
        /// New scale
        scale: f32,
    },
    /// A drag finished and moved at least one node
    NodesMoved(Vec<NodeMovement>),
    /// Outcome of a connect attempt
    OptionConnected {
        /// Port that started the connect
        initiator: PortId,
        /// The other port
        target: PortId,
        /// Result
        status: ConnectionStatus,
    },
    /// Outcome of a disconnect attempt
    OptionDisconnected {
        /// Port that started the disconnect
        initiator: PortId,
        /// The other port
        target: PortId,
        /// Result
        status: ConnectionStatus,
    },
    /// Pointer input routed to a node, in node-local coordinates
    NodePointer {
        /// Target node
        node: NodeId,
        /// Event phase
        kind: NodePointerKind,
        /// Position relative to the node's top-left corner
        local: Pos2,
        /// Button involved, if any
        button: Option<PointerButton>,
    },
    /// Key input routed to the active node
    NodeKey {
        /// Target node
        node: NodeId,
        /// Key input
        key: KeyInput,
    },
    /// A node's mark detail was opened
    MarkDetail {
        /// Marked node
        node: NodeId,
        /// Mark text
        text: String,
    },
    /// A node finished loading
    LoadCompleted(NodeId),
    /// An alert was shown
    Alert {
        /// Message
        text: String,
        /// Severity
        level: AlertLevel,
    },
}

/// Receives editor notifications and answers pre-commit hooks.
///
/// All methods have permissive defaults so observers only implement what they
/// care about.
pub trait EditorObserver {
    /// A connection is about to be made
    fn connecting(&mut self, _scope: HookScope, _request: &ConnectionRequest) -> Proceed {
        Proceed::YES
    }

    /// A connection is about to be removed
    fn disconnecting(&mut self, _scope: HookScope, _request: &ConnectionRequest) -> Proceed {
        Proceed::YES
    }

    /// Something changed
    fn notify(&mut self, _event: &EditorEvent) {}
}

/// Fan-out point for editor events
#[derive(Default)]
pub struct Notifier {
    observers: Vec<Box<dyn EditorObserver>>,
    queue: Vec<EditorEvent>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observers.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl Notifier {
    /// Create a notifier with no observers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer
    pub fn subscribe(&mut self, observer: Box<dyn EditorObserver>) {
        self.observers.push(observer);
    }

    /// Broadcast an event and queue it
    pub fn emit(&mut self, event: EditorEvent) {
        for observer in &mut self.observers {
            observer.notify(&event);
        }
        self.queue.push(event);
    }

    /// Ask every observer, for the editor and both ports, whether a connect may go ahead
    pub fn ask_connecting(&mut self, request: ConnectionRequest) -> Proceed {
        self.ask(request, |observer, scope, request| observer.connecting(scope, request))
    }

    /// Ask every observer, for the editor and both ports, whether a disconnect may go ahead
    pub fn ask_disconnecting(&mut self, request: ConnectionRequest) -> Proceed {
        self.ask(request, |observer, scope, request| observer.disconnecting(scope, request))
    }

    fn ask(
        &mut self,
        request: ConnectionRequest,
        mut hook: impl FnMut(&mut dyn EditorObserver, HookScope, &ConnectionRequest) -> Proceed,
    ) -> Proceed {
        let scopes = [
            HookScope::Editor,
            HookScope::Port(request.initiator),
            HookScope::Port(request.target),
        ];
        let mut proceed = true;
        for scope in scopes {
            for observer in &mut self.observers {
                proceed &= hook(observer.as_mut(), scope, &request).proceed;
            }
        }
        Proceed { proceed }
    }

    /// Take every queued event
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct VetoPort(PortId);

    impl EditorObserver for VetoPort {
        fn connecting(&mut self, scope: HookScope, _request: &ConnectionRequest) -> Proceed {
            if scope == HookScope::Port(self.0) {
                Proceed::NO
            } else {
                Proceed::YES
            }
        }
    }

    struct Recorder(Rc<RefCell<Vec<EditorEvent>>>);

    impl EditorObserver for Recorder {
        fn notify(&mut self, event: &EditorEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    #[test]
    fn test_veto_on_one_port_rejects() {
        let a = PortId::new();
        let b = PortId::new();
        let mut notifier = Notifier::new();
        notifier.subscribe(Box::new(VetoPort(b)));

        let request = ConnectionRequest { initiator: a, target: b };
        assert_eq!(notifier.ask_connecting(request), Proceed::NO);
        assert_eq!(notifier.ask_disconnecting(request), Proceed::YES);

        let other = ConnectionRequest { initiator: a, target: PortId::new() };
        assert_eq!(notifier.ask_connecting(other), Proceed::YES);
    }

    #[test]
    fn test_emit_reaches_observers_and_queue() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut notifier = Notifier::new();
        notifier.subscribe(Box::new(Recorder(seen.clone())));

        notifier.emit(EditorEvent::SelectionChanged);
        assert_eq!(seen.borrow().as_slice(), &[EditorEvent::SelectionChanged]);
        assert_eq!(notifier.drain(), vec![EditorEvent::SelectionChanged]);
        assert!(notifier.drain().is_empty());
    }
}
