use crate::error::PanoramaError;
use crate::node::NodeId;
use std::cell::RefCell;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    LoadStart,
    LoadEnd,
    Error { message: String },
}

impl NodeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NodeEvent::LoadStart => "load-start",
            NodeEvent::LoadEnd => "load-end",
            NodeEvent::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        NodeEvent::Error { message: message.into() }
    }
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeEvent::Error { message } => write!(f, "error {message}"),
            other => f.write_str(other.name()),
        }
    }
}

impl From<PanoramaError> for NodeEvent {
    fn from(err: PanoramaError) -> Self {
        NodeEvent::error(err.to_string())
    }
}

/// Observer side of the declarative layer; receives lifecycle signals keyed by node.
pub trait EventChannel {
    fn emit(&self, node: NodeId, event: NodeEvent);
}

#[derive(Default)]
pub struct EventBus {
    events: RefCell<Vec<(NodeId, NodeEvent)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<(NodeId, NodeEvent)> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn names_for(&self, node: NodeId) -> Vec<&'static str> {
        self.events.borrow().iter().filter(|(id, _)| *id == node).map(|(_, event)| event.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventChannel for EventBus {
    fn emit(&self, node: NodeId, event: NodeEvent) {
        log::debug!("[events] node={node} {event}");
        self.events.borrow_mut().push((node, event));
    }
}
