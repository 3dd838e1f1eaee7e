//! Load/error events for resource elements.
//!
//! Only the two completion events a script or stylesheet element can receive
//! are modelled. Each element carries an `onload`/`onerror` handler slot and an
//! ordered listener list, mirroring the IDL attribute plus
//! `addEventListener` pair a browser exposes.

use crate::dom::NodeId;
use std::fmt;
use std::rc::Rc;

/// Kind of completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
  Load,
  Error,
}

impl EventKind {
  pub fn as_str(self) -> &'static str {
    match self {
      EventKind::Load => "load",
      EventKind::Error => "error",
    }
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A synthetic event delivered to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
  pub kind: EventKind,
  pub target: NodeId,
}

impl Event {
  pub fn new(kind: EventKind, target: NodeId) -> Self {
    Self { kind, target }
  }
}

/// Callback invoked with the delivered event.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// Per-node event state.
#[derive(Default, Clone)]
pub(crate) struct EventTargetData {
  onload: Option<EventHandler>,
  onerror: Option<EventHandler>,
  listeners: Vec<(EventKind, EventHandler)>,
}

impl EventTargetData {
  pub(crate) fn handler(&self, kind: EventKind) -> Option<EventHandler> {
    match kind {
      EventKind::Load => self.onload.clone(),
      EventKind::Error => self.onerror.clone(),
    }
  }

  pub(crate) fn set_handler(&mut self, kind: EventKind, handler: Option<EventHandler>) {
    match kind {
      EventKind::Load => self.onload = handler,
      EventKind::Error => self.onerror = handler,
    }
  }

  pub(crate) fn add_listener(&mut self, kind: EventKind, handler: EventHandler) {
    self.listeners.push((kind, handler));
  }

  /// Handlers to run for `kind`, slot first, then listeners in registration order.
  pub(crate) fn dispatch_list(&self, kind: EventKind) -> Vec<EventHandler> {
    self
      .handler(kind)
      .into_iter()
      .chain(
        self
          .listeners
          .iter()
          .filter(|(k, _)| *k == kind)
          .map(|(_, h)| h.clone()),
      )
      .collect()
  }
}

impl fmt::Debug for EventTargetData {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventTargetData")
      .field("onload", &self.onload.is_some())
      .field("onerror", &self.onerror.is_some())
      .field("listeners", &self.listeners.len())
      .finish()
  }
}
