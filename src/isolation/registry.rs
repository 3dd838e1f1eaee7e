//! Per-activation record of redirected stylesheet elements.

use crate::dom::NodeId;

/// Ordered list of `<style>`/`<link>` elements redirected for one application.
///
/// Entries keep append-call order and are never de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRegistry {
  entries: Vec<NodeId>,
}

impl ResourceRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, element: NodeId) {
    self.entries.push(element);
  }

  pub fn entries(&self) -> &[NodeId] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Return every entry; a mounting drain also clears the registry.
  pub fn drain(&mut self, mounting: bool) -> Vec<NodeId> {
    if mounting {
      std::mem::take(&mut self.entries)
    } else {
      self.entries.clone()
    }
  }
}
