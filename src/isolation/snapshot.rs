//! Style snapshot and restore across deactivation.
//!
//! A `<style>` element loses every rule added through `insert_rule` when it is
//! detached: reconnecting rebuilds its sheet from text content only. Elements
//! populated that way (CSS-in-JS libraries emit empty `<style>` tags and fill
//! them programmatically) have their live rules copied into a side table on
//! deactivation and replayed after re-append.

use crate::dom::{DomTree, NodeId};
use crate::error::{IsolationError, Result};
use log::debug;
use rustc_hash::FxHashMap;

/// Rule texts captured from one element, in sheet order.
pub type CachedRuleSet = Vec<String>;

#[derive(Debug, Clone, Default)]
pub struct StyleSnapshotEngine {
  app: String,
  cache: FxHashMap<NodeId, CachedRuleSet>,
}

impl StyleSnapshotEngine {
  pub fn new(app: impl Into<String>) -> Self {
    Self {
      app: app.into(),
      cache: FxHashMap::default(),
    }
  }

  /// Whether `element` is a style element whose rules live only in its sheet.
  ///
  /// True for an empty-text style element with a non-empty live sheet, or for
  /// one that already has a cached rule set.
  pub fn is_styled_components_like(&self, tree: &DomTree, element: NodeId) -> bool {
    if !tree.is_element_named(element, "style") {
      return false;
    }
    if self.cache.contains_key(&element) {
      return true;
    }
    tree.text_content(element).is_empty() && tree.sheet(element).is_some_and(|s| !s.is_empty())
  }

  /// Capture live rules for every qualifying entry; returns how many elements were captured.
  ///
  /// An existing cache entry is overwritten only when the element still has a sheet.
  pub fn snapshot(&mut self, tree: &DomTree, entries: &[NodeId]) -> usize {
    let mut captured = 0;
    for &element in entries {
      if !self.is_styled_components_like(tree, element) {
        continue;
      }
      if let Some(sheet) = tree.sheet(element) {
        debug!(
          "[isolation] {}: cached {} rule(s) of node {}",
          self.app,
          sheet.len(),
          element
        );
        self.cache.insert(element, sheet.css_rules().to_vec());
        captured += 1;
      }
    }
    captured
  }

  /// Re-append `element` under `container` and replay its cached rules.
  ///
  /// Uses the tree's own append, never the head entry points. Returns the
  /// number of replayed rules.
  pub fn restore(&self, tree: &mut DomTree, container: NodeId, element: NodeId) -> Result<usize> {
    tree.append_child(container, element)?;
    let Some(rules) = self.cache.get(&element) else {
      return Ok(0);
    };
    let sheet = tree
      .sheet_mut(element)
      .ok_or_else(|| IsolationError::SheetUnavailable {
        app: self.app.clone(),
        node: element.index(),
      })?;
    for rule in rules {
      sheet.append_rule(rule)?;
    }
    Ok(rules.len())
  }

  pub fn cached_rules(&self, element: NodeId) -> Option<&[String]> {
    self.cache.get(&element).map(Vec::as_slice)
  }

  /// Number of elements with a cached rule set.
  pub fn len(&self) -> usize {
    self.cache.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cache.is_empty()
  }
}
