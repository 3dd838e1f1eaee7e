//! Live document tree.
//!
//! Nodes live in an arena owned by [`DomTree`] and are addressed by
//! [`NodeId`]. A `NodeId` is only meaningful for the tree that minted it;
//! passing an id from another tree panics on lookup, like indexing a `Vec`
//! out of bounds.
//!
//! The tree reproduces the one piece of browser behavior the isolation core
//! depends on: a `<style>` element owns a [`CssStyleSheet`] only while it is
//! connected to the document. Connecting builds the sheet from the element's
//! text; disconnecting throws it away, together with every rule that was
//! inserted through the CSSOM.

use crate::css::CssStyleSheet;
use crate::error::{DomError, Error, ParseError, Result};
use crate::events::{EventHandler, EventKind, EventTargetData};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde::Serialize;
use std::fmt;
use std::io;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Identity of a node inside a [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
  pub fn index(self) -> usize {
    self.0
  }

  pub(crate) fn from_index(index: usize) -> Self {
    Self(index)
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNodeType {
  Document,
  Element {
    tag_name: String,
    namespace: String,
    attributes: Vec<(String, String)>,
  },
  Text {
    content: String,
  },
  Comment {
    content: String,
  },
}

#[derive(Debug)]
struct NodeRecord {
  node_type: DomNodeType,
  parent: Option<NodeId>,
  children: Vec<NodeId>,
  sheet: Option<CssStyleSheet>,
  events: EventTargetData,
}

impl NodeRecord {
  fn new(node_type: DomNodeType) -> Self {
    Self {
      node_type,
      parent: None,
      children: Vec::new(),
      sheet: None,
      events: EventTargetData::default(),
    }
  }
}

#[derive(Debug)]
pub struct DomTree {
  nodes: Vec<NodeRecord>,
  document: NodeId,
  head: NodeId,
  body: NodeId,
}

impl Default for DomTree {
  fn default() -> Self {
    Self::new()
  }
}

impl DomTree {
  /// Create `#document > html > (head, body)`.
  pub fn new() -> Self {
    let mut tree = Self::with_document_only();
    let html = tree.create_element("html");
    let head = tree.create_element("head");
    let body = tree.create_element("body");
    tree.link(tree.document, html);
    tree.link(html, head);
    tree.link(html, body);
    tree.head = head;
    tree.body = body;
    tree
  }

  fn with_document_only() -> Self {
    let root = NodeId(0);
    Self {
      nodes: vec![NodeRecord::new(DomNodeType::Document)],
      document: root,
      head: root,
      body: root,
    }
  }

  pub fn document(&self) -> NodeId {
    self.document
  }

  pub fn head(&self) -> NodeId {
    self.head
  }

  pub fn body(&self) -> NodeId {
    self.body
  }

  /// Number of nodes ever created in this tree, attached or not.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  fn record(&self, id: NodeId) -> &NodeRecord {
    &self.nodes[id.0]
  }

  fn record_mut(&mut self, id: NodeId) -> &mut NodeRecord {
    &mut self.nodes[id.0]
  }

  fn alloc(&mut self, node_type: DomNodeType) -> NodeId {
    let id = NodeId(self.nodes.len());
    self.nodes.push(NodeRecord::new(node_type));
    id
  }

  /// Attach without validation or sheet bookkeeping. Construction only.
  fn link(&mut self, parent: NodeId, child: NodeId) {
    self.record_mut(child).parent = Some(parent);
    self.record_mut(parent).children.push(child);
  }

  // --------------------------------------------------------------------------
  // Node creation and inspection
  // --------------------------------------------------------------------------

  pub fn create_element(&mut self, tag_name: &str) -> NodeId {
    self.alloc(DomNodeType::Element {
      tag_name: tag_name.to_ascii_lowercase(),
      namespace: String::new(),
      attributes: Vec::new(),
    })
  }

  pub fn create_text_node(&mut self, content: &str) -> NodeId {
    self.alloc(DomNodeType::Text {
      content: content.to_string(),
    })
  }

  pub fn create_comment(&mut self, content: &str) -> NodeId {
    self.alloc(DomNodeType::Comment {
      content: content.to_string(),
    })
  }

  pub fn node_type(&self, id: NodeId) -> &DomNodeType {
    &self.record(id).node_type
  }

  pub fn tag_name(&self, id: NodeId) -> Option<&str> {
    match &self.record(id).node_type {
      DomNodeType::Element { tag_name, .. } => Some(tag_name.as_str()),
      _ => None,
    }
  }

  /// True for HTML elements whose local name matches `tag` (ASCII case-insensitive).
  pub fn is_element_named(&self, id: NodeId, tag: &str) -> bool {
    match &self.record(id).node_type {
      DomNodeType::Element {
        tag_name,
        namespace,
        ..
      } => {
        (namespace.is_empty() || namespace == HTML_NAMESPACE) && tag_name.eq_ignore_ascii_case(tag)
      }
      _ => false,
    }
  }

  pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
    match &self.record(id).node_type {
      DomNodeType::Element { attributes, .. } => attributes
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str()),
      _ => None,
    }
  }

  /// Set an attribute on an element; ignored for other node kinds.
  pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
    if let DomNodeType::Element { attributes, .. } = &mut self.record_mut(id).node_type {
      match attributes
        .iter_mut()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
      {
        Some((_, existing)) => *existing = value.to_string(),
        None => attributes.push((name.to_ascii_lowercase(), value.to_string())),
      }
    }
  }

  pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
    if let DomNodeType::Element { attributes, .. } = &mut self.record_mut(id).node_type {
      attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.record(id).parent
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    &self.record(id).children
  }

  /// Element children only, in order.
  pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
    self
      .children(id)
      .iter()
      .copied()
      .filter(|child| matches!(self.node_type(*child), DomNodeType::Element { .. }))
      .collect()
  }

  /// `Node.textContent`: own content for text/comment nodes, concatenated
  /// descendant text for elements and the document.
  pub fn text_content(&self, id: NodeId) -> String {
    match &self.record(id).node_type {
      DomNodeType::Text { content } | DomNodeType::Comment { content } => content.clone(),
      DomNodeType::Element { .. } | DomNodeType::Document => {
        let mut out = String::new();
        for node in self.preorder(id) {
          if let DomNodeType::Text { content } = &self.record(node).node_type {
            out.push_str(content);
          }
        }
        out
      }
    }
  }

  /// Replace the children of `id` with a single text node (none for empty text).
  ///
  /// A connected `<style>` element rebuilds its sheet from the new text.
  pub fn set_text_content(&mut self, id: NodeId, text: &str) {
    let is_leaf = match &mut self.record_mut(id).node_type {
      DomNodeType::Text { content } | DomNodeType::Comment { content } => {
        *content = text.to_string();
        true
      }
      DomNodeType::Document => return,
      DomNodeType::Element { .. } => false,
    };
    if is_leaf {
      if let Some(parent) = self.parent(id) {
        self.refresh_style_sheet(parent);
      }
      return;
    }

    let old_children = std::mem::take(&mut self.record_mut(id).children);
    let connected = self.is_connected(id);
    for child in old_children {
      self.record_mut(child).parent = None;
      if connected {
        self.disconnect_subtree(child);
      }
    }
    if !text.is_empty() {
      let text_node = self.create_text_node(text);
      self.link(id, text_node);
    }
    self.refresh_style_sheet(id);
  }

  // --------------------------------------------------------------------------
  // Tree queries
  // --------------------------------------------------------------------------

  /// Inclusive descendant test, like `Node.contains`.
  pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
      if id == ancestor {
        return true;
      }
      current = self.parent(id);
    }
    false
  }

  pub fn is_connected(&self, id: NodeId) -> bool {
    self.contains(self.document, id)
  }

  /// Pre-order traversal of the subtree rooted at `root`, root included.
  pub fn preorder(&self, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
      out.push(id);
      stack.extend(self.children(id).iter().rev().copied());
    }
    out
  }

  /// First connected element, in tree order, whose `id` attribute equals `value`.
  pub fn get_element_by_id(&self, value: &str) -> Option<NodeId> {
    self
      .preorder(self.document)
      .into_iter()
      .find(|id| self.get_attribute(*id, "id") == Some(value))
  }

  /// Live stylesheet of a connected `<style>` element.
  pub fn sheet(&self, id: NodeId) -> Option<&CssStyleSheet> {
    self.record(id).sheet.as_ref()
  }

  pub fn sheet_mut(&mut self, id: NodeId) -> Option<&mut CssStyleSheet> {
    self.record_mut(id).sheet.as_mut()
  }

  // --------------------------------------------------------------------------
  // Native mutation primitives
  // --------------------------------------------------------------------------

  /// Append `child` as the last child of `parent`, moving it from any previous parent.
  pub fn append_child(
    &mut self,
    parent: NodeId,
    child: NodeId,
  ) -> std::result::Result<NodeId, DomError> {
    if matches!(
      self.node_type(parent),
      DomNodeType::Text { .. } | DomNodeType::Comment { .. }
    ) {
      return Err(DomError::HierarchyRequest {
        parent: parent.0,
        child: child.0,
        reason: "parent cannot have children".to_string(),
      });
    }
    if matches!(self.node_type(child), DomNodeType::Document) {
      return Err(DomError::HierarchyRequest {
        parent: parent.0,
        child: child.0,
        reason: "a document cannot be inserted".to_string(),
      });
    }
    if self.contains(child, parent) {
      return Err(DomError::HierarchyRequest {
        parent: parent.0,
        child: child.0,
        reason: "the new child is an ancestor of the parent".to_string(),
      });
    }

    if let Some(old_parent) = self.parent(child) {
      self.detach(old_parent, child);
    }
    self.link(parent, child);
    if self.is_connected(parent) {
      self.connect_subtree(child);
    }
    self.refresh_style_sheet(parent);
    Ok(child)
  }

  /// Remove `child` from `parent`; fails when `child` is not a child of `parent`.
  pub fn remove_child(
    &mut self,
    parent: NodeId,
    child: NodeId,
  ) -> std::result::Result<NodeId, DomError> {
    if self.parent(child) != Some(parent) {
      return Err(DomError::NotFound {
        parent: parent.0,
        child: child.0,
      });
    }
    self.detach(parent, child);
    Ok(child)
  }

  fn detach(&mut self, parent: NodeId, child: NodeId) {
    let was_connected = self.is_connected(child);
    let siblings = &mut self.record_mut(parent).children;
    if let Some(pos) = siblings.iter().position(|id| *id == child) {
      siblings.remove(pos);
    }
    self.record_mut(child).parent = None;
    if was_connected {
      self.disconnect_subtree(child);
    }
    self.refresh_style_sheet(parent);
  }

  fn connect_subtree(&mut self, root: NodeId) {
    for id in self.preorder(root) {
      if self.is_element_named(id, "style") {
        let text = self.text_content(id);
        self.record_mut(id).sheet = Some(CssStyleSheet::from_text(&text));
      }
    }
  }

  fn disconnect_subtree(&mut self, root: NodeId) {
    for id in self.preorder(root) {
      self.record_mut(id).sheet = None;
    }
  }

  fn refresh_style_sheet(&mut self, id: NodeId) {
    if self.is_element_named(id, "style") && self.is_connected(id) {
      let text = self.text_content(id);
      self.record_mut(id).sheet = Some(CssStyleSheet::from_text(&text));
    }
  }

  // --------------------------------------------------------------------------
  // Events
  // --------------------------------------------------------------------------

  /// Set or clear the `onload`/`onerror` handler slot.
  pub fn set_event_handler(&mut self, id: NodeId, kind: EventKind, handler: Option<EventHandler>) {
    self.record_mut(id).events.set_handler(kind, handler);
  }

  pub fn event_handler(&self, id: NodeId, kind: EventKind) -> Option<EventHandler> {
    self.record(id).events.handler(kind)
  }

  pub fn add_event_listener(&mut self, id: NodeId, kind: EventKind, handler: EventHandler) {
    self.record_mut(id).events.add_listener(kind, handler);
  }

  pub(crate) fn dispatch_list(&self, id: NodeId, kind: EventKind) -> Vec<EventHandler> {
    self.record(id).events.dispatch_list(kind)
  }
}

// ============================================================================
// HTML bootstrap
// ============================================================================

/// Parse an HTML document into a live tree.
///
/// Scripts in the markup are not executed and `<style>` elements get their
/// sheets from their text, exactly as if they had been appended one by one.
pub fn parse_html(html: &str) -> Result<DomTree> {
  let opts = ParseOpts {
    tree_builder: TreeBuilderOpts {
      scripting_enabled: false,
      ..Default::default()
    },
    ..Default::default()
  };

  let mut reader = io::Cursor::new(html.as_bytes());
  let dom = parse_document(RcDom::default(), opts)
    .from_utf8()
    .read_from(&mut reader)
    .map_err(|e| {
      Error::Parse(ParseError::InvalidHtml {
        message: format!("Failed to parse HTML: {}", e),
      })
    })?;

  let mut tree = DomTree::with_document_only();
  let root = tree.document;
  convert_children(&dom.document, root, &mut tree);

  let html_element = tree
    .child_elements(root)
    .into_iter()
    .find(|id| tree.is_element_named(*id, "html"));
  let (head, body) = match html_element {
    Some(html_element) => {
      let children = tree.child_elements(html_element);
      (
        children
          .iter()
          .copied()
          .find(|id| tree.is_element_named(*id, "head")),
        children
          .iter()
          .copied()
          .find(|id| tree.is_element_named(*id, "body")),
      )
    }
    None => (None, None),
  };
  let (Some(head), Some(body)) = (head, body) else {
    return Err(Error::Parse(ParseError::InvalidHtml {
      message: "document has no head or body element".to_string(),
    }));
  };
  tree.head = head;
  tree.body = body;
  tree.connect_subtree(root);
  Ok(tree)
}

fn convert_children(handle: &Handle, parent: NodeId, tree: &mut DomTree) {
  for child in handle.children.borrow().iter() {
    let node_type = match &child.data {
      NodeData::Element { name, attrs, .. } => {
        let namespace = if name.ns.as_ref() == HTML_NAMESPACE {
          String::new()
        } else {
          name.ns.to_string()
        };
        let attributes = attrs
          .borrow()
          .iter()
          .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
          .collect();
        DomNodeType::Element {
          tag_name: name.local.to_string(),
          namespace,
          attributes,
        }
      }
      NodeData::Text { contents } => DomNodeType::Text {
        content: contents.borrow().to_string(),
      },
      NodeData::Comment { contents } => DomNodeType::Comment {
        content: contents.to_string(),
      },
      _ => continue,
    };
    let id = tree.alloc(node_type);
    tree.link(parent, id);
    convert_children(child, id, tree);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn style_with_text(tree: &mut DomTree, css: &str) -> NodeId {
    let style = tree.create_element("style");
    let text = tree.create_text_node(css);
    tree.append_child(style, text).unwrap();
    style
  }

  #[test]
  fn new_tree_has_head_and_body() {
    let tree = DomTree::new();
    assert!(tree.is_element_named(tree.head(), "head"));
    assert!(tree.is_element_named(tree.body(), "body"));
    assert!(tree.is_connected(tree.head()));
    assert_eq!(tree.parent(tree.head()), tree.parent(tree.body()));
  }

  #[test]
  fn append_moves_node_between_parents() {
    let mut tree = DomTree::new();
    let div = tree.create_element("DIV");
    assert_eq!(tree.tag_name(div), Some("div"));
    let head = tree.head();
    let body = tree.body();
    tree.append_child(head, div).unwrap();
    tree.append_child(body, div).unwrap();
    assert!(tree.children(head).is_empty());
    assert_eq!(tree.children(body), &[div]);
    assert_eq!(tree.parent(div), Some(body));
  }

  #[test]
  fn append_rejects_cycles_and_leaf_parents() {
    let mut tree = DomTree::new();
    let outer = tree.create_element("div");
    let inner = tree.create_element("span");
    tree.append_child(outer, inner).unwrap();
    assert!(matches!(
      tree.append_child(inner, outer),
      Err(DomError::HierarchyRequest { .. })
    ));
    assert!(matches!(
      tree.append_child(outer, outer),
      Err(DomError::HierarchyRequest { .. })
    ));
    let text = tree.create_text_node("x");
    assert!(matches!(
      tree.append_child(text, inner),
      Err(DomError::HierarchyRequest { .. })
    ));
  }

  #[test]
  fn remove_child_requires_direct_child() {
    let mut tree = DomTree::new();
    let body = tree.body();
    let div = tree.create_element("div");
    let span = tree.create_element("span");
    tree.append_child(body, div).unwrap();
    tree.append_child(div, span).unwrap();
    assert_eq!(
      tree.remove_child(body, span),
      Err(DomError::NotFound {
        parent: body.index(),
        child: span.index()
      })
    );
    assert_eq!(tree.remove_child(div, span), Ok(span));
    assert_eq!(tree.parent(span), None);
  }

  #[test]
  fn style_sheet_follows_connection_state() {
    let mut tree = DomTree::new();
    let style = style_with_text(&mut tree, ".a { color: red }");
    assert!(tree.sheet(style).is_none());

    let head = tree.head();
    tree.append_child(head, style).unwrap();
    assert_eq!(tree.sheet(style).map(CssStyleSheet::len), Some(1));

    tree.remove_child(head, style).unwrap();
    assert!(tree.sheet(style).is_none());
  }

  #[test]
  fn inserted_rules_are_lost_across_detach() {
    let mut tree = DomTree::new();
    let style = tree.create_element("style");
    let head = tree.head();
    tree.append_child(head, style).unwrap();
    tree
      .sheet_mut(style)
      .unwrap()
      .append_rule(".generated { top: 0 }")
      .unwrap();
    assert_eq!(tree.sheet(style).unwrap().len(), 1);

    tree.remove_child(head, style).unwrap();
    tree.append_child(head, style).unwrap();
    assert!(tree.sheet(style).unwrap().is_empty());
  }

  #[test]
  fn set_text_content_rebuilds_connected_sheet() {
    let mut tree = DomTree::new();
    let style = style_with_text(&mut tree, ".a {}");
    let head = tree.head();
    tree.append_child(head, style).unwrap();
    tree.set_text_content(style, ".b {} .c {}");
    assert_eq!(tree.text_content(style), ".b {} .c {}");
    assert_eq!(tree.sheet(style).unwrap().len(), 2);
    tree.set_text_content(style, "");
    assert!(tree.children(style).is_empty());
    assert!(tree.sheet(style).unwrap().is_empty());
  }

  #[test]
  fn child_text_changes_rebuild_connected_sheet() {
    let mut tree = DomTree::new();
    let head = tree.head();
    let style = tree.create_element("style");
    tree.append_child(head, style).unwrap();
    assert!(tree.sheet(style).unwrap().is_empty());

    let first = tree.create_text_node(".a {}");
    tree.append_child(style, first).unwrap();
    assert_eq!(tree.sheet(style).unwrap().len(), 1);
    let second = tree.create_text_node(".b {}");
    tree.append_child(style, second).unwrap();
    assert_eq!(tree.sheet(style).unwrap().len(), 2);

    tree.remove_child(style, first).unwrap();
    assert_eq!(tree.sheet(style).unwrap().css_rules(), [".b {}".to_string()]);

    // Moving the text out of the style rebuilds it as well.
    let body = tree.body();
    tree.append_child(body, second).unwrap();
    assert!(tree.sheet(style).unwrap().is_empty());
  }

  #[test]
  fn attributes_are_case_insensitive() {
    let mut tree = DomTree::new();
    let link = tree.create_element("link");
    tree.set_attribute(link, "REL", "stylesheet");
    assert_eq!(tree.get_attribute(link, "rel"), Some("stylesheet"));
    tree.set_attribute(link, "rel", "preload");
    assert_eq!(tree.get_attribute(link, "Rel"), Some("preload"));
    tree.remove_attribute(link, "rel");
    assert_eq!(tree.get_attribute(link, "rel"), None);
  }

  #[test]
  fn get_element_by_id_ignores_detached_nodes() {
    let mut tree = DomTree::new();
    let detached = tree.create_element("div");
    tree.set_attribute(detached, "id", "app");
    assert_eq!(tree.get_element_by_id("app"), None);
    let body = tree.body();
    tree.append_child(body, detached).unwrap();
    assert_eq!(tree.get_element_by_id("app"), Some(detached));
  }

  #[test]
  fn parse_html_builds_sheets_and_keeps_comments() {
    let tree = parse_html(
      "<!doctype html><html><head><style>.x{color:red}.y{top:0}</style></head>\
       <body><!-- mount --><div id=\"root\"></div></body></html>",
    )
    .unwrap();
    let head = tree.head();
    let style = tree.child_elements(head)[0];
    assert!(tree.is_element_named(style, "style"));
    assert_eq!(tree.sheet(style).unwrap().len(), 2);

    let body = tree.body();
    assert!(matches!(
      tree.node_type(tree.children(body)[0]),
      DomNodeType::Comment { content } if content == " mount "
    ));
    assert!(tree.get_element_by_id("root").is_some());
  }

  #[test]
  fn parse_html_synthesizes_missing_sections() {
    let tree = parse_html("<p>hello</p>").unwrap();
    assert_eq!(tree.text_content(tree.body()), "hello");
    assert!(tree.children(tree.head()).is_empty());
  }
}
