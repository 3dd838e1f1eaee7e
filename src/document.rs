//! Shared document handle.
//!
//! [`Document`] is the single-threaded, reference-counted view of one page:
//! the live [`DomTree`], the current location, and the two head mutation
//! entry points that every script on the page goes through. Cloning a
//! `Document` clones the handle, not the page.

use crate::dom::{self, DomTree, NodeId};
use crate::error::{Error, ParseError, Result};
use crate::events::Event;
use crate::isolation::entry_points::HeadMutationPoints;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use url::Url;

#[derive(Clone)]
pub struct Document {
  inner: Rc<DocumentInner>,
}

struct DocumentInner {
  tree: RefCell<DomTree>,
  location: RefCell<Url>,
  head_points: HeadMutationPoints,
}

impl Document {
  /// Blank document (`html > head, body`) at `location`.
  pub fn new(location: &str) -> Result<Self> {
    Ok(Self::from_tree(DomTree::new(), parse_location(location)?))
  }

  /// Document built from HTML markup, located at `location`.
  pub fn parse_html(html: &str, location: &str) -> Result<Self> {
    let location = parse_location(location)?;
    Ok(Self::from_tree(dom::parse_html(html)?, location))
  }

  pub fn from_tree(tree: DomTree, location: Url) -> Self {
    Self {
      inner: Rc::new(DocumentInner {
        tree: RefCell::new(tree),
        location: RefCell::new(location),
        head_points: HeadMutationPoints::default(),
      }),
    }
  }

  /// Borrow the tree. Do not hold the borrow across entry-point calls.
  pub fn tree(&self) -> Ref<'_, DomTree> {
    self.inner.tree.borrow()
  }

  pub fn tree_mut(&self) -> RefMut<'_, DomTree> {
    self.inner.tree.borrow_mut()
  }

  pub fn head(&self) -> NodeId {
    self.tree().head()
  }

  pub fn body(&self) -> NodeId {
    self.tree().body()
  }

  pub fn create_element(&self, tag_name: &str) -> NodeId {
    self.tree_mut().create_element(tag_name)
  }

  pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
    self.tree().get_element_by_id(id)
  }

  pub fn location(&self) -> Url {
    self.inner.location.borrow().clone()
  }

  /// Navigate to `url`, resolved against the current location.
  pub fn set_location(&self, url: &str) -> Result<()> {
    let next = self
      .inner
      .location
      .borrow()
      .join(url)
      .map_err(|e| invalid_url(url, e))?;
    *self.inner.location.borrow_mut() = next;
    Ok(())
  }

  /// The head entry points and their installed interceptor frames.
  pub fn mutation_points(&self) -> &HeadMutationPoints {
    &self.inner.head_points
  }

  /// `document.head.appendChild(child)` as seen by page scripts.
  pub fn head_append_child(&self, child: NodeId) -> Result<NodeId> {
    self.inner.head_points.append_child(self, child)
  }

  /// `document.head.removeChild(child)` as seen by page scripts.
  pub fn head_remove_child(&self, child: NodeId) -> Result<NodeId> {
    self.inner.head_points.remove_child(self, child)
  }

  pub(crate) fn native_head_append(&self, child: NodeId) -> Result<NodeId> {
    let mut tree = self.tree_mut();
    let head = tree.head();
    Ok(tree.append_child(head, child)?)
  }

  pub(crate) fn native_head_remove(&self, child: NodeId) -> Result<NodeId> {
    let mut tree = self.tree_mut();
    let head = tree.head();
    Ok(tree.remove_child(head, child)?)
  }

  /// Deliver `event` to its target: handler slot first, then listeners.
  ///
  /// No tree borrow is held while handlers run, so they may mutate the page.
  pub fn dispatch_event(&self, event: Event) {
    let handlers = self.tree().dispatch_list(event.target, event.kind);
    for handler in handlers {
      handler(&event);
    }
  }

  /// Whether two handles refer to the same page.
  pub fn ptr_eq(&self, other: &Document) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }
}

impl fmt::Debug for Document {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Document")
      .field("location", &self.inner.location.borrow().as_str())
      .field("nodes", &self.inner.tree.borrow().len())
      .field("installed_frames", &self.inner.head_points.depth())
      .finish()
  }
}

fn parse_location(location: &str) -> Result<Url> {
  Url::parse(location).map_err(|e| invalid_url(location, e))
}

fn invalid_url(url: &str, err: url::ParseError) -> Error {
  Error::Parse(ParseError::InvalidUrl {
    url: url.to_string(),
    reason: err.to_string(),
  })
}
