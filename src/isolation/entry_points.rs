//! The two head mutation entry points and the stack of installed strategies.
//!
//! Instead of overwriting a shared prototype method, each mounted
//! application pushes a frame holding its [`HeadMutationStrategy`]. A call
//! walks the frames innermost-first; the first strategy that handles the
//! call wins, and when every frame declines the native head operation runs.
//! With a single frame installed this is exactly "redirect or fall through to
//! the original".

use crate::document::Document;
use crate::dom::NodeId;
use crate::error::{IsolationError, Result};
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Outcome of offering a call to one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
  /// The strategy performed the mutation; the value is the node returned to the caller.
  Handled(NodeId),
  /// Let the next outer frame, or the native operation, take the call.
  Declined,
}

/// Redirection logic installed on the head entry points.
pub trait HeadMutationStrategy {
  /// Name of the application this strategy isolates.
  fn app(&self) -> &str;

  fn append_child(&self, document: &Document, child: NodeId) -> Result<Redirect>;

  fn remove_child(&self, document: &Document, child: NodeId) -> Result<Redirect>;
}

/// Identity of an installed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

struct Frame {
  id: FrameId,
  strategy: Rc<dyn HeadMutationStrategy>,
}

/// Entry-point stack owned by a [`Document`].
#[derive(Default)]
pub struct HeadMutationPoints {
  frames: RefCell<Vec<Frame>>,
  next_id: Cell<u64>,
}

impl HeadMutationPoints {
  /// Push a frame for `strategy`.
  ///
  /// Fails with [`IsolationError::AlreadyInstalled`] when the application
  /// already has a frame; the existing frame stays in place.
  pub fn install(&self, strategy: Rc<dyn HeadMutationStrategy>) -> Result<FrameId> {
    let mut frames = self.frames.borrow_mut();
    if frames.iter().any(|f| f.strategy.app() == strategy.app()) {
      return Err(
        IsolationError::AlreadyInstalled {
          app: strategy.app().to_string(),
        }
        .into(),
      );
    }
    let id = FrameId(self.next_id.get());
    self.next_id.set(id.0 + 1);
    debug!(
      "[isolation] install {} at depth {}",
      strategy.app(),
      frames.len()
    );
    frames.push(Frame { id, strategy });
    Ok(id)
  }

  /// Pop the frame `id`.
  ///
  /// Frames are expected to leave in reverse install order. A frame that is
  /// not innermost is still removed on its own, with a warning; when
  /// `strict` is set this trips a debug assertion instead.
  pub fn uninstall(&self, id: FrameId, strict: bool) -> Result<()> {
    let mut frames = self.frames.borrow_mut();
    let Some(pos) = frames.iter().position(|f| f.id == id) else {
      return Err(
        IsolationError::NotInstalled {
          app: format!("<frame {}>", id.0),
        }
        .into(),
      );
    };
    let frame = frames.remove(pos);
    if pos != frames.len() {
      warn!(
        "[isolation] {} deactivated while {} inner frame(s) remain installed",
        frame.strategy.app(),
        frames.len() - pos
      );
      debug_assert!(
        !strict,
        "out-of-order deactivation of application '{}'",
        frame.strategy.app()
      );
    }
    debug!(
      "[isolation] uninstall {} from depth {}",
      frame.strategy.app(),
      pos
    );
    Ok(())
  }

  /// Number of installed frames.
  pub fn depth(&self) -> usize {
    self.frames.borrow().len()
  }

  pub fn is_installed(&self, app: &str) -> bool {
    self.frames.borrow().iter().any(|f| f.strategy.app() == app)
  }

  /// Installed applications, outermost first.
  pub fn installed_apps(&self) -> Vec<String> {
    self
      .frames
      .borrow()
      .iter()
      .map(|f| f.strategy.app().to_string())
      .collect()
  }

  /// Strategies innermost-first. The frame borrow is released before any strategy runs.
  fn chain(&self) -> Vec<Rc<dyn HeadMutationStrategy>> {
    self
      .frames
      .borrow()
      .iter()
      .rev()
      .map(|f| f.strategy.clone())
      .collect()
  }

  pub(crate) fn append_child(&self, document: &Document, child: NodeId) -> Result<NodeId> {
    for strategy in self.chain() {
      if let Redirect::Handled(node) = strategy.append_child(document, child)? {
        return Ok(node);
      }
    }
    document.native_head_append(child)
  }

  pub(crate) fn remove_child(&self, document: &Document, child: NodeId) -> Result<NodeId> {
    for strategy in self.chain() {
      if let Redirect::Handled(node) = strategy.remove_child(document, child)? {
        return Ok(node);
      }
    }
    document.native_head_remove(child)
  }
}

impl fmt::Debug for HeadMutationPoints {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HeadMutationPoints")
      .field("installed", &self.installed_apps())
      .finish()
  }
}
