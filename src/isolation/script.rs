//! Script redirection: loading, sandboxed evaluation and completion delivery.
//!
//! A redirected `<script>` never reaches a live document, so nothing fires
//! its native `load`/`error`. The interceptor runs the loader future on the
//! host's event loop and reports the outcome through a [`CompletionSink`].

use crate::document::Document;
use crate::dom::NodeId;
use crate::error::{Error, Result, ScriptError};
use crate::events::{Event, EventHandler, EventKind};
use crate::resource::ResourceFetcher;
use futures::future::LocalBoxFuture;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// What a redirected script element asks to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
  /// `<script src>`, resolved against the document location.
  External { url: String },
  /// `<script>` with inline text.
  Inline { text: String },
}

impl ScriptSource {
  pub fn url(&self) -> Option<&str> {
    match self {
      ScriptSource::External { url } => Some(url),
      ScriptSource::Inline { .. } => None,
    }
  }
}

/// Options handed to [`ScriptLoader::exec_scripts`].
#[derive(Clone, Default)]
pub struct ExecOptions {
  /// Transport override for external sources.
  pub fetch: Option<Arc<dyn ResourceFetcher>>,
}

impl ExecOptions {
  pub fn with_fetch(fetch: Arc<dyn ResourceFetcher>) -> Self {
    Self { fetch: Some(fetch) }
  }
}

impl fmt::Debug for ExecOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ExecOptions")
      .field("fetch", &self.fetch.as_ref().map(|_| "<dyn ResourceFetcher>"))
      .finish()
  }
}

/// Per-application global scope that evaluates script text.
pub trait SandboxGlobal {
  fn evaluate(&self, source_url: Option<&str>, code: &str) -> Result<()>;
}

/// Fetches (when needed) and evaluates a script against a sandbox.
///
/// The returned future resolves once evaluation finished; an `Err` becomes an
/// `error` completion on the original element.
pub trait ScriptLoader {
  fn exec_scripts(
    &self,
    source: ScriptSource,
    sandbox: Rc<dyn SandboxGlobal>,
    options: ExecOptions,
  ) -> LocalBoxFuture<'static, Result<()>>;
}

/// Default loader: fetch through [`ResourceFetcher`], decode UTF-8, evaluate.
#[derive(Clone)]
pub struct FetchingScriptLoader {
  fetcher: Arc<dyn ResourceFetcher>,
}

impl FetchingScriptLoader {
  pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
    Self { fetcher }
  }
}

impl fmt::Debug for FetchingScriptLoader {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FetchingScriptLoader").finish_non_exhaustive()
  }
}

impl ScriptLoader for FetchingScriptLoader {
  fn exec_scripts(
    &self,
    source: ScriptSource,
    sandbox: Rc<dyn SandboxGlobal>,
    options: ExecOptions,
  ) -> LocalBoxFuture<'static, Result<()>> {
    let fetcher = options.fetch.unwrap_or_else(|| self.fetcher.clone());
    Box::pin(async move {
      match source {
        ScriptSource::Inline { text } => sandbox.evaluate(None, &text),
        ScriptSource::External { url } => {
          let resource = fetcher.fetch(&url)?;
          let code = String::from_utf8(resource.bytes)
            .map_err(|_| Error::Script(ScriptError::Decode { url: url.clone() }))?;
          sandbox.evaluate(Some(&url), &code)
        }
      }
    })
  }
}

/// Where a redirected script's completion goes.
///
/// An element with an `onload`/`onerror` slot set receives a direct call to
/// that handler; otherwise the event is dispatched to its listeners.
#[derive(Clone)]
pub enum CompletionSink {
  Callback(EventHandler),
  Dispatch,
}

impl CompletionSink {
  /// Sink for `kind` as declared by `element` right now.
  pub fn for_element(document: &Document, element: NodeId, kind: EventKind) -> Self {
    match document.tree().event_handler(element, kind) {
      Some(handler) => CompletionSink::Callback(handler),
      None => CompletionSink::Dispatch,
    }
  }

  pub fn complete(self, document: &Document, event: Event) {
    match self {
      CompletionSink::Callback(handler) => handler(&event),
      CompletionSink::Dispatch => document.dispatch_event(event),
    }
  }
}

impl fmt::Debug for CompletionSink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CompletionSink::Callback(_) => f.write_str("Callback"),
      CompletionSink::Dispatch => f.write_str("Dispatch"),
    }
  }
}
