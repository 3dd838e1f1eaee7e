#![allow(dead_code)]

use fastmount::debug::runtime::RuntimeToggles;
use fastmount::error::ScriptError;
use fastmount::isolation::{ExecOptions, SandboxGlobal, ScriptLoader, ScriptSource};
use fastmount::{Document, HeadInterceptor, IsolationOptions, NodeId, Result};
use futures::executor::LocalPool;
use futures::future::LocalBoxFuture;
use std::cell::RefCell;
use std::rc::Rc;

pub const PAGE: &str = r#"<html><head><title>host</title></head><body><div id="fastmount-app-shop"></div><div id="fastmount-app-cart"></div></body></html>"#;

pub fn page(location: &str) -> Document {
  Document::parse_html(PAGE, location).expect("parse host page")
}

/// Options independent of the process environment.
pub fn options() -> IsolationOptions {
  IsolationOptions::from_toggles(&RuntimeToggles::default())
}

pub fn container(doc: &Document, app: &str) -> NodeId {
  doc
    .get_element_by_id(&format!("fastmount-app-{app}"))
    .expect("container")
}

pub fn interceptor(
  doc: &Document,
  app: &str,
  pool: &LocalPool,
  sandbox: Rc<dyn SandboxGlobal>,
) -> HeadInterceptor {
  HeadInterceptor::new(app, doc.clone(), Rc::new(pool.spawner()), sandbox).with_options(options())
}

/// Host clearing a container on unmount.
pub fn clear(doc: &Document, node: NodeId) {
  doc.tree_mut().set_text_content(node, "");
}

/// Sandbox that records every evaluation and fails on code containing `throw`.
#[derive(Default)]
pub struct RecordingSandbox {
  pub runs: RefCell<Vec<(Option<String>, String)>>,
}

impl SandboxGlobal for RecordingSandbox {
  fn evaluate(&self, source_url: Option<&str>, code: &str) -> Result<()> {
    if code.contains("throw") {
      return Err(
        ScriptError::Evaluation {
          url: source_url.map(str::to_string),
          message: "uncaught exception".to_string(),
        }
        .into(),
      );
    }
    self
      .runs
      .borrow_mut()
      .push((source_url.map(str::to_string), code.to_string()));
    Ok(())
  }
}

/// Loader that records its inputs and always succeeds.
#[derive(Clone, Default)]
pub struct RecordingLoader {
  pub calls: Rc<RefCell<Vec<(ScriptSource, bool)>>>,
}

impl ScriptLoader for RecordingLoader {
  fn exec_scripts(
    &self,
    source: ScriptSource,
    _sandbox: Rc<dyn SandboxGlobal>,
    options: ExecOptions,
  ) -> LocalBoxFuture<'static, Result<()>> {
    self
      .calls
      .borrow_mut()
      .push((source, options.fetch.is_some()));
    Box::pin(async { Ok(()) })
  }
}
