//! Dynamic resource isolation for mounted applications.
//!
//! A [`HeadInterceptor`] owns one application's redirection state across
//! mount cycles. Installing it pushes a strategy onto the document's head
//! entry points; `<style>`/`<link>` appends land in the application's
//! container instead of the head, and `<script>` appends are replaced by a
//! placeholder comment while the script runs against the application's
//! sandbox.
//!
//! The lifecycle is a chain of one-shot handles:
//!
//! ```text
//! install() -> Deactivator
//!   deactivate() -> Reactivator   (entry points restored, styles snapshotted)
//!     reactivate(mounting)        (elements replayed into the container)
//! ```

pub mod entry_points;
pub mod host;
pub mod registry;
pub mod script;
pub mod snapshot;

pub use entry_points::{FrameId, HeadMutationPoints, HeadMutationStrategy, Redirect};
pub use host::{ActivityPredicate, AlwaysActive, ContainerLookup, ElementIdLookup};
pub use registry::ResourceRegistry;
pub use script::{
  CompletionSink, ExecOptions, FetchingScriptLoader, SandboxGlobal, ScriptLoader, ScriptSource,
};
pub use snapshot::{CachedRuleSet, StyleSnapshotEngine};

use crate::config::{IsolationOptions, LoaderConfiguration};
use crate::debug::inspect::{EntrySnapshot, IsolationReport};
use crate::document::Document;
use crate::dom::NodeId;
use crate::error::{IsolationError, Result, ScriptError};
use crate::events::{Event, EventKind};
use futures::task::{LocalSpawn, LocalSpawnExt};
use log::{debug, warn};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use url::Url;

/// Redirection state for one application.
pub struct HeadInterceptor {
  app: String,
  document: Document,
  spawner: Rc<dyn LocalSpawn>,
  sandbox: Rc<dyn SandboxGlobal>,
  container: Option<Rc<dyn ContainerLookup>>,
  activity: Rc<dyn ActivityPredicate>,
  loader: Option<Rc<dyn ScriptLoader>>,
  config: LoaderConfiguration,
  options: IsolationOptions,
  registry: Rc<RefCell<ResourceRegistry>>,
  snapshots: Rc<RefCell<StyleSnapshotEngine>>,
}

impl HeadInterceptor {
  /// Interceptor for `app` on `document`.
  ///
  /// Script completions are spawned on `spawner`; scripts evaluate against
  /// `sandbox`. Until overridden, the container is found by element id, every
  /// application counts as active, and scripts load through
  /// [`FetchingScriptLoader`] with the configured fetch.
  pub fn new(
    app: impl Into<String>,
    document: Document,
    spawner: Rc<dyn LocalSpawn>,
    sandbox: Rc<dyn SandboxGlobal>,
  ) -> Self {
    let app = app.into();
    Self {
      snapshots: Rc::new(RefCell::new(StyleSnapshotEngine::new(app.clone()))),
      app,
      document,
      spawner,
      sandbox,
      container: None,
      activity: Rc::new(AlwaysActive),
      loader: None,
      config: LoaderConfiguration::default(),
      options: IsolationOptions::default(),
      registry: Rc::new(RefCell::new(ResourceRegistry::new())),
    }
  }

  pub fn with_container_lookup(mut self, lookup: impl ContainerLookup + 'static) -> Self {
    self.container = Some(Rc::new(lookup));
    self
  }

  pub fn with_activity(mut self, predicate: impl ActivityPredicate + 'static) -> Self {
    self.activity = Rc::new(predicate);
    self
  }

  pub fn with_script_loader(mut self, loader: impl ScriptLoader + 'static) -> Self {
    self.loader = Some(Rc::new(loader));
    self
  }

  pub fn with_loader_configuration(mut self, config: LoaderConfiguration) -> Self {
    self.config = config;
    self
  }

  pub fn with_options(mut self, options: IsolationOptions) -> Self {
    self.options = options;
    self
  }

  pub fn app(&self) -> &str {
    &self.app
  }

  pub fn document(&self) -> &Document {
    &self.document
  }

  pub fn options(&self) -> &IsolationOptions {
    &self.options
  }

  pub fn loader_configuration(&self) -> &LoaderConfiguration {
    &self.config
  }

  pub fn is_installed(&self) -> bool {
    self.document.mutation_points().is_installed(&self.app)
  }

  /// Redirected stylesheet elements of the current activation, in append order.
  pub fn registry_entries(&self) -> Vec<NodeId> {
    self.registry.borrow().entries().to_vec()
  }

  pub fn cached_rules(&self, element: NodeId) -> Option<CachedRuleSet> {
    self.snapshots.borrow().cached_rules(element).map(<[String]>::to_vec)
  }

  /// Push this application's strategy onto the head entry points.
  pub fn install(&self) -> Result<Deactivator> {
    let loader: Rc<dyn ScriptLoader> = match &self.loader {
      Some(loader) => loader.clone(),
      None => Rc::new(FetchingScriptLoader::new(self.config.fetch.clone())),
    };
    let context = Rc::new(IsolationContext {
      app: self.app.clone(),
      document: self.document.clone(),
      spawner: self.spawner.clone(),
      sandbox: self.sandbox.clone(),
      container: self.container_lookup(),
      activity: self.activity.clone(),
      loader,
      config: self.config.clone(),
      strict_lifecycle: self.options.strict_lifecycle,
      registry: self.registry.clone(),
      snapshots: self.snapshots.clone(),
    });
    let frame = self
      .document
      .mutation_points()
      .install(context.clone())?;
    Ok(Deactivator { context, frame })
  }

  /// Current redirection state, for debugging.
  pub fn report(&self) -> IsolationReport {
    let container = self.container_lookup().container(&self.document, &self.app);
    let tree = self.document.tree();
    let snapshots = self.snapshots.borrow();
    let entries = self
      .registry
      .borrow()
      .entries()
      .iter()
      .map(|&node| EntrySnapshot {
        node_id: node.index(),
        tag_name: tree.tag_name(node).unwrap_or_default().to_string(),
        in_container: container.is_some_and(|c| tree.parent(node) == Some(c)),
        live_rules: tree.sheet(node).map(|s| s.len()),
        cached_rules: snapshots.cached_rules(node).map(<[String]>::len),
      })
      .collect();
    IsolationReport {
      app: self.app.clone(),
      installed: self.is_installed(),
      stack_depth: self.document.mutation_points().depth(),
      container: container.map(NodeId::index),
      entries,
    }
  }

  fn container_lookup(&self) -> Rc<dyn ContainerLookup> {
    match &self.container {
      Some(lookup) => lookup.clone(),
      None => Rc::new(ElementIdLookup::from_options(&self.options)),
    }
  }
}

impl fmt::Debug for HeadInterceptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HeadInterceptor")
      .field("app", &self.app)
      .field("installed", &self.is_installed())
      .field("entries", &self.registry.borrow().len())
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

/// Capability to end the `Installed` state of one activation.
#[must_use = "dropping a Deactivator leaves the interceptor installed"]
pub struct Deactivator {
  context: Rc<IsolationContext>,
  frame: FrameId,
}

impl Deactivator {
  pub fn app(&self) -> &str {
    &self.context.app
  }

  /// Restore the entry points and snapshot programmatic style rules.
  pub fn deactivate(self) -> Result<Reactivator> {
    let ctx = self.context;
    ctx
      .document
      .mutation_points()
      .uninstall(self.frame, ctx.strict_lifecycle)?;
    let entries = ctx.registry.borrow().entries().to_vec();
    let captured = ctx
      .snapshots
      .borrow_mut()
      .snapshot(&ctx.document.tree(), &entries);
    debug!(
      "[isolation] {} deactivated: {} entr(ies), {} style snapshot(s)",
      ctx.app,
      entries.len(),
      captured
    );
    Ok(Reactivator { context: ctx })
  }
}

impl fmt::Debug for Deactivator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Deactivator")
      .field("app", &self.context.app)
      .field("frame", &self.frame)
      .finish()
  }
}

/// Capability to replay a deactivated application's stylesheets.
#[must_use = "a Reactivator does nothing until reactivate is called"]
pub struct Reactivator {
  context: Rc<IsolationContext>,
}

impl Reactivator {
  pub fn app(&self) -> &str {
    &self.context.app
  }

  /// Re-append every recorded element to the container and replay cached rules.
  ///
  /// `mounting` clears the registry once every element is restored, so the
  /// next activation starts empty. On error the registry is left as it was.
  pub fn reactivate(self, mounting: bool) -> Result<()> {
    let ctx = self.context;
    let container = ctx.require_container(&ctx.document)?;
    let entries = ctx.registry.borrow().entries().to_vec();
    let mut replayed = 0;
    {
      let snapshots = ctx.snapshots.borrow();
      let mut tree = ctx.document.tree_mut();
      for element in &entries {
        replayed += snapshots.restore(&mut tree, container, *element)?;
      }
    }
    ctx.registry.borrow_mut().drain(mounting);
    debug!(
      "[isolation] {} reactivated (mounting={}): {} element(s), {} rule(s) replayed",
      ctx.app,
      mounting,
      entries.len(),
      replayed
    );
    Ok(())
  }
}

impl fmt::Debug for Reactivator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Reactivator")
      .field("app", &self.context.app)
      .finish()
  }
}

/// The installed strategy, shared between the entry points and the handles.
struct IsolationContext {
  app: String,
  document: Document,
  spawner: Rc<dyn LocalSpawn>,
  sandbox: Rc<dyn SandboxGlobal>,
  container: Rc<dyn ContainerLookup>,
  activity: Rc<dyn ActivityPredicate>,
  loader: Rc<dyn ScriptLoader>,
  config: LoaderConfiguration,
  strict_lifecycle: bool,
  registry: Rc<RefCell<ResourceRegistry>>,
  snapshots: Rc<RefCell<StyleSnapshotEngine>>,
}

impl IsolationContext {
  fn require_container(&self, document: &Document) -> Result<NodeId> {
    self.container.container(document, &self.app).ok_or_else(|| {
      IsolationError::ContainerNotReady {
        app: self.app.clone(),
      }
      .into()
    })
  }

  fn redirect_stylesheet(&self, document: &Document, child: NodeId) -> Result<Redirect> {
    let location = document.location();
    if !self.activity.is_active(&self.app, &location) {
      debug!(
        "[isolation] {} inactive at {}, node {} goes to the head",
        self.app, location, child
      );
      return Ok(Redirect::Declined);
    }
    let container = self.require_container(document)?;
    self.registry.borrow_mut().record(child);
    document.tree_mut().append_child(container, child)?;
    debug!("[isolation] {}: node {} redirected to container", self.app, child);
    Ok(Redirect::Handled(child))
  }

  fn redirect_script(&self, document: &Document, child: NodeId) -> Result<Redirect> {
    let container = self.require_container(document)?;
    let source = {
      let tree = document.tree();
      match tree.get_attribute(child, "src").filter(|src| !src.is_empty()) {
        Some(src) => ScriptSource::External {
          url: resolve_script_url(&document.location(), src),
        },
        None => ScriptSource::Inline {
          text: tree.text_content(child),
        },
      }
    };
    let (marker, options) = match source.url() {
      Some(url) => (
        format!("dynamic script {url} replaced by fastmount"),
        ExecOptions::with_fetch(self.config.fetch.clone()),
      ),
      None => (
        "dynamic inline script replaced by fastmount".to_string(),
        ExecOptions::default(),
      ),
    };

    let placeholder = {
      let mut tree = document.tree_mut();
      let placeholder = tree.create_comment(&marker);
      tree.append_child(container, placeholder)?;
      placeholder
    };

    let execution = self
      .loader
      .exec_scripts(source, self.sandbox.clone(), options);
    let document_handle = document.clone();
    let app = self.app.clone();
    let spawned = self.spawner.spawn_local(async move {
      let kind = match execution.await {
        Ok(()) => EventKind::Load,
        Err(err) => {
          warn!("[isolation] {app}: script node {child} failed: {err}");
          EventKind::Error
        }
      };
      debug!("[isolation] {app}: script node {child} completed with {kind}");
      CompletionSink::for_element(&document_handle, child, kind)
        .complete(&document_handle, Event::new(kind, child));
    });
    if let Err(err) = spawned {
      document.tree_mut().remove_child(container, placeholder)?;
      return Err(
        ScriptError::Spawn {
          reason: err.to_string(),
        }
        .into(),
      );
    }
    Ok(Redirect::Handled(child))
  }
}

impl HeadMutationStrategy for IsolationContext {
  fn app(&self) -> &str {
    &self.app
  }

  fn append_child(&self, document: &Document, child: NodeId) -> Result<Redirect> {
    let (stylesheet, script) = {
      let tree = document.tree();
      (
        tree.is_element_named(child, "style") || tree.is_element_named(child, "link"),
        tree.is_element_named(child, "script"),
      )
    };
    if stylesheet {
      self.redirect_stylesheet(document, child)
    } else if script {
      self.redirect_script(document, child)
    } else {
      Ok(Redirect::Declined)
    }
  }

  fn remove_child(&self, document: &Document, child: NodeId) -> Result<Redirect> {
    let Some(container) = self.container.container(document, &self.app) else {
      return Ok(Redirect::Declined);
    };
    if !document.tree().contains(container, child) {
      return Ok(Redirect::Declined);
    }
    let removed = document.tree_mut().remove_child(container, child)?;
    debug!("[isolation] {}: node {} removed from container", self.app, child);
    Ok(Redirect::Handled(removed))
  }
}

/// Resolve `src` against the document location, or pass it through unchanged.
fn resolve_script_url(location: &Url, src: &str) -> String {
  location
    .join(src)
    .map(|url| url.to_string())
    .unwrap_or_else(|_| src.to_string())
}
