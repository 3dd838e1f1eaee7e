//! Host-side collaborators consulted by the interceptor.

use crate::config::IsolationOptions;
use crate::document::Document;
use crate::dom::NodeId;
use url::Url;

/// Resolves the private container element of a named application.
pub trait ContainerLookup {
  fn container(&self, document: &Document, app: &str) -> Option<NodeId>;
}

impl<F> ContainerLookup for F
where
  F: Fn(&Document, &str) -> Option<NodeId>,
{
  fn container(&self, document: &Document, app: &str) -> Option<NodeId> {
    self(document, app)
  }
}

/// Finds the container by element id `<prefix><app>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementIdLookup {
  prefix: String,
}

impl ElementIdLookup {
  pub fn new(prefix: impl Into<String>) -> Self {
    Self {
      prefix: prefix.into(),
    }
  }

  pub fn from_options(options: &IsolationOptions) -> Self {
    Self::new(options.container_id_prefix.clone())
  }

  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  /// Element id expected for `app`.
  pub fn container_id(&self, app: &str) -> String {
    format!("{}{}", self.prefix, app)
  }
}

impl ContainerLookup for ElementIdLookup {
  fn container(&self, document: &Document, app: &str) -> Option<NodeId> {
    document.get_element_by_id(&self.container_id(app))
  }
}

/// Decides whether `app` is the application currently active for `location`.
///
/// Queried synchronously on every redirected style or link append.
pub trait ActivityPredicate {
  fn is_active(&self, app: &str, location: &Url) -> bool;
}

impl<F> ActivityPredicate for F
where
  F: Fn(&str, &Url) -> bool,
{
  fn is_active(&self, app: &str, location: &Url) -> bool {
    self(app, location)
  }
}

/// Predicate that treats every application as active.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysActive;

impl ActivityPredicate for AlwaysActive {
  fn is_active(&self, _app: &str, _location: &Url) -> bool {
    true
  }
}
