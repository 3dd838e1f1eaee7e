//! Loader configuration and interceptor options.

use crate::debug::runtime::{self, RuntimeToggles};
use crate::resource::{ResourceFetcher, StaticFetcher};
use std::fmt;
use std::sync::Arc;

/// Default id prefix for application containers: `fastmount-app-<name>`.
pub const DEFAULT_CONTAINER_ID_PREFIX: &str = "fastmount-app-";

/// Configuration handed to the script loader for external scripts.
///
/// `fetch` is the transport override used to retrieve script sources.
#[derive(Clone)]
pub struct LoaderConfiguration {
  pub fetch: Arc<dyn ResourceFetcher>,
}

impl LoaderConfiguration {
  pub fn new(fetch: Arc<dyn ResourceFetcher>) -> Self {
    Self { fetch }
  }
}

impl Default for LoaderConfiguration {
  /// An empty [`StaticFetcher`]: only `data:` sources resolve.
  fn default() -> Self {
    Self::new(Arc::new(StaticFetcher::new()))
  }
}

impl fmt::Debug for LoaderConfiguration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LoaderConfiguration")
      .field("fetch", &"<dyn ResourceFetcher>")
      .finish()
  }
}

/// Behavior switches for a [`HeadInterceptor`](crate::isolation::HeadInterceptor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationOptions {
  /// Assert (debug builds only) when a deactivation is not the innermost installed frame.
  pub strict_lifecycle: bool,
  /// Prefix used by [`ElementIdLookup`](crate::isolation::ElementIdLookup).
  pub container_id_prefix: String,
}

impl IsolationOptions {
  pub fn from_toggles(toggles: &RuntimeToggles) -> Self {
    Self {
      strict_lifecycle: toggles.truthy(runtime::STRICT_LIFECYCLE),
      container_id_prefix: toggles
        .string(runtime::CONTAINER_PREFIX)
        .unwrap_or_else(|| DEFAULT_CONTAINER_ID_PREFIX.to_string()),
    }
  }

  pub fn with_strict_lifecycle(mut self, strict: bool) -> Self {
    self.strict_lifecycle = strict;
    self
  }

  pub fn with_container_id_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.container_id_prefix = prefix.into();
    self
  }
}

impl Default for IsolationOptions {
  /// Options derived from the active `FASTMOUNT_*` toggles.
  fn default() -> Self {
    Self::from_toggles(&runtime::runtime_toggles())
  }
}
