use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::RwLock;

/// Prefix shared by every environment toggle this crate reads.
pub const TOGGLE_PREFIX: &str = "FASTMOUNT_";

/// Enables the stack-discipline assertion on out-of-order deactivation (debug builds).
pub const STRICT_LIFECYCLE: &str = "FASTMOUNT_STRICT_LIFECYCLE";

/// Overrides the id prefix used to locate application containers.
pub const CONTAINER_PREFIX: &str = "FASTMOUNT_CONTAINER_PREFIX";

/// Parsed runtime configuration toggles sourced from `FASTMOUNT_*` environment variables.
///
/// Values are captured once (via [`RuntimeToggles::from_env`]) and then reused for every
/// interceptor. Callers can also construct instances manually to override environment-derived
/// behavior when embedding the library.
#[derive(Debug, Clone, Default)]
pub struct RuntimeToggles {
  raw: HashMap<String, String>,
}

impl RuntimeToggles {
  /// Parse all `FASTMOUNT_*` environment variables into a toggle map.
  pub fn from_env() -> Self {
    let raw = std::env::vars()
      .filter(|(k, _)| k.starts_with(TOGGLE_PREFIX))
      .collect::<HashMap<_, _>>();
    Self { raw }
  }

  /// Construct a toggle set from a provided map of key/value pairs.
  pub fn from_map(raw: HashMap<String, String>) -> Self {
    Self { raw }
  }

  /// Returns the raw string value for a toggle, if set.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.raw.get(key).map(String::as_str)
  }

  /// Returns true when the toggle is present and truthy (`!= 0`/`false`/`off`).
  pub fn truthy(&self, key: &str) -> bool {
    self.truthy_with_default(key, false)
  }

  /// Returns true when the toggle is present and truthy, otherwise the provided default.
  pub fn truthy_with_default(&self, key: &str, default: bool) -> bool {
    self
      .get(key)
      .map(|v| !matches_ignore_case(v, &["0", "false", "off"]))
      .unwrap_or(default)
  }

  /// Returns the trimmed value for a toggle, treating blank values as unset.
  pub fn string(&self, key: &str) -> Option<String> {
    self
      .get(key)
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(str::to_string)
  }
}

fn matches_ignore_case(value: &str, candidates: &[&str]) -> bool {
  let value = value.trim();
  candidates.iter().any(|c| value.eq_ignore_ascii_case(c))
}

static ENV_TOGGLES: OnceLock<Arc<RuntimeToggles>> = OnceLock::new();
static OVERRIDE: RwLock<Option<Arc<RuntimeToggles>>> = RwLock::new(None);

/// Toggles in effect for new interceptors.
///
/// An installed override wins; otherwise the environment is read once and cached.
pub fn runtime_toggles() -> Arc<RuntimeToggles> {
  let current = OVERRIDE
    .read()
    .unwrap_or_else(|poisoned| poisoned.into_inner())
    .clone();
  current.unwrap_or_else(|| {
    ENV_TOGGLES
      .get_or_init(|| Arc::new(RuntimeToggles::from_env()))
      .clone()
  })
}

fn swap_override(next: Option<Arc<RuntimeToggles>>) -> Option<Arc<RuntimeToggles>> {
  let mut slot = OVERRIDE
    .write()
    .unwrap_or_else(|poisoned| poisoned.into_inner());
  std::mem::replace(&mut *slot, next)
}

/// Restores the previous override when dropped.
#[must_use = "the override is removed as soon as the guard is dropped"]
pub struct RuntimeTogglesGuard {
  previous: Option<Arc<RuntimeToggles>>,
}

impl Drop for RuntimeTogglesGuard {
  fn drop(&mut self) {
    swap_override(self.previous.take());
  }
}

/// Make `toggles` the active set until the returned guard is dropped.
pub fn set_runtime_toggles(toggles: Arc<RuntimeToggles>) -> RuntimeTogglesGuard {
  RuntimeTogglesGuard {
    previous: swap_override(Some(toggles)),
  }
}

/// Run `f` with `toggles` active.
pub fn with_runtime_toggles<T>(toggles: Arc<RuntimeToggles>, f: impl FnOnce() -> T) -> T {
  let _guard = set_runtime_toggles(toggles);
  f()
}
