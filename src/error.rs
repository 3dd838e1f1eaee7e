//! Error types for FastMount
//!
//! This module provides error types for every subsystem:
//! - DOM errors (hierarchy violations, missing children, CSSOM misuse)
//! - Parse errors (HTML bootstrap, URLs)
//! - Isolation errors (missing application containers, lifecycle misuse)
//! - Script errors (spawning, decoding, sandbox evaluation)
//! - Resource errors (fetching script sources)
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.

use thiserror::Error;

/// Result type alias for FastMount operations
///
/// # Examples
///
/// ```
/// use fastmount::Result;
///
/// fn mount() -> Result<()> {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for FastMount
///
/// Each variant wraps a more specific error type for that subsystem.
///
/// # Examples
///
/// ```
/// use fastmount::Error;
/// use fastmount::error::IsolationError;
///
/// fn rebuild() -> Result<(), Error> {
///     Err(Error::Isolation(IsolationError::ContainerNotReady {
///         app: "dashboard".to_string(),
///     }))
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
  /// Tree mutation or CSSOM error
  #[error("DOM error: {0}")]
  Dom(#[from] DomError),

  /// HTML or URL parsing error
  #[error("Parse error: {0}")]
  Parse(#[from] ParseError),

  /// Interceptor lifecycle or precondition error
  #[error("Isolation error: {0}")]
  Isolation(#[from] IsolationError),

  /// Script scheduling or evaluation error
  #[error("Script error: {0}")]
  Script(#[from] ScriptError),

  /// Resource fetching error
  #[error("Resource error: {0}")]
  Resource(#[from] ResourceError),
}

/// Errors raised by the native tree and stylesheet primitives
///
/// These mirror the DOM exceptions a browser would throw for the same calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
  /// The node to be removed is not a child of the given parent
  #[error("Node {child} is not a child of node {parent}")]
  NotFound { parent: usize, child: usize },

  /// The insertion would create a cycle or targets a node that cannot have children
  #[error("Cannot insert node {child} into node {parent}: {reason}")]
  HierarchyRequest {
    parent: usize,
    child: usize,
    reason: String,
  },

  /// Rule index outside of the stylesheet's rule list
  #[error("Rule index {index} is out of range for a sheet of {length} rules")]
  IndexSize { index: usize, length: usize },

  /// Rule text does not describe exactly one rule
  #[error("Failed to parse rule: {rule}")]
  Syntax { rule: String },
}

/// Errors that occur while parsing markup or URLs
#[derive(Error, Debug, Clone)]
pub enum ParseError {
  /// Invalid HTML input
  #[error("Invalid HTML: {message}")]
  InvalidHtml { message: String },

  /// Invalid URL
  #[error("Invalid URL '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },
}

/// Errors raised by the head interceptor and its handles
///
/// A missing container is always fatal: it means the host tore down the
/// mount point before the application finished its teardown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IsolationError {
  /// The application's container element could not be located
  #[error("Container for application '{app}' is not ready")]
  ContainerNotReady { app: String },

  /// A frame for the application is already installed on the entry points
  #[error("Application '{app}' already has an installed interceptor")]
  AlreadyInstalled { app: String },

  /// The frame being uninstalled is not on the entry-point stack
  #[error("Application '{app}' has no installed interceptor")]
  NotInstalled { app: String },

  /// Cached rules exist but the re-appended style element has no live sheet
  #[error("Style element {node} of application '{app}' has no stylesheet after re-append")]
  SheetUnavailable { app: String, node: usize },
}

/// Errors related to redirected script execution
///
/// These are reported to the original element as error completions and are
/// never raised from the entry points, except for scheduling failures.
#[derive(Error, Debug, Clone)]
pub enum ScriptError {
  /// The completion task could not be spawned on the event loop
  #[error("Failed to schedule script execution: {reason}")]
  Spawn { reason: String },

  /// Fetched script bytes are not valid UTF-8
  #[error("Script at {url} is not valid UTF-8")]
  Decode { url: String },

  /// The sandbox reported an evaluation failure
  #[error("Script evaluation failed{}: {message}", .url.as_deref().map(|u| format!(" for {u}")).unwrap_or_default())]
  Evaluation { url: Option<String>, message: String },
}

/// Errors that occur while fetching resources
#[derive(Error, Debug, Clone)]
pub enum ResourceError {
  /// No resource is registered for the URL
  #[error("Resource not found: {url}")]
  NotFound { url: String },

  /// Malformed data: URL
  #[error("Invalid data URL: {reason}")]
  InvalidDataUrl { reason: String },
}
