//! Resource fetching abstraction
//!
//! Script sources for redirected `<script src>` elements are fetched through
//! the [`ResourceFetcher`] trait, so the isolation core stays agnostic about
//! transport. The host supplies the fetcher through
//! [`LoaderConfiguration`](crate::config::LoaderConfiguration), enabling:
//!
//! - Custom caching or transport layers
//! - Offline bundles
//! - Mocking for tests
//!
//! # Example
//!
//! ```rust
//! use fastmount::resource::{ResourceFetcher, StaticFetcher};
//!
//! let fetcher = StaticFetcher::new()
//!     .with_resource("https://cdn.example/app.js", "window.ready = true;", Some("text/javascript"));
//! let resource = fetcher.fetch("https://cdn.example/app.js").unwrap();
//! assert_eq!(resource.bytes, b"window.ready = true;");
//! ```

use crate::error::{Error, ResourceError, Result};
use std::collections::HashMap;
use std::sync::Arc;

mod data_url;

/// Body and media type of a fetched script source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
  pub bytes: Vec<u8>,
  /// `Content-Type` reported by the transport, when known.
  pub content_type: Option<String>,
}

impl FetchedResource {
  pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
    Self {
      bytes,
      content_type,
    }
  }
}

/// Transport used to retrieve external script sources.
///
/// This is the `fetch` override carried by
/// [`LoaderConfiguration`](crate::config::LoaderConfiguration). URLs reaching
/// a fetcher have already been resolved against the document location.
/// Implementations are `Send + Sync` so one configuration can be shared by
/// every application on the page.
pub trait ResourceFetcher: Send + Sync {
  fn fetch(&self, url: &str) -> Result<FetchedResource>;
}

impl<T: ResourceFetcher + ?Sized> ResourceFetcher for Arc<T> {
  fn fetch(&self, url: &str) -> Result<FetchedResource> {
    (**self).fetch(url)
  }
}

/// Fetcher serving a fixed set of resources from memory.
///
/// `data:` URLs are decoded inline; any other URL must have been registered
/// or the fetch fails with [`ResourceError::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
  resources: HashMap<String, FetchedResource>,
}

impl StaticFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a resource, builder style.
  pub fn with_resource(
    mut self,
    url: impl Into<String>,
    body: impl Into<Vec<u8>>,
    content_type: Option<&str>,
  ) -> Self {
    self.insert(url, body, content_type);
    self
  }

  pub fn insert(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>, content_type: Option<&str>) {
    self.resources.insert(
      url.into(),
      FetchedResource::new(body.into(), content_type.map(str::to_string)),
    );
  }

  pub fn len(&self) -> usize {
    self.resources.len()
  }

  pub fn is_empty(&self) -> bool {
    self.resources.is_empty()
  }
}

impl ResourceFetcher for StaticFetcher {
  fn fetch(&self, url: &str) -> Result<FetchedResource> {
    if data_url::is_data_url(url) {
      return data_url::decode_data_url(url);
    }
    self.resources.get(url).cloned().ok_or_else(|| {
      Error::Resource(ResourceError::NotFound {
        url: url.to_string(),
      })
    })
  }
}
