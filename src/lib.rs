pub mod config;
pub mod css;
pub mod debug;
pub mod document;
pub mod dom;
pub mod error;
pub mod events;
pub mod isolation;
pub mod resource;

pub use config::{IsolationOptions, LoaderConfiguration};
pub use document::Document;
pub use dom::{DomTree, NodeId};
pub use error::{Error, Result};
pub use events::{Event, EventHandler, EventKind};
pub use isolation::{Deactivator, HeadInterceptor, Reactivator};
pub use resource::{FetchedResource, ResourceFetcher, StaticFetcher};
