//! Abstraction over whatever serves the per-layer spatial queries.

use std::future::Future;
use std::pin::Pin;

use portal_model::SpatialRecord;

use crate::layer::LayerKind;
use crate::request::RequestDescriptor;

/// Boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failure of one layer fetch. The message ends up in the layer's notice.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a transport or decode error, keeping its text as the message.
    pub fn from_error(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Serves one layer of a descriptor.
///
/// Implementations must be `Send + Sync` so fetches can run on spawned tasks.
/// An empty result is `Ok(vec![])`, not an error.
pub trait SpatialSource: Send + Sync {
    fn fetch_layer<'a>(
        &'a self,
        layer: LayerKind,
        descriptor: &'a RequestDescriptor,
    ) -> BoxFuture<'a, Result<Vec<SpatialRecord>, SourceError>>;
}
