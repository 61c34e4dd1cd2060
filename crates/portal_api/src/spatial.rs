use portal_model::SpatialRecord;
use spatial_sync::{BoxFuture, LayerKind, RequestDescriptor, SourceError, SpatialSource};

use crate::client::PortalClient;

impl SpatialSource for PortalClient {
    fn fetch_layer<'a>(
        &'a self,
        layer: LayerKind,
        descriptor: &'a RequestDescriptor,
    ) -> BoxFuture<'a, Result<Vec<SpatialRecord>, SourceError>> {
        Box::pin(async move {
            self.spatial_layer(layer, descriptor)
                .await
                .map_err(SourceError::from_error)
        })
    }
}
