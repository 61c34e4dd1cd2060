use foundation::BoundsError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid viewport bounds: {0}")]
    InvalidBounds(#[from] BoundsError),
    #[error("spatial sync driver has shut down")]
    Closed,
}
