use async_trait::async_trait;

use crate::runtime::contract::BucketObject;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to list bucket '{bucket}': {message}")]
pub struct ListingError {
    pub bucket: String,
    pub message: String,
}

#[async_trait]
pub trait BucketLister: Send + Sync {
    /// Full listing of the watched bucket, in the order storage returns it.
    async fn list_objects(&self) -> Result<Vec<BucketObject>, ListingError>;
}
