//! Object sinks - where a finished payload lands.

use async_trait::async_trait;

use crate::encoder::EncodedPayload;
use crate::error::ExtractError;
use crate::namer::DestinationName;

/// Durable, write-only object storage.
///
/// `put` is all-or-nothing: after an error, nothing is visible under
/// `name`. Every failure surfaces as [`ExtractError::Storage`].
#[async_trait]
pub trait ObjectSink: Send + Sync {
    async fn put(&self, name: &DestinationName, payload: EncodedPayload) -> Result<(), ExtractError>;
}
