use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use url::Url;

use crate::shared::errors::SplitFetchError;
use crate::shared::split_parts::ByteRange;

pub mod http;

/// Body of a range response as a stream of byte chunks.
pub type BoxedStream = Pin<Box<dyn Stream<Item = Result<Bytes, SplitFetchError>> + Send + 'static>>;

/// A source that can report a resource size and serve byte ranges of it.
///
/// Implementations must be safe to share between the concurrent chunk tasks.
#[async_trait]
pub trait RangeTransport: Send + Sync {
    /// Size of the resource in bytes, from a metadata-only request.
    async fn total_bytes(&self, source: &Url) -> Result<u64, SplitFetchError>;

    /// Request `range` of the resource. The stream yields exactly the bytes of
    /// the range as sent by the server; the caller validates its length.
    async fn fetch_range(&self, source: &Url, range: ByteRange) -> Result<BoxedStream, SplitFetchError>;
}
