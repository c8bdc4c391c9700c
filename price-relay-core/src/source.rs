use crate::error::SourceError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait representing the upstream spot price provider.
///
/// Implementors issue exactly one request per call and never retry; the
/// relay decides what to do with a failure.
#[async_trait]
pub trait PriceSource: Send + Sync + Debug {
    /// Fetches the current price of `symbol` as a decimal string.
    ///
    /// # Errors
    /// * [`SourceError::Upstream`] when the provider reports an error status.
    /// * [`SourceError::Fetch`] on transport failure or an unparseable body.
    async fn fetch(&self, symbol: &str, api_key: &str) -> Result<String, SourceError>;
}
