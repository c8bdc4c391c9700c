use crate::types::{OraclePriceUpdate, UnixTimestamp};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait representing the oracle network submission layer.
///
/// Implementors own the signing keys and the network delivery. Only a
/// successful `send` has external side effects.
#[async_trait]
pub trait Submitter: Send + Sync + Debug {
    /// Signs and submits price updates to the oracle network.
    ///
    /// # Arguments
    /// * `timestamp` - Unix time (seconds) of the submission batch.
    /// * `updates` - The normalized prices to publish.
    async fn send(&self, timestamp: UnixTimestamp, updates: &[OraclePriceUpdate]) -> Result<()>;
}
