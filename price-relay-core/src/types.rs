use serde::Serialize;

/// A raw price as returned by the price source, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceObservation {
    /// Symbol the price was requested for (e.g., "AAPL").
    pub symbol: String,
    /// Decimal price string exactly as the upstream API returned it.
    pub raw_price: String,
    /// Unix time (seconds) at which the fetch completed.
    pub fetched_at: UnixTimestamp,
}

/// One price update handed to the oracle network.
///
/// `price` is the fixed-point integer string `truncate(raw_price * 10^8)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OraclePriceUpdate {
    pub asset: String,
    pub price: String,
    pub timestamp: UnixTimestamp,
}

pub type UnixTimestamp = u64;
