pub mod config;
pub mod controller;
pub mod error;
pub mod normalize;
pub mod source;
pub mod submitter;
pub mod twelvedata;
pub mod types;
pub mod utils;

// Re-export key types/functions for easier use by other crates
pub use config::{load_config, Config};
pub use controller::{run, Relay};
pub use error::{ConfigError, ParseError, SourceError, TickError};
pub use normalize::{scale, PRICE_DECIMALS};
pub use source::PriceSource;
pub use submitter::Submitter;
pub use twelvedata::TwelveDataClient;
pub use types::{OraclePriceUpdate, PriceObservation, UnixTimestamp};
