use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Configuration problems detected at startup. These are fatal: the relay
/// refuses to start any tick.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("missing symbol in config")]
    MissingSymbol,
    #[error("update frequency is too low: {0:?} (must be greater than {min:?})", min = crate::config::MIN_UPDATE_FREQUENCY)]
    UpdateFrequencyTooLow(Duration),
}

/// Failure reported by a [`PriceSource`](crate::source::PriceSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure or an unreadable response body.
    #[error("couldn't get prices: {0:#}")]
    Fetch(#[source] anyhow::Error),
    /// The upstream API answered with an explicit error status.
    #[error("api error: {0}")]
    Upstream(String),
}

/// The price string is not a valid decimal number.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid decimal price {input:?}: {reason}")]
pub struct ParseError {
    pub input: String,
    pub reason: String,
}

/// Why a single tick ended early. Every variant is recoverable; the relay
/// logs it and waits for the next tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("could not send prices to the network: {0:#}")]
    Submission(#[source] anyhow::Error),
}

impl TickError {
    /// Short category label used in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            TickError::Source(SourceError::Fetch(_)) => "fetch",
            TickError::Source(SourceError::Upstream(_)) => "upstream",
            TickError::Parse(_) => "parse",
            TickError::Submission(_) => "submission",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_tick_error_kinds() {
        let fetch: TickError = SourceError::Fetch(anyhow!("connection refused")).into();
        let upstream: TickError = SourceError::Upstream("rate limited".into()).into();
        let parse: TickError = ParseError {
            input: "abc".into(),
            reason: "not a number".into(),
        }
        .into();
        let submission = TickError::Submission(anyhow!("node unavailable"));

        assert_eq!(fetch.kind(), "fetch");
        assert_eq!(upstream.kind(), "upstream");
        assert_eq!(parse.kind(), "parse");
        assert_eq!(submission.kind(), "submission");
        assert_eq!(upstream.to_string(), "api error: rate limited");
    }
}
