use crate::error::ConfigError;
use serde::{Deserialize, Deserializer};
use std::{
    fmt::{self, Debug, Formatter},
    fs,
    path::Path,
    time::Duration,
};
use tracing::debug;

/// Update frequencies at or below this value are rejected at startup.
pub const MIN_UPDATE_FREQUENCY: Duration = Duration::from_secs(5);

pub const DEFAULT_TWELVEDATA_URL: &str = "https://api.twelvedata.com";

/// Relay configuration, read once from a TOML file and never mutated.
///
/// Missing string keys default to empty and a missing `update_frequency`
/// defaults to zero, so that [`Config::validate`] can report them precisely.
#[derive(Clone, Deserialize, PartialEq)]
pub struct Config {
    /// Address of the oracle network node submissions are delivered to.
    #[serde(default)]
    pub node_addr: String,
    /// BIP-39 phrase of the wallet that signs submissions.
    #[serde(default)]
    pub wallet_mnemonic: String,
    /// Hex-encoded key that signs the oracle price messages.
    #[serde(default)]
    pub ethereum_private_key: String,
    /// The single symbol to relay (e.g., "AAPL" or "BTC/USD").
    #[serde(default)]
    pub symbol: String,
    /// Interval between ticks, e.g. "10s" or "1m30s". Bare integers are rejected.
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub update_frequency: Duration,
    #[serde(default, rename = "twelvedata_apikey")]
    pub twelvedata_api_key: String,
    /// Optional market identifier code forwarded to the price API.
    #[serde(default)]
    pub mic_code: Option<String>,
    #[serde(default = "default_twelvedata_url")]
    pub twelvedata_url: String,
}

fn default_twelvedata_url() -> String {
    DEFAULT_TWELVEDATA_URL.to_string()
}

// Secrets stay out of logs.
impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("node_addr", &self.node_addr)
            .field("wallet_mnemonic", &"<redacted>")
            .field("ethereum_private_key", &"<redacted>")
            .field("symbol", &self.symbol)
            .field("update_frequency", &self.update_frequency)
            .field("twelvedata_api_key", &"<redacted>")
            .field("mic_code", &self.mic_code)
            .field("twelvedata_url", &self.twelvedata_url)
            .finish()
    }
}

impl Config {
    /// Checks the rules that must hold before the first tick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::MissingSymbol);
        }
        if self.update_frequency <= MIN_UPDATE_FREQUENCY {
            return Err(ConfigError::UpdateFrequencyTooLow(self.update_frequency));
        }
        Ok(())
    }
}

/// Loads, parses and validates the relay configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path_ref = path.as_ref();
    debug!(path = %path_ref.display(), "Loading relay config file");

    let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path_ref.to_path_buf(),
        source,
    })?;

    config.validate()?;

    debug!(symbol = %config.symbol, frequency = ?config.update_frequency, "Successfully loaded and validated config");
    Ok(config)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Integer(i64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        // A bare number has no obvious unit; refuse it rather than guess.
        RawDuration::Integer(n) => Err(serde::de::Error::custom(format!(
            "duration must be a string with a unit (e.g. \"{}s\"), got bare integer {}",
            n, n
        ))),
        RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

/// Parses a duration string such as "10s", "1m30s", "1.5h" or "250ms".
///
/// Accepted units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare
/// `"0"` is the only value allowed without a unit.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err("empty duration".to_string());
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut rest = text;
    let mut total_nanos: u128 = 0;

    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail.find(is_number).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            "" => return Err(format!("missing unit in duration {input:?}")),
            other => return Err(format!("unknown unit {other:?} in duration {input:?}")),
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(format!("invalid duration {input:?}"));
        }
        let invalid = |_| format!("invalid duration {input:?}");
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(invalid)?
        };
        // Digits past nanosecond resolution of the largest unit carry no weight.
        let fraction = &fraction[..fraction.len().min(18)];
        let fraction_nanos = if fraction.is_empty() {
            0
        } else {
            let digits: u128 = fraction.parse().map_err(invalid)?;
            unit_nanos * digits / 10u128.pow(fraction.len() as u32)
        };

        total_nanos = whole
            .checked_mul(unit_nanos)
            .and_then(|n| n.checked_add(fraction_nanos))
            .and_then(|n| n.checked_add(total_nanos))
            .ok_or_else(|| format!("duration {input:?} overflows"))?;
        rest = tail;
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000)
        .map_err(|_| format!("duration {input:?} overflows"))?;
    Ok(Duration::new(secs, (total_nanos % 1_000_000_000) as u32))
}
