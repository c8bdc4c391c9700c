use crate::error::ParseError;
use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Number of decimal places carried by oracle prices (prices are scaled by 10^8).
pub const PRICE_DECIMALS: i64 = 8;

/// Longest price string accepted. Keeps scaling cost bounded whatever the
/// upstream sends.
pub const MAX_PRICE_LEN: usize = 64;

/// Converts a decimal price string into a fixed-point integer string.
///
/// The value is multiplied by `10^exponent` using exact decimal arithmetic and
/// any remaining fractional digits are truncated toward zero, never rounded.
/// The result is rendered in canonical base 10: `"0"` for zero, no leading
/// zeros, and no sign for non-negative values.
///
/// Only plain positional notation is accepted: exponent forms such as
/// `"1e3"` and strings longer than [`MAX_PRICE_LEN`] are rejected.
///
/// ```
/// use price_relay_core::normalize::{scale, PRICE_DECIMALS};
///
/// assert_eq!(scale("1.999999999", PRICE_DECIMALS).unwrap(), "199999999");
/// ```
pub fn scale(price: &str, exponent: i64) -> Result<String, ParseError> {
    let trimmed = price.trim();
    if trimmed.is_empty() {
        return Err(ParseError {
            input: price.to_string(),
            reason: "empty price".to_string(),
        });
    }
    if trimmed.len() > MAX_PRICE_LEN {
        return Err(ParseError {
            input: price.to_string(),
            reason: format!("longer than {} characters", MAX_PRICE_LEN),
        });
    }
    if trimmed.contains(|c: char| matches!(c, 'e' | 'E')) {
        return Err(ParseError {
            input: price.to_string(),
            reason: "exponent notation is not accepted".to_string(),
        });
    }

    let value = BigDecimal::from_str(trimmed).map_err(|e| ParseError {
        input: price.to_string(),
        reason: e.to_string(),
    })?;

    // 10^exponent expressed as 1 with a scale of -exponent.
    let factor = BigDecimal::new(1.into(), -exponent);
    let (digits, _) = (value * factor).with_scale(0).into_bigint_and_exponent();

    Ok(digits.to_string())
}
