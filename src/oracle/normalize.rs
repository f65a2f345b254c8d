//! Fixed-point to decimal-string normalization
//!
//! Both sources report prices as a signed integer magnitude scaled by a
//! power of ten. Formatting works on the magnitude's decimal digits, never
//! through floating point, so values with 15+ significant digits stay exact.

use ethers::types::{Sign, I256};

/// Fractional digits kept for display. The full scale is preserved in
/// `RawReading`; only the formatted string is truncated.
pub const MAX_DISPLAY_DECIMALS: usize = 6;

/// Format `magnitude * 10^exponent` as a decimal string.
///
/// For negative exponents the magnitude is split on `10^|exponent|` via its
/// digit string, the fraction left-padded to exactly `|exponent|` digits and
/// then truncated (not rounded) to [`MAX_DISPLAY_DECIMALS`]. Neither source
/// produces a positive exponent today; if one ever does, zeros are appended
/// and no fractional part is emitted.
pub fn format_fixed_point(magnitude: I256, exponent: i32) -> String {
    let (sign, abs) = magnitude.into_sign_and_abs();
    let sign = if sign == Sign::Negative { "-" } else { "" };

    if exponent >= 0 {
        return format!("{}{}{}", sign, abs, "0".repeat(exponent as usize));
    }

    let scale = exponent.unsigned_abs() as usize;
    let digits = abs.to_string();

    let (integer, mut fraction) = if digits.len() > scale {
        let split = digits.len() - scale;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        // Value below 1: pad the fraction out to the full scale
        let pad = "0".repeat(scale - digits.len());
        ("0".to_string(), format!("{}{}", pad, digits))
    };

    fraction.truncate(MAX_DISPLAY_DECIMALS);
    format!("{}{}.{}", sign, integer, fraction)
}
