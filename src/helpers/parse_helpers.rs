/// Parses a decimal integer with an optional leading sign.
///
/// Leading zeros are dropped before the digits reach `atoi_simd`, which
/// rejects inputs wider than the type even when the value would fit.
/// `"+-1"` and `"--1"` are rejected.
pub fn parse_i64(raw: &str) -> Option<i64> {
    let bytes = raw.as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let first_significant = digits
        .iter()
        .position(|&b| b != b'0')
        .unwrap_or(digits.len() - 1);
    let magnitude = atoi_simd::parse::<u64>(&digits[first_significant..]).ok()?;

    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
}

/// Parses a floating point number, rejecting NaN and infinities.
pub fn parse_finite_f64(raw: &str) -> Option<f64> {
    match fast_float::parse::<f64, _>(raw) {
        Ok(value) if value.is_finite() => Some(value),
        _ => None,
    }
}
