// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Typed duration for configuration timing fields.
//!
//! [`Duration`] wraps a signed 64-bit nanosecond count and reads and writes the
//! compact textual form used throughout source configuration files:
//!
//! ```text
//! 100ms   1.5h   1h30m   500us   -2s   0
//! ```
//!
//! A duration string is an optional sign followed by one or more
//! `<number><unit>` pairs. Numbers may carry a fractional part. Recognised units
//! are `h`, `m`, `s`, `ms`, `us` (also `µs` / `μs`) and `ns`.
//!
//! Formatting always produces the canonical shortest form (`1h30m0s`, `1.5s`,
//! `500µs`, `0s`), and parsing the formatted text yields the same value.
//!
//! # Examples
//!
//! ```
//! use softplc_core::duration::Duration;
//!
//! let d: Duration = "1h30m".parse().unwrap();
//! assert_eq!(d.to_string(), "1h30m0s");
//! assert_eq!(d, Duration::parse(&d.to_string()).unwrap());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

const NANOSECOND: u64 = 1;
const MICROSECOND: u64 = 1_000 * NANOSECOND;
const MILLISECOND: u64 = 1_000 * MICROSECOND;
const SECOND: u64 = 1_000 * MILLISECOND;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;

/// Magnitude limit of an i64 nanosecond count (`|i64::MIN|`).
const MAGNITUDE_LIMIT: u64 = 1 << 63;

// =============================================================================
// Duration
// =============================================================================

/// A signed span of time with nanosecond resolution.
///
/// Zero and negative values are representable; fields that need a positive
/// interval reject them during validation rather than at parse time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(i64);

impl Duration {
    /// The zero duration.
    pub const ZERO: Duration = Duration(0);

    /// Creates a duration from nanoseconds.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Creates a duration from milliseconds, saturating on overflow.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(MILLISECOND as i64))
    }

    /// Creates a duration from whole seconds, saturating on overflow.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(SECOND as i64))
    }

    /// Returns the nanosecond count.
    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    /// Returns `true` for a strictly positive duration.
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns `true` for the zero duration.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Converts to [`std::time::Duration`]; `None` for negative values.
    pub fn to_std(&self) -> Option<std::time::Duration> {
        u64::try_from(self.0).ok().map(std::time::Duration::from_nanos)
    }

    /// Parses a duration string such as `"1h30m"` or `"500us"`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDurationFormat`] when the text is empty,
    /// a number has no unit, a unit is unknown, a number is malformed, or the
    /// value does not fit in 64 bits of nanoseconds.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        parse_duration(input)
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl FromStr for Duration {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s)
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn invalid(input: &str, reason: &str) -> ConfigError {
    ConfigError::invalid_duration(input, reason)
}

fn unit_scale(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(NANOSECOND),
        "us" | "\u{00b5}s" | "\u{03bc}s" => Some(MICROSECOND),
        "ms" => Some(MILLISECOND),
        "s" => Some(SECOND),
        "m" => Some(MINUTE),
        "h" => Some(HOUR),
        _ => None,
    }
}

fn is_number_char(c: char) -> bool {
    c == '.' || c.is_ascii_digit()
}

/// Consumes leading decimal digits. `None` on overflow.
fn leading_int(s: &str) -> Option<(u64, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let mut x: u64 = 0;
    for b in s[..end].bytes() {
        if x > MAGNITUDE_LIMIT / 10 {
            return None;
        }
        x = x * 10 + u64::from(b - b'0');
        if x > MAGNITUDE_LIMIT {
            return None;
        }
    }
    Some((x, &s[end..]))
}

/// Consumes fractional digits, returning the digits as an integer and their
/// scale. Digits beyond representable precision are dropped.
fn leading_fraction(s: &str) -> (u64, f64, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let mut x: u64 = 0;
    let mut scale = 1.0;
    let mut overflow = false;
    for b in s[..end].bytes() {
        if overflow {
            continue;
        }
        if x > (MAGNITUDE_LIMIT - 1) / 10 {
            overflow = true;
            continue;
        }
        let y = x * 10 + u64::from(b - b'0');
        if y > MAGNITUDE_LIMIT {
            overflow = true;
            continue;
        }
        x = y;
        scale *= 10.0;
    }
    (x, scale, &s[end..])
}

fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let mut s = input;
    let mut negative = false;

    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid(input, "empty duration"));
    }

    let mut total: u64 = 0;
    while !s.is_empty() {
        if !s.starts_with(is_number_char) {
            return Err(invalid(input, "expected a number"));
        }

        let before = s.len();
        let (whole, rest) =
            leading_int(s).ok_or_else(|| invalid(input, "value out of range"))?;
        s = rest;
        let has_whole = before != s.len();

        let mut frac = 0u64;
        let mut scale = 1.0;
        let mut has_frac = false;
        if let Some(rest) = s.strip_prefix('.') {
            let before = rest.len();
            let (f, sc, rest) = leading_fraction(rest);
            frac = f;
            scale = sc;
            has_frac = before != rest.len();
            s = rest;
        }
        if !has_whole && !has_frac {
            return Err(invalid(input, "expected a number"));
        }

        let unit_end = s.find(is_number_char).unwrap_or(s.len());
        if unit_end == 0 {
            return Err(invalid(input, "missing unit"));
        }
        let unit = &s[..unit_end];
        s = &s[unit_end..];
        let scale_ns = unit_scale(unit)
            .ok_or_else(|| invalid(input, &format!("unknown unit '{}'", unit)))?;

        if whole > MAGNITUDE_LIMIT / scale_ns {
            return Err(invalid(input, "value out of range"));
        }
        let mut value = whole * scale_ns;
        if frac > 0 {
            value += (frac as f64 * (scale_ns as f64 / scale)) as u64;
            if value > MAGNITUDE_LIMIT {
                return Err(invalid(input, "value out of range"));
            }
        }
        total += value;
        if total > MAGNITUDE_LIMIT {
            return Err(invalid(input, "value out of range"));
        }
    }

    if negative {
        if total == MAGNITUDE_LIMIT {
            return Ok(Duration(i64::MIN));
        }
        return Ok(Duration(-(total as i64)));
    }
    i64::try_from(total)
        .map(Duration)
        .map_err(|_| invalid(input, "value out of range"))
}

// =============================================================================
// Formatting
// =============================================================================

/// Splits `v` into `v / 10^prec` and the fractional digits as `".ddd"`, with
/// trailing zeros removed. The fraction is empty when all digits are zero.
fn split_fraction(mut v: u64, prec: u32) -> (u64, String) {
    let mut digits = Vec::with_capacity(prec as usize);
    let mut significant = false;
    for _ in 0..prec {
        let digit = (v % 10) as u8;
        significant = significant || digit != 0;
        if significant {
            digits.push(char::from(b'0' + digit));
        }
        v /= 10;
    }
    if digits.is_empty() {
        return (v, String::new());
    }
    let mut frac = String::with_capacity(digits.len() + 1);
    frac.push('.');
    frac.extend(digits.iter().rev());
    (v, frac)
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let u = self.0.unsigned_abs();

        if u == 0 {
            return f.write_str("0s");
        }

        if u < SECOND {
            let (prec, unit) = if u < MICROSECOND {
                (0, "ns")
            } else if u < MILLISECOND {
                (3, "\u{00b5}s")
            } else {
                (6, "ms")
            };
            let (whole, frac) = split_fraction(u, prec);
            return write!(f, "{}{}{}{}", sign, whole, frac, unit);
        }

        let (secs_total, frac) = split_fraction(u, 9);
        let secs = secs_total % 60;
        let mins_total = secs_total / 60;

        f.write_str(sign)?;
        if mins_total > 0 {
            let hours = mins_total / 60;
            if hours > 0 {
                write!(f, "{}h", hours)?;
            }
            write!(f, "{}m", mins_total % 60)?;
        }
        write!(f, "{}{}s", secs, frac)
    }
}

// =============================================================================
// Serde
// =============================================================================

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration string such as \"500ms\" or \"1h30m\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        Duration::parse(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(DurationVisitor)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(s: &str) -> i64 {
        Duration::parse(s).unwrap().as_nanos()
    }

    #[test]
    fn test_parse_single_units() {
        assert_eq!(ns("100ms"), 100_000_000);
        assert_eq!(ns("5s"), 5_000_000_000);
        assert_eq!(ns("2m"), 120_000_000_000);
        assert_eq!(ns("1h"), 3_600_000_000_000);
        assert_eq!(ns("500us"), 500_000);
        assert_eq!(ns("500µs"), 500_000);
        assert_eq!(ns("1000ns"), 1_000);
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(ns("1h30m"), 5_400_000_000_000);
        assert_eq!(ns("1.5h"), 5_400_000_000_000);
        assert_eq!(ns("2h45m"), 9_900_000_000_000);
        assert_eq!(ns("1.5s"), 1_500_000_000);
        assert_eq!(ns(".5s"), 500_000_000);
        assert_eq!(ns("1m30.25s"), 90_250_000_000);
    }

    #[test]
    fn test_parse_sign_and_zero() {
        assert_eq!(ns("0"), 0);
        assert_eq!(ns("-0"), 0);
        assert_eq!(ns("0s"), 0);
        assert_eq!(ns("-1.5s"), -1_500_000_000);
        assert_eq!(ns("+3ms"), 3_000_000);
    }

    #[test]
    fn test_parse_errors() {
        for input in ["", "100", "100days", "s", "1.2.3s", ".s", "-", "1h30", "9999999999h"] {
            let err = Duration::parse(input).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidDurationFormat { .. }),
                "expected InvalidDurationFormat for {:?}, got {:?}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_error_mentions_input() {
        let err = Duration::parse("100days").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("100days"));
        assert!(message.contains("days"));
    }

    #[test]
    fn test_format_canonical() {
        assert_eq!(Duration::ZERO.to_string(), "0s");
        assert_eq!(Duration::from_nanos(1).to_string(), "1ns");
        assert_eq!(Duration::from_nanos(1_000).to_string(), "1µs");
        assert_eq!(Duration::from_nanos(1_500).to_string(), "1.5µs");
        assert_eq!(Duration::from_millis(100).to_string(), "100ms");
        assert_eq!(Duration::from_millis(1_500).to_string(), "1.5s");
        assert_eq!(Duration::from_secs(90).to_string(), "1m30s");
        assert_eq!(Duration::from_secs(5_400).to_string(), "1h30m0s");
        assert_eq!(Duration::from_secs(-2).to_string(), "-2s");
        assert_eq!(Duration::from_nanos(i64::MIN).to_string(), "-2562047h47m16.854775808s");
    }

    #[test]
    fn test_round_trip() {
        let inputs = [
            "100ms", "5s", "2m", "1h", "1h30m", "1.5h", "500us", "1000ns", "-1.5s", "0",
            "2h45m30.5s", "1.000000001s", "999ns", "59m59.999999999s",
        ];
        for input in inputs {
            let parsed = Duration::parse(input).unwrap();
            let formatted = parsed.to_string();
            let reparsed = Duration::parse(&formatted).unwrap();
            assert_eq!(parsed, reparsed, "{} -> {} did not round-trip", input, formatted);
        }

        for nanos in [1, 999, 1_001, 123_456_789, 3_600_000_000_001, i64::MAX, i64::MIN + 1] {
            let d = Duration::from_nanos(nanos);
            assert_eq!(Duration::parse(&d.to_string()).unwrap(), d);
        }
    }

    #[test]
    fn test_std_conversion() {
        let d = Duration::from_millis(250);
        assert_eq!(d.to_std(), Some(std::time::Duration::from_millis(250)));
        assert_eq!(Duration::from_secs(-1).to_std(), None);
        assert_eq!(Duration::from(std::time::Duration::from_secs(3)), Duration::from_secs(3));
        assert_eq!(Duration::from(std::time::Duration::MAX).as_nanos(), i64::MAX);
    }

    #[test]
    fn test_serde_string_form() {
        let d: Duration = serde_json::from_value(serde_json::json!("1h30m")).unwrap();
        assert_eq!(d, Duration::from_secs(5_400));
        assert_eq!(serde_json::to_value(d).unwrap(), serde_json::json!("1h30m0s"));
    }

    #[test]
    fn test_serde_rejects_non_string() {
        let result: Result<Duration, _> = serde_json::from_value(serde_json::json!(100));
        assert!(result.is_err());

        let result: Result<Duration, _> = serde_json::from_value(serde_json::json!("100"));
        assert!(result.is_err());
    }
}
