//! Parsers for the human-readable values used in the configuration file:
//! sizes (`"500 MB"`), durations (`"30 days"`) and rate limits (`"100/minute"`).

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseUnitError(String);

/// When the log file is rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Rotate once the file would grow beyond this many bytes.
    Size(u64),
    Daily,
    Hourly,
    Never,
}

impl FromStr for Rotation {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "1 day" => Ok(Rotation::Daily),
            "hourly" | "1 hour" => Ok(Rotation::Hourly),
            "never" | "none" => Ok(Rotation::Never),
            _ => parse_byte_size(s).map(Rotation::Size),
        }
    }
}

/// A request budget over a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: u32,
    pub per: Duration,
}

impl FromStr for RateLimit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, period) = s
            .split_once('/')
            .ok_or_else(|| ParseUnitError(format!("expected `<count>/<period>`, got {s:?}")))?;

        let requests: u32 = count
            .trim()
            .parse()
            .map_err(|_| ParseUnitError(format!("invalid request count {:?}", count.trim())))?;
        if requests == 0 {
            return Err(ParseUnitError("request count must be greater than 0".into()));
        }

        let per = match period.trim().to_ascii_lowercase().as_str() {
            "second" | "seconds" | "s" => Duration::from_secs(1),
            "minute" | "minutes" | "m" => Duration::from_secs(60),
            "hour" | "hours" | "h" => Duration::from_secs(3600),
            "day" | "days" | "d" => Duration::from_secs(86_400),
            other => return Err(ParseUnitError(format!("unknown rate limit period {other:?}"))),
        };

        Ok(RateLimit { requests, per })
    }
}

/// Parse a size such as `"500 MB"` or `"1GiB"` into bytes. Decimal units
/// (KB, MB, GB, TB) are powers of 1000; binary units (KiB, ...) powers of 1024.
pub fn parse_byte_size(s: &str) -> Result<u64, ParseUnitError> {
    let (value, unit) = split_number(s)?;
    let multiplier: f64 = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "kb" => 1e3,
        "mb" => 1e6,
        "gb" => 1e9,
        "tb" => 1e12,
        "kib" => 1024.0,
        "mib" => 1024.0 * 1024.0,
        "gib" => 1024.0 * 1024.0 * 1024.0,
        "tib" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        other => return Err(ParseUnitError(format!("unknown size unit {other:?}"))),
    };

    let bytes = value * multiplier;
    if bytes < 1.0 {
        return Err(ParseUnitError(format!("size {s:?} is smaller than one byte")));
    }
    Ok(bytes as u64)
}

/// Parse a duration such as `"30 days"`, `"12h"` or `"1.5 weeks"`.
pub fn parse_duration(s: &str) -> Result<Duration, ParseUnitError> {
    let (value, unit) = split_number(s)?;
    let seconds: f64 = match unit.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600.0,
        "d" | "day" | "days" => 86_400.0,
        "w" | "week" | "weeks" => 604_800.0,
        "" => return Err(ParseUnitError(format!("duration {s:?} is missing a unit"))),
        other => return Err(ParseUnitError(format!("unknown duration unit {other:?}"))),
    };

    let total = value * seconds;
    if total <= 0.0 {
        return Err(ParseUnitError(format!("duration {s:?} must be positive")));
    }
    Duration::try_from_secs_f64(total)
        .map_err(|_| ParseUnitError(format!("duration {s:?} is too long")))
}

/// Split `"500 MB"` into `(500.0, "MB")`.
fn split_number(s: &str) -> Result<(f64, &str), ParseUnitError> {
    let s = s.trim();
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(end);

    let value: f64 = number
        .parse()
        .map_err(|_| ParseUnitError(format!("expected a number in {s:?}")))?;
    if !value.is_finite() {
        return Err(ParseUnitError(format!("{s:?} is not a finite number")));
    }
    Ok((value, unit.trim()))
}
