use chrono::{DateTime, Utc};
use std::fmt::Display;

use crate::error::OracleError;
use crate::Result;

/// Earliest timestamp, in milliseconds, the Prometheus HTTP API accepts.
/// The API cannot omit a time range, so this bounds queries over all time.
pub const PROMETHEUS_MIN_TIME_MS: i64 = (i64::MIN / 1000 + 62_135_596_801) * 1000;

/// Latest timestamp, in milliseconds, the Prometheus HTTP API accepts.
pub const PROMETHEUS_MAX_TIME_MS: i64 = (i64::MAX / 1000 - 62_135_596_801) * 1000 + 999;

/// Wrapper around the `checked_*` integer ops, mapping `None` to
/// `OracleError::Overflow`.
pub trait CheckedOps: Sized {
    fn add_chk(self, rhs: Self) -> Result<Self>;
}

impl CheckedOps for i32 {
    fn add_chk(self, rhs: Self) -> Result<Self> {
        self.checked_add(rhs)
            .ok_or_else(|| OracleError::overflowed(self, rhs, "adding"))
    }
}

impl CheckedOps for i64 {
    fn add_chk(self, rhs: Self) -> Result<Self> {
        self.checked_add(rhs)
            .ok_or_else(|| OracleError::overflowed(self, rhs, "adding"))
    }
}

/// A wrapper around `TryFrom`, returning `OracleError::FailedCast` on error.
pub fn cast_chk<T, U>(val: T, name: &str) -> Result<U>
where
    T: Copy + Display,
    U: std::convert::TryFrom<T>,
{
    U::try_from(val).map_err(|_| OracleError::failed_cast::<T, U>(val, name))
}

/// Convert a timestamp to Prometheus milliseconds. Sub-millisecond
/// precision is truncated.
#[inline]
pub fn time_to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Convert Prometheus milliseconds to the float seconds the query API uses.
#[inline]
pub fn millis_to_api_seconds(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

/// Convert query API float seconds back to milliseconds.
#[inline]
pub fn api_seconds_to_millis(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}
