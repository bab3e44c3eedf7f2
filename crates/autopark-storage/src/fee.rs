//! Fee computation and receipt formatting.
//!
//! Parking is billed per started billing unit: a stay of 61 minutes with a
//! one-hour unit costs two units. A zero or negative stay still costs one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autopark_core::Money;
use autopark_core::constants::{DEFAULT_BILLING_UNIT_SECS, DEFAULT_RATE_MINOR};

use crate::error::{StorageError, StorageResult};

/// Billing unit and rate per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tariff {
    unit: Duration,
    rate: Money,
}

impl Tariff {
    /// # Errors
    /// Rejects a billing unit shorter than one millisecond and a negative rate.
    pub fn new(unit: Duration, rate: Money) -> StorageResult<Self> {
        if unit.as_millis() == 0 {
            return Err(StorageError::Configuration(
                "billing unit must be at least 1 ms".to_string(),
            ));
        }
        if rate.is_negative() {
            return Err(StorageError::Configuration(format!(
                "rate must not be negative, got {rate}"
            )));
        }
        Ok(Self { unit, rate })
    }

    pub fn unit(&self) -> Duration {
        self.unit
    }

    pub fn rate(&self) -> Money {
        self.rate
    }

    /// Number of billing units charged for a stay, at least one.
    pub fn billable_units(&self, entry: DateTime<Utc>, exit: DateTime<Utc>) -> u64 {
        let elapsed_ms = (exit - entry).num_milliseconds();
        if elapsed_ms <= 0 {
            return 1;
        }
        let unit_ms = u64::try_from(self.unit.as_millis()).unwrap_or(u64::MAX);
        (elapsed_ms as u64).div_ceil(unit_ms).max(1)
    }

    /// Fee for a stay from `entry` to `exit`.
    pub fn compute_fee(&self, entry: DateTime<Utc>, exit: DateTime<Utc>) -> Money {
        let units = i64::try_from(self.billable_units(entry, exit)).unwrap_or(i64::MAX);
        self.rate.times(units)
    }
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(DEFAULT_BILLING_UNIT_SECS),
            rate: Money::from_minor(DEFAULT_RATE_MINOR),
        }
    }
}

/// `tariff` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffConfig {
    pub unit_seconds: u64,
    pub rate: Money,
    /// Printed in front of amounts on receipts.
    pub currency_symbol: String,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            unit_seconds: DEFAULT_BILLING_UNIT_SECS,
            rate: Money::from_minor(DEFAULT_RATE_MINOR),
            currency_symbol: "$".to_string(),
        }
    }
}

impl TariffConfig {
    /// # Errors
    /// See [`Tariff::new`].
    pub fn tariff(&self) -> StorageResult<Tariff> {
        Tariff::new(Duration::from_secs(self.unit_seconds), self.rate)
    }

    /// `"$2.00"` style rendering of an amount.
    pub fn format_amount(&self, amount: Money) -> String {
        format!("{}{}", self.currency_symbol, amount)
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Human readable length of a stay, e.g. `"2 hours 30 minutes"`.
///
/// Seconds are only shown for stays shorter than a minute.
pub fn format_duration(entry: DateTime<Utc>, exit: DateTime<Utc>) -> String {
    let total = (exit - entry).num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    match (hours, minutes) {
        (h, m) if h > 0 && m > 0 => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
        (h, _) if h > 0 => plural(h, "hour"),
        (_, m) if m > 0 => plural(m, "minute"),
        _ => plural(seconds, "second"),
    }
}
