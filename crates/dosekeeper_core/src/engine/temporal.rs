//! Administration timestamp normalization.
//!
//! # Responsibility
//! - Parse caller-supplied administration times into UTC instants.
//! - Enforce the backdating window on creation and on correction.
//!
//! # Invariants
//! - Offset-less input is UTC, never local time.
//! - Accepted instants satisfy `now - 24h <= instant <= now` (inclusive).

use super::error::{ValidationError, MAX_BACKDATE_HOURS};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Administration time as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampInput {
    /// ISO-8601-like text, with or without offset.
    Text(String),
    /// Offset-aware instant.
    Aware(DateTime<FixedOffset>),
    /// Offset-less instant, taken as UTC.
    Naive(NaiveDateTime),
}

impl From<&str> for TimestampInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TimestampInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for TimestampInput {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Aware(value.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for TimestampInput {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Aware(value)
    }
}

impl From<NaiveDateTime> for TimestampInput {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

impl TimestampInput {
    /// Converts the input to UTC without applying backdating bounds.
    pub fn to_utc(&self) -> Result<DateTime<Utc>, ValidationError> {
        match self {
            Self::Text(text) => parse_timestamp(text),
            Self::Aware(value) => Ok(value.with_timezone(&Utc)),
            Self::Naive(value) => Ok(Utc.from_utc_datetime(value)),
        }
    }
}

/// Parses timestamp text into UTC.
///
/// Accepts `YYYY-MM-DD[T| ]HH:MM[:SS[.fff]]` with an optional `Z` or
/// `+HH:MM` suffix, or a bare date (midnight UTC).
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = text.trim();
    let invalid = || ValidationError::InvalidDatetimeFormat(trimmed.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let normalized = match trimmed.strip_suffix(['Z', 'z']) {
        Some(stripped) => format!("{stripped}+00:00"),
        None => trimmed.to_string(),
    };

    for format in OFFSET_FORMATS {
        if let Ok(value) = DateTime::parse_from_str(&normalized, format) {
            return Ok(value.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(Utc.from_utc_datetime(&value));
        }
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|value| Utc.from_utc_datetime(&value))
        .ok_or_else(invalid)
}

/// Checks that `instant` lies within the backdating window ending at `now`.
pub fn check_backdate_bounds(
    instant: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if instant > now {
        return Err(ValidationError::FutureTimestamp);
    }
    if instant < now - Duration::hours(MAX_BACKDATE_HOURS) {
        return Err(ValidationError::TimestampTooOld);
    }
    Ok(())
}

/// Resolves the administration instant for a new or corrected dose.
///
/// Absent input defaults to `now`. Present input is converted to UTC and
/// must fall inside the backdating window.
pub fn normalize_administered_at(
    input: Option<&TimestampInput>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    let Some(input) = input else {
        return Ok(now);
    };

    let instant = input.to_utc()?;
    check_backdate_bounds(instant, now)?;
    Ok(instant)
}
