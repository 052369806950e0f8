//! Dose readiness evaluation.
//!
//! # Responsibility
//! - Derive the administration state of an assignment from its resolved
//!   frequency, the last administration instant and the current instant.
//!
//! # Invariants
//! - Pure: `now` is always injected, never read from a wall clock here.
//! - Fixed frequencies never report `Overdue`; past-due fixed doses stay
//!   `Ready` with `can_administer = true`.
//! - `Ready` with `can_administer = false` means "not due and not imminent".
//! - `time_until_next` is only populated while a dose cannot be given.

use super::frequency::{FrequencyKind, FrequencySpec};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Hours before the next permissible dose at which the state turns `Soon`.
pub const SOON_WINDOW_HOURS: f64 = 1.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Readiness state reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    Ready,
    Soon,
    Overdue,
}

/// Derived readiness snapshot. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessStatus {
    #[serde(rename = "status")]
    pub state: ReadinessState,
    pub can_administer: bool,
    /// Hours until the next permissible dose.
    pub time_until_next: Option<f64>,
    /// Hours until the range maximum; range frequencies only.
    pub time_until_max: Option<f64>,
    pub last_administration: Option<DateTime<Utc>>,
    pub next_dose_time: Option<DateTime<Utc>>,
    /// Range frequencies only.
    pub next_dose_max_time: Option<DateTime<Utc>>,
    pub frequency_kind: FrequencyKind,
}

impl ReadinessStatus {
    fn never_administered(kind: FrequencyKind) -> Self {
        Self {
            state: ReadinessState::Ready,
            can_administer: true,
            time_until_next: None,
            time_until_max: None,
            last_administration: None,
            next_dose_time: None,
            next_dose_max_time: None,
            frequency_kind: kind,
        }
    }
}

/// Computes the readiness of a dose at `now`.
///
/// Naive instants must be converted with `Utc.from_utc_datetime` before
/// calling; they are never interpreted as local time.
pub fn evaluate_readiness(
    spec: &FrequencySpec,
    last_administration: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ReadinessStatus {
    let Some(last) = last_administration else {
        return ReadinessStatus::never_administered(spec.kind());
    };

    match *spec {
        FrequencySpec::Fixed { hours } => evaluate_fixed(hours, last, now),
        FrequencySpec::Range {
            min_hours,
            max_hours,
        } => evaluate_range(min_hours, max_hours, last, now),
    }
}

fn evaluate_fixed(hours: f64, last: DateTime<Utc>, now: DateTime<Utc>) -> ReadinessStatus {
    let next_dose_time = add_hours(last, hours);
    let time_until_next = hours_between(next_dose_time, now);

    let (state, can_administer) = if now >= next_dose_time {
        (ReadinessState::Ready, true)
    } else if time_until_next <= SOON_WINDOW_HOURS {
        (ReadinessState::Soon, false)
    } else {
        (ReadinessState::Ready, false)
    };

    ReadinessStatus {
        state,
        can_administer,
        time_until_next: (!can_administer).then_some(time_until_next),
        time_until_max: None,
        last_administration: Some(last),
        next_dose_time: Some(next_dose_time),
        next_dose_max_time: None,
        frequency_kind: FrequencyKind::Fixed,
    }
}

fn evaluate_range(
    min_hours: f64,
    max_hours: f64,
    last: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ReadinessStatus {
    let next_dose_min_time = add_hours(last, min_hours);
    let next_dose_max_time = add_hours(last, max_hours);
    let time_until_min = hours_between(next_dose_min_time, now);
    let time_until_max = hours_between(next_dose_max_time, now);

    let (state, can_administer) = if now >= next_dose_max_time {
        (ReadinessState::Overdue, true)
    } else if now >= next_dose_min_time {
        (ReadinessState::Ready, true)
    } else if time_until_min <= SOON_WINDOW_HOURS {
        (ReadinessState::Soon, false)
    } else {
        (ReadinessState::Ready, false)
    };

    ReadinessStatus {
        state,
        can_administer,
        time_until_next: (!can_administer).then_some(time_until_min),
        time_until_max: (now < next_dose_max_time).then_some(time_until_max),
        last_administration: Some(last),
        next_dose_time: Some(next_dose_min_time),
        next_dose_max_time: Some(next_dose_max_time),
        frequency_kind: FrequencyKind::Range,
    }
}

/// Offsets `instant` by fractional hours at millisecond precision,
/// saturating at the representable maximum.
fn add_hours(instant: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
    let millis = (hours * MILLIS_PER_HOUR).round() as i64;
    Duration::try_milliseconds(millis)
        .and_then(|delta| instant.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn hours_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

#[cfg(test)]
mod tests {
    use super::{evaluate_readiness, ReadinessState, ReadinessStatus};
    use crate::engine::frequency::{FrequencyKind, FrequencySpec};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn minutes_ago(minutes: i64) -> Option<DateTime<Utc>> {
        Some(now() - Duration::minutes(minutes))
    }

    fn fixed(hours: f64) -> FrequencySpec {
        FrequencySpec::Fixed { hours }
    }

    fn range(min_hours: f64, max_hours: f64) -> FrequencySpec {
        FrequencySpec::Range {
            min_hours,
            max_hours,
        }
    }

    fn outcome(status: &ReadinessStatus) -> (ReadinessState, bool) {
        (status.state, status.can_administer)
    }

    #[test]
    fn never_administered_is_ready_for_any_spec() {
        for spec in [fixed(4.0), range(4.0, 6.0)] {
            let status = evaluate_readiness(&spec, None, now());
            assert_eq!(outcome(&status), (ReadinessState::Ready, true));
            assert_eq!(status.time_until_next, None);
            assert_eq!(status.time_until_max, None);
            assert_eq!(status.next_dose_time, None);
            assert_eq!(status.next_dose_max_time, None);
            assert_eq!(status.last_administration, None);
        }
    }

    #[test]
    fn fixed_frequency_states() {
        let spec = fixed(4.0);

        let not_yet = evaluate_readiness(&spec, minutes_ago(120), now());
        assert_eq!(outcome(&not_yet), (ReadinessState::Ready, false));
        assert_eq!(not_yet.time_until_next, Some(2.0));

        let soon = evaluate_readiness(&spec, minutes_ago(210), now());
        assert_eq!(outcome(&soon), (ReadinessState::Soon, false));
        assert_eq!(soon.time_until_next, Some(0.5));

        let due = evaluate_readiness(&spec, minutes_ago(240), now());
        assert_eq!(outcome(&due), (ReadinessState::Ready, true));
        assert_eq!(due.time_until_next, None);
        assert_eq!(due.next_dose_time, Some(now()));

        let past_due = evaluate_readiness(&spec, minutes_ago(300), now());
        assert_eq!(outcome(&past_due), (ReadinessState::Ready, true));
        assert_eq!(past_due.next_dose_max_time, None);
        assert_eq!(past_due.frequency_kind, FrequencyKind::Fixed);
    }

    #[test]
    fn exactly_one_hour_before_next_dose_is_soon() {
        let fixed_status = evaluate_readiness(&fixed(4.0), minutes_ago(180), now());
        assert_eq!(outcome(&fixed_status), (ReadinessState::Soon, false));
        assert_eq!(fixed_status.time_until_next, Some(1.0));

        let range_status = evaluate_readiness(&range(4.0, 6.0), minutes_ago(180), now());
        assert_eq!(outcome(&range_status), (ReadinessState::Soon, false));
    }

    #[test]
    fn range_frequency_states() {
        let spec = range(4.0, 6.0);

        let not_yet = evaluate_readiness(&spec, minutes_ago(120), now());
        assert_eq!(outcome(&not_yet), (ReadinessState::Ready, false));
        assert_eq!(not_yet.time_until_next, Some(2.0));
        assert_eq!(not_yet.time_until_max, Some(4.0));

        let soon = evaluate_readiness(&spec, minutes_ago(210), now());
        assert_eq!(outcome(&soon), (ReadinessState::Soon, false));

        let window = evaluate_readiness(&spec, minutes_ago(300), now());
        assert_eq!(outcome(&window), (ReadinessState::Ready, true));
        assert_eq!(window.time_until_next, None);
        assert_eq!(window.time_until_max, Some(1.0));

        let overdue = evaluate_readiness(&spec, minutes_ago(420), now());
        assert_eq!(outcome(&overdue), (ReadinessState::Overdue, true));
        assert_eq!(overdue.time_until_max, None);
        assert_eq!(
            overdue.next_dose_max_time,
            Some(now() - Duration::minutes(60))
        );
    }

    #[test]
    fn range_maximum_boundary_is_overdue() {
        let status = evaluate_readiness(&range(4.0, 6.0), minutes_ago(360), now());
        assert_eq!(outcome(&status), (ReadinessState::Overdue, true));
        assert_eq!(status.time_until_max, None);
    }

    #[test]
    fn fractional_hours_are_respected() {
        let status = evaluate_readiness(&fixed(0.5), minutes_ago(29), now());
        assert_eq!(outcome(&status), (ReadinessState::Soon, false));
        let status = evaluate_readiness(&fixed(0.5), minutes_ago(30), now());
        assert_eq!(outcome(&status), (ReadinessState::Ready, true));
    }

    #[test]
    fn huge_frequency_does_not_overflow() {
        let status = evaluate_readiness(&fixed(1.0e15), minutes_ago(0), now());
        assert_eq!(outcome(&status), (ReadinessState::Ready, false));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let spec = range(4.0, 6.0);
        let first = evaluate_readiness(&spec, minutes_ago(200), now());
        let second = evaluate_readiness(&spec, minutes_ago(200), now());
        assert_eq!(first, second);
        assert_eq!(
            first.time_until_next.map(f64::to_bits),
            second.time_until_next.map(f64::to_bits)
        );
    }

    #[test]
    fn status_serializes_with_wire_names() {
        let status = evaluate_readiness(&range(4.0, 6.0), minutes_ago(420), now());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "overdue");
        assert_eq!(json["can_administer"], true);
        assert_eq!(json["frequency_kind"], "range");
        assert!(json["time_until_next"].is_null());
    }
}
