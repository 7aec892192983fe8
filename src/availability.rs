//! Seat availability, time state and payment state derivation.
//!
//! Every endpoint that reports free seats, whether a cycle is running, or
//! whether an enrollment is paid goes through these functions. They are pure
//! and take `now` explicitly so callers and tests control the clock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::PaymentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLight {
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Availability {
    /// `None` means unlimited.
    pub capacity: Option<i32>,
    pub active: i64,
    pub seats_left: Option<i64>,
    pub display: String,
    pub light: TrafficLight,
}

impl Availability {
    pub fn compute(capacity: Option<i32>, active: i64) -> Self {
        let active = active.max(0);
        match capacity {
            Some(cap) => {
                let seats_left = (i64::from(cap) - active).max(0);
                Self {
                    capacity: Some(cap),
                    active,
                    seats_left: Some(seats_left),
                    display: format!("{seats_left}/{cap}"),
                    light: if seats_left > 0 {
                        TrafficLight::Green
                    } else {
                        TrafficLight::Red
                    },
                }
            }
            None => Self {
                capacity: None,
                active,
                seats_left: None,
                display: "Unlimited".to_string(),
                light: TrafficLight::Green,
            },
        }
    }

    pub fn has_room(&self) -> bool {
        self.seats_left.is_none_or(|left| left > 0)
    }
}

/// Cycle override wins over the workshop default.
pub fn effective_capacity(cycle_override: Option<i32>, workshop_default: Option<i32>) -> Option<i32> {
    cycle_override.or(workshop_default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimeState {
    Upcoming,
    Ongoing,
    Past,
}

pub fn time_state(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> TimeState {
    let end = end.max(start);
    if now < start {
        TimeState::Upcoming
    } else if now > end {
        TimeState::Past
    } else {
        TimeState::Ongoing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

/// Time left until `start`, or `None` once it has begun.
pub fn countdown(now: DateTime<Utc>, start: DateTime<Utc>) -> Option<Countdown> {
    if now >= start {
        return None;
    }
    let total_minutes = (start - now).num_minutes();
    Some(Countdown {
        days: total_minutes / (24 * 60),
        hours: (total_minutes % (24 * 60)) / 60,
        minutes: total_minutes % 60,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Paid,
    Pending,
    None,
}

pub fn payment_state<I>(statuses: I) -> PaymentState
where
    I: IntoIterator<Item = PaymentStatus>,
{
    let mut state = PaymentState::None;
    for status in statuses {
        match status {
            PaymentStatus::Paid => return PaymentState::Paid,
            PaymentStatus::Pending => state = PaymentState::Pending,
        }
    }
    state
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn label(&self) -> String {
        let start = self.start.date_naive();
        let end = self.end.date_naive();
        if start == end {
            start.format("%Y-%m-%d").to_string()
        } else {
            format!("{} – {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
        }
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> TimeState {
        time_state(now, self.start, self.end)
    }
}

/// Range covered by a cycle. Sessions take precedence over the cycle's own
/// dates; a cycle without an end date ends when it starts.
pub fn normalize_range<I>(
    cycle_start: DateTime<Utc>,
    cycle_end: Option<DateTime<Utc>>,
    sessions: I,
) -> DateRange
where
    I: IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
{
    let mut bounds: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    for (start, end) in sessions {
        bounds = Some(match bounds {
            Some((lo, hi)) => (lo.min(start), hi.max(end)),
            None => (start, end),
        });
    }

    let (start, end) = bounds.unwrap_or((cycle_start, cycle_end.unwrap_or(cycle_start)));
    DateRange {
        start,
        end: end.max(start),
    }
}
