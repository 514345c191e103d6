//! Scheduling planner
//!
//! Turns a target instant into a minute-quantized [`ScheduleTarget`] and
//! drives the editor's scheduling widget to it.
//!
//! The widget only offers 10-minute steps and only shows the current month;
//! cross-month targets are rejected up front instead of navigated to.

use crate::affordances;
use crate::driver::EditorDriver;
use crate::error::{DriverError, PublishError, PublishResult};
use crate::services::editor_session::EditorSession;
use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use serde::Serialize;

/// Hour used when a scheduled request has no explicit time
pub const DEFAULT_HOUR: u32 = 10;

/// Granularity of the minute selector
pub const MINUTE_STEP: u32 = 10;

/// Tomorrow at 10:00 (local)
pub fn default_target(now: NaiveDateTime) -> NaiveDateTime {
    let tomorrow = now.date() + Duration::days(1);
    tomorrow.and_hms_opt(DEFAULT_HOUR, 0, 0).unwrap_or(now)
}

/// Round a minute up to the next multiple of 10
///
/// Returns the new minute and whether it carried into the next hour.
pub fn quantize_minute(minute: u32) -> (u32, bool) {
    let rounded = (minute + MINUTE_STEP - 1) / MINUTE_STEP * MINUTE_STEP;
    if rounded >= 60 {
        (0, true)
    } else {
        (rounded, false)
    }
}

/// Quantize `(hour, minute)`; a carry wraps the hour modulo 24 without
/// touching the day
pub fn quantize(hour: u32, minute: u32) -> (u32, u32) {
    let (minute, carried) = quantize_minute(minute);
    let hour = if carried { (hour + 1) % 24 } else { hour };
    (hour, minute)
}

/// Day cell and time selector values for the scheduling widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleTarget {
    day_of_month: u32,
    hour: u32,
    minute: u32,
}

impl ScheduleTarget {
    pub fn new(day_of_month: u32, hour: u32, minute: u32) -> PublishResult<Self> {
        if !(1..=31).contains(&day_of_month) {
            return Err(PublishError::InvalidOptions(format!(
                "day of month {} out of range",
                day_of_month
            )));
        }
        if hour >= 24 {
            return Err(PublishError::InvalidOptions(format!("hour {} out of range", hour)));
        }
        if minute >= 60 || minute % MINUTE_STEP != 0 {
            return Err(PublishError::InvalidOptions(format!(
                "minute {} is not a multiple of {}",
                minute, MINUTE_STEP
            )));
        }
        Ok(Self {
            day_of_month,
            hour,
            minute,
        })
    }

    /// Quantized target for an instant
    pub fn from_datetime(at: NaiveDateTime) -> Self {
        let (hour, minute) = quantize(at.hour(), at.minute());
        if hour < at.hour() {
            tracing::warn!(
                at = %at,
                hour,
                minute,
                "Quantization wrapped past midnight on the same day"
            );
        }
        Self {
            day_of_month: at.day(),
            hour,
            minute,
        }
    }

    pub fn day_of_month(&self) -> u32 {
        self.day_of_month
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }
}

/// Check a requested instant against what the widget can express
///
/// The calendar renders the current month only, so anything outside it
/// (and anything already past) is `ScheduleOutOfRange`.
pub fn validate_target(now: NaiveDateTime, at: NaiveDateTime) -> PublishResult<ScheduleTarget> {
    if at <= now {
        return Err(PublishError::ScheduleOutOfRange(format!(
            "{} is not in the future",
            at
        )));
    }
    if (at.year(), at.month()) != (now.year(), now.month()) {
        return Err(PublishError::ScheduleOutOfRange(format!(
            "{} is outside the displayed month {}-{:02}",
            at,
            now.year(),
            now.month()
        )));
    }
    Ok(ScheduleTarget::from_datetime(at))
}

/// Drive the scheduling widget and confirm
///
/// Every step before the confirm is best-effort: a failure is logged and
/// appended to `warnings`. A missing confirm control is fatal.
pub async fn drive<D: EditorDriver>(
    session: &mut EditorSession<D>,
    target: &ScheduleTarget,
    warnings: &mut Vec<String>,
) -> PublishResult<()> {
    tracing::info!(
        day = target.day_of_month,
        hour = target.hour,
        minute = target.minute,
        "Scheduling publication"
    );

    let steps = [
        ("open publish panel", affordances::publish_panel()),
        ("select scheduled option", affordances::schedule_option()),
        ("open date widget", affordances::date_input()),
        ("select day", affordances::calendar_day(target.day_of_month)),
        ("select hour", affordances::hour_option(target.hour)),
        ("select minute", affordances::minute_option(target.minute)),
    ];

    for (step, locator) in steps {
        match session.click(&locator).await {
            Ok(()) => session.settle().await,
            Err(e) if e.is_session_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(step, error = %e, "Schedule step failed");
                warnings.push(format!("schedule step '{}' failed: {}", step, e));
            }
        }
    }

    match session.click(&affordances::publish_confirm()).await {
        Ok(()) => {
            session.settle().await;
            Ok(())
        }
        Err(DriverError::NoSuchElement(name)) => Err(PublishError::ScheduleStepNotFound(name)),
        Err(e) => Err(e.into()),
    }
}
