//! Schedules computed from the clock instead of page text.
use chrono::{DateTime, Datelike, Days, Duration, NaiveTime, TimeZone, Weekday};

use crate::datetime::{adjust_for_past, localize, ParseStrategy, ResolveError, ResolvedSchedule};

/// `now` plus `minutes`. The offset must be positive.
pub fn in_minutes<Tz: TimeZone>(
    now: &DateTime<Tz>,
    minutes: i64,
) -> Result<ResolvedSchedule, ResolveError> {
    offset_from(now, minutes)
}

pub fn in_hours<Tz: TimeZone>(
    now: &DateTime<Tz>,
    hours: i64,
) -> Result<ResolvedSchedule, ResolveError> {
    offset_from(now, hours.saturating_mul(60))
}

/// `hour:minute` on the day `days_ahead` days after today. Same-day times
/// that already passed move to the next day.
pub fn at_local_time<Tz: TimeZone>(
    now: &DateTime<Tz>,
    hour: u32,
    minute: u32,
    days_ahead: u32,
) -> Result<ResolvedSchedule, ResolveError> {
    let clock = clock(hour, minute)?;
    let day = now
        .date_naive()
        .checked_add_days(Days::new(u64::from(days_ahead)))
        .ok_or(ResolveError::InvalidTime { hour, minute })?;
    let ts = localize(&day.and_time(clock), &now.timezone())
        .ok_or(ResolveError::InvalidTime { hour, minute })?;
    Ok(adjust_for_past(ts, ParseStrategy::Preset, now))
}

/// Next occurrence of `hour:minute`, today or tomorrow.
pub fn next_daily<Tz: TimeZone>(
    now: &DateTime<Tz>,
    hour: u32,
    minute: u32,
) -> Result<ResolvedSchedule, ResolveError> {
    at_local_time(now, hour, minute, 0)
}

/// `hour:minute` on the next `weekday`. When today is `weekday` the result is
/// a week out.
pub fn next_weekly<Tz: TimeZone>(
    now: &DateTime<Tz>,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> Result<ResolvedSchedule, ResolveError> {
    let today = now.weekday().num_days_from_monday() as i64;
    let mut days_ahead = weekday.num_days_from_monday() as i64 - today;
    if days_ahead <= 0 {
        days_ahead += 7;
    }
    at_local_time(now, hour, minute, days_ahead as u32)
}

fn clock(hour: u32, minute: u32) -> Result<NaiveTime, ResolveError> {
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or(ResolveError::InvalidTime { hour, minute })
}

fn offset_from<Tz: TimeZone>(
    now: &DateTime<Tz>,
    minutes: i64,
) -> Result<ResolvedSchedule, ResolveError> {
    if minutes <= 0 {
        return Err(ResolveError::NonPositiveOffset { minutes });
    }
    let ts = Duration::try_minutes(minutes)
        .and_then(|delta| crate::datetime::to_fixed(now).checked_add_signed(delta))
        .ok_or(ResolveError::OutOfRange)?;
    Ok(ResolvedSchedule {
        timestamp: ts,
        was_adjusted_for_past: false,
        strategy: ParseStrategy::Preset,
    })
}
