//! Resolves free-text date and time strings scraped from a page into a single
//! absolute timestamp.
//!
//! Parsing uses a fixed grammar (see [`DATE_FORMATS`] and [`TIME_FORMATS`])
//! rather than a locale-sensitive parser. Slash dates are read month first.
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// Accepted date layouts, tried in order.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %B %d, %Y",
];

/// Accepted time layouts for the space-joined strategy.
pub const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M:%S %p"];

const ISO_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(AM|PM)?").expect("valid time pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("date or time input is missing")]
    InputMissing,
    #[error("could not parse date {date:?} with time {time:?}")]
    Parse { date: String, time: String },
    #[error("invalid time of day {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },
    #[error("offset must be positive, got {minutes} minutes")]
    NonPositiveOffset { minutes: i64 },
    #[error("scheduled time is out of range")]
    OutOfRange,
}

impl ResolveError {
    fn parse(date: &str, time: &str) -> Self {
        ResolveError::Parse {
            date: date.to_string(),
            time: time.to_string(),
        }
    }
}

/// Which step of the fallback chain produced the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// `"<date> <time>"`
    Joined,
    /// `"<date>T<time>"`
    IsoJoined,
    /// Date parsed alone, time matched by pattern.
    Split,
    /// Computed from a preset rather than parsed text.
    Preset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDateTimeInput {
    pub date_part: String,
    pub time_part: String,
}

impl RawDateTimeInput {
    pub fn new(date_part: impl Into<String>, time_part: impl Into<String>) -> Self {
        Self {
            date_part: date_part.into(),
            time_part: time_part.into(),
        }
    }

    pub fn resolve<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<ResolvedSchedule, ResolveError> {
        resolve(&self.date_part, &self.time_part, now)
    }
}

/// A timestamp ready to be scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchedule {
    pub timestamp: DateTime<FixedOffset>,
    pub was_adjusted_for_past: bool,
    pub strategy: ParseStrategy,
}

/// Resolve `date_part` and `time_part` relative to `now`.
///
/// Zone-less input is read as wall-clock time in `now`'s time zone. A result
/// at or before `now` is moved forward by exactly 24 hours, once.
pub fn resolve<Tz: TimeZone>(
    date_part: &str,
    time_part: &str,
    now: &DateTime<Tz>,
) -> Result<ResolvedSchedule, ResolveError> {
    let date = date_part.trim();
    let time = time_part.trim();
    if date.is_empty() || time.is_empty() {
        return Err(ResolveError::InputMissing);
    }

    let tz = now.timezone();
    let (timestamp, strategy) = parse_joined(date, time, &tz)
        .map(|ts| (ts, ParseStrategy::Joined))
        .or_else(|| parse_iso_joined(date, time, &tz).map(|ts| (ts, ParseStrategy::IsoJoined)))
        .or_else(|| parse_split(date, time, &tz).map(|ts| (ts, ParseStrategy::Split)))
        .ok_or_else(|| ResolveError::parse(date, time))?;

    debug!(%timestamp, ?strategy, "parsed date/time");
    Ok(adjust_for_past(timestamp, strategy, now))
}

/// Apply the single next-day correction used for every resolved schedule.
pub fn adjust_for_past<Tz: TimeZone>(
    timestamp: DateTime<FixedOffset>,
    strategy: ParseStrategy,
    now: &DateTime<Tz>,
) -> ResolvedSchedule {
    let now = to_fixed(now);
    if timestamp <= now {
        warn!(%timestamp, %now, "scheduled time is in the past, adding 24 hours");
        return ResolvedSchedule {
            timestamp: timestamp + Duration::hours(24),
            was_adjusted_for_past: true,
            strategy,
        };
    }
    ResolvedSchedule {
        timestamp,
        was_adjusted_for_past: false,
        strategy,
    }
}

/// Convert a 12-hour clock hour to 24-hour. Without a marker the hour is
/// already 24-hour and passes through.
pub fn normalize_hour(hour: u32, meridiem: Option<Meridiem>) -> u32 {
    match meridiem {
        Some(Meridiem::Pm) if hour != 12 => hour + 12,
        Some(Meridiem::Am) if hour == 12 => 0,
        _ => hour,
    }
}

/// Extract `hour:minute` with an optional AM/PM marker from anywhere in
/// `text`, normalized to a 24-hour time.
pub fn match_time(text: &str) -> Option<NaiveTime> {
    let caps = TIME_PATTERN.captures(text)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    let meridiem = caps.get(3).map(|m| {
        if m.as_str().eq_ignore_ascii_case("pm") {
            Meridiem::Pm
        } else {
            Meridiem::Am
        }
    });
    NaiveTime::from_hms_opt(normalize_hour(hour, meridiem), minute, 0)
}

/// Parse a date alone against [`DATE_FORMATS`].
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

pub(crate) fn to_fixed<Tz: TimeZone>(dt: &DateTime<Tz>) -> DateTime<FixedOffset> {
    dt.with_timezone(&dt.offset().fix())
}

pub(crate) fn localize<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<FixedOffset>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| to_fixed(&dt))
}

fn parse_joined<Tz: TimeZone>(date: &str, time: &str, tz: &Tz) -> Option<DateTime<FixedOffset>> {
    let joined = format!("{date} {time}");
    DATE_FORMATS
        .iter()
        .flat_map(|d| TIME_FORMATS.iter().map(move |t| format!("{d} {t}")))
        .find_map(|fmt| NaiveDateTime::parse_from_str(&joined, &fmt).ok())
        .and_then(|naive| localize(&naive, tz))
}

fn parse_iso_joined<Tz: TimeZone>(
    date: &str,
    time: &str,
    tz: &Tz,
) -> Option<DateTime<FixedOffset>> {
    let joined = format!("{date}T{time}");
    if let Ok(dt) = DateTime::parse_from_rfc3339(&joined) {
        return Some(dt);
    }
    ISO_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&joined, fmt).ok())
        .and_then(|naive| localize(&naive, tz))
}

fn parse_split<Tz: TimeZone>(date: &str, time: &str, tz: &Tz) -> Option<DateTime<FixedOffset>> {
    let day = parse_date(date)?;
    let clock = match_time(time)?;
    localize(&day.and_time(clock), tz)
}
