//! Resolution of the optional "on or after" command argument.
//!
//! The argument is turned into a concrete calendar date once, before any
//! feed is fetched. "Today" and the caller's UTC offset are passed in so
//! resolution stays a pure function of its inputs.

use chrono::{
    DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone,
    Utc,
};
use std::fmt;

/// Date formats accepted for an explicit threshold, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Minimum publish date an entry must have to be kept.
///
/// Always a real calendar date, read in the offset of the user's calendar.
/// The default is 1970-01-01 UTC, which keeps every dated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateThreshold {
    date: NaiveDate,
    offset: FixedOffset,
}

impl DateThreshold {
    /// A threshold whose day starts at midnight UTC.
    pub fn new(date: NaiveDate) -> Self {
        Self::with_offset(date, Utc.fix())
    }

    /// A threshold whose day starts at midnight in `offset`.
    pub fn with_offset(date: NaiveDate, offset: FixedOffset) -> Self {
        Self { date, offset }
    }

    /// The epoch threshold, i.e. no effective filtering.
    pub fn unbounded() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH.date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// True when the date is the epoch default.
    pub fn is_unbounded(&self) -> bool {
        self.date == DateTime::<Utc>::UNIX_EPOCH.date_naive()
    }

    /// Start of the threshold day in its own offset, as a UTC instant.
    pub fn instant(&self) -> DateTime<Utc> {
        start_of_day(self.date, &self.offset)
    }

    /// Whether an entry with the given publish time satisfies the filter.
    ///
    /// Undated entries only pass the epoch threshold.
    pub fn admits(&self, published: Option<DateTime<Utc>>) -> bool {
        match published {
            Some(ts) => ts >= self.instant(),
            None => self.is_unbounded(),
        }
    }
}

/// First instant of `date` in `tz`.
///
/// Zones that skip midnight on a transition day start at the earliest valid
/// time in the first hour; failing that the day is read as UTC.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    midnight
        .and_local_timezone(tz.clone())
        .earliest()
        .or_else(|| {
            (1..=60)
                .map(|m| midnight + TimeDelta::minutes(m))
                .find_map(|t| t.and_local_timezone(tz.clone()).earliest())
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

impl Default for DateThreshold {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl fmt::Display for DateThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))
    }
}

/// Resolves the raw date argument against the caller's notion of today.
///
/// `offset` is the caller's UTC offset; the resolved day starts at local
/// midnight in it.
///
/// | Input          | Result            |
/// |----------------|-------------------|
/// | `None`         | 1970-01-01        |
/// | `today`        | `today`           |
/// | `yesterday`    | `today` - 1 day   |
/// | a date string  | that date         |
/// | anything else  | 1970-01-01        |
///
/// Keywords are matched case-insensitively.
pub fn resolve_threshold(
    raw: Option<&str>,
    today: NaiveDate,
    offset: FixedOffset,
) -> DateThreshold {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return DateThreshold::unbounded();
    };

    let at = |date| DateThreshold::with_offset(date, offset);
    match raw.to_ascii_lowercase().as_str() {
        "today" => at(today),
        "yesterday" => at(today.checked_sub_days(Days::new(1)).unwrap_or(today)),
        _ => match parse_date(raw) {
            Some(date) => at(date),
            None => {
                tracing::warn!(input = %raw, "Unrecognized date, not filtering by date");
                DateThreshold::unbounded()
            }
        },
    }
}

/// Parses a calendar date in any of the accepted formats.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}
