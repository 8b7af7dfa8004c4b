//! Local calendar days and the timezone they are derived in.
//!
//! Every "which day is this for" question in the crate goes through this
//! module. A [`CalendarDay`] is always computed from the wall-clock fields
//! of an instant in a specific zone; it is never obtained by truncating an
//! RFC 3339 / ISO 8601 string, which would silently use UTC and shift the
//! day boundary by the zone's offset.
//!
//! # Functions
//!
//! - [`today`] — The current day in the process's local zone
//! - [`to_calendar_day`] — The day an instant falls on in a given zone
//! - [`calendar_day_of`] — String-facing variant (RFC 3339 + IANA name)
//! - [`parse_timezone`] — Parse an IANA timezone name
//!
//! Day arithmetic ([`CalendarDay::days_since`], [`CalendarDay::offset`]) is
//! done on calendar dates, so a 23- or 25-hour DST day still counts as one.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};

const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

// ── CalendarDay ─────────────────────────────────────────────────────────────

/// One local calendar day, rendered as a zero-padded `YYYY-MM-DD` key.
///
/// Years are restricted to 0000–9999 so the key is always ten characters
/// and sorts lexicographically in date order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// Wrap a date, rejecting years outside 0000–9999.
    pub fn from_date(date: NaiveDate) -> Result<Self> {
        if (MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
            Ok(Self(date))
        } else {
            Err(HabitError::InvalidDate(format!(
                "'{date}': year outside {MIN_YEAR:04}-{MAX_YEAR:04}"
            )))
        }
    }

    /// Build a day from year, month (1-12) and day of month (1-31).
    ///
    /// # Errors
    ///
    /// Returns [`HabitError::InvalidDate`] if the fields do not name a real
    /// date (e.g. February 30) or the year is out of range.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            HabitError::InvalidDate(format!("{year:04}-{month:02}-{day:02}: no such date"))
        })?;
        Self::from_date(date)
    }

    /// Parse a strict `YYYY-MM-DD` key. Equivalent to `s.parse()`.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    /// The underlying date.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Day of the month, 1-31.
    pub fn day_of_month(&self) -> u32 {
        self.0.day()
    }

    /// Day of the week, 0 = Sunday through 6 = Saturday.
    pub fn weekday(&self) -> u8 {
        self.0.weekday().num_days_from_sunday() as u8
    }

    /// Whole calendar days from `earlier` to `self` (negative if `earlier`
    /// is actually later).
    pub fn days_since(&self, earlier: CalendarDay) -> i64 {
        self.0.signed_duration_since(earlier.0).num_days()
    }

    /// Shift by a number of calendar days.
    ///
    /// # Errors
    ///
    /// Returns [`HabitError::InvalidDate`] if the result leaves the
    /// supported year range.
    pub fn offset(&self, days: i64) -> Result<Self> {
        let shifted = TimeDelta::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .ok_or_else(|| HabitError::InvalidDate(format!("{self} shifted by {days} days")))?;
        Self::from_date(shifted)
    }

    /// The following day, or `None` at 9999-12-31.
    pub fn next(&self) -> Option<Self> {
        self.0.succ_opt().and_then(|d| Self::from_date(d).ok())
    }

    /// The preceding day, or `None` at 0000-01-01.
    pub fn prev(&self) -> Option<Self> {
        self.0.pred_opt().and_then(|d| Self::from_date(d).ok())
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl FromStr for CalendarDay {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 10
            && bytes.iter().enumerate().all(|(i, b)| match i {
                4 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            });
        if !well_formed {
            return Err(HabitError::InvalidDate(format!(
                "'{s}': expected YYYY-MM-DD"
            )));
        }

        // All-digit fields of fixed width cannot fail to parse.
        let field = |range: std::ops::Range<usize>| -> Result<u32> {
            s[range]
                .parse::<u32>()
                .map_err(|e| HabitError::InvalidDate(format!("'{s}': {e}")))
        };
        let year = field(0..4)? as i32;
        let month = field(5..7)?;
        let day = field(8..10)?;

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| HabitError::InvalidDate(format!("'{s}': no such date")))
    }
}

impl TryFrom<String> for CalendarDay {
    type Error = HabitError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CalendarDay> for String {
    fn from(day: CalendarDay) -> Self {
        day.to_string()
    }
}

// ── Zone ────────────────────────────────────────────────────────────────────

/// The timezone a [`CalendarDay`] is derived in.
///
/// Parses from `"local"` (case-insensitive) or an IANA name such as
/// `"America/New_York"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The execution environment's configured zone (`TZ` on Unix).
    #[default]
    Local,
    /// A named IANA zone.
    Named(Tz),
}

impl Zone {
    /// The current calendar day in this zone.
    pub fn today(&self) -> CalendarDay {
        let date = match self {
            Zone::Local => Local::now().date_naive(),
            Zone::Named(tz) => Utc::now().with_timezone(tz).date_naive(),
        };
        // The system clock stays inside the four-digit year range.
        CalendarDay(date)
    }

    /// The calendar day `instant` falls on in this zone.
    ///
    /// # Errors
    ///
    /// Returns [`HabitError::InvalidDate`] if the local year is outside
    /// 0000–9999.
    pub fn day_of(&self, instant: DateTime<Utc>) -> Result<CalendarDay> {
        let date = match self {
            Zone::Local => instant.with_timezone(&Local).date_naive(),
            Zone::Named(tz) => instant.with_timezone(tz).date_naive(),
        };
        CalendarDay::from_date(date)
    }

    /// Whether the local day at `now` differs from `last_seen`.
    ///
    /// This is the daily "reset": nothing is deleted, callers simply start
    /// evaluating statuses against the new day.
    pub fn rolled_over(&self, last_seen: CalendarDay, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.day_of(now)? != last_seen)
    }
}

impl From<Tz> for Zone {
    fn from(tz: Tz) -> Self {
        Zone::Named(tz)
    }
}

impl From<Option<Tz>> for Zone {
    fn from(tz: Option<Tz>) -> Self {
        tz.map_or(Zone::Local, Zone::Named)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl FromStr for Zone {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("local") {
            Ok(Zone::Local)
        } else {
            parse_timezone(s).map(Zone::Named)
        }
    }
}

// ── Free functions ──────────────────────────────────────────────────────────

/// The current calendar day in the process's local zone.
pub fn today() -> CalendarDay {
    Zone::Local.today()
}

/// The calendar day `instant` falls on in `tz`, or in the local zone when
/// `tz` is `None`.
///
/// The day comes from the year/month/day fields as seen on a wall clock
/// in that zone, so the same instant can map to different days in
/// different zones.
///
/// # Errors
///
/// Returns [`HabitError::InvalidDate`] if the local year is outside
/// 0000–9999.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use habit_engine::calendar::to_calendar_day;
///
/// // 04:45 UTC on July 1 is still 23:45 on June 30 in Bogotá (UTC-5).
/// let instant = Utc.with_ymd_and_hms(2024, 7, 1, 4, 45, 0).unwrap();
/// let day = to_calendar_day(instant, Some(&chrono_tz::America::Bogota)).unwrap();
/// assert_eq!(day.to_string(), "2024-06-30");
/// ```
pub fn to_calendar_day(instant: DateTime<Utc>, tz: Option<&Tz>) -> Result<CalendarDay> {
    Zone::from(tz.copied()).day_of(instant)
}

/// The calendar day of an RFC 3339 datetime in a zone given by name.
///
/// `timezone` accepts an IANA name or `"local"`.
///
/// # Errors
///
/// Returns [`HabitError::InvalidDatetime`] if the datetime cannot be parsed,
/// [`HabitError::InvalidTimezone`] if the zone is unknown, or
/// [`HabitError::InvalidDate`] if the resulting day is out of range.
pub fn calendar_day_of(datetime: &str, timezone: &str) -> Result<CalendarDay> {
    let instant = parse_rfc3339(datetime)?;
    let zone: Zone = timezone.parse()?;
    zone.day_of(instant)
}

/// Parse an IANA timezone name into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz> {
    s.trim()
        .parse::<Tz>()
        .map_err(|_| HabitError::InvalidTimezone(format!("'{s}'")))
}

/// Parse an RFC 3339 datetime string into `DateTime<Utc>`.
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HabitError::InvalidDatetime(format!("'{s}': {e}")))
}

// ── DayRange ────────────────────────────────────────────────────────────────

/// An inclusive, non-empty run of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    start: CalendarDay,
    end: CalendarDay,
}

impl DayRange {
    /// # Errors
    ///
    /// Returns [`HabitError::InvalidRange`] if `start` is after `end`.
    pub fn new(start: CalendarDay, end: CalendarDay) -> Result<Self> {
        if start > end {
            return Err(HabitError::InvalidRange(format!("{start} is after {end}")));
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending at (and including) `end`.
    pub fn ending(end: CalendarDay, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(HabitError::InvalidRange(format!(
                "empty range ending {end}"
            )));
        }
        let start = end.offset(1 - i64::from(days))?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> CalendarDay {
        self.start
    }

    pub fn end(&self) -> CalendarDay {
        self.end
    }

    pub fn day_count(&self) -> usize {
        (self.end.days_since(self.start) + 1) as usize
    }

    pub fn contains(&self, day: CalendarDay) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn days(&self) -> Days {
        Days {
            next: Some(self.start),
            end: self.end,
        }
    }
}

impl IntoIterator for DayRange {
    type Item = CalendarDay;
    type IntoIter = Days;

    fn into_iter(self) -> Days {
        self.days()
    }
}

/// Ascending iterator over a [`DayRange`].
#[derive(Debug, Clone)]
pub struct Days {
    next: Option<CalendarDay>,
    end: CalendarDay,
}

impl Iterator for Days {
    type Item = CalendarDay;

    fn next(&mut self) -> Option<CalendarDay> {
        let current = self.next?;
        self.next = if current < self.end {
            current.next()
        } else {
            None
        };
        Some(current)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
