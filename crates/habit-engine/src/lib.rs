//! # habit-engine
//!
//! Deterministic habit-day computation.
//!
//! Decides, across timezones and daily-reset boundaries, whether a habit is
//! due on a given local calendar day and whether a completion record
//! belongs to that day. All functions are pure: callers pass in the day (or
//! the instant and zone) they mean, and the backing store is never touched.
//!
//! ## Modules
//!
//! - [`calendar`] — Instant + zone → local `YYYY-MM-DD` day, day arithmetic, day ranges
//! - [`schedule`] — Recurrence rules and "is this habit due on this day"
//! - [`completion`] — Completion records, per-day status, toggling, duplicate resolution
//! - [`progress`] — Streaks and completion rates over a window of days
//! - [`error`] — Error types

pub mod calendar;
pub mod completion;
pub mod error;
pub mod progress;
pub mod schedule;

pub use calendar::{
    calendar_day_of, parse_timezone, to_calendar_day, today, CalendarDay, DayRange, Zone,
};
pub use completion::{
    collapse_duplicates, record_key, resolve_record, status_on, toggle, upsert,
    CompletionRecord, DayStatus,
};
pub use error::{HabitError, Result};
pub use progress::{current_streak, daily_statuses, longest_streak, summarize, ProgressSummary};
pub use schedule::{due_days, is_due_on, next_due_on, Habit, Recurrence};
