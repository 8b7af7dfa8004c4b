//! Habit recurrence rules and the "is this habit due on this day" check.
//!
//! Everything here works on [`CalendarDay`] values that were already
//! resolved in the user's zone, so evaluation is pure and never looks at a
//! clock or a timestamp. Interval rules count whole calendar days between
//! two dates rather than dividing elapsed milliseconds, which would drift
//! by an hour on each DST transition.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::calendar::{CalendarDay, DayRange};
use crate::error::{HabitError, Result};

/// Which calendar days a habit is scheduled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    /// Every day in the habit's active range.
    Daily,
    /// Specific days of the week, 0 = Sunday through 6 = Saturday.
    Weekdays { days: BTreeSet<u8> },
    /// Specific days of the month, 1-31. A day missing from a shorter month
    /// (e.g. the 31st in April) is simply not due that month.
    MonthDays { days: BTreeSet<u8> },
    /// Every `every_days` days counted from `start`, or from the habit's
    /// creation day when `start` is absent.
    Interval {
        every_days: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<CalendarDay>,
    },
}

impl Recurrence {
    pub fn weekdays(days: impl IntoIterator<Item = u8>) -> Self {
        Recurrence::Weekdays {
            days: days.into_iter().collect(),
        }
    }

    pub fn month_days(days: impl IntoIterator<Item = u8>) -> Self {
        Recurrence::MonthDays {
            days: days.into_iter().collect(),
        }
    }

    pub fn every(every_days: u32) -> Self {
        Recurrence::Interval {
            every_days,
            start: None,
        }
    }

    /// Check the rule is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`HabitError::InvalidRecurrence`] for an empty day set, a
    /// weekday above 6, a month day outside 1-31, or a zero interval.
    pub fn validate(&self) -> Result<()> {
        match self {
            Recurrence::Daily => Ok(()),
            Recurrence::Weekdays { days } => {
                if days.is_empty() {
                    return Err(HabitError::InvalidRecurrence(
                        "weekday set is empty".to_string(),
                    ));
                }
                match days.iter().find(|d| **d > 6) {
                    Some(bad) => Err(HabitError::InvalidRecurrence(format!(
                        "weekday {bad} outside 0-6"
                    ))),
                    None => Ok(()),
                }
            }
            Recurrence::MonthDays { days } => {
                if days.is_empty() {
                    return Err(HabitError::InvalidRecurrence(
                        "month day set is empty".to_string(),
                    ));
                }
                match days.iter().find(|d| !(1..=31).contains(*d)) {
                    Some(bad) => Err(HabitError::InvalidRecurrence(format!(
                        "month day {bad} outside 1-31"
                    ))),
                    None => Ok(()),
                }
            }
            Recurrence::Interval { every_days: 0, .. } => Err(HabitError::InvalidRecurrence(
                "interval of 0 days".to_string(),
            )),
            Recurrence::Interval { .. } => Ok(()),
        }
    }
}

/// A tracked habit as far as scheduling is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// `None` when the stored rule was missing or could not be read; such a
    /// habit is never due.
    #[serde(default, deserialize_with = "lenient_recurrence")]
    pub recurrence: Option<Recurrence>,
    pub created_on: CalendarDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_on: Option<CalendarDay>,
}

impl Habit {
    pub fn new(id: impl Into<String>, created_on: CalendarDay, recurrence: Recurrence) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            recurrence: Some(recurrence),
            created_on,
            ends_on: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn ending_on(mut self, ends_on: CalendarDay) -> Self {
        self.ends_on = Some(ends_on);
        self
    }

    /// Whether `day` lies between the creation day and the end day
    /// (inclusive), ignoring the recurrence rule.
    pub fn is_active_on(&self, day: CalendarDay) -> bool {
        day >= self.created_on && self.ends_on.is_none_or(|end| day <= end)
    }
}

/// Stored habits come from a schemaless document store; a rule we cannot
/// read degrades to "never due" instead of failing the whole habit.
fn lenient_recurrence<'de, D>(deserializer: D) -> std::result::Result<Option<Recurrence>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match serde_json::from_value::<Recurrence>(value) {
        Ok(recurrence) => Ok(Some(recurrence)),
        Err(err) => {
            warn!(%err, "dropping malformed recurrence");
            Ok(None)
        }
    }
}

/// Whether `habit` is scheduled on `day`.
///
/// Returns `false` (never panics) when `day` is before the habit's creation
/// day, after its end day, or when the recurrence is missing or invalid.
///
/// # Examples
///
/// ```
/// use habit_engine::calendar::CalendarDay;
/// use habit_engine::schedule::{is_due_on, Habit, Recurrence};
///
/// let created = CalendarDay::parse("2024-01-01").unwrap();
/// let habit = Habit::new("stretch", created, Recurrence::every(3));
/// assert!(is_due_on(&habit, CalendarDay::parse("2024-01-04").unwrap()));
/// assert!(!is_due_on(&habit, CalendarDay::parse("2024-01-05").unwrap()));
/// ```
pub fn is_due_on(habit: &Habit, day: CalendarDay) -> bool {
    if !habit.is_active_on(day) {
        return false;
    }
    let Some(recurrence) = &habit.recurrence else {
        return false;
    };
    if let Err(err) = recurrence.validate() {
        debug!(habit_id = %habit.id, %err, "treating habit as never due");
        return false;
    }

    match recurrence {
        Recurrence::Daily => true,
        Recurrence::Weekdays { days } => days.contains(&day.weekday()),
        Recurrence::MonthDays { days } => u8::try_from(day.day_of_month())
            .map(|dom| days.contains(&dom))
            .unwrap_or(false),
        Recurrence::Interval { every_days, start } => {
            let anchor = start.unwrap_or(habit.created_on);
            let elapsed = day.days_since(anchor);
            elapsed >= 0 && elapsed % i64::from(*every_days) == 0
        }
    }
}

/// The first due day in `[from, from + horizon_days)`, if any.
pub fn next_due_on(habit: &Habit, from: CalendarDay, horizon_days: u32) -> Option<CalendarDay> {
    let mut day = Some(from);
    for _ in 0..horizon_days {
        let current = day?;
        if is_due_on(habit, current) {
            return Some(current);
        }
        day = current.next();
    }
    None
}

/// All days in `range` on which `habit` is due, ascending.
pub fn due_days(habit: &Habit, range: DayRange) -> Vec<CalendarDay> {
    range.days().filter(|d| is_due_on(habit, *d)).collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────
