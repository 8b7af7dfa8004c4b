//! Streaks and completion rates over a run of days.
//!
//! Days on which a habit is not due neither extend nor break a streak. The
//! last day of a window is treated as "today": if it is still pending it
//! does not break the current streak, since the user can still complete it.

use serde::Serialize;

use crate::calendar::{CalendarDay, DayRange};
use crate::completion::{status_on, CompletionRecord, DayStatus};
use crate::schedule::Habit;

/// Per-habit progress over a window of days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub habit_id: String,
    pub start: CalendarDay,
    pub end: CalendarDay,
    pub due_days: u32,
    pub completed_days: u32,
    /// `completed_days / due_days`, 0.0 when nothing was due.
    pub completion_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<CalendarDay>,
}

fn own_records(habit: &Habit, completions: &[CompletionRecord]) -> Vec<CompletionRecord> {
    completions
        .iter()
        .filter(|r| r.habit_id == habit.id)
        .cloned()
        .collect()
}

fn has_usable_schedule(habit: &Habit) -> bool {
    habit
        .recurrence
        .as_ref()
        .is_some_and(|r| r.validate().is_ok())
}

/// Status of `habit` on each day of `range`, ascending.
pub fn daily_statuses(
    habit: &Habit,
    range: DayRange,
    completions: &[CompletionRecord],
) -> Vec<(CalendarDay, DayStatus)> {
    let own = own_records(habit, completions);
    range
        .days()
        .map(|day| (day, status_on(habit, day, &own)))
        .collect()
}

/// Consecutive completed due days ending at `today`.
pub fn current_streak(habit: &Habit, today: CalendarDay, completions: &[CompletionRecord]) -> u32 {
    if !has_usable_schedule(habit) {
        return 0;
    }
    let own = own_records(habit, completions);

    let mut streak = 0;
    let mut cursor = Some(today);
    while let Some(day) = cursor {
        if day < habit.created_on {
            break;
        }
        match status_on(habit, day, &own) {
            DayStatus::Completed => streak += 1,
            DayStatus::Pending if day == today => {}
            DayStatus::Pending => break,
            DayStatus::NotDue => {}
        }
        cursor = day.prev();
    }
    streak
}

/// Longest run of completed due days inside `range`.
pub fn longest_streak(habit: &Habit, range: DayRange, completions: &[CompletionRecord]) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    for (_, status) in daily_statuses(habit, range, completions) {
        match status {
            DayStatus::Completed => {
                run += 1;
                longest = longest.max(run);
            }
            DayStatus::Pending => run = 0,
            DayStatus::NotDue => {}
        }
    }
    longest
}

/// Due/completed counts and streaks for `habit` over `range`, treating
/// `range.end()` as today.
pub fn summarize(
    habit: &Habit,
    range: DayRange,
    completions: &[CompletionRecord],
) -> ProgressSummary {
    let statuses = daily_statuses(habit, range, completions);

    let mut due_days = 0u32;
    let mut completed_days = 0u32;
    let mut last_completed = None;
    for (day, status) in &statuses {
        match status {
            DayStatus::Completed => {
                due_days += 1;
                completed_days += 1;
                last_completed = Some(*day);
            }
            DayStatus::Pending => due_days += 1,
            DayStatus::NotDue => {}
        }
    }

    let completion_rate = if due_days == 0 {
        0.0
    } else {
        f64::from(completed_days) / f64::from(due_days)
    };

    ProgressSummary {
        habit_id: habit.id.clone(),
        start: range.start(),
        end: range.end(),
        due_days,
        completed_days,
        completion_rate,
        current_streak: current_streak(habit, range.end(), completions),
        longest_streak: longest_streak(habit, range, completions),
        last_completed,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
