//! Completion records and per-day habit status.
//!
//! A completion record says "habit X was marked done (or undone) on day D".
//! The backing store does not enforce one record per `(habit, day)`, so
//! every lookup here goes through [`resolve_record`], which picks a single
//! winner: the latest `recorded_at`, and among equal timestamps the one
//! that comes later in the input.
//!
//! The daily reset is a view: a record for yesterday simply does not match
//! today, so today reads as [`DayStatus::Pending`]. Nothing is deleted.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::CalendarDay;
use crate::schedule::{is_due_on, Habit};

/// A stored fact that a habit was marked done or undone on a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub habit_id: String,
    pub day: CalendarDay,
    pub completed: bool,
    /// When the record was last written. Only used to order duplicates.
    pub recorded_at: DateTime<Utc>,
}

impl CompletionRecord {
    /// Document id to upsert this record under.
    pub fn key(&self) -> String {
        record_key(&self.habit_id, self.day)
    }

    pub fn belongs_to(&self, habit_id: &str, day: CalendarDay) -> bool {
        self.day == day && self.habit_id == habit_id
    }
}

/// Deterministic store key for the record of `habit_id` on `day`.
pub fn record_key(habit_id: &str, day: CalendarDay) -> String {
    format!("{habit_id}_{day}")
}

/// Status of a habit on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// The habit is not scheduled that day.
    NotDue,
    /// Scheduled and not (or no longer) marked done.
    Pending,
    /// Scheduled and marked done.
    Completed,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::NotDue => "not_due",
            DayStatus::Pending => "pending",
            DayStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single record that counts for `(habit_id, day)`, if any.
///
/// With duplicates the latest `recorded_at` wins; ties go to the record
/// appearing later in `completions`.
pub fn resolve_record<'a>(
    habit_id: &str,
    day: CalendarDay,
    completions: &'a [CompletionRecord],
) -> Option<&'a CompletionRecord> {
    let mut matching = completions.iter().filter(|r| r.belongs_to(habit_id, day));
    let first = matching.next()?;

    let mut count = 1usize;
    let winner = matching.fold(first, |best, candidate| {
        count += 1;
        if candidate.recorded_at >= best.recorded_at {
            candidate
        } else {
            best
        }
    });

    if count > 1 {
        debug!(
            habit_id,
            %day,
            duplicates = count,
            winner_recorded_at = %winner.recorded_at,
            "resolved duplicate completion records"
        );
    }
    Some(winner)
}

/// Status of `habit` on `day` given the records in `completions`.
///
/// [`DayStatus::NotDue`] takes precedence: a record for a day the habit is
/// not scheduled on is never surfaced as completed.
pub fn status_on(habit: &Habit, day: CalendarDay, completions: &[CompletionRecord]) -> DayStatus {
    if !is_due_on(habit, day) {
        return DayStatus::NotDue;
    }
    match resolve_record(&habit.id, day, completions) {
        Some(record) if record.completed => DayStatus::Completed,
        _ => DayStatus::Pending,
    }
}

/// The record to upsert when the user toggles `habit` on `day`.
///
/// Flips the resolved record's flag, or creates a completed record when
/// there is none. `recorded_at` becomes `now`, but never earlier than the
/// record it replaces, so the result always wins against that record.
///
/// The schedule is not consulted; whether a not-due day may be toggled is
/// up to the caller.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use habit_engine::calendar::CalendarDay;
/// use habit_engine::completion::{status_on, toggle, DayStatus};
/// use habit_engine::schedule::{Habit, Recurrence};
///
/// let day = CalendarDay::parse("2024-03-11").unwrap();
/// let habit = Habit::new("h1", day, Recurrence::Daily);
/// let now = Utc.with_ymd_and_hms(2024, 3, 11, 14, 0, 0).unwrap();
///
/// assert_eq!(status_on(&habit, day, &[]), DayStatus::Pending);
/// let record = toggle(&habit, day, &[], now);
/// assert!(record.completed);
/// assert_eq!(status_on(&habit, day, &[record]), DayStatus::Completed);
/// ```
pub fn toggle(
    habit: &Habit,
    day: CalendarDay,
    completions: &[CompletionRecord],
    now: DateTime<Utc>,
) -> CompletionRecord {
    match resolve_record(&habit.id, day, completions) {
        Some(existing) => CompletionRecord {
            completed: !existing.completed,
            recorded_at: now.max(existing.recorded_at),
            ..existing.clone()
        },
        None => CompletionRecord {
            habit_id: habit.id.clone(),
            day,
            completed: true,
            recorded_at: now,
        },
    }
}

/// Replace every record for `record`'s `(habit_id, day)` with `record`,
/// mirroring an upsert by [`CompletionRecord::key`].
pub fn upsert(completions: &mut Vec<CompletionRecord>, record: CompletionRecord) {
    completions.retain(|r| !r.belongs_to(&record.habit_id, record.day));
    completions.push(record);
}

/// One record per `(habit_id, day)`, chosen as in [`resolve_record`],
/// ordered by habit id then day.
pub fn collapse_duplicates(completions: &[CompletionRecord]) -> Vec<CompletionRecord> {
    let mut winners: BTreeMap<(&str, CalendarDay), &CompletionRecord> = BTreeMap::new();
    for record in completions {
        winners
            .entry((record.habit_id.as_str(), record.day))
            .and_modify(|best| {
                if record.recorded_at >= best.recorded_at {
                    *best = record;
                }
            })
            .or_insert(record);
    }

    let collapsed = winners.len();
    if collapsed < completions.len() {
        debug!(
            before = completions.len(),
            after = collapsed,
            "collapsed duplicate completion records"
        );
    }
    winners.into_values().cloned().collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Recurrence;
    use chrono::TimeZone;

    fn day(s: &str) -> CalendarDay {
        s.parse().unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 11, h, m, 0).unwrap()
    }

    fn record(
        habit_id: &str,
        d: &str,
        completed: bool,
        recorded_at: DateTime<Utc>,
    ) -> CompletionRecord {
        CompletionRecord {
            habit_id: habit_id.to_string(),
            day: day(d),
            completed,
            recorded_at,
        }
    }

    fn daily(id: &str) -> Habit {
        Habit::new(id, day("2024-03-01"), Recurrence::Daily)
    }

    // ── status_on ───────────────────────────────────────────────────────

    #[test]
    fn test_pending_without_record() {
        assert_eq!(status_on(&daily("h1"), day("2024-03-11"), &[]), DayStatus::Pending);
    }

    #[test]
    fn test_pending_then_completed_after_toggle() {
        let habit = daily("h1");
        let today = day("2024-03-11");
        let mut completions = Vec::new();
        assert_eq!(status_on(&habit, today, &completions), DayStatus::Pending);

        let toggled = toggle(&habit, today, &completions, at(9, 0));
        upsert(&mut completions, toggled);
        assert_eq!(status_on(&habit, today, &completions), DayStatus::Completed);
    }

    #[test]
    fn test_record_with_false_flag_is_pending() {
        let completions = [record("h1", "2024-03-11", false, at(9, 0))];
        assert_eq!(
            status_on(&daily("h1"), day("2024-03-11"), &completions),
            DayStatus::Pending
        );
    }

    #[test]
    fn test_yesterdays_record_does_not_count_today() {
        let completions = [record("h1", "2024-03-10", true, at(9, 0))];
        let habit = daily("h1");
        assert_eq!(status_on(&habit, day("2024-03-10"), &completions), DayStatus::Completed);
        assert_eq!(status_on(&habit, day("2024-03-11"), &completions), DayStatus::Pending);
    }

    #[test]
    fn test_other_habit_records_ignored() {
        let completions = [record("h2", "2024-03-11", true, at(9, 0))];
        assert_eq!(
            status_on(&daily("h1"), day("2024-03-11"), &completions),
            DayStatus::Pending
        );
    }

    #[test]
    fn test_not_due_overrides_completed_record() {
        // Tuesday, habit is Mon/Wed/Fri only.
        let habit = Habit::new("h1", day("2024-03-01"), Recurrence::weekdays([1, 3, 5]));
        let completions = [
            record("h1", "2024-03-12", true, at(9, 0)),
            record("h1", "2024-03-12", true, at(10, 0)),
        ];
        assert_eq!(status_on(&habit, day("2024-03-12"), &completions), DayStatus::NotDue);
    }

    #[test]
    fn test_not_due_before_creation_even_with_record() {
        let habit = Habit::new("h1", day("2024-03-10"), Recurrence::Daily);
        let completions = [record("h1", "2024-03-09", true, at(9, 0))];
        assert_eq!(status_on(&habit, day("2024-03-09"), &completions), DayStatus::NotDue);
    }

    // ── Duplicate resolution ────────────────────────────────────────────

    #[test]
    fn test_latest_duplicate_wins() {
        let habit = daily("h1");
        let today = day("2024-03-11");
        let newer_undone = [
            record("h1", "2024-03-11", true, at(9, 0)),
            record("h1", "2024-03-11", false, at(10, 0)),
        ];
        assert_eq!(status_on(&habit, today, &newer_undone), DayStatus::Pending);

        // Order in the input does not matter when timestamps differ.
        let reversed = [newer_undone[1].clone(), newer_undone[0].clone()];
        assert_eq!(status_on(&habit, today, &reversed), DayStatus::Pending);
    }

    #[test]
    fn test_equal_timestamps_later_entry_wins() {
        let completions = [
            record("h1", "2024-03-11", false, at(9, 0)),
            record("h1", "2024-03-11", true, at(9, 0)),
        ];
        let winner = resolve_record("h1", day("2024-03-11"), &completions).unwrap();
        assert!(winner.completed);
    }

    #[test]
    fn test_toggle_flips_latest_duplicate() {
        let habit = daily("h1");
        let completions = [
            record("h1", "2024-03-11", false, at(8, 0)),
            record("h1", "2024-03-11", true, at(9, 30)),
        ];
        let toggled = toggle(&habit, day("2024-03-11"), &completions, at(12, 0));
        assert!(!toggled.completed);
        assert_eq!(toggled.recorded_at, at(12, 0));
    }

    #[test]
    fn test_resolve_record_none_for_missing() {
        assert!(resolve_record("h1", day("2024-03-11"), &[]).is_none());
    }

    // ── toggle ──────────────────────────────────────────────────────────

    #[test]
    fn test_toggle_creates_completed_record() {
        let toggled = toggle(&daily("h1"), day("2024-03-11"), &[], at(9, 0));
        assert_eq!(toggled, record("h1", "2024-03-11", true, at(9, 0)));
        assert_eq!(toggled.key(), "h1_2024-03-11");
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let habit = daily("h1");
        let today = day("2024-03-11");
        let mut completions = Vec::new();

        let first = toggle(&habit, today, &completions, at(9, 0));
        upsert(&mut completions, first);
        let second = toggle(&habit, today, &completions, at(9, 0));
        upsert(&mut completions, second);

        assert_eq!(completions.len(), 1);
        assert!(!completions[0].completed);
        assert_eq!(status_on(&habit, today, &completions), DayStatus::Pending);
    }

    #[test]
    fn test_toggle_timestamp_never_moves_backwards() {
        let completions = [record("h1", "2024-03-11", true, at(15, 0))];
        let toggled = toggle(&daily("h1"), day("2024-03-11"), &completions, at(14, 0));
        assert_eq!(toggled.recorded_at, at(15, 0));
        assert!(!toggled.completed);
    }

    #[test]
    fn test_toggle_appended_without_upsert_still_wins() {
        let habit = daily("h1");
        let today = day("2024-03-11");
        let mut completions = vec![record("h1", "2024-03-11", true, at(9, 0))];
        let toggled = toggle(&habit, today, &completions, at(9, 0));
        completions.push(toggled);
        assert_eq!(status_on(&habit, today, &completions), DayStatus::Pending);
    }

    // ── upsert / collapse ───────────────────────────────────────────────

    #[test]
    fn test_upsert_replaces_all_duplicates() {
        let mut completions = vec![
            record("h1", "2024-03-11", true, at(8, 0)),
            record("h2", "2024-03-11", true, at(8, 0)),
            record("h1", "2024-03-11", true, at(9, 0)),
        ];
        upsert(&mut completions, record("h1", "2024-03-11", false, at(10, 0)));
        assert_eq!(completions.len(), 2);
        assert_eq!(completions[0].habit_id, "h2");
        assert!(!completions[1].completed);
    }

    #[test]
    fn test_collapse_duplicates_keeps_winners_in_key_order() {
        let completions = [
            record("h2", "2024-03-11", true, at(8, 0)),
            record("h1", "2024-03-12", true, at(8, 0)),
            record("h1", "2024-03-11", true, at(8, 0)),
            record("h1", "2024-03-11", false, at(9, 0)),
        ];
        let collapsed = collapse_duplicates(&completions);
        let keys: Vec<String> = collapsed.iter().map(CompletionRecord::key).collect();
        assert_eq!(keys, vec!["h1_2024-03-11", "h1_2024-03-12", "h2_2024-03-11"]);
        assert!(!collapsed[0].completed);
    }

    #[test]
    fn test_collapse_duplicates_equal_timestamps_later_entry_wins() {
        let completions = [
            record("h1", "2024-03-11", false, at(9, 0)),
            record("h1", "2024-03-11", true, at(9, 0)),
        ];
        let collapsed = collapse_duplicates(&completions);
        assert_eq!(collapsed.len(), 1);
        assert!(collapsed[0].completed);
        assert_eq!(
            status_on(&daily("h1"), day("2024-03-11"), &collapsed),
            status_on(&daily("h1"), day("2024-03-11"), &completions)
        );
    }

    // ── Serialization ───────────────────────────────────────────────────

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(record("h1", "2024-03-11", true, at(9, 0))).unwrap();
        assert_eq!(json["day"], "2024-03-11");
        assert_eq!(json["completed"], true);
        assert_eq!(json["recorded_at"], "2024-03-11T09:00:00Z");
    }

    #[test]
    fn test_day_status_names() {
        assert_eq!(serde_json::to_value(DayStatus::NotDue).unwrap(), "not_due");
        assert_eq!(DayStatus::Completed.to_string(), "completed");
    }
}
