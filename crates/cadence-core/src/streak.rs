//! Streak and adherence analytics.
//!
//! Streaks are measured over the sequence of due days only: a weekly item is
//! never penalized for the six days it was not due. The calculator is shared
//! by every recurrence kind; callers feed it the due days produced by a
//! [`RecurrenceRule`] and the set of days the ledger counts as done.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::day::{DayKey, DayRange};
use crate::error::Result;
use crate::recurrence::RecurrenceRule;

/// Configuration for streak evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakConfig {
    /// Treat an unfinished due day equal to "today" as still open instead of
    /// breaking the current streak.
    #[serde(default)]
    pub count_pending_today: bool,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            count_pending_today: false,
        }
    }
}

/// Current and longest run of completed due days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Streaks plus completion-rate figures for one item over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakReport {
    pub current: u32,
    pub longest: u32,
    /// Due days in the window that were completed
    pub completed_due_days: u32,
    /// Due days in the window
    pub total_due_days: u32,
    /// `completed_due_days / total_due_days`, 0 when nothing was due
    pub completion_rate: f64,
    /// Most recent completed due day in the window
    pub last_completed: Option<DayKey>,
}

/// Slot-level adherence for multi-dose items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdherenceStats {
    /// Doses expected in the window (due days x slots per day)
    pub expected: u32,
    /// Doses recorded as completed
    pub taken: u32,
    /// Ratio of taken to expected (0.0 to 1.0)
    pub adherence_rate: f64,
}

/// Ratio in `[0, 1]`; 0 when `total` is 0.
pub fn completion_rate(completed: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(completed.min(total)) / f64::from(total)
    }
}

/// Streak calculator shared by every recurrence kind.
#[derive(Debug, Clone, Default)]
pub struct StreakCalculator {
    config: StreakConfig,
}

impl StreakCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StreakConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StreakConfig {
        &self.config
    }

    /// Current and longest streak over an ascending sequence of due days.
    ///
    /// The current streak is anchored on the last due day in the sequence:
    /// if that day is not completed the current streak is 0.
    pub fn compute_streaks<I>(&self, due_days: I, completed: &BTreeSet<DayKey>) -> Streaks
    where
        I: IntoIterator<Item = DayKey>,
    {
        let due: Vec<DayKey> = due_days.into_iter().collect();
        debug_assert!(due.windows(2).all(|w| w[0] < w[1]), "due days must ascend");

        let mut run = 0u32;
        let mut longest = 0u32;
        for day in &due {
            if completed.contains(day) {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }

        let current = due
            .iter()
            .rev()
            .take_while(|day| completed.contains(day))
            .count() as u32;

        Streaks { current, longest }
    }

    /// Full report for `rule` over `window_start..=today`.
    ///
    /// `window_start` is clamped to the rule's own start.
    pub fn report(
        &self,
        rule: &RecurrenceRule,
        completed: &BTreeSet<DayKey>,
        window_start: DayKey,
        today: DayKey,
    ) -> Result<StreakReport> {
        let start = window_start.max(rule.start());
        if today < start {
            DayRange::new(window_start, today)?;
            return Ok(StreakReport::default());
        }
        let mut due: Vec<DayKey> = rule.due_days(DayRange::new(start, today)?).collect();

        let total_due_days = due.len() as u32;
        let completed_due_days = due.iter().filter(|d| completed.contains(d)).count() as u32;
        let last_completed = due.iter().rev().find(|d| completed.contains(d)).copied();

        if self.config.count_pending_today
            && due.last() == Some(&today)
            && !completed.contains(&today)
        {
            due.pop();
        }
        let streaks = self.compute_streaks(due, completed);

        Ok(StreakReport {
            current: streaks.current,
            longest: streaks.longest,
            completed_due_days,
            total_due_days,
            completion_rate: completion_rate(completed_due_days, total_due_days),
            last_completed,
        })
    }

    /// Dose-level adherence for an item with `slots_per_day` slots.
    ///
    /// `taken_on` returns the completed slot count for a day.
    pub fn dose_adherence<F>(
        &self,
        rule: &RecurrenceRule,
        slots_per_day: usize,
        range: DayRange,
        taken_on: F,
    ) -> AdherenceStats
    where
        F: Fn(DayKey) -> usize,
    {
        let per_day = slots_per_day.max(1) as u32;
        let mut expected = 0u32;
        let mut taken = 0u32;
        for day in rule.due_days(range) {
            expected += per_day;
            taken += (taken_on(day) as u32).min(per_day);
        }
        AdherenceStats {
            expected,
            taken,
            adherence_rate: completion_rate(taken, expected),
        }
    }
}
