//! Recurrence rules.
//!
//! A [`RecurrenceRule`] decides whether a tracked item is due on a given
//! calendar day. Every tracked-item kind (habit, medication, plant care)
//! shares this one rule type and its [`RecurrenceRule::is_due`] dispatch.

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::day::{DayKey, DayRange};
use crate::error::ValidationError;

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Set of weekdays, stored as a 7-bit mask (bit 0 = Monday).
///
/// Serialized as a list of weekday names in Monday-first order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self(0b111_1111)
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in Monday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        ALL_WEEKDAYS.iter().copied().filter(|d| self.contains(*d))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Debug for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let days = Vec::<Weekday>::deserialize(deserializer)?;
        Ok(days.into_iter().collect())
    }
}

/// When a tracked item is due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// Due on exactly one day.
    Once { date: DayKey },
    /// Due every day from `start`.
    Daily { start: DayKey },
    /// Due on one weekday, from `start`.
    Weekly { weekday: Weekday, start: DayKey },
    /// Due on any weekday in the set, from `start`.
    CustomDays { weekdays: WeekdaySet, start: DayKey },
    /// Due on `start` and every `interval` days after it.
    EveryNDays { interval: u32, start: DayKey },
}

impl RecurrenceRule {
    /// Whether the item is due on `day`. Pure in `(self, day)`.
    pub fn is_due(&self, day: DayKey) -> bool {
        match self {
            RecurrenceRule::Once { date } => day == *date,
            RecurrenceRule::Daily { start } => day >= *start,
            RecurrenceRule::Weekly { weekday, start } => {
                day >= *start && day.weekday() == *weekday
            }
            RecurrenceRule::CustomDays { weekdays, start } => {
                day >= *start && weekdays.contains(day.weekday())
            }
            RecurrenceRule::EveryNDays { interval, start } => {
                day >= *start && start.days_until(day) % i64::from((*interval).max(1)) == 0
            }
        }
    }

    /// First day the rule can be due.
    pub fn start(&self) -> DayKey {
        match self {
            RecurrenceRule::Once { date } => *date,
            RecurrenceRule::Daily { start }
            | RecurrenceRule::Weekly { start, .. }
            | RecurrenceRule::CustomDays { start, .. }
            | RecurrenceRule::EveryNDays { start, .. } => *start,
        }
    }

    /// Reject rules that can never be due for structural reasons.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            RecurrenceRule::EveryNDays { interval: 0, .. } => Err(ValidationError::ZeroInterval),
            RecurrenceRule::CustomDays { weekdays, .. } if weekdays.is_empty() => {
                Err(ValidationError::EmptyWeekdaySet)
            }
            _ => Ok(()),
        }
    }

    /// Earliest due day on or after `day`.
    pub fn next_due_on_or_after(&self, day: DayKey) -> Option<DayKey> {
        let from = day.max(self.start());
        match self {
            RecurrenceRule::Once { date } => (day <= *date).then_some(*date),
            RecurrenceRule::EveryNDays { interval, start } => {
                let n = i64::from((*interval).max(1));
                let offset = start.days_until(from);
                start.add_days((offset + n - 1) / n * n)
            }
            _ => (0..7)
                .filter_map(|offset| from.add_days(offset))
                .find(|candidate| self.is_due(*candidate)),
        }
    }

    /// Latest due day on or before `day`.
    pub fn last_due_on_or_before(&self, day: DayKey) -> Option<DayKey> {
        if day < self.start() {
            return None;
        }
        match self {
            RecurrenceRule::Once { date } => Some(*date),
            RecurrenceRule::EveryNDays { interval, start } => {
                let n = i64::from((*interval).max(1));
                start.add_days(start.days_until(day) / n * n)
            }
            _ => (0..7)
                .filter_map(|offset| day.add_days(-offset))
                .take_while(|candidate| *candidate >= self.start())
                .find(|candidate| self.is_due(*candidate)),
        }
    }

    /// Lazily yield the due days within `range`, ascending.
    pub fn due_days(&self, range: DayRange) -> impl Iterator<Item = DayKey> + Clone + '_ {
        range.filter(move |day| self.is_due(*day))
    }
}
