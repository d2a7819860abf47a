//! Tracked items.
//!
//! A [`TrackedItem`] pairs a recurrence rule with free-form details. The
//! details type is generic so habits, medications and plant-care routines
//! share one engine; the filter engine only sees them through
//! [`ItemDetails`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::day::{DayKey, TimeSlot};
use crate::error::ValidationError;
use crate::recurrence::RecurrenceRule;

/// Opaque unique identifier of a tracked item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata the filter engine can search and group on.
pub trait ItemDetails {
    fn name(&self) -> &str;

    fn category(&self) -> Option<&str> {
        None
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn description(&self) -> Option<&str> {
        None
    }
}

/// Stock details carried by most tracked items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Details {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl ItemDetails for Details {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn description(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

/// An entity under schedule tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem<D = Details> {
    pub id: ItemId,
    #[serde(flatten)]
    pub details: D,
    pub rule: RecurrenceRule,
    pub created_at: DayKey,
    /// Times of day with a separate completion each; empty means once per day.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_slots: Vec<TimeSlot>,
}

impl<D> TrackedItem<D> {
    /// New item with a generated id.
    pub fn new(details: D, rule: RecurrenceRule, created_at: DayKey) -> Self {
        Self {
            id: ItemId::generate(),
            details,
            rule,
            created_at,
            time_slots: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the time slots, kept sorted and free of duplicates.
    pub fn with_time_slots(mut self, slots: impl IntoIterator<Item = TimeSlot>) -> Self {
        self.time_slots = slots.into_iter().collect();
        self.normalize_slots();
        self
    }

    pub(crate) fn normalize_slots(&mut self) {
        self.time_slots.sort();
        self.time_slots.dedup();
    }

    /// Check the rule and that it can fall due once tracking has started.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.rule.validate()?;
        if self.rule.next_due_on_or_after(self.created_at).is_none() {
            return Err(ValidationError::NeverDue {
                created_at: self.created_at,
            });
        }
        Ok(())
    }

    pub fn is_due(&self, day: DayKey) -> bool {
        self.rule.is_due(day)
    }

    pub fn is_multi_slot(&self) -> bool {
        !self.time_slots.is_empty()
    }

    /// Whether `slot` is a valid completion slot for this item.
    pub fn accepts_slot(&self, slot: Option<TimeSlot>) -> bool {
        match slot {
            None => self.time_slots.is_empty(),
            Some(slot) => self.time_slots.binary_search(&slot).is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DayKey {
        DayKey::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ItemId::generate(), ItemId::generate());
    }

    #[test]
    fn slots_are_sorted_and_deduplicated() {
        let item = TrackedItem::new(
            Details::named("Vitamin D"),
            RecurrenceRule::Daily { start: day(2024, 1, 1) },
            day(2024, 1, 1),
        )
        .with_time_slots([
            TimeSlot::from_hm(20, 0).unwrap(),
            TimeSlot::from_hm(8, 0).unwrap(),
            TimeSlot::from_hm(20, 0).unwrap(),
        ]);
        assert_eq!(
            item.time_slots,
            vec![TimeSlot::from_hm(8, 0).unwrap(), TimeSlot::from_hm(20, 0).unwrap()]
        );
        assert!(item.accepts_slot(TimeSlot::from_hm(8, 0)));
        assert!(!item.accepts_slot(None));
        assert!(!item.accepts_slot(TimeSlot::from_hm(12, 0)));
    }

    #[test]
    fn single_completion_item_takes_no_slot() {
        let item = TrackedItem::new(
            Details::named("Water ferns"),
            RecurrenceRule::Daily { start: day(2024, 1, 1) },
            day(2024, 1, 1),
        );
        assert!(item.accepts_slot(None));
        assert!(!item.accepts_slot(TimeSlot::from_hm(8, 0)));
    }

    #[test]
    fn details_flatten_into_item_record() {
        let item = TrackedItem::new(
            Details::named("Stretch").with_category("Health").with_tags(["morning"]),
            RecurrenceRule::Daily { start: day(2024, 1, 1) },
            day(2024, 1, 1),
        )
        .with_id("stretch");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "stretch");
        assert_eq!(json["name"], "Stretch");
        assert_eq!(json["category"], "Health");
        assert_eq!(json["rule"]["kind"], "daily");
        assert_eq!(json["created_at"], "2024-01-01");
        let back: TrackedItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn validate_rejects_rules_that_end_before_creation() {
        let past_once = TrackedItem::new(
            Details::named("Renew passport"),
            RecurrenceRule::Once { date: day(2024, 1, 1) },
            day(2024, 3, 1),
        );
        assert_eq!(
            past_once.validate(),
            Err(ValidationError::NeverDue {
                created_at: day(2024, 3, 1)
            })
        );

        let upcoming = TrackedItem::new(
            Details::named("Renew passport"),
            RecurrenceRule::Once { date: day(2024, 3, 1) },
            day(2024, 1, 1),
        );
        assert!(upcoming.validate().is_ok());

        let empty = TrackedItem::new(
            Details::named("Mow lawn"),
            RecurrenceRule::CustomDays {
                weekdays: crate::recurrence::WeekdaySet::empty(),
                start: day(2024, 1, 1),
            },
            day(2024, 1, 1),
        );
        assert_eq!(empty.validate(), Err(ValidationError::EmptyWeekdaySet));
    }
}
