//! Completion ledger.
//!
//! In-memory index of completion records keyed by `(item, day, slot)`.
//! The ledger never persists anything itself; callers decide when to save.
//!
//! Each registered item carries a floor day (its creation day). Mutations
//! for days before the floor are refused, so the ledger never holds records
//! for days the item did not exist.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::day::{DayKey, TimeSlot};
use crate::error::{CoreError, Result};
use crate::item::ItemId;

/// Recorded outcome for one `(item, day, slot)`. Unmarked is the absence of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    Missed,
}

/// One persisted completion entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub day: DayKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<TimeSlot>,
    pub status: CompletionStatus,
}

type DaySlots = BTreeMap<Option<TimeSlot>, CompletionStatus>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemRecords {
    floor: DayKey,
    days: BTreeMap<DayKey, DaySlots>,
}

impl ItemRecords {
    fn len(&self) -> usize {
        self.days.values().map(BTreeMap::len).sum()
    }
}

/// Per-item completion records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionLedger {
    items: HashMap<ItemId, ItemRecords>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `item`, or move its floor.
    ///
    /// Returns the number of records pruned because they now predate the floor.
    pub fn register(&mut self, item: &ItemId, floor: DayKey) -> usize {
        match self.items.get_mut(item) {
            Some(records) => {
                records.floor = floor;
                let before = records.len();
                records.days = records.days.split_off(&floor);
                before - records.len()
            }
            None => {
                self.items.insert(
                    item.clone(),
                    ItemRecords {
                        floor,
                        days: BTreeMap::new(),
                    },
                );
                0
            }
        }
    }

    /// Drop records of `item` whose slot is not in `slots`.
    ///
    /// With no `slots` only slot-less records survive. Returns the number of
    /// records dropped.
    pub fn retain_slots(&mut self, item: &ItemId, slots: &[TimeSlot]) -> usize {
        let Some(records) = self.items.get_mut(item) else {
            return 0;
        };
        let before = records.len();
        for day_slots in records.days.values_mut() {
            day_slots.retain(|slot, _| slot_accepted(slots, *slot));
        }
        records.days.retain(|_, day_slots| !day_slots.is_empty());
        before - records.len()
    }

    /// Forget `item` and all of its records. Returns the removed record count.
    pub fn remove_item(&mut self, item: &ItemId) -> Option<usize> {
        self.items.remove(item).map(|records| records.len())
    }

    pub fn contains_item(&self, item: &ItemId) -> bool {
        self.items.contains_key(item)
    }

    /// Total records across all items.
    pub fn record_count(&self) -> usize {
        self.items.values().map(ItemRecords::len).sum()
    }

    pub fn status(&self, item: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Option<CompletionStatus> {
        self.items
            .get(item)?
            .days
            .get(&day)?
            .get(&slot)
            .copied()
    }

    pub fn is_completed_for(&self, item: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> bool {
        self.status(item, day, slot) == Some(CompletionStatus::Completed)
    }

    fn writable(&mut self, item: &ItemId, day: DayKey) -> Result<&mut ItemRecords> {
        let records = self
            .items
            .get_mut(item)
            .ok_or_else(|| CoreError::ItemNotFound(item.clone()))?;
        if day < records.floor {
            return Err(CoreError::DayBeforeStart {
                item: item.clone(),
                day,
                start: records.floor,
            });
        }
        Ok(records)
    }

    fn set(
        &mut self,
        item: &ItemId,
        day: DayKey,
        slot: Option<TimeSlot>,
        status: CompletionStatus,
    ) -> Result<bool> {
        let records = self.writable(item, day)?;
        let previous = records.days.entry(day).or_default().insert(slot, status);
        Ok(previous != Some(status))
    }

    /// Record a completion. Returns whether anything changed.
    pub fn mark_completed(&mut self, item: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Result<bool> {
        self.set(item, day, slot, CompletionStatus::Completed)
    }

    /// Record an explicit miss. Returns whether anything changed.
    pub fn mark_missed(&mut self, item: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Result<bool> {
        self.set(item, day, slot, CompletionStatus::Missed)
    }

    /// Remove the record, if any. Returns whether anything changed.
    pub fn mark_not_completed(&mut self, item: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Result<bool> {
        let records = self.writable(item, day)?;
        let Some(slots) = records.days.get_mut(&day) else {
            return Ok(false);
        };
        let removed = slots.remove(&slot).is_some();
        if slots.is_empty() {
            records.days.remove(&day);
        }
        Ok(removed)
    }

    /// Flip between completed and unmarked. Returns the new completed state.
    pub fn toggle(&mut self, item: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Result<bool> {
        if self.is_completed_for(item, day, slot) {
            self.mark_not_completed(item, day, slot)?;
            Ok(false)
        } else {
            self.mark_completed(item, day, slot)?;
            Ok(true)
        }
    }

    /// Records for `item` between `start` and `end` inclusive, ascending by day then slot.
    ///
    /// The iterator is lazy and can be cloned to restart from its current position.
    pub fn records_in_range(
        &self,
        item: &ItemId,
        start: DayKey,
        end: DayKey,
    ) -> Result<impl Iterator<Item = CompletionRecord> + Clone + '_> {
        if end < start {
            return Err(CoreError::InvalidDateRange { start, end });
        }
        let records = self
            .items
            .get(item)
            .ok_or_else(|| CoreError::ItemNotFound(item.clone()))?;
        Ok(flatten(records.days.range(start..=end)))
    }

    /// Every record for `item`, ascending. Empty for unknown items.
    pub fn records(&self, item: &ItemId) -> Vec<CompletionRecord> {
        match self.items.get(item) {
            Some(records) => flatten(records.days.iter()).collect(),
            None => Vec::new(),
        }
    }

    /// Days on which `item` counts as done.
    ///
    /// With no `slots` a day is done when its slot-less record is completed;
    /// otherwise every listed slot must be completed that day.
    pub fn completed_days(&self, item: &ItemId, slots: &[TimeSlot]) -> BTreeSet<DayKey> {
        let Some(records) = self.items.get(item) else {
            return BTreeSet::new();
        };
        records
            .days
            .iter()
            .filter(|(_, day_slots)| day_complete(day_slots, slots))
            .map(|(day, _)| *day)
            .collect()
    }

    /// Completed count on `day` among `slots` (the slot-less record when empty).
    pub fn completed_slots_on(&self, item: &ItemId, day: DayKey, slots: &[TimeSlot]) -> usize {
        self.items
            .get(item)
            .and_then(|records| records.days.get(&day))
            .map(|day_slots| {
                day_slots
                    .iter()
                    .filter(|(slot, status)| {
                        **status == CompletionStatus::Completed && slot_accepted(slots, **slot)
                    })
                    .count()
            })
            .unwrap_or(0)
    }
}

fn slot_accepted(slots: &[TimeSlot], slot: Option<TimeSlot>) -> bool {
    match slot {
        None => slots.is_empty(),
        Some(slot) => slots.contains(&slot),
    }
}

fn day_complete(day_slots: &DaySlots, slots: &[TimeSlot]) -> bool {
    let done = |slot: Option<TimeSlot>| day_slots.get(&slot) == Some(&CompletionStatus::Completed);
    if slots.is_empty() {
        done(None)
    } else {
        slots.iter().all(|slot| done(Some(*slot)))
    }
}

fn flatten<'a, I>(days: I) -> impl Iterator<Item = CompletionRecord> + Clone + 'a
where
    I: Iterator<Item = (&'a DayKey, &'a DaySlots)> + Clone + 'a,
{
    days.flat_map(|(day, slots)| {
        let day = *day;
        slots.iter().map(move |(slot, status)| CompletionRecord {
            day,
            slot: *slot,
            status: *status,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DayKey {
        DayKey::from_ymd(y, m, d).unwrap()
    }

    fn ledger_with(item: &ItemId) -> CompletionLedger {
        let mut ledger = CompletionLedger::new();
        ledger.register(item, day(2024, 1, 1));
        ledger
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let id = ItemId::from("habit");
        let mut ledger = ledger_with(&id);
        assert!(ledger.mark_completed(&id, day(2024, 1, 2), None).unwrap());
        assert!(!ledger.mark_completed(&id, day(2024, 1, 2), None).unwrap());
        assert_eq!(ledger.record_count(), 1);
        assert!(ledger.is_completed_for(&id, day(2024, 1, 2), None));
    }

    #[test]
    fn mark_then_unmark_restores_state() {
        let id = ItemId::from("habit");
        let mut ledger = ledger_with(&id);
        ledger.mark_completed(&id, day(2024, 1, 3), None).unwrap();
        let before = ledger.clone();

        ledger.mark_completed(&id, day(2024, 1, 5), None).unwrap();
        ledger.mark_not_completed(&id, day(2024, 1, 5), None).unwrap();
        assert_eq!(ledger, before);
    }

    #[test]
    fn unmark_absent_is_noop() {
        let id = ItemId::from("habit");
        let mut ledger = ledger_with(&id);
        assert!(!ledger.mark_not_completed(&id, day(2024, 1, 9), None).unwrap());
        assert_eq!(ledger.record_count(), 0);
    }

    #[test]
    fn toggle_flips_and_missed_toggles_to_completed() {
        let id = ItemId::from("habit");
        let mut ledger = ledger_with(&id);
        let d = day(2024, 1, 4);
        assert!(ledger.toggle(&id, d, None).unwrap());
        assert!(!ledger.toggle(&id, d, None).unwrap());
        assert_eq!(ledger.status(&id, d, None), None);

        ledger.mark_missed(&id, d, None).unwrap();
        assert_eq!(ledger.status(&id, d, None), Some(CompletionStatus::Missed));
        assert!(ledger.toggle(&id, d, None).unwrap());
        assert_eq!(ledger.status(&id, d, None), Some(CompletionStatus::Completed));
    }

    #[test]
    fn refuses_days_before_floor() {
        let id = ItemId::from("habit");
        let mut ledger = ledger_with(&id);
        let err = ledger.mark_completed(&id, day(2023, 12, 31), None).unwrap_err();
        assert!(matches!(err, CoreError::DayBeforeStart { .. }));
        assert_eq!(ledger.record_count(), 0);
    }

    #[test]
    fn unknown_item_is_an_error() {
        let mut ledger = CompletionLedger::new();
        let err = ledger
            .mark_completed(&ItemId::from("ghost"), day(2024, 1, 1), None)
            .unwrap_err();
        assert!(matches!(err, CoreError::ItemNotFound(_)));
    }

    #[test]
    fn slots_are_tracked_independently() {
        let id = ItemId::from("meds");
        let mut ledger = ledger_with(&id);
        let am = TimeSlot::from_hm(8, 0);
        let pm = TimeSlot::from_hm(20, 0);
        let d = day(2024, 1, 2);
        ledger.mark_completed(&id, d, am).unwrap();
        assert!(ledger.is_completed_for(&id, d, am));
        assert!(!ledger.is_completed_for(&id, d, pm));
        let slots = [am.unwrap(), pm.unwrap()];
        assert_eq!(ledger.completed_slots_on(&id, d, &slots), 1);

        assert!(ledger.completed_days(&id, &slots).is_empty());
        ledger.mark_completed(&id, d, pm).unwrap();
        assert_eq!(ledger.completed_days(&id, &slots).into_iter().collect::<Vec<_>>(), vec![d]);
    }

    #[test]
    fn records_in_range_are_ordered_and_restartable() {
        let id = ItemId::from("habit");
        let mut ledger = ledger_with(&id);
        for d in [5, 2, 9, 3] {
            ledger.mark_completed(&id, day(2024, 1, d), None).unwrap();
        }
        ledger.mark_missed(&id, day(2024, 1, 4), None).unwrap();

        let range = ledger.records_in_range(&id, day(2024, 1, 3), day(2024, 1, 5)).unwrap();
        let again = range.clone();
        let days: Vec<_> = range.map(|r| (r.day, r.status)).collect();
        assert_eq!(
            days,
            vec![
                (day(2024, 1, 3), CompletionStatus::Completed),
                (day(2024, 1, 4), CompletionStatus::Missed),
                (day(2024, 1, 5), CompletionStatus::Completed),
            ]
        );
        assert_eq!(again.count(), 3);
    }

    #[test]
    fn reversed_range_fails_fast() {
        let id = ItemId::from("habit");
        let ledger = ledger_with(&id);
        assert!(matches!(
            ledger.records_in_range(&id, day(2024, 2, 1), day(2024, 1, 1)),
            Err(CoreError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn moving_floor_prunes_older_records() {
        let id = ItemId::from("habit");
        let mut ledger = ledger_with(&id);
        for d in 1..=5 {
            ledger.mark_completed(&id, day(2024, 1, d), None).unwrap();
        }
        assert_eq!(ledger.register(&id, day(2024, 1, 4)), 3);
        assert_eq!(ledger.record_count(), 2);
    }

    #[test]
    fn retain_slots_drops_records_for_removed_slots() {
        let id = ItemId::from("meds");
        let mut ledger = ledger_with(&id);
        let am = TimeSlot::from_hm(8, 0);
        let pm = TimeSlot::from_hm(20, 0);
        ledger.mark_completed(&id, day(2024, 1, 2), None).unwrap();
        ledger.mark_completed(&id, day(2024, 1, 3), am).unwrap();
        ledger.mark_completed(&id, day(2024, 1, 3), pm).unwrap();

        let slots = [am.unwrap()];
        assert_eq!(ledger.completed_slots_on(&id, day(2024, 1, 2), &slots), 0);
        assert_eq!(ledger.retain_slots(&id, &slots), 2);
        assert_eq!(
            ledger.records(&id),
            vec![CompletionRecord {
                day: day(2024, 1, 3),
                slot: am,
                status: CompletionStatus::Completed,
            }]
        );
        assert_eq!(ledger.retain_slots(&ItemId::from("ghost"), &slots), 0);
    }

    #[test]
    fn remove_item_cascades() {
        let id = ItemId::from("habit");
        let mut ledger = ledger_with(&id);
        ledger.mark_completed(&id, day(2024, 1, 1), None).unwrap();
        ledger.mark_completed(&id, day(2024, 1, 2), None).unwrap();
        assert_eq!(ledger.remove_item(&id), Some(2));
        assert!(!ledger.contains_item(&id));
        assert!(ledger.records(&id).is_empty());
    }
}
