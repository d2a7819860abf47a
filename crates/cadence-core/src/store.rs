//! Tracked-item store.
//!
//! [`TrackerStore`] owns the item collection and the completion ledger for
//! one session. It is an explicit value: construct it once and pass it to
//! whatever needs it. Every successful mutation writes a full snapshot
//! through the [`SnapshotStore`] collaborator; a failed write is logged and
//! remembered but never rolls the in-memory state back.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::day::{DayKey, DayRange, TimeSlot};
use crate::error::{CoreError, DecodeError, Result};
use crate::filter::{self, ItemFilter, ItemStatus, SortKey};
use crate::item::{Details, ItemDetails, ItemId, TrackedItem};
use crate::ledger::{CompletionLedger, CompletionRecord, CompletionStatus};
use crate::snapshot::{decode_snapshot, encode_snapshot, LoadResult, LoadWarning, SnapshotStore};
use crate::streak::{AdherenceStats, StreakCalculator, StreakReport};

/// How the store's initial state was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReport {
    /// Nothing persisted yet
    Fresh,
    /// Snapshot decoded cleanly
    Loaded { items: usize },
    /// Snapshot decoded with some entries dropped
    Recovered {
        items: usize,
        warnings: Vec<LoadWarning>,
    },
    /// Persisted data unusable; the store started empty
    Failed(DecodeError),
}

/// Completion state of one item on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DayStatus {
    /// Rule not due that day
    NotDue,
    /// Due, nothing recorded
    Pending,
    /// Multi-slot item with some but not all slots completed
    Partial { done: u32, total: u32 },
    /// Every required completion recorded
    Completed,
    /// At least one slot marked missed and none completed
    Missed,
}

impl DayStatus {
    fn as_item_status(self) -> ItemStatus {
        match self {
            DayStatus::NotDue => ItemStatus::NotDue,
            DayStatus::Completed => ItemStatus::Completed,
            DayStatus::Pending | DayStatus::Partial { .. } | DayStatus::Missed => ItemStatus::Pending,
        }
    }
}

/// Authoritative collection of tracked items for one session.
pub struct TrackerStore<P, D = Details> {
    items: Vec<TrackedItem<D>>,
    ledger: CompletionLedger,
    persistence: P,
    calculator: StreakCalculator,
    default_sort: SortKey,
    pretty: bool,
    batch_depth: usize,
    dirty: bool,
    last_persist_error: Option<String>,
}

impl<P, D> TrackerStore<P, D>
where
    P: SnapshotStore,
    D: ItemDetails + Serialize + DeserializeOwned,
{
    /// Load the persisted snapshot, falling back to an empty collection.
    pub fn open(persistence: P, config: &Config) -> (Self, LoadReport) {
        let result = match persistence.load() {
            Ok(bytes) => decode_snapshot::<D>(bytes.as_deref()),
            Err(e) => LoadResult::Failed(DecodeError::Unreadable(e.to_string())),
        };

        let report = match &result {
            LoadResult::Fresh => LoadReport::Fresh,
            LoadResult::Loaded(snapshot) => LoadReport::Loaded {
                items: snapshot.items.len(),
            },
            LoadResult::Recovered { snapshot, warnings } => {
                for warning in warnings {
                    tracing::warn!("snapshot recovery: {}", warning);
                }
                LoadReport::Recovered {
                    items: snapshot.items.len(),
                    warnings: warnings.clone(),
                }
            }
            LoadResult::Failed(reason) => {
                tracing::warn!("starting with an empty collection: {}", reason);
                LoadReport::Failed(reason.clone())
            }
        };

        let snapshot = result.into_snapshot();
        tracing::debug!(items = snapshot.items.len(), "tracker store opened");

        let store = Self {
            items: snapshot.items,
            ledger: snapshot.ledger,
            persistence,
            calculator: StreakCalculator::with_config(config.streaks.clone()),
            default_sort: config.view.default_sort,
            pretty: config.storage.pretty,
            batch_depth: 0,
            dirty: false,
            last_persist_error: None,
        };
        (store, report)
    }

    pub fn items(&self) -> &[TrackedItem<D>] {
        &self.items
    }

    pub fn get(&self, id: &ItemId) -> Option<&TrackedItem<D>> {
        self.items.iter().find(|item| &item.id == id)
    }

    fn require(&self, id: &ItemId) -> Result<&TrackedItem<D>> {
        self.get(id).ok_or_else(|| CoreError::ItemNotFound(id.clone()))
    }

    fn position(&self, id: &ItemId) -> Result<usize> {
        self.items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| CoreError::ItemNotFound(id.clone()))
    }

    pub fn ledger(&self) -> &CompletionLedger {
        &self.ledger
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Message of the most recent failed save, cleared by the next successful one.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    /// Items whose rule is due on `day`, in collection order.
    pub fn items_due(&self, day: DayKey) -> Vec<&TrackedItem<D>> {
        self.items.iter().filter(|item| item.is_due(day)).collect()
    }

    pub fn is_completed(&self, id: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Result<bool> {
        let item = self.require(id)?;
        check_slot(item, slot)?;
        Ok(self.ledger.is_completed_for(id, day, slot))
    }

    /// Completion state of an item on `day`.
    pub fn day_status(&self, id: &ItemId, day: DayKey) -> Result<DayStatus> {
        let item = self.require(id)?;
        Ok(self.status_of(item, day))
    }

    fn status_of(&self, item: &TrackedItem<D>, day: DayKey) -> DayStatus {
        if !item.is_due(day) {
            return DayStatus::NotDue;
        }
        if item.time_slots.is_empty() {
            return match self.ledger.status(&item.id, day, None) {
                Some(CompletionStatus::Completed) => DayStatus::Completed,
                Some(CompletionStatus::Missed) => DayStatus::Missed,
                None => DayStatus::Pending,
            };
        }

        let total = item.time_slots.len() as u32;
        let mut done = 0u32;
        let mut missed = 0u32;
        for slot in &item.time_slots {
            match self.ledger.status(&item.id, day, Some(*slot)) {
                Some(CompletionStatus::Completed) => done += 1,
                Some(CompletionStatus::Missed) => missed += 1,
                None => {}
            }
        }
        match (done, missed) {
            (d, _) if d == total => DayStatus::Completed,
            (0, 0) => DayStatus::Pending,
            (0, _) => DayStatus::Missed,
            (d, _) => DayStatus::Partial { done: d, total },
        }
    }

    /// Day-by-day status for one calendar month.
    pub fn calendar_month(&self, id: &ItemId, year: i32, month: u32) -> Result<Vec<(DayKey, DayStatus)>> {
        let item = self.require(id)?;
        let (first, last) = DayKey::month_bounds(year, month)?;
        Ok(DayRange::new(first, last)?
            .map(|day| (day, self.status_of(item, day)))
            .collect())
    }

    /// Recorded completions between `start` and `end` inclusive.
    pub fn records_in_range(
        &self,
        id: &ItemId,
        start: DayKey,
        end: DayKey,
    ) -> Result<impl Iterator<Item = CompletionRecord> + Clone + '_> {
        self.ledger.records_in_range(id, start, end)
    }

    /// Streaks and completion rate from the item's creation up to `today`.
    pub fn streaks_for(&self, id: &ItemId, today: DayKey) -> Result<StreakReport> {
        let item = self.require(id)?;
        if today < item.created_at {
            return Ok(StreakReport::default());
        }
        let completed = self.ledger.completed_days(id, &item.time_slots);
        self.calculator
            .report(&item.rule, &completed, item.created_at, today)
    }

    /// Share of due days completed between `start` and `end` inclusive.
    pub fn completion_rate(&self, id: &ItemId, start: DayKey, end: DayKey) -> Result<f64> {
        let item = self.require(id)?;
        DayRange::new(start, end)?;
        let window_start = start.max(item.created_at);
        if end < window_start {
            return Ok(0.0);
        }
        let completed = self.ledger.completed_days(id, &item.time_slots);
        let report = self
            .calculator
            .report(&item.rule, &completed, window_start, end)?;
        Ok(report.completion_rate)
    }

    /// Slot-level adherence between `start` and `end` inclusive.
    pub fn dose_adherence(&self, id: &ItemId, start: DayKey, end: DayKey) -> Result<AdherenceStats> {
        let item = self.require(id)?;
        let range = DayRange::new(start, end)?;
        Ok(self.calculator.dose_adherence(
            &item.rule,
            item.time_slots.len(),
            range,
            |day| self.ledger.completed_slots_on(id, day, &item.time_slots),
        ))
    }

    /// Filtered and sorted view relative to `today`.
    ///
    /// `sort` falls back to the configured default ordering.
    pub fn filtered_view(&self, filter: &ItemFilter, sort: Option<SortKey>, today: DayKey) -> Vec<&TrackedItem<D>> {
        filter::apply(
            &self.items,
            filter,
            sort.unwrap_or(self.default_sort),
            |item| self.status_of(item, today).as_item_status(),
        )
    }

    /// Add a new item. Fails on an invalid rule or a reused id.
    pub fn add(&mut self, mut item: TrackedItem<D>) -> Result<ItemId> {
        item.validate()?;
        if self.get(&item.id).is_some() {
            return Err(CoreError::DuplicateItem(item.id));
        }
        item.normalize_slots();
        self.ledger.register(&item.id, item.created_at);
        let id = item.id.clone();
        tracing::debug!(item = %id, "item added");
        self.items.push(item);
        self.mutated();
        Ok(id)
    }

    /// Replace an item wholesale, keeping its completion history.
    ///
    /// Records that predate a moved-forward `created_at`, or whose slot the
    /// new slot list no longer accepts, are dropped.
    pub fn update(&mut self, mut item: TrackedItem<D>) -> Result<()> {
        item.validate()?;
        let index = self.position(&item.id)?;
        item.normalize_slots();
        let pruned = self.ledger.register(&item.id, item.created_at)
            + self.ledger.retain_slots(&item.id, &item.time_slots);
        if pruned > 0 {
            tracing::debug!(item = %item.id, pruned, "records outside the new schedule dropped");
        }
        self.items[index] = item;
        self.mutated();
        Ok(())
    }

    /// Remove an item and every completion record it owns.
    pub fn delete(&mut self, id: &ItemId) -> Result<TrackedItem<D>> {
        let index = self.position(id)?;
        let removed = self.items.remove(index);
        let records = self.ledger.remove_item(id).unwrap_or(0);
        tracing::debug!(item = %id, records, "item deleted");
        self.mutated();
        Ok(removed)
    }

    /// Flip completion for `(id, day, slot)`. Returns the new completed state.
    pub fn toggle_completion(&mut self, id: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Result<bool> {
        check_slot(self.require(id)?, slot)?;
        let completed = self.ledger.toggle(id, day, slot)?;
        tracing::debug!(item = %id, %day, completed, "completion toggled");
        self.mutated();
        Ok(completed)
    }

    /// Record a completion. Saves only when something changed.
    pub fn mark_completed(&mut self, id: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Result<bool> {
        check_slot(self.require(id)?, slot)?;
        let changed = self.ledger.mark_completed(id, day, slot)?;
        if changed {
            self.mutated();
        }
        Ok(changed)
    }

    /// Record an explicit miss. Saves only when something changed.
    pub fn mark_missed(&mut self, id: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Result<bool> {
        check_slot(self.require(id)?, slot)?;
        let changed = self.ledger.mark_missed(id, day, slot)?;
        if changed {
            self.mutated();
        }
        Ok(changed)
    }

    /// Clear any record. Saves only when something changed.
    pub fn mark_not_completed(&mut self, id: &ItemId, day: DayKey, slot: Option<TimeSlot>) -> Result<bool> {
        check_slot(self.require(id)?, slot)?;
        let changed = self.ledger.mark_not_completed(id, day, slot)?;
        if changed {
            self.mutated();
        }
        Ok(changed)
    }

    /// Run several mutations and save once at the end.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let out = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && self.dirty {
            self.persist();
        }
        out
    }

    fn mutated(&mut self) {
        self.dirty = true;
        if self.batch_depth == 0 {
            self.persist();
        }
    }

    /// Write the full snapshot. Failures are logged, not propagated.
    fn persist(&mut self) {
        self.dirty = false;
        let outcome = encode_snapshot(&self.items, &self.ledger, self.pretty)
            .and_then(|bytes| self.persistence.save(&bytes).map_err(CoreError::from));
        match outcome {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                tracing::warn!("snapshot save failed: {}", e);
                self.last_persist_error = Some(e.to_string());
            }
        }
    }
}

fn check_slot<D>(item: &TrackedItem<D>, slot: Option<TimeSlot>) -> Result<()> {
    if item.accepts_slot(slot) {
        Ok(())
    } else {
        Err(CoreError::UnknownTimeSlot {
            item: item.id.clone(),
            slot,
        })
    }
}
