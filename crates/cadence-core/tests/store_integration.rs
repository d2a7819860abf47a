//! Integration tests for the tracker store.
//!
//! Walks the full workflow: items are added, completions recorded, the
//! snapshot reloaded into a second store, and streak / filter queries
//! checked against known calendars.

use cadence_core::{
    CompletionStatus, Config, CoreError, DayKey, DayStatus, Details, FileSnapshotStore, ItemFilter,
    ItemId, ItemStatus, LoadReport, MemorySnapshotStore, RecurrenceRule, SortKey, TimeSlot,
    TrackedItem, TrackerStore,
};
use chrono::Weekday;

fn day(y: i32, m: u32, d: u32) -> DayKey {
    DayKey::from_ymd(y, m, d).unwrap()
}

fn open(store: MemorySnapshotStore) -> (TrackerStore<MemorySnapshotStore>, LoadReport) {
    TrackerStore::open(store, &Config::default())
}

#[test]
fn test_daily_streak_workflow() {
    let (mut store, _) = open(MemorySnapshotStore::new());
    let id = store
        .add(TrackedItem::new(
            Details::named("Morning pages"),
            RecurrenceRule::Daily { start: day(2024, 1, 1) },
            day(2024, 1, 1),
        ))
        .unwrap();

    for d in 1..=3 {
        store.toggle_completion(&id, day(2024, 1, d), None).unwrap();
    }
    let report = store.streaks_for(&id, day(2024, 1, 3)).unwrap();
    assert_eq!((report.current, report.longest), (3, 3));
    assert_eq!(report.completion_rate, 1.0);

    store.toggle_completion(&id, day(2024, 1, 5), None).unwrap();
    let report = store.streaks_for(&id, day(2024, 1, 5)).unwrap();
    assert_eq!((report.current, report.longest), (1, 3));
    assert_eq!(report.total_due_days, 5);
    assert_eq!(report.completed_due_days, 4);
}

#[test]
fn test_weekly_streak_ignores_off_days() {
    let (mut store, _) = open(MemorySnapshotStore::new());
    let id = store
        .add(TrackedItem::new(
            Details::named("Fertilize roses").with_category("Garden"),
            RecurrenceRule::Weekly {
                weekday: Weekday::Mon,
                start: day(2024, 1, 1),
            },
            day(2024, 1, 1),
        ))
        .unwrap();

    for d in [1, 8, 15, 22] {
        store.mark_completed(&id, day(2024, 1, d), None).unwrap();
    }
    let report = store.streaks_for(&id, day(2024, 1, 28)).unwrap();
    assert_eq!((report.current, report.longest), (4, 4));
    assert_eq!(report.total_due_days, 4);
}

#[test]
fn test_multi_dose_streak_requires_every_slot() {
    let (mut store, _) = open(MemorySnapshotStore::new());
    let am = TimeSlot::from_hm(8, 0);
    let pm = TimeSlot::from_hm(20, 0);
    let id = store
        .add(
            TrackedItem::new(
                Details::named("Amoxicillin").with_category("Medication"),
                RecurrenceRule::CustomDays {
                    weekdays: [Weekday::Mon, Weekday::Wed, Weekday::Fri].into_iter().collect(),
                    start: day(2024, 1, 1),
                },
                day(2024, 1, 1),
            )
            .with_time_slots([am.unwrap(), pm.unwrap()]),
        )
        .unwrap();

    // Mon and Wed fully taken, Fri only the morning dose.
    for d in [1, 3] {
        store.mark_completed(&id, day(2024, 1, d), am).unwrap();
        store.mark_completed(&id, day(2024, 1, d), pm).unwrap();
    }
    store.mark_completed(&id, day(2024, 1, 5), am).unwrap();

    let report = store.streaks_for(&id, day(2024, 1, 5)).unwrap();
    assert_eq!((report.current, report.longest), (0, 2));

    let adherence = store.dose_adherence(&id, day(2024, 1, 1), day(2024, 1, 7)).unwrap();
    assert_eq!(adherence.expected, 6);
    assert_eq!(adherence.taken, 5);

    assert_eq!(
        store.day_status(&id, day(2024, 1, 5)).unwrap(),
        DayStatus::Partial { done: 1, total: 2 }
    );
    assert_eq!(store.day_status(&id, day(2024, 1, 6)).unwrap(), DayStatus::NotDue);
}

#[test]
fn test_mark_idempotence_and_restoration() {
    let (mut store, _) = open(MemorySnapshotStore::new());
    let id = store
        .add(TrackedItem::new(
            Details::named("Sweep kitchen"),
            RecurrenceRule::Daily { start: day(2024, 1, 1) },
            day(2024, 1, 1),
        ))
        .unwrap();
    store.mark_completed(&id, day(2024, 1, 2), None).unwrap();
    let before = store.ledger().clone();

    assert!(store.mark_completed(&id, day(2024, 1, 4), None).unwrap());
    assert!(!store.mark_completed(&id, day(2024, 1, 4), None).unwrap());
    assert_eq!(
        store
            .records_in_range(&id, day(2024, 1, 4), day(2024, 1, 4))
            .unwrap()
            .count(),
        1
    );

    assert!(store.mark_not_completed(&id, day(2024, 1, 4), None).unwrap());
    assert_eq!(store.ledger(), &before);
}

#[test]
fn test_items_due_by_rule() {
    let (mut store, _) = open(MemorySnapshotStore::new());
    let daily = store
        .add(TrackedItem::new(
            Details::named("Water basil"),
            RecurrenceRule::Daily { start: day(2024, 1, 1) },
            day(2024, 1, 1),
        ))
        .unwrap();
    let weekly = store
        .add(TrackedItem::new(
            Details::named("Clean bathroom"),
            RecurrenceRule::Weekly {
                weekday: Weekday::Sat,
                start: day(2024, 1, 1),
            },
            day(2024, 1, 1),
        ))
        .unwrap();
    let once = store
        .add(TrackedItem::new(
            Details::named("Repot cactus"),
            RecurrenceRule::Once { date: day(2024, 1, 10) },
            day(2024, 1, 1),
        ))
        .unwrap();

    let ids = |d: DayKey| -> Vec<ItemId> {
        store.items_due(d).into_iter().map(|i| i.id.clone()).collect()
    };
    assert_eq!(ids(day(2024, 1, 6)), vec![daily.clone(), weekly.clone()]);
    assert_eq!(ids(day(2024, 1, 10)), vec![daily.clone(), once.clone()]);
    assert_eq!(ids(day(2023, 12, 30)), Vec::<ItemId>::new());
}

#[test]
fn test_filter_asymmetry_and_status_sort() {
    let (mut store, _) = open(MemorySnapshotStore::new());
    let rule = RecurrenceRule::Daily { start: day(2024, 1, 1) };
    let report = store
        .add(TrackedItem::new(Details::named("Write report").with_category("Work"), rule.clone(), day(2024, 1, 1)))
        .unwrap();
    let email = store
        .add(TrackedItem::new(Details::named("Email triage").with_category("Work"), rule.clone(), day(2024, 1, 1)))
        .unwrap();
    let yoga = store
        .add(TrackedItem::new(Details::named("Yoga").with_category("Health"), rule, day(2024, 1, 1)))
        .unwrap();
    let today = day(2024, 1, 2);
    store.mark_completed(&email, today, None).unwrap();

    let all = store.filtered_view(&ItemFilter::new(), Some(SortKey::Name), today);
    assert_eq!(all.len(), 3);

    let work: Vec<_> = store
        .filtered_view(&ItemFilter::new().category("Work"), None, today)
        .into_iter()
        .map(|i| i.id.clone())
        .collect();
    // Default sort is status first: pending "Write report" before completed "Email triage".
    assert_eq!(work, vec![report.clone(), email.clone()]);

    let pending: Vec<_> = store
        .filtered_view(&ItemFilter::new().status(ItemStatus::Pending), Some(SortKey::Name), today)
        .into_iter()
        .map(|i| i.id.clone())
        .collect();
    assert_eq!(pending, vec![report, yoga]);
}

#[test]
fn test_snapshot_reload_reproduces_state() {
    let (mut store, _) = open(MemorySnapshotStore::new());
    let id = store
        .add(
            TrackedItem::new(
                Details::named("Vitamin D").with_tags(["supplement"]),
                RecurrenceRule::EveryNDays {
                    interval: 2,
                    start: day(2024, 1, 1),
                },
                day(2024, 1, 1),
            )
            .with_time_slots([TimeSlot::from_hm(9, 0).unwrap()]),
        )
        .unwrap();
    store.mark_completed(&id, day(2024, 1, 1), TimeSlot::from_hm(9, 0)).unwrap();
    store.mark_missed(&id, day(2024, 1, 3), TimeSlot::from_hm(9, 0)).unwrap();

    let bytes = store.persistence().bytes().unwrap();
    let (reloaded, report) = open(MemorySnapshotStore::with_bytes(bytes));
    assert_eq!(report, LoadReport::Loaded { items: 1 });
    assert_eq!(reloaded.items(), store.items());
    assert_eq!(reloaded.ledger(), store.ledger());
    assert_eq!(
        reloaded.ledger().status(&id, day(2024, 1, 3), TimeSlot::from_hm(9, 0)),
        Some(CompletionStatus::Missed)
    );
}

#[test]
fn test_corrupted_snapshot_starts_empty() {
    let (mut store, report) = open(MemorySnapshotStore::with_bytes(&b"\x00garbage"[..]));
    assert!(matches!(report, LoadReport::Failed(_)));
    assert!(store.items().is_empty());

    // Store stays usable.
    store
        .add(TrackedItem::new(
            Details::named("Fresh start"),
            RecurrenceRule::Daily { start: day(2024, 1, 1) },
            day(2024, 1, 1),
        ))
        .unwrap();
    assert_eq!(store.items().len(), 1);
}

#[test]
fn test_file_backed_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.json");

    let (mut store, report) = TrackerStore::<_, Details>::open(FileSnapshotStore::new(&path), &Config::default());
    assert_eq!(report, LoadReport::Fresh);
    let id = store
        .add(TrackedItem::new(
            Details::named("Mop floors"),
            RecurrenceRule::Weekly {
                weekday: Weekday::Sun,
                start: day(2024, 1, 7),
            },
            day(2024, 1, 7),
        ))
        .unwrap();
    store.mark_completed(&id, day(2024, 1, 7), None).unwrap();
    drop(store);

    let (store, report) = TrackerStore::<_, Details>::open(FileSnapshotStore::new(&path), &Config::default());
    assert_eq!(report, LoadReport::Loaded { items: 1 });
    assert!(store.is_completed(&id, day(2024, 1, 7), None).unwrap());
}

#[test]
fn test_range_queries_fail_fast_when_reversed() {
    let (mut store, _) = open(MemorySnapshotStore::new());
    let id = store
        .add(TrackedItem::new(
            Details::named("Practice piano"),
            RecurrenceRule::Daily { start: day(2024, 1, 1) },
            day(2024, 1, 1),
        ))
        .unwrap();
    assert!(matches!(
        store.records_in_range(&id, day(2024, 1, 9), day(2024, 1, 1)),
        Err(CoreError::InvalidDateRange { .. })
    ));
    assert!(matches!(
        store.dose_adherence(&id, day(2024, 1, 9), day(2024, 1, 1)),
        Err(CoreError::InvalidDateRange { .. })
    ));
}

#[test]
fn test_custom_details_type() {
    use cadence_core::ItemDetails;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Plant {
        species: String,
        room: String,
    }

    impl ItemDetails for Plant {
        fn name(&self) -> &str {
            &self.species
        }
        fn category(&self) -> Option<&str> {
            Some(&self.room)
        }
    }

    let (mut store, _) = TrackerStore::<_, Plant>::open(MemorySnapshotStore::new(), &Config::default());
    store
        .add(TrackedItem::new(
            Plant {
                species: "Monstera".into(),
                room: "Living room".into(),
            },
            RecurrenceRule::EveryNDays {
                interval: 7,
                start: day(2024, 1, 1),
            },
            day(2024, 1, 1),
        ))
        .unwrap();
    store
        .add(TrackedItem::new(
            Plant {
                species: "Pothos".into(),
                room: "Office".into(),
            },
            RecurrenceRule::EveryNDays {
                interval: 5,
                start: day(2024, 1, 1),
            },
            day(2024, 1, 1),
        ))
        .unwrap();

    let office = store.filtered_view(&ItemFilter::new().category("Office"), None, day(2024, 1, 6));
    assert_eq!(office.len(), 1);
    assert_eq!(office[0].details.species, "Pothos");

    let bytes = store.persistence().bytes().unwrap();
    let (reloaded, _) = TrackerStore::<_, Plant>::open(MemorySnapshotStore::with_bytes(bytes), &Config::default());
    assert_eq!(reloaded.items(), store.items());
}
