//! # Cadence Core Library
//!
//! Recurrence evaluation and completion tracking over calendar time for
//! habits, medication schedules, plant-care routines and similar tracked
//! items.
//!
//! ## Architecture
//!
//! - **Recurrence**: a single tagged [`RecurrenceRule`] decides whether an
//!   item is due on a calendar day
//! - **Ledger**: [`CompletionLedger`] indexes completion records by
//!   `(item, day, slot)` with idempotent mark/unmark
//! - **Streaks**: [`StreakCalculator`] derives current/longest streaks and
//!   completion rates over due days only
//! - **Filtering**: search, filter sets and stable multi-key sort
//! - **Store**: [`TrackerStore`] orchestrates the above and writes a
//!   snapshot through a [`SnapshotStore`] after every mutation
//!
//! Everything is synchronous and single-threaded; dates are local calendar
//! days.

pub mod config;
pub mod day;
pub mod error;
pub mod filter;
pub mod item;
pub mod ledger;
pub mod recurrence;
pub mod snapshot;
pub mod store;
pub mod streak;

pub use config::Config;
pub use day::{DayKey, DayRange, TimeSlot};
pub use error::{ConfigError, CoreError, DecodeError, Result, ValidationError};
pub use filter::{ItemFilter, ItemStatus, SortKey};
pub use item::{Details, ItemDetails, ItemId, TrackedItem};
pub use ledger::{CompletionLedger, CompletionRecord, CompletionStatus};
pub use recurrence::{RecurrenceRule, WeekdaySet};
pub use snapshot::{
    decode_snapshot, encode_snapshot, FileSnapshotStore, LoadResult, LoadWarning,
    MemorySnapshotStore, Snapshot, SnapshotStore,
};
pub use store::{DayStatus, LoadReport, TrackerStore};
pub use streak::{AdherenceStats, StreakCalculator, StreakConfig, StreakReport, Streaks};
