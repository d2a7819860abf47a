//! Core error types for cadence-core.
//!
//! This module defines the error hierarchy using thiserror. Decode failures
//! are split out so the load path can report them without aborting startup.

use std::path::PathBuf;
use thiserror::Error;

use crate::day::{DayKey, TimeSlot};
use crate::item::ItemId;

/// Core error type for cadence-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Range query whose end precedes its start
    #[error("Invalid date range: end ({end}) precedes start ({start})")]
    InvalidDateRange { start: DayKey, end: DayKey },

    /// Persisted snapshot could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No tracked item with this id
    #[error("Tracked item not found: {0}")]
    ItemNotFound(ItemId),

    /// An item with this id already exists
    #[error("Tracked item already exists: {0}")]
    DuplicateItem(ItemId),

    /// Ledger mutation for a day before the item was created
    #[error("Cannot record {day} for item {item}: tracking starts on {start}")]
    DayBeforeStart {
        item: ItemId,
        day: DayKey,
        start: DayKey,
    },

    /// Slot argument does not match the item's configured time slots
    #[error("Item {item} has no time slot {}", display_slot(.slot))]
    UnknownTimeSlot {
        item: ItemId,
        slot: Option<TimeSlot>,
    },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_slot(slot: &Option<TimeSlot>) -> String {
    match slot {
        Some(slot) => slot.to_string(),
        None => "(none)".to_string(),
    }
}

/// Reasons a persisted snapshot could not be decoded at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Blob is not valid JSON
    #[error("snapshot is malformed: {0}")]
    Malformed(String),

    /// Valid JSON but not shaped like a snapshot
    #[error("snapshot does not match the expected schema: {0}")]
    SchemaMismatch(String),

    /// Persistence collaborator failed to produce the blob
    #[error("snapshot could not be read: {0}")]
    Unreadable(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Interval rule with a zero-day interval
    #[error("Recurrence interval must be at least 1 day")]
    ZeroInterval,

    /// Custom-days rule with no weekdays selected
    #[error("Custom recurrence must select at least one weekday")]
    EmptyWeekdaySet,

    /// Rule has no due day on or after the item's creation day
    #[error("Recurrence is never due on or after {created_at}")]
    NeverDue { created_at: DayKey },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
