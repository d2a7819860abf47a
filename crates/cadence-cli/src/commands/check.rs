//! Completion commands for CLI.

use cadence_core::{DayKey, DayStatus, ItemId, TimeSlot};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::common::{ensure_saved, open_store, parse_day, parse_slot, CliResult};

#[derive(Args)]
pub struct Target {
    /// Item ID
    id: String,
    /// Day to record (default: today)
    #[arg(long)]
    day: Option<String>,
    /// Time slot (HH:MM) for multi-dose items
    #[arg(long)]
    slot: Option<String>,
}

#[derive(Subcommand)]
pub enum CheckAction {
    /// Flip completion
    Toggle(Target),
    /// Mark as completed
    Done(Target),
    /// Clear any record
    Undo(Target),
    /// Mark as explicitly missed
    Miss(Target),
}

enum Kind {
    Toggle,
    Done,
    Undo,
    Miss,
}

#[derive(Serialize)]
struct Outcome {
    id: ItemId,
    day: DayKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    slot: Option<TimeSlot>,
    changed: bool,
    status: DayStatus,
}

pub fn run(action: CheckAction) -> CliResult {
    let mut store = open_store()?;

    let (target, kind) = match action {
        CheckAction::Toggle(t) => (t, Kind::Toggle),
        CheckAction::Done(t) => (t, Kind::Done),
        CheckAction::Undo(t) => (t, Kind::Undo),
        CheckAction::Miss(t) => (t, Kind::Miss),
    };

    let id = ItemId::from(target.id);
    let day = parse_day(target.day.as_deref())?;
    let slot = parse_slot(target.slot.as_deref())?;

    let changed = match kind {
        // Toggling always changes the record.
        Kind::Toggle => store.toggle_completion(&id, day, slot).map(|_| true)?,
        Kind::Done => store.mark_completed(&id, day, slot)?,
        Kind::Undo => store.mark_not_completed(&id, day, slot)?,
        Kind::Miss => store.mark_missed(&id, day, slot)?,
    };
    ensure_saved(&store)?;

    let outcome = Outcome {
        status: store.day_status(&id, day)?,
        id,
        day,
        slot,
        changed,
    };
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
