use cadence_core::{DayStatus, TrackedItem};
use clap::Args;
use serde::Serialize;

use crate::common::{open_store, parse_day, CliResult};

#[derive(Args)]
pub struct DueArgs {
    /// Day to check (default: today)
    #[arg(long)]
    day: Option<String>,
    /// Only items not yet completed
    #[arg(long)]
    pending: bool,
}

#[derive(Serialize)]
struct DueRow<'a> {
    #[serde(flatten)]
    item: &'a TrackedItem,
    status: DayStatus,
}

pub fn run(args: DueArgs) -> CliResult {
    let store = open_store()?;
    let day = parse_day(args.day.as_deref())?;

    let mut rows = Vec::new();
    for item in store.items_due(day) {
        let status = store.day_status(&item.id, day)?;
        if args.pending && status == DayStatus::Completed {
            continue;
        }
        rows.push(DueRow { item, status });
    }
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
