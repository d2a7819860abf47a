use cadence_core::{DayKey, ItemId};
use clap::Subcommand;
use serde_json::json;

use crate::common::{open_store, parse_day, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Current and longest streak
    Streak {
        /// Item ID
        id: String,
        /// Evaluate as of this day (default: today)
        #[arg(long)]
        today: Option<String>,
    },
    /// Completion rate over a window
    Rate {
        /// Item ID
        id: String,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day (default: today)
        #[arg(long)]
        to: Option<String>,
    },
    /// Day-by-day status for a month
    Calendar {
        /// Item ID
        id: String,
        /// Month as YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Dose adherence for multi-slot items
    Adherence {
        /// Item ID
        id: String,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day (default: today)
        #[arg(long)]
        to: Option<String>,
    },
}

fn parse_month(value: Option<&str>) -> CliResult<(i32, u32)> {
    use chrono::Datelike;

    let Some(text) = value else {
        let today = DayKey::today().date();
        return Ok((today.year(), today.month()));
    };
    let (year, month) = text
        .split_once('-')
        .ok_or(format!("month must be YYYY-MM: {text}"))?;
    Ok((year.trim().parse()?, month.trim().parse()?))
}

pub fn run(action: StatsAction) -> CliResult {
    let store = open_store()?;

    match action {
        StatsAction::Streak { id, today } => {
            let report = store.streaks_for(&ItemId::from(id), parse_day(today.as_deref())?)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StatsAction::Rate { id, from, to } => {
            let from: DayKey = from.parse()?;
            let to = parse_day(to.as_deref())?;
            let rate = store.completion_rate(&ItemId::from(id), from, to)?;
            let out = json!({ "from": from, "to": to, "completion_rate": rate });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        StatsAction::Calendar { id, month } => {
            let (year, month) = parse_month(month.as_deref())?;
            let days: Vec<_> = store
                .calendar_month(&ItemId::from(id), year, month)?
                .into_iter()
                .map(|(day, status)| json!({ "day": day, "status": status }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&days)?);
        }
        StatsAction::Adherence { id, from, to } => {
            let from: DayKey = from.parse()?;
            let to = parse_day(to.as_deref())?;
            let stats = store.dose_adherence(&ItemId::from(id), from, to)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
