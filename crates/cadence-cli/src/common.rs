//! Helpers shared by the CLI commands.

use std::path::PathBuf;

use cadence_core::{
    Config, DayKey, FileSnapshotStore, LoadReport, RecurrenceRule, TimeSlot, TrackerStore,
    WeekdaySet,
};
use chrono::Weekday;
use serde::de::DeserializeOwned;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub type Store = TrackerStore<FileSnapshotStore>;

/// Returns `$CADENCE_HOME`, or `~/.config/cadence/` when unset.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> CliResult<PathBuf> {
    let dir = match std::env::var_os("CADENCE_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("cadence"),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn config_path() -> CliResult<PathBuf> {
    Ok(data_dir()?.join("config.toml"))
}

pub fn load_config() -> CliResult<Config> {
    Ok(Config::load_from(&config_path()?)?)
}

/// Open the tracker snapshot named in the config.
///
/// An unreadable snapshot is moved aside to `<file>.corrupt` before the
/// empty store can overwrite it.
pub fn open_store() -> CliResult<Store> {
    let config = load_config()?;
    let path = data_dir()?.join(&config.storage.snapshot_file);
    let (store, report) = TrackerStore::open(FileSnapshotStore::new(&path), &config);
    match report {
        LoadReport::Recovered { items, warnings } => {
            tracing::warn!(items, dropped = warnings.len(), "snapshot partially recovered");
        }
        LoadReport::Failed(reason) => {
            let mut aside = path.clone().into_os_string();
            aside.push(".corrupt");
            std::fs::rename(&path, &aside)?;
            tracing::warn!(
                "snapshot unreadable ({}); moved to {}",
                reason,
                PathBuf::from(aside).display()
            );
        }
        LoadReport::Fresh | LoadReport::Loaded { .. } => {}
    }
    Ok(store)
}

/// Turn a remembered save failure into a command error.
pub fn ensure_saved(store: &Store) -> CliResult {
    match store.last_persist_error() {
        Some(message) => Err(format!("failed to save tracker data: {message}").into()),
        None => Ok(()),
    }
}

pub fn parse_day(value: Option<&str>) -> CliResult<DayKey> {
    match value {
        Some(text) => Ok(text.parse()?),
        None => Ok(DayKey::today()),
    }
}

pub fn parse_slot(value: Option<&str>) -> CliResult<Option<TimeSlot>> {
    value.map(str::parse::<TimeSlot>).transpose().map_err(Into::into)
}

pub fn parse_slots(value: &str) -> CliResult<Vec<TimeSlot>> {
    split_csv(value)
        .iter()
        .map(|s| -> CliResult<TimeSlot> { Ok(s.parse()?) })
        .collect()
}

pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_weekday(value: &str) -> CliResult<Weekday> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| format!("unknown weekday: {value}").into())
}

/// Parse a rule description.
///
/// Accepted forms: `daily`, `weekly:mon`, `days:mon,wed,fri`,
/// `every:3` and `once:2024-05-01`. `start` anchors every form except `once`.
pub fn parse_rule(text: &str, start: DayKey) -> CliResult<RecurrenceRule> {
    let (kind, arg) = match text.split_once(':') {
        Some((kind, arg)) => (kind.trim(), Some(arg)),
        None => (text.trim(), None),
    };
    let rule = match (kind, arg) {
        ("daily", None) => RecurrenceRule::Daily { start },
        ("weekly", Some(day)) => RecurrenceRule::Weekly {
            weekday: parse_weekday(day)?,
            start,
        },
        ("days", Some(days)) => RecurrenceRule::CustomDays {
            weekdays: split_csv(days)
                .iter()
                .map(|d| parse_weekday(d))
                .collect::<CliResult<WeekdaySet>>()?,
            start,
        },
        ("every", Some(n)) => RecurrenceRule::EveryNDays {
            interval: n.trim().parse()?,
            start,
        },
        ("once", Some(date)) => RecurrenceRule::Once { date: date.parse()? },
        _ => return Err(format!("unrecognised rule: {text}").into()),
    };
    rule.validate()?;
    Ok(rule)
}

/// Deserialize a snake_case enum value such as a sort key or status.
pub fn parse_enum<T: DeserializeOwned>(value: &str) -> CliResult<T> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string()))
        .map_err(|_| format!("invalid value: {value}").into())
}
