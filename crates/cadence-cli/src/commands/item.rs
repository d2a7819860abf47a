//! Tracked item management commands for CLI.

use cadence_core::{DayKey, DayStatus, Details, ItemFilter, ItemId, SortKey, TrackedItem};
use clap::Subcommand;
use serde::Serialize;

use crate::common::{
    ensure_saved, open_store, parse_day, parse_enum, parse_rule, parse_slots, split_csv, CliResult,
};

#[derive(Subcommand)]
pub enum ItemAction {
    /// Start tracking a new item
    Add {
        /// Item name
        name: String,
        /// Recurrence: daily, weekly:mon, days:mon,wed, every:N or once:YYYY-MM-DD
        #[arg(long, default_value = "daily")]
        rule: String,
        /// First tracked day (default: today, or the once: date if earlier)
        #[arg(long)]
        start: Option<String>,
        /// Category
        #[arg(long)]
        category: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Free-form note
        #[arg(long)]
        note: Option<String>,
        /// Comma-separated HH:MM times, each completed separately
        #[arg(long)]
        slots: Option<String>,
    },
    /// List items, filtered and sorted
    List {
        /// Case-insensitive text search
        #[arg(long)]
        search: Option<String>,
        /// Restrict to categories (repeatable)
        #[arg(long)]
        category: Vec<String>,
        /// Restrict to tags (repeatable)
        #[arg(long)]
        tag: Vec<String>,
        /// Restrict to statuses: pending, not_due, completed (repeatable)
        #[arg(long)]
        status: Vec<String>,
        /// Sort: name, created_at, status_then_name, status_then_created_at
        #[arg(long)]
        sort: Option<String>,
        /// Reference day for statuses (default: today)
        #[arg(long)]
        on: Option<String>,
    },
    /// Show one item
    Show {
        /// Item ID
        id: String,
    },
    /// Update an item
    Update {
        /// Item ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New recurrence, anchored on --start or the item's first tracked day
        #[arg(long)]
        rule: Option<String>,
        /// New first tracked day; earlier completions are dropped
        #[arg(long)]
        start: Option<String>,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// New note
        #[arg(long)]
        note: Option<String>,
        /// Comma-separated HH:MM times; empty to clear
        #[arg(long)]
        slots: Option<String>,
    },
    /// Delete an item and its history
    Delete {
        /// Item ID
        id: String,
    },
}

#[derive(Serialize)]
struct ItemRow<'a> {
    #[serde(flatten)]
    item: &'a TrackedItem,
    today: DayStatus,
}

pub fn run(action: ItemAction) -> CliResult {
    let mut store = open_store()?;

    match action {
        ItemAction::Add {
            name,
            rule,
            start,
            category,
            tags,
            note,
            slots,
        } => {
            let start = parse_day(start.as_deref())?;
            let mut details = Details::named(name);
            details.category = category;
            details.note = note;
            details.tags = tags.as_deref().map(split_csv).unwrap_or_default();

            let slots = slots.as_deref().map(parse_slots).transpose()?.unwrap_or_default();
            let rule = parse_rule(&rule, start)?;
            let created = start.min(rule.start());
            let item = TrackedItem::new(details, rule, created).with_time_slots(slots);
            let id = store.add(item)?;
            ensure_saved(&store)?;
            println!("Item added: {id}");
            if let Some(item) = store.get(&id) {
                println!("{}", serde_json::to_string_pretty(item)?);
            }
        }
        ItemAction::List {
            search,
            category,
            tag,
            status,
            sort,
            on,
        } => {
            let today = parse_day(on.as_deref())?;
            let mut filter = ItemFilter::new().search(search.unwrap_or_default());
            for c in category {
                filter = filter.category(c);
            }
            for t in tag {
                filter = filter.tag(t);
            }
            for s in &status {
                filter = filter.status(parse_enum(s)?);
            }
            let sort = sort.as_deref().map(parse_enum::<SortKey>).transpose()?;

            let mut rows = Vec::new();
            for item in store.filtered_view(&filter, sort, today) {
                rows.push(ItemRow {
                    item,
                    today: store.day_status(&item.id, today)?,
                });
            }
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        ItemAction::Show { id } => {
            let id = ItemId::from(id);
            let item = store.get(&id).ok_or(format!("Item not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(item)?);
        }
        ItemAction::Update {
            id,
            name,
            rule,
            start,
            category,
            tags,
            note,
            slots,
        } => {
            let id = ItemId::from(id);
            let mut item = store.get(&id).ok_or(format!("Item not found: {id}"))?.clone();

            if let Some(n) = name {
                item.details.name = n;
            }
            if let Some(c) = category {
                item.details.category = Some(c);
            }
            if let Some(n) = note {
                item.details.note = Some(n);
            }
            if let Some(t) = tags {
                item.details.tags = split_csv(&t);
            }
            if let Some(s) = slots {
                item.time_slots = parse_slots(&s)?;
            }
            let start = start.as_deref().map(str::parse::<DayKey>).transpose()?;
            if let Some(s) = start {
                item.created_at = s;
            }
            match rule {
                Some(r) => {
                    item.rule = parse_rule(&r, start.unwrap_or(item.created_at))?;
                    item.created_at = item.created_at.min(item.rule.start());
                }
                None if start.is_some() => {
                    return Err("--start requires --rule so the recurrence can be re-anchored".into());
                }
                None => {}
            }

            store.update(item)?;
            ensure_saved(&store)?;
            println!("Item updated:");
            if let Some(item) = store.get(&id) {
                println!("{}", serde_json::to_string_pretty(item)?);
            }
        }
        ItemAction::Delete { id } => {
            let id = ItemId::from(id);
            store.delete(&id)?;
            ensure_saved(&store)?;
            println!("Item deleted: {id}");
        }
    }
    Ok(())
}
