//! Search, filter and sort over tracked items.
//!
//! Every filter set follows the same rule: an empty set means "no
//! restriction", never "exclude everything".

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::item::{ItemDetails, TrackedItem};

/// Status of an item relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Due and not yet done
    Pending,
    /// Not due on the reference day
    NotDue,
    /// Due and done
    Completed,
}

impl ItemStatus {
    /// Sort rank, incomplete first.
    fn rank(self) -> u8 {
        match self {
            ItemStatus::Pending => 0,
            ItemStatus::NotDue => 1,
            ItemStatus::Completed => 2,
        }
    }
}

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    CreatedAt,
    #[default]
    StatusThenName,
    StatusThenCreatedAt,
}

/// Predicate set for [`apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring over name, description, category and tags
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// Matches items carrying any of these tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub statuses: BTreeSet<ItemStatus>,
}

impl ItemFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn status(mut self, status: ItemStatus) -> Self {
        self.statuses.insert(status);
        self
    }

    fn matches_search<D: ItemDetails>(&self, details: &D) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let hit = |text: &str| text.to_lowercase().contains(&needle);
        hit(details.name())
            || details.description().is_some_and(hit)
            || details.category().is_some_and(hit)
            || details.tags().iter().any(|tag| hit(tag.as_str()))
    }

    fn matches<D: ItemDetails>(&self, details: &D, status: ItemStatus) -> bool {
        if !self.categories.is_empty()
            && !details
                .category()
                .is_some_and(|c| self.categories.contains(c))
        {
            return false;
        }
        if !self.tags.is_empty() && !details.tags().iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&status) {
            return false;
        }
        self.matches_search(details)
    }
}

fn by_name<D: ItemDetails>(a: &TrackedItem<D>, b: &TrackedItem<D>) -> Ordering {
    a.details
        .name()
        .to_lowercase()
        .cmp(&b.details.name().to_lowercase())
}

/// Filter `items` and sort the survivors.
///
/// `status_of` supplies each item's status for the status filter and the
/// status-first sort keys. The sort is stable and always falls back to
/// name and then id, so output order is reproducible.
pub fn apply<'a, D, I, F>(
    items: I,
    filter: &ItemFilter,
    sort: SortKey,
    status_of: F,
) -> Vec<&'a TrackedItem<D>>
where
    D: ItemDetails + 'a,
    I: IntoIterator<Item = &'a TrackedItem<D>>,
    F: Fn(&TrackedItem<D>) -> ItemStatus,
{
    let mut rows: Vec<(ItemStatus, &'a TrackedItem<D>)> = items
        .into_iter()
        .map(|item| (status_of(item), item))
        .filter(|(status, item)| filter.matches(&item.details, *status))
        .collect();

    rows.sort_by(|(sa, a), (sb, b)| {
        let primary = match sort {
            SortKey::Name => by_name(a, b),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::StatusThenName => sa.rank().cmp(&sb.rank()).then_with(|| by_name(a, b)),
            SortKey::StatusThenCreatedAt => sa
                .rank()
                .cmp(&sb.rank())
                .then_with(|| a.created_at.cmp(&b.created_at)),
        };
        primary
            .then_with(|| by_name(a, b))
            .then_with(|| a.id.cmp(&b.id))
    });

    rows.into_iter().map(|(_, item)| item).collect()
}
