//! Snapshot persistence.
//!
//! The whole item collection, completion records included, is saved as one
//! JSON blob through a [`SnapshotStore`]. Decoding is lenient per item: a
//! record that fails to decode is dropped with a [`LoadWarning`] instead of
//! taking the rest of the collection down with it. Only a blob that is not
//! a snapshot at all yields [`LoadResult::Failed`].

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::day::{DayKey, TimeSlot};
use crate::error::{DecodeError, Result};
use crate::item::{ItemId, TrackedItem};
use crate::ledger::{CompletionLedger, CompletionRecord, CompletionStatus};

/// Key-value blob store the tracker persists into.
pub trait SnapshotStore {
    /// Previously saved bytes, `None` when nothing was saved yet.
    fn load(&self) -> std::io::Result<Option<Vec<u8>>>;

    fn save(&self, bytes: &[u8]) -> std::io::Result<()>;
}

/// In-process blob store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    bytes: RefCell<Option<Vec<u8>>>,
    fail_saves: bool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `bytes`.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: RefCell::new(Some(bytes.into())),
            fail_saves: false,
        }
    }

    /// Store whose saves always fail.
    pub fn failing() -> Self {
        Self {
            bytes: RefCell::new(None),
            fail_saves: true,
        }
    }

    /// Last saved bytes.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.bytes.borrow().clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.bytes.borrow().clone())
    }

    fn save(&self, bytes: &[u8]) -> std::io::Result<()> {
        if self.fail_saves {
            return Err(std::io::Error::other("snapshot store rejects writes"));
        }
        *self.bytes.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }
}

/// Blob store backed by a single file. Writes replace the file wholesale.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> std::io::Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, bytes)
    }
}

/// Decoded collection plus its ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<D> {
    pub items: Vec<TrackedItem<D>>,
    pub ledger: CompletionLedger,
}

impl<D> Default for Snapshot<D> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ledger: CompletionLedger::new(),
        }
    }
}

/// Something dropped while decoding an otherwise usable snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Item at this position could not be decoded
    ItemSkipped { index: usize, reason: String },
    /// Later item reusing an id already loaded
    DuplicateItem { id: ItemId },
    /// Item decoded but its schedule is unusable
    InvalidItem { id: ItemId, reason: String },
    /// Record dated before its item was created
    RecordBeforeStart { id: ItemId, day: DayKey },
    /// Second record for the same day and slot
    DuplicateRecord {
        id: ItemId,
        day: DayKey,
        slot: Option<TimeSlot>,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::ItemSkipped { index, reason } => {
                write!(f, "item #{index} skipped: {reason}")
            }
            LoadWarning::DuplicateItem { id } => write!(f, "duplicate item {id} skipped"),
            LoadWarning::InvalidItem { id, reason } => write!(f, "item {id} skipped: {reason}"),
            LoadWarning::RecordBeforeStart { id, day } => {
                write!(f, "record {day} for {id} predates the item and was dropped")
            }
            LoadWarning::DuplicateRecord { id, day, slot } => match slot {
                Some(slot) => write!(f, "duplicate record {day} {slot} for {id}, last one kept"),
                None => write!(f, "duplicate record {day} for {id}, last one kept"),
            },
        }
    }
}

/// Outcome of decoding a persisted blob.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult<D> {
    /// Nothing was ever saved
    Fresh,
    /// Everything decoded
    Loaded(Snapshot<D>),
    /// Usable collection with some entries dropped
    Recovered {
        snapshot: Snapshot<D>,
        warnings: Vec<LoadWarning>,
    },
    /// Blob unusable; the caller starts empty
    Failed(DecodeError),
}

impl<D> LoadResult<D> {
    /// Collection to start from; empty for `Fresh` and `Failed`.
    pub fn into_snapshot(self) -> Snapshot<D> {
        match self {
            LoadResult::Loaded(snapshot) | LoadResult::Recovered { snapshot, .. } => snapshot,
            LoadResult::Fresh | LoadResult::Failed(_) => Snapshot::default(),
        }
    }
}

#[derive(Serialize)]
struct ItemOut<'a, D> {
    #[serde(flatten)]
    item: &'a TrackedItem<D>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    completions: Vec<CompletionRecord>,
}

#[derive(Serialize)]
struct SnapshotOut<'a, D> {
    items: Vec<ItemOut<'a, D>>,
}

#[derive(Deserialize)]
struct ItemIn<D> {
    #[serde(flatten)]
    item: TrackedItem<D>,
    #[serde(default)]
    completions: Vec<CompletionRecord>,
}

/// Encode items and their ledger records as one JSON snapshot.
pub fn encode_snapshot<D: Serialize>(
    items: &[TrackedItem<D>],
    ledger: &CompletionLedger,
    pretty: bool,
) -> Result<Vec<u8>> {
    let out = SnapshotOut {
        items: items
            .iter()
            .map(|item| ItemOut {
                item,
                completions: ledger.records(&item.id),
            })
            .collect(),
    };
    let bytes = if pretty {
        serde_json::to_vec_pretty(&out)?
    } else {
        serde_json::to_vec(&out)?
    };
    Ok(bytes)
}

/// Decode a snapshot blob. `None` or blank input is a fresh start.
pub fn decode_snapshot<D: DeserializeOwned>(bytes: Option<&[u8]>) -> LoadResult<D> {
    let bytes = match bytes {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
        _ => return LoadResult::Fresh,
    };

    let root: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => return LoadResult::Failed(DecodeError::Malformed(e.to_string())),
    };
    let Some(entries) = root.get("items").and_then(|v| v.as_array()) else {
        return LoadResult::Failed(DecodeError::SchemaMismatch(
            "expected an object with an \"items\" array".to_string(),
        ));
    };

    let mut snapshot = Snapshot::default();
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let decoded: ItemIn<D> = match serde_json::from_value(entry.clone()) {
            Ok(decoded) => decoded,
            Err(e) => {
                warnings.push(LoadWarning::ItemSkipped {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let mut item = decoded.item;
        if let Err(e) = item.validate() {
            warnings.push(LoadWarning::InvalidItem {
                id: item.id,
                reason: e.to_string(),
            });
            continue;
        }
        if !seen.insert(item.id.clone()) {
            warnings.push(LoadWarning::DuplicateItem { id: item.id });
            continue;
        }
        item.normalize_slots();
        snapshot.ledger.register(&item.id, item.created_at);

        let mut records: BTreeMap<(DayKey, Option<TimeSlot>), CompletionStatus> = BTreeMap::new();
        for record in decoded.completions {
            if record.day < item.created_at {
                warnings.push(LoadWarning::RecordBeforeStart {
                    id: item.id.clone(),
                    day: record.day,
                });
                continue;
            }
            if records.insert((record.day, record.slot), record.status).is_some() {
                warnings.push(LoadWarning::DuplicateRecord {
                    id: item.id.clone(),
                    day: record.day,
                    slot: record.slot,
                });
            }
        }
        for ((day, slot), status) in records {
            // Floor was checked above, so these cannot fail.
            let applied = match status {
                CompletionStatus::Completed => snapshot.ledger.mark_completed(&item.id, day, slot),
                CompletionStatus::Missed => snapshot.ledger.mark_missed(&item.id, day, slot),
            };
            debug_assert!(applied.is_ok());
        }
        snapshot.items.push(item);
    }

    if warnings.is_empty() {
        LoadResult::Loaded(snapshot)
    } else {
        LoadResult::Recovered { snapshot, warnings }
    }
}
