//! Data model: the unit of work accepted by the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation kind carried by an item.
///
/// Opaque to the queue itself; only the processor assigns meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpKind {
    Index,
    Remove,
    RemoveAll,
    Archive,
    Reactivate,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Index => "index",
            OpKind::Remove => "remove",
            OpKind::RemoveAll => "remove-all",
            OpKind::Archive => "archive",
            OpKind::Reactivate => "reactivate",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority class. Ordering is Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Weight used by the selector. Priority strictly dominates age,
    /// so weights only need to be distinct and ordered.
    pub fn weight(self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

/// Debounce identity: notifications sharing a key collapse into one
/// unit of work while a debounce window is open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetKey {
    source: String,
    path: String,
}

impl TargetKey {
    pub fn new(source: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.path)
    }
}

/// A change notification queued for processing.
///
/// The queue owns every stored item; the processor only ever sees a
/// shared reference. Retry bookkeeping lives on the stored record, not
/// here, so producers never observe it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    /// Producer-supplied unique id. Re-adding an id overwrites the
    /// stored item only when the new timestamp is strictly newer.
    pub id: String,
    pub kind: OpKind,
    pub target: TargetKey,
    /// Creation time; logical ordering and age-bonus input.
    pub timestamp: DateTime<Utc>,
    pub priority: Priority,
    /// Opaque producer data handed through to the processor.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl QueueItem {
    pub fn new(id: impl Into<String>, kind: OpKind, target: TargetKey, priority: Priority) -> Self {
        Self {
            id: id.into(),
            kind,
            target,
            timestamp: Utc::now(),
            priority,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
