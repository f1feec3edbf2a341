//! Collected snapshot and its on-disk form.
//!
//! The file is a JSON array with one single-key object per account, in the
//! order accounts were collected:
//!
//! ```json
//! [{"alice": [["r1", "PushEvent"], ["r2", "IssuesEvent"]]}, {"bob": []}]
//! ```

use std::fs;
use std::path::Path;

use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Default output file name.
pub const DEFAULT_OUTPUT_PATH: &str = "events.json";

/// An event reduced to repository name and action type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectedEvent {
    pub repo: String,
    pub kind: String,
}

impl ProjectedEvent {
    pub fn new(repo: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            kind: kind.into(),
        }
    }
}

impl From<crate::github::Event> for ProjectedEvent {
    fn from(event: crate::github::Event) -> Self {
        Self {
            repo: event.repo.name,
            kind: event.kind,
        }
    }
}

// Written as a two-element array `[repo, type]`.
impl Serialize for ProjectedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.repo)?;
        tuple.serialize_element(&self.kind)?;
        tuple.end()
    }
}

/// One account's unique events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEvents {
    pub login: String,
    pub events: Vec<ProjectedEvent>,
}

impl AccountEvents {
    pub fn new(login: impl Into<String>, events: Vec<ProjectedEvent>) -> Self {
        Self {
            login: login.into(),
            events,
        }
    }
}

// Written as `{login: events}`.
impl Serialize for AccountEvents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.login, &self.events)?;
        map.end()
    }
}

/// Ordered per-account results of a collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    accounts: Vec<AccountEvents>,
}

impl Snapshot {
    pub fn new(accounts: Vec<AccountEvents>) -> Self {
        Self { accounts }
    }

    pub fn accounts(&self) -> &[AccountEvents] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Total projected events across accounts.
    pub fn event_count(&self) -> usize {
        self.accounts.iter().map(|a| a.events.len()).sum()
    }
}

/// Errors from persisting a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Render a snapshot as compact JSON.
pub fn to_json_string(snapshot: &Snapshot) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Write a snapshot to `path`, replacing any existing file.
pub fn write_snapshot(path: impl AsRef<Path>, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let json = to_json_string(snapshot)?;

    fs::write(path, json).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;

    tracing::debug!(path = %path.display(), accounts = snapshot.len(), "Wrote snapshot");
    Ok(())
}
