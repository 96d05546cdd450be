//! Per-user history of generated anecdotes.
//!
//! The in-memory list is authoritative for the running session and keeps
//! illustrations. Durable storage receives a projection without images,
//! newest first, deduplicated by title and capped in size.

use crate::anecdote::{Anecdote, HistoryEntry};
use crate::session::User;
use crate::storage::{KeyValueStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Maximum number of entries kept.
pub const HISTORY_LIMIT: usize = 50;

/// Number of entries retried when a full write is rejected.
pub const FALLBACK_HISTORY_LIMIT: usize = 10;

const GUEST_PARTITION: &str = "guest";

/// Storage key of the history partition for `user`.
///
/// Guests share one partition. Named users map to their case-folded,
/// trimmed name, so "Ada " and "ada" read the same history.
pub fn key_for(user: &User) -> String {
    if user.is_guest {
        format!("history:{GUEST_PARTITION}")
    } else {
        format!("history:{}", user.name.trim().to_lowercase())
    }
}

/// What happened to the durable copy after an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The full list was written.
    Saved,
    /// Only the newest `kept` entries could be written.
    Trimmed { kept: usize },
    /// Nothing was written; memory is the only copy.
    Failed,
}

/// Why a history write was rejected.
#[derive(Debug, Error)]
pub enum HistoryWriteError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// History for the active user.
pub struct HistoryStore {
    storage: Arc<dyn KeyValueStore>,
    partition: Option<String>,
    entries: Vec<Anecdote>,
    limit: usize,
    fallback_limit: usize,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            partition: None,
            entries: Vec::new(),
            limit: HISTORY_LIMIT,
            fallback_limit: FALLBACK_HISTORY_LIMIT,
        }
    }

    /// Override the size cap and the reduced cap used on write failure.
    pub fn with_limits(mut self, limit: usize, fallback_limit: usize) -> Self {
        self.limit = limit.max(1);
        self.fallback_limit = fallback_limit.clamp(1, self.limit);
        self
    }

    /// Load the durable history for `user`, replacing what is in memory.
    ///
    /// Missing or corrupt data loads as an empty history.
    pub fn load(&mut self, user: &User) -> &[Anecdote] {
        let key = key_for(user);
        self.entries = match self.storage.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(stored) => stored.into_iter().map(Anecdote::from).collect(),
                Err(e) => {
                    warn!(partition = %key, error = %e, "history is corrupt; starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(partition = %key, error = %e, "failed to read history; starting empty");
                Vec::new()
            }
        };
        self.entries.truncate(self.limit);
        debug!(partition = %key, entries = self.entries.len(), "history loaded");
        self.partition = Some(key);
        &self.entries
    }

    /// Record `anecdote` as the newest entry for `user` and persist.
    ///
    /// An earlier entry with the same title is removed first. If the full
    /// write fails the newest entries are retried at the fallback cap.
    pub fn append(&mut self, user: &User, anecdote: Anecdote) -> PersistOutcome {
        let key = key_for(user);
        if self.partition.as_deref() != Some(key.as_str()) {
            self.load(user);
        }

        self.entries.retain(|h| h.title != anecdote.title);
        self.entries.insert(0, anecdote);
        self.entries.truncate(self.limit);

        self.persist(&key)
    }

    fn persist(&self, key: &str) -> PersistOutcome {
        let stored: Vec<HistoryEntry> = self.entries.iter().map(HistoryEntry::from).collect();

        match self.write(key, &stored) {
            Ok(()) => return PersistOutcome::Saved,
            Err(e) => warn!(partition = %key, error = %e, "history write failed; retrying trimmed"),
        }

        let kept = stored.len().min(self.fallback_limit);
        match self.write(key, &stored[..kept]) {
            Ok(()) => PersistOutcome::Trimmed { kept },
            Err(e) => {
                error!(partition = %key, error = %e, "failed to save history even after trimming");
                PersistOutcome::Failed
            }
        }
    }

    fn write(&self, key: &str, entries: &[HistoryEntry]) -> Result<(), HistoryWriteError> {
        let raw = serde_json::to_string(entries)?;
        self.storage.set(key, &raw)?;
        Ok(())
    }

    /// Drop the in-memory history (on logout).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.partition = None;
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[Anecdote] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Anecdote> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Storage key of the loaded partition.
    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }
}
