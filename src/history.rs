//! Search history persistence
//!
//! Most-recent-first list of past queries, unique by query text and capped at
//! [`HISTORY_CAPACITY`]. Stored as one JSON array under [`HISTORY_KEY`], read
//! lazily on first use and written back on every mutation.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::storage::KvStore;
use crate::types::HistoryEntry;

pub const HISTORY_KEY: &str = "kadx.search.history";
pub const HISTORY_CAPACITY: usize = 20;

pub struct HistoryStore {
    kv: Arc<dyn KvStore>,
    entries: Option<Vec<HistoryEntry>>,
}

impl HistoryStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv, entries: None }
    }

    fn load(&mut self) -> &mut Vec<HistoryEntry> {
        let kv = &self.kv;
        self.entries.get_or_insert_with(|| {
            let raw = match kv.get(HISTORY_KEY) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("[history] read failed: {e:#}");
                    None
                }
            };
            let mut list: Vec<HistoryEntry> = raw
                .map(|s| {
                    serde_json::from_str(&s).unwrap_or_else(|e| {
                        log::warn!("[history] discarding corrupt history: {e}");
                        Vec::new()
                    })
                })
                .unwrap_or_default();
            list.truncate(HISTORY_CAPACITY);
            list
        })
    }

    fn persist(&self) -> Result<()> {
        let list = self.entries.as_deref().unwrap_or_default();
        let json = serde_json::to_string(list).context("serialize history")?;
        self.kv.set(HISTORY_KEY, &json).context("write history")
    }

    pub fn entries(&mut self) -> &[HistoryEntry] {
        self.load()
    }

    /// Record `query` at the front. An existing entry for the same text is
    /// moved rather than duplicated, with its type and timestamp refreshed.
    pub fn add(&mut self, query: &str, kind: Option<&str>) -> Result<()> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().timestamp_millis();
        let list = self.load();
        list.retain(|e| e.query != query);
        list.insert(
            0,
            HistoryEntry {
                query: query.to_string(),
                kind: kind.map(|k| k.to_string()),
                timestamp: now,
            },
        );
        list.truncate(HISTORY_CAPACITY);
        self.persist()
    }

    pub fn remove(&mut self, query: &str) -> Result<bool> {
        let list = self.load();
        let before = list.len();
        list.retain(|e| e.query != query);
        let removed = list.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries = Some(Vec::new());
        self.persist()
    }
}
