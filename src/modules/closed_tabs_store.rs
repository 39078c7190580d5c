use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures_util::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use url::Url;

use super::events::TabModelEvent;
use crate::error::StoreError;
use crate::settings::Settings;
use crate::state::{Tab, WindowId};

pub const DEFAULT_MAX_CLOSED_TABS: usize = 25;

/// A closed tab that outlived its window's undo ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTabEntry {
    pub url: Url,
    pub title: String,
    pub window_id: WindowId,
    pub closed_at: DateTime<Utc>,
}

impl From<&Tab> for ClosedTabEntry {
    fn from(tab: &Tab) -> Self {
        Self {
            url: tab.url.clone(),
            title: tab.title.clone(),
            window_id: tab.window_id,
            closed_at: Utc::now(),
        }
    }
}

/// Durable source of closed tabs, consulted when no in-memory ledger has
/// anything left to restore.
///
/// The returned entry is handed over: the store forgets it. An entry that
/// could not be opened after all comes back through `reinstate`.
pub trait PersistedRestoreStore: Send + Sync + 'static {
    fn query_most_recent_closed_entry(
        &self,
        window_hint: Option<WindowId>,
    ) -> BoxFuture<'static, Option<ClosedTabEntry>>;

    fn reinstate(&self, entry: ClosedTabEntry);
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct StoreFile {
    tabs: VecDeque<ClosedTabEntry>,
}

/// Bounded stack of closed tabs, optionally backed by a JSON file.
#[derive(Clone, Debug)]
pub struct ClosedTabStore {
    tabs: Arc<Mutex<VecDeque<ClosedTabEntry>>>,
    max_entries: usize,
    path: Option<PathBuf>,
}

impl ClosedTabStore {
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            tabs: Arc::new(Mutex::new(VecDeque::new())),
            max_entries,
            path: None,
        }
    }

    /// Store sized by `settings`, file-backed when `path` is given.
    pub fn open(settings: &Settings, path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::load(path, settings.max_closed_entries),
            None => Self::in_memory(settings.max_closed_entries),
        }
    }

    /// Opens the store at `path`. A missing or corrupt file yields an empty
    /// store.
    pub fn load(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        let path = path.into();
        let mut tabs = read_entries(&path);
        while tabs.len() > max_entries {
            tabs.pop_front();
        }
        log::debug!("[ClosedTabs] Loaded {} entr(ies) from {}", tabs.len(), path.display());
        Self {
            tabs: Arc::new(Mutex::new(tabs)),
            max_entries,
            path: Some(path),
        }
    }

    /// Writes the store to its file, if it has one.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp_path = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = StoreFile {
            tabs: self.lock().clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        fs::write(&tmp_path, json)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Pushes an entry, dropping the oldest once the store is full.
    pub fn archive(&self, entry: ClosedTabEntry) {
        log::debug!("[ClosedTabs] Archived '{}' at URL: {}", entry.title, entry.url);
        let mut tabs = self.lock();
        tabs.push_back(entry);
        while tabs.len() > self.max_entries {
            tabs.pop_front();
        }
    }

    /// Archives every tab whose closure was committed. Returns how many.
    pub fn archive_committed(&self, events: &[TabModelEvent]) -> usize {
        let mut archived = 0;
        for event in events {
            if let TabModelEvent::ClosureCommitted(tab) = event {
                self.archive(ClosedTabEntry::from(tab));
                archived += 1;
            }
        }
        archived
    }

    /// Puts a handed-out entry back in `closed_at` order.
    pub fn put_back(&self, entry: ClosedTabEntry) {
        log::debug!("[ClosedTabs] Took back '{}' at URL: {}", entry.title, entry.url);
        let mut tabs = self.lock();
        let pos = tabs.partition_point(|e| e.closed_at <= entry.closed_at);
        tabs.insert(pos, entry);
        while tabs.len() > self.max_entries {
            tabs.pop_front();
        }
    }

    /// Takes the most recent entry. `window` only breaks ties between
    /// entries closed at the same instant.
    pub fn pop_most_recent(&self, window: Option<WindowId>) -> Option<ClosedTabEntry> {
        let mut tabs = self.lock();
        let newest = tabs.back()?.closed_at;
        let pos = window
            .and_then(|w| {
                tabs.iter()
                    .rposition(|e| e.closed_at == newest && e.window_id == w)
            })
            .unwrap_or(tabs.len() - 1);
        let entry = tabs.remove(pos);
        if let Some(e) = &entry {
            log::debug!("[ClosedTabs] Handed out '{}' at URL: {}", e.title, e.url);
        }
        entry
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ClosedTabEntry>> {
        // The deque is valid after any panic mid-push, so poisoning is ignored.
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistedRestoreStore for ClosedTabStore {
    fn query_most_recent_closed_entry(
        &self,
        window_hint: Option<WindowId>,
    ) -> BoxFuture<'static, Option<ClosedTabEntry>> {
        let store = self.clone();
        future::lazy(move |_| store.pop_most_recent(window_hint)).boxed()
    }

    fn reinstate(&self, entry: ClosedTabEntry) {
        self.put_back(entry);
    }
}

fn read_entries(path: &Path) -> VecDeque<ClosedTabEntry> {
    if !path.exists() {
        return VecDeque::new();
    }
    match fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str::<StoreFile>(&json) {
            Ok(file) => file.tabs,
            Err(e) => {
                log::warn!("[ClosedTabs] Failed to parse {}: {}", path.display(), e);
                VecDeque::new()
            }
        },
        Err(e) => {
            log::warn!("[ClosedTabs] Failed to read {}: {}", path.display(), e);
            VecDeque::new()
        }
    }
}
