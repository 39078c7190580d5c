// "Reopen closed tab" routing.
//
// Looks for something to restore in three places, nearest first: the
// requesting window's current undo ledger, the undo ledgers of the other
// windows, then the persisted store. The store is asynchronous; its answer
// arrives over a channel and is applied on the control thread.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::closed_tabs_store::{ClosedTabEntry, PersistedRestoreStore};
use super::windows::WindowRegistry;
use crate::settings::CrossWindowRestore;
use crate::state::{ModelKind, NewTab, TabId, WindowId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RestoreRequestId(u64);

impl fmt::Display for RestoreRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "restore-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreTier {
    LocalLedger,
    OtherWindowLedger,
    PersistedStore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored {
        window: WindowId,
        tab: TabId,
        tier: RestoreTier,
    },
    /// The persisted store was queried; the answer comes back through
    /// [`RestoreRouter::drain_completions`] or [`RestoreRouter::next_completion`].
    Pending(RestoreRequestId),
    /// Nothing to restore anywhere. Not an error.
    Unavailable,
}

/// Answer of the persisted store for one request.
#[derive(Clone, Debug)]
pub struct RestoreCompletion {
    pub request: RestoreRequestId,
    pub entry: Option<ClosedTabEntry>,
}

pub struct RestoreRouter<S: PersistedRestoreStore> {
    store: Arc<S>,
    runtime: Option<Handle>,
    /// Requests still waiting on the store, and the window that asked.
    outstanding: HashMap<RestoreRequestId, WindowId>,
    /// Requests dropped before their answer arrived.
    abandoned: HashSet<RestoreRequestId>,
    next_request: u64,
    tx: mpsc::UnboundedSender<RestoreCompletion>,
    rx: mpsc::UnboundedReceiver<RestoreCompletion>,
}

impl<S: PersistedRestoreStore> RestoreRouter<S> {
    /// Uses the ambient tokio runtime, if any. Without one the persisted
    /// tier is unavailable.
    pub fn new(store: Arc<S>) -> Self {
        Self::build(store, Handle::try_current().ok())
    }

    pub fn with_runtime(store: Arc<S>, runtime: Handle) -> Self {
        Self::build(store, Some(runtime))
    }

    fn build(store: Arc<S>, runtime: Option<Handle>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            runtime,
            outstanding: HashMap::new(),
            abandoned: HashSet::new(),
            next_request: 0,
            tx,
            rx,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_outstanding(&self, request: RestoreRequestId) -> bool {
        self.outstanding.contains_key(&request)
    }

    pub fn open_most_recently_closed_tab(
        &mut self,
        registry: &mut WindowRegistry,
        window: WindowId,
    ) -> RestoreOutcome {
        let Some(selector) = registry.selector_mut(window) else {
            log::warn!("[Restore] Restore requested for unknown {}", window);
            return RestoreOutcome::Unavailable;
        };

        if let Some(tab) = selector.current_model_mut().restore_most_recent() {
            log::info!("[Restore] Restored {} from the ledger of {}", tab, window);
            return RestoreOutcome::Restored {
                window,
                tab,
                tier: RestoreTier::LocalLedger,
            };
        }

        if let Some(outcome) = self.restore_from_other_window(registry, window) {
            return outcome;
        }

        self.query_store(window)
    }

    fn restore_from_other_window(
        &mut self,
        registry: &mut WindowRegistry,
        window: WindowId,
    ) -> Option<RestoreOutcome> {
        let (source, kind, tab) = find_other_ledger(registry, window)?;

        match registry.settings().cross_window_restore {
            CrossWindowRestore::OriginWindow => {
                let selector = registry.selector_mut(source)?;
                selector.model_mut(kind).restore_most_recent()?;
                selector.select_model(kind);
                log::info!("[Restore] Restored {} in place in {} for {}", tab, source, window);
                Some(RestoreOutcome::Restored {
                    window: source,
                    tab,
                    tier: RestoreTier::OtherWindowLedger,
                })
            }
            CrossWindowRestore::RequestingWindow => {
                let released = registry
                    .selector_mut(source)?
                    .model_mut(kind)
                    .release_pending(tab)
                    .map_err(|e| log::error!("[Restore] Failed to release {}: {}", tab, e))
                    .ok()?;
                let selector = registry.selector_mut(window)?;
                selector
                    .model_mut(kind)
                    .adopt_tab(released)
                    .map_err(|e| log::error!("[Restore] Failed to adopt {}: {}", tab, e))
                    .ok()?;
                selector.select_model(kind);
                log::info!("[Restore] Moved {} from the ledger of {} into {}", tab, source, window);
                Some(RestoreOutcome::Restored {
                    window,
                    tab,
                    tier: RestoreTier::OtherWindowLedger,
                })
            }
        }
    }

    fn query_store(&mut self, window: WindowId) -> RestoreOutcome {
        let Some(runtime) = &self.runtime else {
            log::debug!("[Restore] No runtime for the persisted store, nothing to restore");
            return RestoreOutcome::Unavailable;
        };

        let request = RestoreRequestId(self.next_request);
        self.next_request += 1;
        self.outstanding.insert(request, window);

        let query = self.store.query_most_recent_closed_entry(Some(window));
        let tx = self.tx.clone();
        let store = Arc::clone(&self.store);
        runtime.spawn(async move {
            let entry = query.await;
            if let Err(unsent) = tx.send(RestoreCompletion { request, entry }) {
                // Router dropped: the entry goes back where it came from.
                if let Some(entry) = unsent.0.entry {
                    store.reinstate(entry);
                }
            }
        });

        log::debug!("[Restore] {} queued for {} against the persisted store", request, window);
        RestoreOutcome::Pending(request)
    }

    /// Drops interest in a pending request. Whatever the store hands out
    /// for it is given back to the store.
    pub fn abandon(&mut self, request: RestoreRequestId) -> bool {
        if self.outstanding.remove(&request).is_none() {
            return false;
        }
        self.abandoned.insert(request);
        true
    }

    /// Applies one store answer. Unknown, abandoned or already applied
    /// requests are ignored and yield `None`. An entry that does not become
    /// a tab is reinstated in the store.
    pub fn apply_completion(
        &mut self,
        registry: &mut WindowRegistry,
        completion: RestoreCompletion,
    ) -> Option<RestoreOutcome> {
        let request = completion.request;
        let Some(window) = self.outstanding.remove(&request) else {
            if self.abandoned.remove(&request) {
                log::debug!("[Restore] {} was abandoned", request);
                self.reinstate(completion.entry);
            } else {
                log::warn!("[Restore] Ignoring completion of {}", request);
            }
            return None;
        };

        let Some(entry) = completion.entry else {
            log::debug!("[Restore] Persisted store had nothing for {}", window);
            return Some(RestoreOutcome::Unavailable);
        };

        let Some(selector) = registry.selector_mut(window) else {
            log::warn!("[Restore] {} closed before {} completed", window, request);
            self.reinstate(Some(entry));
            return Some(RestoreOutcome::Unavailable);
        };

        let tab = selector
            .current_model_mut()
            .create_tab(NewTab::new(entry.url).with_title(entry.title));
        log::info!("[Restore] Restored {} into {} from the persisted store", tab, window);
        Some(RestoreOutcome::Restored {
            window,
            tab,
            tier: RestoreTier::PersistedStore,
        })
    }

    fn reinstate(&self, entry: Option<ClosedTabEntry>) {
        if let Some(entry) = entry {
            log::debug!("[Restore] Returning '{}' to the persisted store", entry.url);
            self.store.reinstate(entry);
        }
    }

    /// Applies every completion that has already arrived, without waiting.
    pub fn drain_completions(
        &mut self,
        registry: &mut WindowRegistry,
    ) -> Vec<(RestoreRequestId, RestoreOutcome)> {
        let mut applied = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            let request = completion.request;
            if let Some(outcome) = self.apply_completion(registry, completion) {
                applied.push((request, outcome));
            }
        }
        applied
    }

    /// Waits for the next completion that belongs to an outstanding request,
    /// settling abandoned ones on the way. Returns `None` once nothing is
    /// in flight.
    pub async fn next_completion(
        &mut self,
        registry: &mut WindowRegistry,
    ) -> Option<(RestoreRequestId, RestoreOutcome)> {
        while !self.outstanding.is_empty() || !self.abandoned.is_empty() {
            let completion = self.rx.recv().await?;
            let request = completion.request;
            if let Some(outcome) = self.apply_completion(registry, completion) {
                return Some((request, outcome));
            }
        }
        None
    }
}

/// First other window, in registry order, with a non-empty ledger. Each
/// window's current model is checked before its other one.
fn find_other_ledger(
    registry: &WindowRegistry,
    requesting: WindowId,
) -> Option<(WindowId, ModelKind, TabId)> {
    registry
        .windows()
        .filter(|w| w.id != requesting)
        .find_map(|w| {
            w.selector
                .models_current_first()
                .find_map(|m| m.most_recent_closure().map(|tab| (w.id, m.kind(), tab)))
        })
}
