// Undo ledger for one tab model.
// Pure bookkeeping: callers own the tab states and the active list.

use std::collections::VecDeque;

use crate::error::TabError;
use crate::state::TabId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LedgerEntry {
    tab: TabId,
    prior_index: usize,
}

/// Closed-but-undoable tabs, most recently closed first.
///
/// The stack order here is close order. It says nothing about where a tab
/// sat in the strip; that lives in `Tab::original_order`.
#[derive(Debug, Default)]
pub struct PendingClosureLedger {
    stack: VecDeque<LedgerEntry>,
}

impl PendingClosureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `tab` on top of the closure stack.
    pub fn add(&mut self, tab: TabId, prior_index: usize) -> Result<(), TabError> {
        if self.contains(tab) {
            return Err(TabError::AlreadyPending(tab));
        }
        self.stack.push_front(LedgerEntry { tab, prior_index });
        log::debug!("[Ledger] {} pending at index {} (depth {})", tab, prior_index, self.stack.len());
        Ok(())
    }

    /// Removes `tab` wherever it sits in the stack and returns its recorded
    /// index.
    pub fn remove(&mut self, tab: TabId) -> Option<usize> {
        let pos = self.stack.iter().position(|e| e.tab == tab)?;
        self.stack.remove(pos).map(|e| e.prior_index)
    }

    pub fn most_recent(&self) -> Option<TabId> {
        self.stack.front().map(|e| e.tab)
    }

    pub fn prior_index(&self, tab: TabId) -> Option<usize> {
        self.stack.iter().find(|e| e.tab == tab).map(|e| e.prior_index)
    }

    pub fn contains(&self, tab: TabId) -> bool {
        self.stack.iter().any(|e| e.tab == tab)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Ids from most to least recently closed.
    pub fn iter(&self) -> impl Iterator<Item = TabId> + '_ {
        self.stack.iter().map(|e| e.tab)
    }
}
