// Tab model - ordered active tabs, selection and the undo ledger of one
// browsing context in one window.
//
// Flush points (create, move, save, non-undoable close) commit every pending
// closure of this model before they touch anything else.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use url::Url;

use super::comprehensive::ComprehensiveView;
use super::events::{EventBus, Subscription, SubscriptionId, TabModelEvent};
use super::pending_closures::PendingClosureLedger;
use crate::error::TabError;
use crate::state::{ModelKind, NewTab, Tab, TabId, TabIdAllocator, TabState, WindowId};

/// A visible tab as recorded by a persistence checkpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedTab {
    pub id: TabId,
    pub url: Url,
    pub title: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelSnapshot {
    pub kind: ModelKind,
    pub selected_index: Option<usize>,
    pub tabs: Vec<SavedTab>,
}

const MAX_TOMBSTONES: usize = 64;

pub struct TabModel {
    kind: ModelKind,
    window_id: WindowId,
    undo_supported: bool,
    /// Every tab that is Active or PendingClosure.
    tabs: HashMap<TabId, Tab>,
    /// Strip order. Always sorted by `original_order`.
    active: Vec<TabId>,
    selected: Option<TabId>,
    ledger: PendingClosureLedger,
    /// Recently destroyed ids, so late calls report the real state. Older
    /// ones fall back to `NotFound`.
    tombstones: VecDeque<TabId>,
    next_order: u64,
    ids: TabIdAllocator,
    events: EventBus,
}

impl TabModel {
    pub fn new(
        kind: ModelKind,
        window_id: WindowId,
        undo_supported: bool,
        ids: TabIdAllocator,
    ) -> Self {
        Self {
            kind,
            window_id,
            undo_supported,
            tabs: HashMap::new(),
            active: Vec::new(),
            selected: None,
            ledger: PendingClosureLedger::new(),
            tombstones: VecDeque::new(),
            next_order: 0,
            ids,
            events: EventBus::new(),
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn supports_pending_closures(&self) -> bool {
        self.undo_supported
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // --- queries ---

    /// Number of active tabs.
    pub fn count(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn tab_at(&self, index: usize) -> Option<&Tab> {
        self.active.get(index).and_then(|id| self.tabs.get(id))
    }

    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.active.iter().position(|t| *t == id)
    }

    /// Looks up an active or pending tab.
    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.get(&id)
    }

    /// Active tabs in strip order.
    pub fn tabs(&self) -> impl Iterator<Item = &Tab> + '_ {
        self.active.iter().filter_map(|id| self.tabs.get(id))
    }

    pub fn active_ids(&self) -> &[TabId] {
        &self.active
    }

    pub fn selected_tab_id(&self) -> Option<TabId> {
        self.selected
    }

    pub fn selected_tab(&self) -> Option<&Tab> {
        self.selected.and_then(|id| self.tabs.get(&id))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.and_then(|id| self.index_of(id))
    }

    /// True for live tabs and for tabs this model destroyed.
    pub fn owns(&self, id: TabId) -> bool {
        self.tabs.contains_key(&id) || self.tombstones.contains(&id)
    }

    pub fn is_closure_pending(&self, id: TabId) -> bool {
        self.ledger.contains(id)
    }

    pub fn has_pending_closures(&self) -> bool {
        !self.ledger.is_empty()
    }

    /// Pending ids, most recently closed first.
    pub fn pending_closures(&self) -> Vec<TabId> {
        self.ledger.iter().collect()
    }

    pub fn most_recent_closure(&self) -> Option<TabId> {
        self.ledger.most_recent()
    }

    pub fn comprehensive_view(&self) -> ComprehensiveView {
        let pending = self.ledger.iter().filter_map(|id| self.tabs.get(&id)).collect();
        ComprehensiveView::merge(self.tabs(), pending, self.selected)
    }

    // --- mutations ---

    /// Flush point. Creates a new active tab and returns its id.
    pub fn create_tab(&mut self, params: NewTab) -> TabId {
        self.flush();

        let id = self.ids.allocate();
        let select = params.select || self.selected.is_none();
        let position = params.position.filter(|p| *p < self.active.len());

        let tab = match position {
            None => {
                let tab = Tab::new(id, self.window_id, self.next_order, params);
                self.next_order += 1;
                self.active.push(id);
                tab
            }
            Some(index) => {
                self.active.insert(index, id);
                Tab::new(id, self.window_id, 0, params)
            }
        };
        let created = tab.clone();
        self.tabs.insert(id, tab);
        if position.is_some() {
            self.resequence();
        }

        log::debug!(
            "[TabModel] Created {} in {} {:?} (total: {})",
            id,
            self.window_id,
            self.kind,
            self.active.len()
        );
        self.events.emit(TabModelEvent::TabCreated(created));
        if select {
            self.set_selected(Some(id));
        }

        self.check_invariants();
        id
    }

    /// Closes an active tab. With undo the tab becomes pending; without it
    /// every pending closure is committed first and the tab is destroyed.
    pub fn close_tab(&mut self, id: TabId, allow_undo: bool) -> Result<(), TabError> {
        self.require(id, TabState::Active, "close")?;
        self.close_validated(id, allow_undo)?;
        self.check_invariants();
        Ok(())
    }

    pub fn cancel_tab_closure(&mut self, id: TabId) -> Result<(), TabError> {
        self.require(id, TabState::PendingClosure, "cancel closure")?;

        let prior_index = self.ledger.remove(id);
        let tab = self.tabs.get_mut(&id).ok_or(TabError::NotFound(id))?;
        tab.undo_closure()?;
        let order = tab.original_order();
        let restored = tab.clone();

        // Slot it back where it sits in the comprehensive order.
        let tabs = &self.tabs;
        let index = self
            .active
            .partition_point(|other| tabs.get(other).map_or(0, Tab::original_order) < order);
        if prior_index != Some(index) {
            log::debug!(
                "[TabModel] {} restored at {} instead of recorded index {:?}",
                id,
                index,
                prior_index
            );
        }
        self.active.insert(index, id);

        log::debug!("[TabModel] Closure of {} undone (index {})", id, index);
        self.events.emit(TabModelEvent::ClosureUndone(restored));
        if self.selected.is_none() {
            self.set_selected(Some(id));
        }

        self.check_invariants();
        Ok(())
    }

    pub fn commit_tab_closure(&mut self, id: TabId) -> Result<(), TabError> {
        self.require(id, TabState::PendingClosure, "commit closure")?;
        self.ledger.remove(id);
        self.destroy(id);
        self.check_invariants();
        Ok(())
    }

    /// Commits every pending closure, most recent first. Returns the ids.
    pub fn commit_all_tab_closures(&mut self) -> Vec<TabId> {
        let committed = self.flush();
        self.check_invariants();
        committed
    }

    /// Flush without the invariant check, for callers in mid-mutation.
    fn flush(&mut self) -> Vec<TabId> {
        let mut committed = Vec::with_capacity(self.ledger.len());
        while let Some(id) = self.ledger.most_recent() {
            self.ledger.remove(id);
            self.destroy(id);
            committed.push(id);
        }
        if !committed.is_empty() {
            log::info!(
                "[TabModel] Committed {} pending closure(s) in {} {:?}",
                committed.len(),
                self.window_id,
                self.kind
            );
        }
        committed
    }

    /// Undoes every pending closure in strip order.
    pub fn cancel_all_tab_closures(&mut self) -> Vec<TabId> {
        let mut pending: Vec<&Tab> = self.ledger.iter().filter_map(|id| self.tabs.get(&id)).collect();
        pending.sort_by_key(|t| t.original_order());
        let ids: Vec<TabId> = pending.into_iter().map(|t| t.id).collect();

        ids.into_iter()
            .filter(|id| match self.cancel_tab_closure(*id) {
                Ok(()) => true,
                Err(e) => {
                    log::error!("[TabModel] Failed to undo closure: {}", e);
                    false
                }
            })
            .collect()
    }

    /// Closes every active tab, last to first. Returns the ids closed.
    pub fn close_all_tabs(&mut self) -> Vec<TabId> {
        let allow_undo = self.undo_supported;
        if !allow_undo {
            self.flush();
        }
        // One clear up front instead of a reselect per closed tab
        self.set_selected(None);

        let ids: Vec<TabId> = self.active.iter().rev().copied().collect();
        let mut closed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.close_validated(id, allow_undo) {
                Ok(()) => closed.push(id),
                Err(e) => log::error!("[TabModel] Failed to close {}: {}", id, e),
            }
        }

        log::debug!("[TabModel] Closed all {} tab(s) (undo: {})", closed.len(), allow_undo);
        self.check_invariants();
        closed
    }

    /// Flush point. Moves an active tab so that it lands before the tab
    /// currently at `new_index`. Returns whether the order changed.
    pub fn move_tab(&mut self, id: TabId, new_index: usize) -> Result<bool, TabError> {
        self.require(id, TabState::Active, "move")?;
        self.flush();

        let current = self.index_of(id).ok_or(TabError::NotFound(id))?;
        let target = new_index.min(self.active.len());
        if target == current || target == current + 1 {
            return Ok(false);
        }

        self.active.remove(current);
        let destination = if current < target { target - 1 } else { target };
        self.active.insert(destination, id);
        self.resequence();

        log::debug!("[TabModel] Moved {} from index {} to {}", id, current, destination);
        self.events.emit(TabModelEvent::TabMoved {
            tab: id,
            from: current,
            to: destination,
        });

        self.check_invariants();
        Ok(true)
    }

    pub fn select_tab(&mut self, id: TabId) -> Result<(), TabError> {
        self.require(id, TabState::Active, "select")?;
        self.set_selected(Some(id));
        Ok(())
    }

    pub fn set_index(&mut self, index: usize) -> Result<(), TabError> {
        let id = *self.active.get(index).ok_or(TabError::NoTabAtIndex(index))?;
        self.select_tab(id)
    }

    /// Undoes the most recent closure and selects the restored tab.
    pub fn restore_most_recent(&mut self) -> Option<TabId> {
        let id = self.ledger.most_recent()?;
        if let Err(e) = self.cancel_tab_closure(id) {
            log::error!("[TabModel] Failed to restore {}: {}", id, e);
            return None;
        }
        self.set_selected(Some(id));
        Some(id)
    }

    /// Flush point. Snapshot of exactly the tabs the user can see.
    pub fn save_state(&mut self) -> ModelSnapshot {
        self.flush();
        ModelSnapshot {
            kind: self.kind,
            selected_index: self.selected_index(),
            tabs: self
                .tabs()
                .map(|t| SavedTab {
                    id: t.id,
                    url: t.url.clone(),
                    title: t.title.clone(),
                })
                .collect(),
        }
    }

    /// Window teardown: nothing in this model survives in memory.
    pub fn teardown(&mut self) -> Vec<TabId> {
        self.flush();
        self.set_selected(None);
        let ids: Vec<TabId> = self.active.drain(..).rev().collect();
        for id in &ids {
            self.destroy(*id);
        }
        self.check_invariants();
        ids
    }

    /// Takes a pending tab out of this model without destroying it, so
    /// another window can adopt it.
    pub(crate) fn release_pending(&mut self, id: TabId) -> Result<Tab, TabError> {
        self.require(id, TabState::PendingClosure, "release")?;
        self.ledger.remove(id);
        let tab = self.tabs.remove(&id).ok_or(TabError::NotFound(id))?;
        log::debug!("[TabModel] Released pending {} from {}", id, self.window_id);
        self.events.emit(TabModelEvent::TabDetached(tab.clone()));
        self.check_invariants();
        Ok(tab)
    }

    /// Takes over a tab released by another model, appends and selects it.
    /// Not a flush point: pending closures here stay undoable.
    pub(crate) fn adopt_tab(&mut self, mut tab: Tab) -> Result<TabId, TabError> {
        tab.undo_closure()?;

        let id = tab.id;
        tab.window_id = self.window_id;
        tab.set_original_order(self.next_order);
        self.next_order += 1;
        let adopted = tab.clone();
        self.tabs.insert(id, tab);
        self.active.push(id);

        log::debug!("[TabModel] Adopted {} into {}", id, self.window_id);
        self.events.emit(TabModelEvent::ClosureUndone(adopted));
        self.set_selected(Some(id));

        self.check_invariants();
        Ok(id)
    }

    // --- internals ---

    fn require(
        &self,
        id: TabId,
        expected: TabState,
        operation: &'static str,
    ) -> Result<(), TabError> {
        let state = match self.tabs.get(&id) {
            Some(tab) => tab.state(),
            None if self.tombstones.contains(&id) => TabState::Destroyed,
            None => return Err(TabError::NotFound(id)),
        };
        if state != expected {
            return Err(TabError::PreconditionViolation {
                tab: id,
                state,
                operation,
            });
        }
        Ok(())
    }

    fn close_validated(&mut self, id: TabId, allow_undo: bool) -> Result<(), TabError> {
        if allow_undo && self.undo_supported {
            let index = self.index_of(id).ok_or(TabError::NotFound(id))?;
            self.ledger.add(id, index)?;
            let tab = self.tabs.get_mut(&id).ok_or(TabError::NotFound(id))?;
            tab.begin_closure()?;
            let pending = tab.clone();
            self.active.remove(index);

            log::debug!("[TabModel] {} pending closure (was index {})", id, index);
            self.events.emit(TabModelEvent::PendingClosure(pending));
            self.reselect_after_removal(id, index);
        } else {
            self.flush();
            let index = self.index_of(id).ok_or(TabError::NotFound(id))?;
            self.active.remove(index);
            self.destroy(id);
            self.reselect_after_removal(id, index);
        }
        Ok(())
    }

    /// Same index if possible, else the new last tab, else nothing.
    fn reselect_after_removal(&mut self, removed: TabId, index: usize) {
        if self.selected != Some(removed) {
            return;
        }
        let next = match self.active.len() {
            0 => None,
            len => Some(self.active[index.min(len - 1)]),
        };
        self.set_selected(next);
    }

    fn set_selected(&mut self, next: Option<TabId>) {
        let previous = self.selected;
        if previous == next {
            return;
        }
        self.selected = next;
        match (next, previous) {
            (Some(tab), _) => self.events.emit(TabModelEvent::TabSelected { tab, previous }),
            (None, Some(previous)) => self.events.emit(TabModelEvent::SelectionCleared { previous }),
            (None, None) => {}
        }
    }

    fn destroy(&mut self, id: TabId) {
        let Some(mut tab) = self.tabs.remove(&id) else {
            return;
        };
        if let Err(e) = tab.destroy() {
            log::error!("[TabModel] {}", e);
        }
        if self.tombstones.len() == MAX_TOMBSTONES {
            self.tombstones.pop_front();
        }
        self.tombstones.push_back(id);
        log::info!("[TabModel] Closure of {} committed ({})", id, tab.url);
        self.events.emit(TabModelEvent::ClosureCommitted(tab));
    }

    /// Rewrites order slots to match the strip. Only valid with an empty
    /// ledger, which every caller guarantees by flushing first.
    fn resequence(&mut self) {
        debug_assert!(self.ledger.is_empty(), "resequence with pending closures");
        for (slot, id) in self.active.iter().enumerate() {
            if let Some(tab) = self.tabs.get_mut(id) {
                tab.set_original_order(slot as u64);
            }
        }
        self.next_order = self.active.len() as u64;
    }

    /// Ledger and active list must partition the live tabs.
    pub fn check_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        assert_eq!(
            self.tabs.len(),
            self.active.len() + self.ledger.len(),
            "active list and ledger do not partition the live tabs"
        );
        for id in &self.active {
            let tab = self.tabs.get(id);
            assert_eq!(tab.map(Tab::state), Some(TabState::Active), "{} in strip but not active", id);
            assert!(!self.ledger.contains(*id), "{} both active and pending", id);
        }
        for id in self.ledger.iter() {
            let tab = self.tabs.get(&id);
            assert_eq!(
                tab.map(Tab::state),
                Some(TabState::PendingClosure),
                "{} in ledger but not pending",
                id
            );
        }
        let orders: Vec<u64> = self.tabs().map(Tab::original_order).collect();
        assert!(orders.windows(2).all(|w| w[0] < w[1]), "strip out of creation order");
        assert_eq!(
            self.selected.is_none(),
            self.active.is_empty(),
            "selection out of sync with the strip"
        );
        if let Some(id) = self.selected {
            assert!(self.active.contains(&id), "selected {} is not active", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// A regular model with `n` tabs; the last one is selected.
    fn model_with_tabs(n: usize) -> (TabModel, Vec<TabId>) {
        let mut model = TabModel::new(ModelKind::Regular, WindowId(1), true, TabIdAllocator::new());
        let ids = (0..n).map(|_| model.create_tab(NewTab::blank())).collect();
        (model, ids)
    }

    fn committed(events: &[TabModelEvent]) -> Vec<TabId> {
        events
            .iter()
            .filter_map(|e| match e {
                TabModelEvent::ClosureCommitted(tab) => Some(tab.id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_create_appends_and_selects() {
        let (model, ids) = model_with_tabs(3);
        assert_eq!(model.active_ids(), ids.as_slice());
        assert_eq!(model.selected_tab_id(), Some(ids[2]));
        assert_eq!(model.count(), 3);
    }

    #[test]
    fn test_create_at_position_in_background() {
        let (mut model, ids) = model_with_tabs(2);
        let new = model.create_tab(NewTab::blank().at(0).in_background());

        assert_eq!(model.active_ids(), &[new, ids[0], ids[1]]);
        assert_eq!(model.selected_tab_id(), Some(ids[1]));
        assert_eq!(model.comprehensive_view().ids(), vec![new, ids[0], ids[1]]);
    }

    #[test]
    fn test_close_with_undo_then_cancel_restores_everything() {
        let (mut model, ids) = model_with_tabs(4);
        model.set_index(1).unwrap();
        let before = model.comprehensive_view();

        model.close_tab(ids[1], true).unwrap();
        assert!(model.is_closure_pending(ids[1]));
        assert_eq!(model.tab(ids[1]).map(Tab::state), Some(TabState::PendingClosure));
        assert_eq!(model.active_ids(), &[ids[0], ids[2], ids[3]]);

        model.cancel_tab_closure(ids[1]).unwrap();
        assert_eq!(model.active_ids(), ids.as_slice());
        // Selection moved to the neighbour on close and stays there on undo
        assert_eq!(model.selected_tab_id(), Some(ids[2]));
        assert_eq!(model.comprehensive_view().ids(), before.ids());
    }

    #[test]
    fn test_close_unselected_keeps_selection() {
        let (mut model, ids) = model_with_tabs(3);
        model.close_tab(ids[0], true).unwrap();
        assert_eq!(model.selected_tab_id(), Some(ids[2]));
        assert_eq!(model.selected_index(), Some(1));
    }

    // `expected` indexes the tabs as created, before the close.
    #[rstest]
    #[case::first(4, 0, Some(1))]
    #[case::middle(4, 1, Some(2))]
    #[case::last(4, 3, Some(2))]
    #[case::last_of_two(2, 1, Some(0))]
    #[case::only(1, 0, None)]
    fn test_selection_tie_break(
        #[case] n: usize,
        #[case] closed: usize,
        #[case] expected: Option<usize>,
    ) {
        let (mut model, ids) = model_with_tabs(n);
        model.set_index(closed).unwrap();
        model.close_tab(ids[closed], true).unwrap();

        assert_eq!(model.selected_tab_id(), expected.map(|i| ids[i]));
        assert_eq!(model.comprehensive_view().selected_tab_id(), expected.map(|i| ids[i]));
    }

    #[test]
    fn test_close_pending_tab_is_rejected() {
        let (mut model, ids) = model_with_tabs(2);
        model.close_tab(ids[0], true).unwrap();

        let err = model.close_tab(ids[0], true).unwrap_err();
        assert!(matches!(
            err,
            TabError::PreconditionViolation { state: TabState::PendingClosure, .. }
        ));
        assert_eq!(model.pending_closures(), vec![ids[0]]);
    }

    #[test]
    fn test_operations_on_destroyed_tab() {
        let (mut model, ids) = model_with_tabs(2);
        model.close_tab(ids[0], false).unwrap();

        for result in [
            model.close_tab(ids[0], true),
            model.cancel_tab_closure(ids[0]),
            model.commit_tab_closure(ids[0]),
        ] {
            assert!(matches!(
                result,
                Err(TabError::PreconditionViolation { state: TabState::Destroyed, .. })
            ));
        }
    }

    #[test]
    fn test_tombstones_are_bounded() {
        let (mut model, ids) = model_with_tabs(1);
        model.close_tab(ids[0], false).unwrap();
        for _ in 0..MAX_TOMBSTONES {
            let id = model.create_tab(NewTab::blank());
            model.close_tab(id, false).unwrap();
        }

        assert_eq!(model.tombstones.len(), MAX_TOMBSTONES);
        assert!(!model.owns(ids[0]));
        assert_eq!(model.cancel_tab_closure(ids[0]), Err(TabError::NotFound(ids[0])));
    }

    #[test]
    fn test_unknown_tab() {
        let (mut model, _) = model_with_tabs(1);
        assert_eq!(model.cancel_tab_closure(TabId(99)), Err(TabError::NotFound(TabId(99))));
        assert_eq!(model.set_index(5), Err(TabError::NoTabAtIndex(5)));
    }

    #[test]
    fn test_commit_requires_pending() {
        let (mut model, ids) = model_with_tabs(1);
        assert!(matches!(
            model.commit_tab_closure(ids[0]),
            Err(TabError::PreconditionViolation { state: TabState::Active, .. })
        ));
        assert_eq!(model.count(), 1);
    }

    #[test]
    fn test_commit_all_leaves_active_alone() {
        let (mut model, ids) = model_with_tabs(5);
        model.close_tab(ids[1], true).unwrap();
        model.close_tab(ids[3], true).unwrap();
        let active: Vec<TabId> = model.active_ids().to_vec();
        let mut sub = model.subscribe();

        let done = model.commit_all_tab_closures();

        assert_eq!(done, vec![ids[3], ids[1]]);
        assert!(!model.has_pending_closures());
        assert_eq!(model.active_ids(), active.as_slice());
        assert_eq!(committed(&sub.drain()), vec![ids[3], ids[1]]);
    }

    #[derive(Debug, Clone, Copy)]
    enum FlushOp {
        Move,
        Create,
        Save,
        HardClose,
    }

    #[rstest]
    #[case(FlushOp::Move)]
    #[case(FlushOp::Create)]
    #[case(FlushOp::Save)]
    #[case(FlushOp::HardClose)]
    fn test_flush_points(#[case] op: FlushOp) {
        let (mut model, ids) = model_with_tabs(4);
        model.close_tab(ids[1], true).unwrap();
        model.close_tab(ids[2], true).unwrap();
        let mut sub = model.subscribe();

        match op {
            FlushOp::Move => {
                model.move_tab(ids[0], 2).unwrap();
            }
            FlushOp::Create => {
                model.create_tab(NewTab::blank());
            }
            FlushOp::Save => {
                model.save_state();
            }
            FlushOp::HardClose => {
                model.close_tab(ids[3], false).unwrap();
            }
        }

        assert!(!model.has_pending_closures());
        let events = sub.drain();
        let flushed = committed(&events);
        assert_eq!(&flushed[..2], &[ids[2], ids[1]]);
        assert!(!events.iter().any(|e| matches!(e, TabModelEvent::PendingClosure(_))));
    }

    #[test]
    fn test_move_semantics() {
        let (mut model, ids) = model_with_tabs(4);

        // Onto its own slot or the slot after it: no change
        assert!(!model.move_tab(ids[1], 1).unwrap());
        assert!(!model.move_tab(ids[1], 2).unwrap());

        assert!(model.move_tab(ids[0], 3).unwrap());
        assert_eq!(model.active_ids(), &[ids[1], ids[2], ids[0], ids[3]]);

        assert!(model.move_tab(ids[3], 0).unwrap());
        assert_eq!(model.active_ids(), &[ids[3], ids[1], ids[2], ids[0]]);

        // Past the end clamps to the end
        assert!(model.move_tab(ids[3], 100).unwrap());
        assert_eq!(model.active_ids(), &[ids[1], ids[2], ids[0], ids[3]]);
        assert_eq!(model.comprehensive_view().ids(), model.active_ids());
    }

    #[test]
    fn test_move_keeps_later_undo_in_place() {
        let (mut model, ids) = model_with_tabs(3);
        model.move_tab(ids[2], 0).unwrap();
        model.close_tab(ids[0], true).unwrap();

        assert_eq!(model.comprehensive_view().ids(), vec![ids[2], ids[0], ids[1]]);
        model.cancel_tab_closure(ids[0]).unwrap();
        assert_eq!(model.active_ids(), &[ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn test_move_pending_tab_rejected_without_flush() {
        let (mut model, ids) = model_with_tabs(3);
        model.close_tab(ids[0], true).unwrap();

        assert!(model.move_tab(ids[0], 2).is_err());
        assert!(model.is_closure_pending(ids[0]));
    }

    #[test]
    fn test_undo_unsupported() {
        let mut model = TabModel::new(ModelKind::Private, WindowId(1), false, TabIdAllocator::new());
        let a = model.create_tab(NewTab::blank());
        let b = model.create_tab(NewTab::blank());
        let mut sub = model.subscribe();

        model.close_tab(a, true).unwrap();

        assert!(!model.is_closure_pending(a));
        assert_eq!(model.comprehensive_view().ids(), vec![b]);
        assert_eq!(committed(&sub.drain()), vec![a]);
    }

    #[test]
    fn test_close_all_goes_back_to_front() {
        let (mut model, ids) = model_with_tabs(3);
        let closed = model.close_all_tabs();

        assert_eq!(closed, vec![ids[2], ids[1], ids[0]]);
        assert_eq!(model.most_recent_closure(), Some(ids[0]));
        assert_eq!(model.selected_tab_id(), None);
        assert_eq!(model.comprehensive_view().ids(), ids);
        assert_eq!(model.comprehensive_view().selected_tab_id(), None);
    }

    #[test]
    fn test_cancel_all_selects_first_restored() {
        let (mut model, ids) = model_with_tabs(3);
        model.close_all_tabs();

        assert_eq!(model.cancel_all_tab_closures(), ids);
        assert_eq!(model.active_ids(), ids.as_slice());
        assert_eq!(model.selected_tab_id(), Some(ids[0]));
    }

    #[test]
    fn test_restore_most_recent_selects() {
        let (mut model, ids) = model_with_tabs(3);
        model.set_index(0).unwrap();
        model.close_tab(ids[2], true).unwrap();
        model.close_tab(ids[1], true).unwrap();

        assert_eq!(model.restore_most_recent(), Some(ids[1]));
        assert_eq!(model.selected_tab_id(), Some(ids[1]));
        assert_eq!(model.pending_closures(), vec![ids[2]]);
    }

    #[test]
    fn test_events_fire_once_per_transition() {
        let (mut model, ids) = model_with_tabs(2);
        let mut sub = model.subscribe();

        model.close_tab(ids[0], true).unwrap();
        model.cancel_tab_closure(ids[0]).unwrap();
        model.close_tab(ids[0], true).unwrap();
        model.commit_tab_closure(ids[0]).unwrap();

        let events = sub.drain();
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                TabModelEvent::PendingClosure(_) => "pending",
                TabModelEvent::ClosureUndone(_) => "undone",
                TabModelEvent::ClosureCommitted(_) => "committed",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["pending", "undone", "pending", "committed"]);
    }

    #[rstest]
    #[case::with_undo(true)]
    #[case::without_undo(false)]
    fn test_close_all_reports_one_selection_clear(#[case] undo: bool) {
        let mut model = TabModel::new(ModelKind::Regular, WindowId(1), undo, TabIdAllocator::new());
        let ids: Vec<TabId> = (0..3).map(|_| model.create_tab(NewTab::blank())).collect();
        model.select_tab(ids[1]).unwrap();
        let mut sub = model.subscribe();

        model.close_all_tabs();

        let selection: Vec<TabModelEvent> = sub
            .drain()
            .into_iter()
            .filter(|e| {
                matches!(e, TabModelEvent::TabSelected { .. } | TabModelEvent::SelectionCleared { .. })
            })
            .collect();
        assert_eq!(selection, vec![TabModelEvent::SelectionCleared { previous: ids[1] }]);
        assert_eq!(model.selected_tab_id(), None);
    }

    #[test]
    fn test_closing_last_tab_clears_selection() {
        let (mut model, ids) = model_with_tabs(1);
        let mut sub = model.subscribe();

        model.close_tab(ids[0], true).unwrap();

        assert!(sub.drain().contains(&TabModelEvent::SelectionCleared { previous: ids[0] }));
    }

    #[test]
    fn test_save_state_snapshot() {
        let (mut model, ids) = model_with_tabs(3);
        model.close_tab(ids[0], true).unwrap();

        let snapshot = model.save_state();

        assert_eq!(snapshot.kind, ModelKind::Regular);
        assert_eq!(snapshot.selected_index, Some(1));
        assert_eq!(snapshot.tabs.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[1], ids[2]]);
    }

    #[test]
    fn test_teardown_destroys_everything() {
        let (mut model, ids) = model_with_tabs(3);
        model.close_tab(ids[1], true).unwrap();
        let mut sub = model.subscribe();

        model.teardown();

        assert!(model.is_empty());
        assert!(model.comprehensive_view().is_empty());
        assert_eq!(committed(&sub.drain()).len(), 3);
    }

    #[test]
    fn test_release_and_adopt() {
        let ids = TabIdAllocator::new();
        let mut source = TabModel::new(ModelKind::Regular, WindowId(1), true, ids.clone());
        let mut target = TabModel::new(ModelKind::Regular, WindowId(2), true, ids);
        let keep = source.create_tab(NewTab::blank());
        let moving = source.create_tab(NewTab::blank());
        let existing = target.create_tab(NewTab::blank());
        source.close_tab(moving, true).unwrap();

        let tab = source.release_pending(moving).unwrap();
        target.adopt_tab(tab).unwrap();

        assert_eq!(source.active_ids(), &[keep]);
        assert!(!source.has_pending_closures());
        assert_eq!(target.active_ids(), &[existing, moving]);
        assert_eq!(target.selected_tab_id(), Some(moving));
        assert_eq!(target.tab(moving).map(|t| t.window_id), Some(WindowId(2)));
    }

    #[test]
    fn test_adopt_keeps_local_pending_closures() {
        let ids = TabIdAllocator::new();
        let mut source = TabModel::new(ModelKind::Regular, WindowId(1), true, ids.clone());
        let mut target = TabModel::new(ModelKind::Regular, WindowId(2), true, ids);
        let moving = source.create_tab(NewTab::blank());
        let first = target.create_tab(NewTab::blank());
        let local = target.create_tab(NewTab::blank());
        source.close_tab(moving, true).unwrap();
        target.close_tab(local, true).unwrap();
        let mut sub = target.subscribe();

        let tab = source.release_pending(moving).unwrap();
        target.adopt_tab(tab).unwrap();

        assert!(committed(&sub.drain()).is_empty());
        assert_eq!(target.active_ids(), &[first, moving]);
        assert_eq!(target.pending_closures(), vec![local]);

        // The local closure still undoes into its old slot
        target.cancel_tab_closure(local).unwrap();
        assert_eq!(target.active_ids(), &[first, local, moving]);
    }
}
