// The "rewound" tab list: active tabs plus tabs still pending closure, in the
// order they were created. Restore bookkeeping and full tab counts read this.

use crate::state::{Tab, TabId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Slot {
    id: TabId,
    pending: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComprehensiveView {
    slots: Vec<Slot>,
    selected: Option<TabId>,
}

impl ComprehensiveView {
    /// Stable merge of two lists that are each already sorted by
    /// `original_order`.
    pub(crate) fn merge<'a>(
        active: impl IntoIterator<Item = &'a Tab>,
        mut pending: Vec<&'a Tab>,
        selected: Option<TabId>,
    ) -> Self {
        pending.sort_by_key(|t| t.original_order());

        let mut slots = Vec::new();
        let mut pending = pending.into_iter().peekable();
        for tab in active {
            while let Some(closing) = pending.next_if(|p| p.original_order() < tab.original_order()) {
                slots.push(Slot { id: closing.id, pending: true });
            }
            slots.push(Slot { id: tab.id, pending: false });
        }
        slots.extend(pending.map(|p| Slot { id: p.id, pending: true }));

        Self { slots, selected }
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn tab_at(&self, index: usize) -> Option<TabId> {
        self.slots.get(index).map(|s| s.id)
    }

    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn is_closure_pending(&self, id: TabId) -> bool {
        self.slots.iter().any(|s| s.id == id && s.pending)
    }

    /// Always an active tab; none while every tab is pending closure.
    pub fn selected_tab_id(&self) -> Option<TabId> {
        self.selected
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.and_then(|id| self.index_of(id))
    }

    pub fn ids(&self) -> Vec<TabId> {
        self.slots.iter().map(|s| s.id).collect()
    }
}
