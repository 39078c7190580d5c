// Per-model notification channel.
// A simple broadcaster that relays every event to all registered subscribers.

use tokio::sync::mpsc;

use crate::state::{Tab, TabId};

#[derive(Clone, Debug, PartialEq)]
pub enum TabModelEvent {
    PendingClosure(Tab),
    ClosureUndone(Tab),
    ClosureCommitted(Tab),
    TabCreated(Tab),
    TabSelected { tab: TabId, previous: Option<TabId> },
    /// The last selectable tab went away.
    SelectionCleared { previous: TabId },
    TabMoved { tab: TabId, from: usize, to: usize },
    /// The tab left this model through a cross-window restore.
    TabDetached(Tab),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<TabModelEvent>,
}

impl Subscription {
    /// Everything delivered so far, without waiting.
    pub fn drain(&mut self) -> Vec<TabModelEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

#[derive(Debug, Default)]
pub struct EventBus {
    peers: Vec<(SubscriptionId, mpsc::UnboundedSender<TabModelEvent>)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.peers.push((id, tx));
        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.peers.len();
        self.peers.retain(|(peer, _)| *peer != id);
        self.peers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.peers.len()
    }

    pub(crate) fn emit(&mut self, event: TabModelEvent) {
        // Receivers that were dropped without unsubscribing are pruned here.
        self.peers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}
