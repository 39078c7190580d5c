// Shared state structs to avoid circular dependencies.
// These are used by every module and can be tested independently.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TabError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Browsing context a model belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelKind {
    Regular,
    Private,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Regular, ModelKind::Private];

    pub(crate) fn index(self) -> usize {
        match self {
            ModelKind::Regular => 0,
            ModelKind::Private => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabState {
    Active,
    PendingClosure,
    Destroyed,
}

/// Hands out tab ids that are unique across every window sharing it.
/// Ids are never reused, so a stale id can never alias a newer tab.
#[derive(Clone, Debug, Default)]
pub struct TabIdAllocator {
    next: Arc<AtomicU32>,
}

impl TabIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> TabId {
        TabId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Only serialized: a tab is never rebuilt from data, it goes through the
/// lifecycle transitions below.
///
/// ```compile_fail
/// let tab: tabstrip_core::Tab = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: Url,
    pub title: String,
    state: TabState,
    original_order: u64,
}

impl Tab {
    pub(crate) fn new(
        id: TabId,
        window_id: WindowId,
        original_order: u64,
        params: NewTab,
    ) -> Self {
        Self {
            id,
            window_id,
            url: params.url,
            title: params.title,
            state: TabState::Active,
            original_order,
        }
    }

    pub fn state(&self) -> TabState {
        self.state
    }

    pub fn original_order(&self) -> u64 {
        self.original_order
    }

    pub fn is_closing(&self) -> bool {
        self.state != TabState::Active
    }

    pub(crate) fn set_original_order(&mut self, order: u64) {
        self.original_order = order;
    }

    /// Active -> PendingClosure
    pub(crate) fn begin_closure(&mut self) -> Result<(), TabError> {
        self.transition(TabState::Active, TabState::PendingClosure, "close")
    }

    /// PendingClosure -> Active
    pub(crate) fn undo_closure(&mut self) -> Result<(), TabError> {
        self.transition(TabState::PendingClosure, TabState::Active, "cancel closure")
    }

    /// Terminal. A tab closed without undo goes straight from Active.
    pub(crate) fn destroy(&mut self) -> Result<(), TabError> {
        match self.state {
            TabState::Active | TabState::PendingClosure => {
                self.state = TabState::Destroyed;
                Ok(())
            }
            TabState::Destroyed => Err(self.violation("destroy")),
        }
    }

    fn transition(
        &mut self,
        from: TabState,
        to: TabState,
        operation: &'static str,
    ) -> Result<(), TabError> {
        if self.state != from {
            return Err(self.violation(operation));
        }
        self.state = to;
        Ok(())
    }

    fn violation(&self, operation: &'static str) -> TabError {
        TabError::PreconditionViolation {
            tab: self.id,
            state: self.state,
            operation,
        }
    }
}

/// Parameters for a tab about to be created.
#[derive(Clone, Debug)]
pub struct NewTab {
    pub url: Url,
    pub title: String,
    /// Insert position in the tab strip. `None` appends.
    pub position: Option<usize>,
    pub select: bool,
}

impl NewTab {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            title: String::new(),
            position: None,
            select: true,
        }
    }

    pub fn blank() -> Self {
        Self::new(Url::parse("about:blank").expect("about:blank is a valid URL"))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn in_background(mut self) -> Self {
        self.select = false;
        self
    }
}
