use crate::state::{TabId, TabState};

/// Errors returned by tab model operations.
///
/// Every rejected call leaves the model exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TabError {
    /// The tab exists but is in the wrong lifecycle state for the operation.
    #[error("cannot {operation} {tab}: tab is {state:?}")]
    PreconditionViolation {
        tab: TabId,
        state: TabState,
        operation: &'static str,
    },
    /// No tab with this id is known to the model.
    #[error("unknown tab {0}")]
    NotFound(TabId),
    /// Selection by position outside the active strip.
    #[error("no active tab at index {0}")]
    NoTabAtIndex(usize),
    /// The ledger already holds an entry for this tab.
    #[error("{0} is already pending closure")]
    AlreadyPending(TabId),
}

/// Errors from the JSON-backed closed tab store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("closed tab store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("closed tab store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
