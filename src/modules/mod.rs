// Module exports for the tab lifecycle core
pub mod closed_tabs_store;  // Persisted restore source
pub mod comprehensive;      // Active + pending view in creation order
pub mod events;             // Per-model notification channel
pub mod pending_closures;   // Undo ledger
pub mod restore_router;     // "Reopen closed tab" routing
pub mod selector;           // Regular/private models of one window
pub mod tab_model;          // Strip order, selection, close/undo/commit
pub mod windows;            // Window registry
