// Tabstrip Core Library Entry Point
// Tab lifecycle, undoable closure and restore routing for a multi-window
// browser. Everything here is UI-free and runs on one control thread.

pub mod error;
pub mod settings;

// Shared state
pub mod state;

// Pure logic modules
pub mod modules;

pub use error::{SettingsError, StoreError, TabError};
pub use modules::closed_tabs_store::{ClosedTabEntry, ClosedTabStore, PersistedRestoreStore};
pub use modules::comprehensive::ComprehensiveView;
pub use modules::events::{Subscription, SubscriptionId, TabModelEvent};
pub use modules::pending_closures::PendingClosureLedger;
pub use modules::restore_router::{
    RestoreCompletion, RestoreOutcome, RestoreRequestId, RestoreRouter, RestoreTier,
};
pub use modules::selector::{SessionSnapshot, TabModelSelector};
pub use modules::tab_model::{ModelSnapshot, SavedTab, TabModel};
pub use modules::windows::{BrowserWindow, WindowRegistry};
pub use settings::{CrossWindowRestore, Settings};
pub use state::{ModelKind, NewTab, Tab, TabId, TabIdAllocator, TabState, WindowId};
