use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::SettingsError;
use crate::state::ModelKind;

/// Where a tab restored from another window's undo ledger ends up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CrossWindowRestore {
    /// Move the tab into the window that asked for the restore.
    RequestingWindow,
    /// Undo the closure in place; the tab stays where it was closed.
    OriginWindow,
}

impl Default for CrossWindowRestore {
    fn default() -> Self {
        Self::RequestingWindow
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub undo_close_enabled: bool,
    pub private_undo_close_enabled: bool,
    pub max_closed_entries: usize,
    pub cross_window_restore: CrossWindowRestore,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            undo_close_enabled: true,
            private_undo_close_enabled: false,
            max_closed_entries: 25,
            cross_window_restore: CrossWindowRestore::default(),
        }
    }
}

impl Settings {
    pub fn undo_supported(&self, kind: ModelKind) -> bool {
        match kind {
            ModelKind::Regular => self.undo_close_enabled,
            ModelKind::Private => self.private_undo_close_enabled,
        }
    }

    /// Reads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("[Settings] Failed to parse settings: {}, returning defaults", e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("[Settings] Failed to read file: {}, returning defaults", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let tmp_path = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to tmp, then rename so a crash never leaves a half-written file.
        fs::write(&tmp_path, json)?;
        fs::rename(tmp_path, path)?;

        Ok(())
    }
}
