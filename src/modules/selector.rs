// Per-window pair of tab models (regular and private) plus the pointer to
// the one the user is looking at.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tab_model::{ModelSnapshot, TabModel};
use crate::error::TabError;
use crate::settings::Settings;
use crate::state::{ModelKind, NewTab, TabId, TabIdAllocator, WindowId};

/// Everything a window shows, as written at a persistence checkpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub window_id: WindowId,
    pub saved_at: DateTime<Utc>,
    pub current: ModelKind,
    pub models: Vec<ModelSnapshot>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub struct TabModelSelector {
    window_id: WindowId,
    /// Indexed by `ModelKind::index`.
    models: Vec<TabModel>,
    current: ModelKind,
}

impl TabModelSelector {
    pub fn new(window_id: WindowId, settings: &Settings, ids: TabIdAllocator) -> Self {
        let models = ModelKind::ALL
            .iter()
            .map(|kind| TabModel::new(*kind, window_id, settings.undo_supported(*kind), ids.clone()))
            .collect();
        Self {
            window_id,
            models,
            current: ModelKind::Regular,
        }
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn current_kind(&self) -> ModelKind {
        self.current
    }

    pub fn select_model(&mut self, kind: ModelKind) {
        if self.current != kind {
            log::debug!("[Selector] {} switched to {:?} model", self.window_id, kind);
            self.current = kind;
        }
    }

    pub fn current_model(&self) -> &TabModel {
        self.model(self.current)
    }

    pub fn current_model_mut(&mut self) -> &mut TabModel {
        self.model_mut(self.current)
    }

    pub fn model(&self, kind: ModelKind) -> &TabModel {
        &self.models[kind.index()]
    }

    pub fn model_mut(&mut self, kind: ModelKind) -> &mut TabModel {
        &mut self.models[kind.index()]
    }

    pub fn models(&self) -> impl Iterator<Item = &TabModel> + '_ {
        self.models.iter()
    }

    /// Current model first, then the rest. Restore lookups scan in this order.
    pub fn models_current_first(&self) -> impl Iterator<Item = &TabModel> + '_ {
        let current = self.current;
        std::iter::once(self.model(current)).chain(self.models.iter().filter(move |m| m.kind() != current))
    }

    /// The model holding `id`, whether active or pending closure.
    pub fn model_for_tab(&self, id: TabId) -> Option<ModelKind> {
        self.models.iter().find(|m| m.tab(id).is_some()).map(TabModel::kind)
    }

    /// Also resolves destroyed ids so callers see the real lifecycle error.
    fn owner_mut(&mut self, id: TabId) -> Result<&mut TabModel, TabError> {
        self.models
            .iter_mut()
            .find(|m| m.owns(id))
            .ok_or(TabError::NotFound(id))
    }

    pub fn close_tab(&mut self, id: TabId, allow_undo: bool) -> Result<(), TabError> {
        self.owner_mut(id)?.close_tab(id, allow_undo)
    }

    pub fn cancel_tab_closure(&mut self, id: TabId) -> Result<(), TabError> {
        self.owner_mut(id)?.cancel_tab_closure(id)
    }

    pub fn commit_tab_closure(&mut self, id: TabId) -> Result<(), TabError> {
        self.owner_mut(id)?.commit_tab_closure(id)
    }

    pub fn select_tab(&mut self, id: TabId) -> Result<(), TabError> {
        let model = self.owner_mut(id)?;
        model.select_tab(id)?;
        let kind = model.kind();
        self.select_model(kind);
        Ok(())
    }

    /// Only the owning model is flushed.
    pub fn move_tab(&mut self, id: TabId, new_index: usize) -> Result<bool, TabError> {
        self.owner_mut(id)?.move_tab(id, new_index)
    }

    /// Only the target model is flushed.
    pub fn create_tab(&mut self, kind: ModelKind, params: NewTab) -> TabId {
        self.model_mut(kind).create_tab(params)
    }

    pub fn commit_all_tab_closures(&mut self) -> Vec<TabId> {
        self.models.iter_mut().flat_map(|m| m.commit_all_tab_closures()).collect()
    }

    pub fn has_pending_closures(&self) -> bool {
        self.models.iter().any(TabModel::has_pending_closures)
    }

    /// Flushes every model, then snapshots what is visible.
    pub fn save_state(&mut self) -> SessionSnapshot {
        let models = self.models.iter_mut().map(TabModel::save_state).collect();
        log::debug!("[Selector] Saved state of {}", self.window_id);
        SessionSnapshot {
            window_id: self.window_id,
            saved_at: Utc::now(),
            current: self.current,
            models,
        }
    }

    /// Destroys every tab in both models.
    pub fn teardown(&mut self) -> Vec<TabId> {
        self.models.iter_mut().flat_map(|m| m.teardown()).collect()
    }
}
