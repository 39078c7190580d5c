// Registry of open browser windows. Owns the tab id allocator shared by all
// of them and the settings every new window is built from.

use super::selector::TabModelSelector;
use crate::settings::Settings;
use crate::state::{TabIdAllocator, WindowId};

pub struct BrowserWindow {
    pub id: WindowId,
    pub selector: TabModelSelector,
}

pub struct WindowRegistry {
    /// Opening order. Restore scans other windows in this order.
    windows: Vec<BrowserWindow>,
    next_window_id: u32,
    ids: TabIdAllocator,
    settings: Settings,
}

impl WindowRegistry {
    pub fn new(settings: Settings) -> Self {
        Self {
            windows: Vec::new(),
            next_window_id: 1,
            ids: TabIdAllocator::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn open_window(&mut self) -> WindowId {
        let id = WindowId(self.next_window_id);
        self.next_window_id += 1;
        self.windows.push(BrowserWindow {
            id,
            selector: TabModelSelector::new(id, &self.settings, self.ids.clone()),
        });
        log::debug!("[Selector] Opened {} ({} open)", id, self.windows.len());
        id
    }

    /// Tears the window down. Its pending closures are committed, so nothing
    /// of it stays reachable in memory. Returns false for unknown ids.
    pub fn close_window(&mut self, id: WindowId) -> bool {
        let Some(pos) = self.windows.iter().position(|w| w.id == id) else {
            return false;
        };
        let mut window = self.windows.remove(pos);
        let destroyed = window.selector.teardown();
        log::info!("[Selector] Closed {} ({} tab(s) destroyed)", id, destroyed.len());
        true
    }

    pub fn window(&self, id: WindowId) -> Option<&BrowserWindow> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut BrowserWindow> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    pub fn selector(&self, id: WindowId) -> Option<&TabModelSelector> {
        self.window(id).map(|w| &w.selector)
    }

    pub fn selector_mut(&mut self, id: WindowId) -> Option<&mut TabModelSelector> {
        self.window_mut(id).map(|w| &mut w.selector)
    }

    pub fn windows(&self) -> impl Iterator<Item = &BrowserWindow> + '_ {
        self.windows.iter()
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.iter().map(|w| w.id).collect()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
