//! Collapsible, resizable side panel state.
//!
//! The panel owns its collapsed flag, width, resize session and the set of
//! expanded tree items. When persistence is enabled the collapsed flag and the
//! width are read from an injected [`KeyValueStore`] at construction and
//! written back on every change. Store failures are logged and otherwise
//! ignored: the panel always falls back to its configured defaults.

use crate::config::PanelSettings;
use crate::record::format_number;
use crate::store::KeyValueStore;
use std::collections::BTreeSet;
use tracing::warn;

/// Panel bounds, defaults and persistence settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelConfig {
    pub default_collapsed: bool,
    pub default_width: f64,
    pub min_width: f64,
    pub max_width: f64,
    pub persist: bool,
    pub namespace: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelSettings::default().into()
    }
}

impl From<PanelSettings> for PanelConfig {
    fn from(settings: PanelSettings) -> Self {
        Self {
            default_collapsed: settings.default_collapsed,
            default_width: settings.default_width,
            min_width: settings.min_width,
            max_width: settings.max_width,
            persist: settings.persist,
            namespace: settings.namespace,
        }
    }
}

impl PanelConfig {
    fn collapsed_key(&self) -> String {
        format!("{}_collapsed", self.namespace)
    }

    fn width_key(&self) -> String {
        format!("{}_width", self.namespace)
    }

    /// Clamp into `[min_width, max_width]`. NaN clamps to the minimum.
    pub fn clamp(&self, width: f64) -> f64 {
        if width.is_nan() {
            return self.min_width;
        }
        width.max(self.min_width).min(self.max_width)
    }
}

/// Identifies one resize interaction. Updates carrying an older token are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeToken(u64);

#[derive(Debug, Clone, Copy)]
struct ResizeSession {
    token: ResizeToken,
    origin: f64,
}

#[derive(Debug)]
pub struct Panel {
    config: PanelConfig,
    collapsed: bool,
    width: f64,
    resize: Option<ResizeSession>,
    last_token: u64,
    expanded: BTreeSet<String>,
    store: Option<Box<dyn KeyValueStore>>,
}

impl Panel {
    /// In-memory panel starting from the configured defaults.
    pub fn new(config: PanelConfig) -> Self {
        Self {
            collapsed: config.default_collapsed,
            width: config.clamp(config.default_width),
            resize: None,
            last_token: 0,
            expanded: BTreeSet::new(),
            store: None,
            config,
        }
    }

    /// Panel backed by `store`. Stored values override the defaults when
    /// persistence is enabled; unreadable values are ignored.
    pub fn with_store(config: PanelConfig, store: Box<dyn KeyValueStore>) -> Self {
        let mut panel = Self::new(config);
        if panel.config.persist {
            if let Some(collapsed) = read_stored(store.as_ref(), &panel.config.collapsed_key(), |raw| {
                serde_json::from_str::<bool>(raw).ok()
            }) {
                panel.collapsed = collapsed;
            }
            if let Some(width) = read_stored(store.as_ref(), &panel.config.width_key(), |raw| {
                raw.trim().parse::<f64>().ok().filter(|w| w.is_finite())
            }) {
                panel.width = panel.config.clamp(width);
            }
        }
        panel.store = Some(store);
        panel
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    // ========================================================================
    // Collapse
    // ========================================================================

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
        self.persist(&self.config.collapsed_key(), &collapsed.to_string());
    }

    pub fn toggle_collapse(&mut self) {
        self.set_collapsed(!self.collapsed);
    }

    // ========================================================================
    // Width
    // ========================================================================

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Width consumers should lay out with: 0 while collapsed.
    pub fn effective_width(&self) -> f64 {
        if self.collapsed {
            0.0
        } else {
            self.width
        }
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = self.config.clamp(width);
        self.persist(&self.config.width_key(), &format_number(self.width));
    }

    pub fn is_resizing(&self) -> bool {
        self.resize.is_some()
    }

    /// Begin a resize. `origin` is the panel's left edge in pointer
    /// coordinates. Any earlier session is superseded.
    pub fn start_resize(&mut self, origin: f64) -> ResizeToken {
        self.last_token += 1;
        let token = ResizeToken(self.last_token);
        self.resize = Some(ResizeSession { token, origin });
        token
    }

    /// Apply a pointer position to the active session. Returns whether the
    /// update was accepted.
    pub fn resize_to(&mut self, token: ResizeToken, pointer_x: f64) -> bool {
        match self.resize {
            Some(session) if session.token == token => {
                self.set_width(pointer_x - session.origin);
                true
            }
            _ => false,
        }
    }

    /// End the session started with `token`.
    pub fn stop_resize(&mut self, token: ResizeToken) -> bool {
        match self.resize {
            Some(session) if session.token == token => {
                self.resize = None;
                true
            }
            _ => false,
        }
    }

    /// End whatever session is active, for example when navigating away.
    pub fn cancel_resize(&mut self) {
        self.resize = None;
    }

    // ========================================================================
    // Expanded items
    // ========================================================================

    pub fn is_item_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn toggle_item(&mut self, id: &str) {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_string());
        }
    }

    pub fn expand_item(&mut self, id: &str) {
        self.expanded.insert(id.to_string());
    }

    pub fn collapse_item(&mut self, id: &str) {
        self.expanded.remove(id);
    }

    /// Replace the expanded set with exactly `ids`.
    pub fn expand_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expanded = ids.into_iter().map(Into::into).collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn expanded_items(&self) -> impl Iterator<Item = &str> {
        self.expanded.iter().map(String::as_str)
    }

    fn persist(&mut self, key: &str, value: &str) {
        if !self.config.persist {
            return;
        }
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.set(key, value) {
                warn!(key, error = %e, "failed to persist panel state");
            }
        }
    }
}

fn read_stored<T>(
    store: &dyn KeyValueStore,
    key: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    match store.get(key) {
        Ok(Some(raw)) => {
            let value = parse(&raw);
            if value.is_none() {
                warn!(key, raw = %raw, "ignoring unreadable stored panel state");
            }
            value
        }
        Ok(None) => None,
        Err(e) => {
            warn!(key, error = %e, "failed to read panel state, using defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, RunlensError};
    use crate::store::MemoryStore;

    #[derive(Debug)]
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(RunlensError::Store("unavailable".into()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(RunlensError::Store("unavailable".into()))
        }
    }

    fn persisted() -> PanelConfig {
        PanelConfig {
            persist: true,
            namespace: "sidebar".into(),
            ..PanelConfig::default()
        }
    }

    // ========================================================================
    // Width and collapse
    // ========================================================================

    #[test]
    fn test_defaults() {
        let panel = Panel::new(PanelConfig::default());
        assert!(!panel.is_collapsed());
        assert_eq!(panel.width(), 280.0);
        assert_eq!(panel.effective_width(), 280.0);
        assert!(!panel.is_resizing());
    }

    #[test]
    fn test_width_always_clamped() {
        let mut panel = Panel::new(PanelConfig::default());
        panel.set_width(50.0);
        assert_eq!(panel.width(), 200.0);
        panel.set_width(5000.0);
        assert_eq!(panel.width(), 600.0);
        panel.set_width(f64::NAN);
        assert_eq!(panel.width(), 200.0);
    }

    #[test]
    fn test_collapsed_effective_width_is_zero() {
        let mut panel = Panel::new(PanelConfig::default());
        panel.toggle_collapse();
        assert_eq!(panel.effective_width(), 0.0);
        assert_eq!(panel.width(), 280.0);
        panel.set_collapsed(false);
        assert_eq!(panel.effective_width(), 280.0);
    }

    // ========================================================================
    // Resize sessions
    // ========================================================================

    #[test]
    fn test_resize_session() {
        let mut panel = Panel::new(PanelConfig::default());
        let token = panel.start_resize(100.0);
        assert!(panel.is_resizing());
        assert!(panel.resize_to(token, 450.0));
        assert_eq!(panel.width(), 350.0);
        assert!(panel.resize_to(token, 2000.0));
        assert_eq!(panel.width(), 600.0);
        assert!(panel.stop_resize(token));
        assert!(!panel.resize_to(token, 400.0));
        assert_eq!(panel.width(), 600.0);
    }

    #[test]
    fn test_stale_token_ignored() {
        let mut panel = Panel::new(PanelConfig::default());
        let old = panel.start_resize(0.0);
        let new = panel.start_resize(0.0);
        assert!(!panel.resize_to(old, 300.0));
        assert!(!panel.stop_resize(old));
        assert!(panel.resize_to(new, 300.0));
        panel.cancel_resize();
        assert!(!panel.is_resizing());
        assert!(!panel.resize_to(new, 400.0));
        assert_eq!(panel.width(), 300.0);
    }

    // ========================================================================
    // Expanded items
    // ========================================================================

    #[test]
    fn test_expanded_items() {
        let mut panel = Panel::new(PanelConfig::default());
        panel.toggle_item("a");
        panel.expand_item("b");
        assert!(panel.is_item_expanded("a"));
        panel.toggle_item("a");
        assert!(!panel.is_item_expanded("a"));
        panel.collapse_item("b");
        assert!(!panel.is_item_expanded("b"));

        panel.expand_all(["x", "y"]);
        assert_eq!(panel.expanded_items().collect::<Vec<_>>(), vec!["x", "y"]);
        panel.collapse_all();
        assert_eq!(panel.expanded_items().count(), 0);
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    #[test]
    fn test_restores_stored_state() {
        let mut store = MemoryStore::new();
        store.set("sidebar_collapsed", "true").unwrap();
        store.set("sidebar_width", "1000").unwrap();
        let panel = Panel::with_store(persisted(), Box::new(store));
        assert!(panel.is_collapsed());
        assert_eq!(panel.width(), 600.0);
    }

    #[test]
    fn test_writes_on_change() {
        let mut panel = Panel::with_store(persisted(), Box::new(MemoryStore::new()));
        panel.set_width(321.5);
        panel.toggle_collapse();
        let store = panel.store.as_ref().unwrap();
        assert_eq!(store.get("sidebar_width").unwrap().as_deref(), Some("321.5"));
        assert_eq!(store.get("sidebar_collapsed").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_persistence_disabled_ignores_store() {
        let mut store = MemoryStore::new();
        store.set("panel_collapsed", "true").unwrap();
        let mut panel = Panel::with_store(PanelConfig::default(), Box::new(store));
        assert!(!panel.is_collapsed());
        panel.set_width(300.0);
        let store = panel.store.as_ref().unwrap();
        assert_eq!(store.get("panel_width").unwrap(), None);
    }

    #[test]
    fn test_garbage_and_broken_store_fall_back() {
        let mut store = MemoryStore::new();
        store.set("sidebar_collapsed", "maybe").unwrap();
        store.set("sidebar_width", "wide").unwrap();
        let panel = Panel::with_store(persisted(), Box::new(store));
        assert!(!panel.is_collapsed());
        assert_eq!(panel.width(), 280.0);

        let mut broken = Panel::with_store(persisted(), Box::new(BrokenStore));
        assert_eq!(broken.width(), 280.0);
        broken.set_width(400.0);
        assert_eq!(broken.width(), 400.0);
    }
}
