//! The UI toolkit bridge and the visual objects it is shown.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{Asset, WindowController};

/// The toolkit-side object backing a window.
///
/// The manager owns the active flag; bridges attach whatever references the
/// toolkit needs through [`Visual::bind`].
#[derive(Clone, Debug)]
pub struct Visual {
    /// Object name.
    name: String,
    /// Backing resource.
    asset: Asset,
    /// Shown or hidden.
    active: bool,
    /// Toolkit references set by the bridge.
    bindings: BTreeMap<String, Value>,
}

impl Visual {
    /// A fresh, inactive visual for `asset`.
    pub(crate) fn new(name: impl Into<String>, asset: Asset) -> Self {
        Self {
            name: name.into(),
            asset,
            active: false,
            bindings: BTreeMap::new(),
        }
    }

    /// Copy this visual under a new name. The copy shares the asset, keeps
    /// the bindings and starts inactive.
    pub(crate) fn instantiate_as(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: false,
            ..self.clone()
        }
    }

    /// Show or hide.
    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Object name; the window's instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource this visual was built from.
    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// Whether the window is currently shown.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Record a toolkit reference.
    pub fn bind(&mut self, key: impl Into<String>, value: Value) {
        self.bindings.insert(key.into(), value);
    }

    /// Toolkit references recorded so far.
    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }
}

/// Hooks into the concrete UI toolkit.
pub trait UiBridge: Send + Sync {
    /// Called once when the manager is built.
    fn init_bridge(&self) {}

    /// Post-instantiation hook, run for template loads and for every dynamic
    /// clone. `source` is the controller the visual was built for (for a
    /// clone, the template's controller).
    fn filter_object(&self, source: &dyn WindowController, visual: &mut Visual);
}

/// Bridge that leaves visuals untouched. Used when no bridge is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughBridge;

impl UiBridge for PassthroughBridge {
    fn filter_object(&self, _source: &dyn WindowController, _visual: &mut Visual) {}
}
