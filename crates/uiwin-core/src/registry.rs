//! The name-keyed window registry.

use std::collections::HashMap;

use crate::{Error, Result, WindowState};

/// Name to state map. At most one state per name.
#[derive(Default)]
pub struct Registry {
    /// Registry name to state.
    windows: HashMap<String, WindowState>,
}

impl Registry {
    /// State for `name`.
    pub(crate) fn get(&self, name: &str) -> Option<WindowState> {
        self.windows.get(name).cloned()
    }

    /// Whether `name` has a state.
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.windows.contains_key(name)
    }

    /// Insert a new state. A second state for the same name is a caller bug.
    pub(crate) fn put(&mut self, name: &str, state: WindowState) -> Result<()> {
        if self.windows.contains_key(name) {
            return Err(Error::Duplicate(name.to_string()));
        }
        self.windows.insert(name.to_string(), state);
        Ok(())
    }

    /// Forget `name`.
    pub(crate) fn remove(&mut self, name: &str) -> Option<WindowState> {
        self.windows.remove(name)
    }

    /// Remove `name` only if it still maps to `state`.
    pub(crate) fn remove_if_same(&mut self, name: &str, state: &WindowState) -> bool {
        if self
            .windows
            .get(name)
            .is_some_and(|cur| WindowState::same(cur, state))
        {
            self.windows.remove(name);
            return true;
        }
        false
    }

    /// Registered names, sorted.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.windows.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of states.
    pub(crate) fn len(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Args;

    #[test]
    fn put_rejects_duplicates() {
        let mut reg = Registry::default();
        reg.put("Login", WindowState::new_static("Login", false, Args::new()))
            .unwrap();
        let err = reg
            .put("Login", WindowState::new_static("Login", true, Args::new()))
            .unwrap_err();
        assert!(matches!(err, Error::Duplicate(name) if name == "Login"));
        assert_eq!(reg.len(), 1);
        assert!(!reg.get("Login").unwrap().open_when_finish());
    }

    #[test]
    fn remove_if_same_ignores_replaced_entries() {
        let mut reg = Registry::default();
        let old = WindowState::new_static("A", false, Args::new());
        let new = WindowState::new_static("A", false, Args::new());
        reg.put("A", new).unwrap();
        assert!(!reg.remove_if_same("A", &old));
        assert!(reg.contains("A"));
        assert!(reg.remove("A").is_some());
        assert!(!reg.contains("A"));
        assert!(reg.names().is_empty());
    }
}
