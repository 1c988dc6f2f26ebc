//! Registration table mapping window names to controller factories.

use std::{
    any::{TypeId, type_name},
    collections::HashMap,
    sync::Arc,
};

use tracing::warn;
use uiwin_config::NameConvention;

use crate::WindowController;

/// Builds a fresh controller for one window instance.
pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn WindowController> + Send + Sync>;

/// One registration.
#[derive(Clone)]
struct TypeEntry {
    /// Builds controllers.
    factory: ControllerFactory,
    /// Concrete controller type.
    type_id: TypeId,
}

/// Explicit name → factory table supplied by the host at startup.
#[derive(Clone, Default)]
pub struct WindowTypes {
    /// Window name to factory.
    by_name: HashMap<String, TypeEntry>,
    /// Reverse map for the typed API.
    by_type: HashMap<TypeId, String>,
}

impl WindowTypes {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register controller type `T` under an explicit window name.
    ///
    /// Re-registering a name replaces the previous entry.
    pub fn register<T, F>(&mut self, name: impl Into<String>, factory: F)
    where
        T: WindowController,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let name = name.into();
        let type_id = TypeId::of::<T>();
        let boxed: ControllerFactory =
            Arc::new(move || -> Box<dyn WindowController> { Box::new(factory()) });
        let entry = TypeEntry {
            factory: boxed,
            type_id,
        };
        if let Some(old) = self.by_name.insert(name.clone(), entry) {
            warn!(window = %name, "window type registered twice; keeping the latest");
            if old.type_id != type_id {
                self.by_type.remove(&old.type_id);
            }
        }
        self.by_type.insert(type_id, name);
    }

    /// Register `T` under the name derived from its type name by `convention`.
    pub fn register_type<T, F>(&mut self, convention: NameConvention, factory: F) -> String
    where
        T: WindowController,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let name = convention.apply(short_type_name::<T>());
        self.register::<T, F>(name.clone(), factory);
        name
    }

    /// Whether a factory exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Window name registered for controller type `T`.
    pub fn name_of<T: WindowController>(&self) -> Option<&str> {
        self.by_type.get(&TypeId::of::<T>()).map(String::as_str)
    }

    /// Build a new controller for `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn WindowController>> {
        self.by_name.get(name).map(|entry| (entry.factory)())
    }

    /// Registered window names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Last path segment of `T`'s type name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
