//! The load task: manifest, dependencies, resource, then instantiation.
//!
//! Exactly one task runs per registry state. Every fetch is a suspend point;
//! the registry and state locks are never held across one.

use std::{mem, time::Duration};

use tokio::time;
use tracing::{debug, trace};

use crate::{
    Error, LoadPhase, LoadStatus, Manifest, ResourceHandle, Result, UiManager, Visual,
    WindowHandle, WindowState,
};

/// Drive `state` from `Loading` to `Loaded`, or remove it on failure.
pub async fn run(manager: UiManager, state: WindowState) {
    let name = state.template_name();
    trace!(window = %name, "load task started");
    let fetched = match manager.config().load_timeout_ms {
        Some(ms) => time::timeout(Duration::from_millis(ms), fetch(&manager, &state, &name))
            .await
            .unwrap_or_else(|_| {
                Err(Error::Timeout {
                    name: name.clone(),
                    ms,
                })
            }),
        None => fetch(&manager, &state, &name).await,
    };
    match fetched {
        Ok(resource) => instantiate(&manager, &state, &name, resource),
        Err(err) => fail(&manager, &state, &err, None),
    }
    manager.load_finished();
}

/// Fetch the manifest, every dependency in manifest order, then the window's
/// own resource. Dependencies are recorded on the state as they arrive so a
/// failed or timed-out load can release them.
async fn fetch(manager: &UiManager, state: &WindowState, name: &str) -> Result<ResourceHandle> {
    if !manager.types().contains(name) {
        return Err(Error::UnknownWindowType(name.to_string()));
    }
    let config = manager.config();
    let loader = manager.loader();

    state.set_phase(LoadPhase::Manifest);
    let manifest_path = config.manifest_path(name);
    let bytes = loader
        .load_bytes(&manifest_path)
        .await
        .map_err(|source| Error::Load {
            path: manifest_path.clone(),
            source,
        })?;
    loader.release(&manifest_path);
    let manifest = Manifest::parse(&bytes).map_err(|source| Error::Manifest {
        path: manifest_path,
        source,
    })?;

    let total = manifest.len();
    trace!(window = name, total, "manifest parsed");
    for (index, dep) in manifest.iter().enumerate() {
        state.set_phase(LoadPhase::Dependency { index, total });
        let path = config.dependency_path(dep);
        let asset = loader
            .load_asset(&path)
            .await
            .map_err(|source| Error::Load {
                path: path.clone(),
                source,
            })?;
        state
            .lock()
            .dependencies
            .push(ResourceHandle::new(path, asset));
    }

    state.set_phase(LoadPhase::Resource);
    let path = config.resource_path(name);
    let asset = loader
        .load_asset(&path)
        .await
        .map_err(|source| Error::Load {
            path: path.clone(),
            source,
        })?;
    Ok(ResourceHandle::new(path, asset))
}

/// Build the controller and visual, then run the post-load sequence.
fn instantiate(manager: &UiManager, state: &WindowState, name: &str, resource: ResourceHandle) {
    state.set_phase(LoadPhase::Instantiating);
    let Some(controller) = manager.types().create(name) else {
        let err = Error::UnknownWindowType(name.to_string());
        fail(manager, state, &err, Some(resource));
        return;
    };
    let mut visual = Visual::new(name, resource.asset().clone());
    manager.bridge().filter_object(controller.as_ref(), &mut visual);
    let window = WindowHandle::new(name, name, controller, visual);
    {
        let mut st = state.lock();
        st.status = LoadStatus::Loading(LoadPhase::Initializing);
        st.window = Some(window.clone());
        st.resource = Some(resource);
    }
    debug!(window = name, "window loaded");
    manager.init_window(state, &window);
}

/// Release what was fetched and drop the state.
fn fail(
    manager: &UiManager,
    state: &WindowState,
    err: &Error,
    resource: Option<ResourceHandle>,
) {
    err.log("load");
    let dependencies = mem::take(&mut state.lock().dependencies);
    for handle in resource.into_iter().chain(dependencies) {
        manager.loader().release(handle.path());
    }
    manager.fail_state(state, &err.to_string());
}
