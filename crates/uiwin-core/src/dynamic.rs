//! Dynamic instancing: independent clones of an already-loaded template.

use tracing::debug;

use crate::{
    Args, Error, LoadPhase, LoadStatus, UiManager, WindowHandle, WindowState, state::Pending,
};

/// Open `instance` as a clone of `template`.
///
/// A name that is already registered is simply opened. The placeholder
/// registered here makes a repeated call for the same instance take that
/// path instead of cloning twice.
pub fn open_dynamic(
    manager: &UiManager,
    template: &str,
    instance: &str,
    args: Args,
) -> Option<WindowState> {
    if let Some(state) = manager.state(instance) {
        manager.open_state(&state, args);
        return Some(state);
    }
    if template == instance {
        Error::InvalidInstance(instance.to_string()).log("open_dynamic");
        return None;
    }
    let (state, created) = manager.lookup_or_insert(instance, || {
        WindowState::new_dynamic(template, instance, args.clone())
    });
    if !created {
        manager.open_state(&state, args);
        return Some(state);
    }
    debug!(template, instance, "dynamic window requested");
    let template_state = manager.ensure_registered(template);
    manager.submit(
        &template_state,
        Pending::CloneTo {
            instance: instance.to_string(),
        },
    );
    Some(state)
}

/// Build the instance waiting in the registry under `instance` from the
/// loaded `template` window.
pub fn clone_instance(manager: &UiManager, template: &WindowHandle, instance: &str) {
    let Some(state) = manager.state(instance) else {
        debug!(instance, "dynamic placeholder gone before its template loaded");
        return;
    };
    if state.status() != LoadStatus::Loading(LoadPhase::AwaitingTemplate) {
        debug!(instance, "dynamic window already built");
        return;
    }
    let Some(controller) = manager.types().create(template.template_name()) else {
        let err = Error::UnknownWindowType(template.template_name().to_string());
        err.log("open_dynamic");
        manager.fail_state(&state, &err.to_string());
        return;
    };
    let mut visual = template.visual().instantiate_as(instance);
    template.with_controller(|source| manager.bridge().filter_object(source, &mut visual));
    let window = WindowHandle::new(template.template_name(), instance, controller, visual);
    {
        let mut st = state.lock();
        st.status = LoadStatus::Loading(LoadPhase::Initializing);
        st.window = Some(window.clone());
    }
    debug!(template = template.template_name(), instance, "dynamic window cloned");
    manager.init_window(&state, &window);
}
