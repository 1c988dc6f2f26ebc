//! uiwin-core: window lifecycle manager.
//!
//! Windows are loaded asynchronously from a bundle (manifest, dependencies,
//! then the window's own resource), deduplicated by name, and driven through
//! an open/close state machine. Static windows are singletons that survive
//! close; dynamic windows are independent clones of a loaded template that are
//! destroyed on close.
//!
//! ```no_run
//! use std::sync::Arc;
//! use uiwin_core::{UiManager, WindowController, test_support::MockLoader};
//!
//! struct KUILogin;
//! impl WindowController for KUILogin {}
//!
//! # async fn demo() {
//! let loader = Arc::new(MockLoader::new());
//! loader.add_window("Login", &["common/atlas"]);
//! let ui = UiManager::builder(loader).window_type(|| KUILogin).build();
//! ui.open("Login", vec![]);
//! # }
//! ```
//!
//! Operations never return errors: misuse is logged at `error`, harmless
//! no-ops at `warn`, and load failures are also reported as
//! [`WindowEvent::LoadFailed`].

mod asset;
mod bridge;
mod controller;
mod dynamic;
mod error;
mod events;
mod load_task;
mod manager;
mod manifest;
mod registry;
mod state;
pub mod test_support;
mod types;
mod window;

pub use asset::{Asset, AssetLoader, ResourceHandle};
pub use bridge::{PassthroughBridge, UiBridge, Visual};
pub use controller::{Args, AsAny, OpenGate, WindowController, WindowInfo};
pub use error::{Error, ErrorKind, LoadError, Result};
pub use events::WindowEvent;
pub use manager::{UiManager, UiManagerBuilder};
pub use manifest::Manifest;
pub use state::{Callback, LoadPhase, LoadStatus, WindowState};
pub use types::{ControllerFactory, WindowTypes, short_type_name};
pub use uiwin_config::{NameConvention, UiConfig};
pub use window::WindowHandle;
