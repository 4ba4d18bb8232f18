pub mod animation;
pub mod callback;
pub mod compositor;
pub mod config;
pub mod focus;
pub mod input;
pub mod log;
pub mod overlay;
pub mod process;
pub mod rect;
pub mod window_state;

pub use animation::AnimationManager;
pub use callback::CallbackSet;
pub use compositor::{Compose, LayerKind, ZOrderManager};
pub use focus::{FocusSample, FocusTracker, ForegroundSource};
pub use input::{DeviceState, InputMode, InputRouter, InputRoutingState};
pub use overlay::{OverlayController, OverlayMode, OverlayOptions, OverlaySurface, Visibility};
pub use process::{ProcessInfo, ProcessMonitor, ProcessResolver, ProcessState};
pub use rect::{Point, Rect};
pub use window_state::{WindowQuery, WindowState, WindowStateInfo, WindowStateTracker};

/// A boxed error type for overlay operations.
///
/// Any error type that implements the `Error` trait can be boxed into
/// this. Platform crates convert their native error types at the seam.
pub type OverlayResult<T> = Result<T, Box<dyn std::error::Error>>;
