//! The overlay alignment and mode controller.
//!
//! Owns what the overlay window *should* look like (bounds, opacity,
//! interactive/click-through mode, visibility) and reconciles that
//! against the platform surface each cycle. Opacity and border
//! transitions run through the animation engine under the reserved
//! names `"opacity"` and `"border"`; creating either again replaces
//! the in-flight run, which is what makes a second `set_visible`
//! arriving mid-fade safe.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::OverlayResult;
use crate::animation::AnimationManager;
use crate::process::{ProcessInfo, ProcessState};
use crate::rect::{Point, Rect};
use crate::{log_error, log_info};

/// Reserved animation name for opacity fades.
const OPACITY_ANIM: &str = "opacity";
/// Reserved animation name for the border highlight fade.
const BORDER_ANIM: &str = "border";
/// Below this opacity a hiding overlay is taken off screen.
const HIDE_EPSILON: f32 = 0.01;

/// Whether the overlay takes pointer input or lets it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayMode {
    Interactive,
    ClickThrough,
}

/// Visibility lifecycle, with the fade phases explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    /// Fading in; the platform window is already shown.
    Showing,
    Visible,
    /// Fading out; the platform window hides below [`HIDE_EPSILON`].
    Hiding,
}

/// Platform seam: the concrete overlay window and its layer stack.
pub trait OverlaySurface {
    /// Moves and resizes the platform window.
    fn move_resize(&mut self, bounds: Rect) -> OverlayResult<()>;

    /// Flips the platform click-through flag.
    fn set_click_through(&mut self, enabled: bool) -> OverlayResult<()>;

    /// Applies whole-overlay opacity and reflects it to the compositor.
    fn set_opacity(&mut self, opacity: f32) -> OverlayResult<()>;

    /// Applies the border highlight level in [0, 1].
    fn set_border_level(&mut self, level: f32) -> OverlayResult<()>;

    /// Shows the platform window without activating it.
    fn show(&mut self) -> OverlayResult<()>;

    /// Hides the platform window.
    fn hide(&mut self) -> OverlayResult<()>;

    /// Raw window handle for focus comparisons.
    fn handle(&self) -> usize;
}

/// Controller tuning, taken from configuration at construction.
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// Target opacity when fully visible.
    pub opacity: f32,
    /// Opacity fade duration.
    pub fade: Duration,
    /// Border highlight fade duration.
    pub border_fade: Duration,
    /// Cursor distance to an edge that lights the border.
    pub edge_threshold: i32,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            opacity: 0.9,
            fade: Duration::from_millis(300),
            border_fade: Duration::from_millis(200),
            edge_threshold: 10,
        }
    }
}

/// State the animation callbacks write from inside the engine.
struct Shared<S> {
    surface: S,
    opacity: f32,
    border_level: f32,
    visibility: Visibility,
}

impl<S: OverlaySurface> Shared<S> {
    fn apply_opacity(&mut self, value: f32) {
        self.opacity = value;
        if let Err(e) = self.surface.set_opacity(value) {
            log_error!("failed to apply opacity: {e}");
        }
    }

    fn apply_border(&mut self, level: f32) {
        self.border_level = level;
        if let Err(e) = self.surface.set_border_level(level) {
            log_error!("failed to apply border level: {e}");
        }
    }

    fn platform_hide(&mut self) {
        if let Err(e) = self.surface.hide() {
            log_error!("failed to hide overlay: {e}");
        }
        self.visibility = Visibility::Hidden;
    }
}

/// Keeps the overlay aligned, faded, and in the right input mode.
pub struct OverlayController<S: OverlaySurface + 'static> {
    shared: Rc<RefCell<Shared<S>>>,
    animations: AnimationManager,
    mode: OverlayMode,
    bounds: Rect,
    options: OverlayOptions,
    border_lit: bool,
}

impl<S: OverlaySurface + 'static> OverlayController<S> {
    /// Wraps a surface. The overlay starts hidden at opacity 0 with
    /// the platform click-through flag matching `mode`.
    pub fn new(mut surface: S, mode: OverlayMode, options: OverlayOptions) -> Self {
        if let Err(e) = surface.set_click_through(mode == OverlayMode::ClickThrough) {
            log_error!("failed to apply initial mode: {e}");
        }
        Self {
            shared: Rc::new(RefCell::new(Shared {
                surface,
                opacity: 0.0,
                border_level: 0.0,
                visibility: Visibility::Hidden,
            })),
            animations: AnimationManager::new(),
            mode,
            bounds: Rect::default(),
            options,
            border_lit: false,
        }
    }

    /// Raw handle of the platform window.
    pub fn handle(&self) -> usize {
        self.shared.borrow().surface.handle()
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    /// Switches interaction mode. A no-op when unchanged; on a real
    /// change only the platform click-through flag is touched.
    pub fn set_mode(&mut self, mode: OverlayMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        let mut shared = self.shared.borrow_mut();
        if let Err(e) = shared
            .surface
            .set_click_through(mode == OverlayMode::ClickThrough)
        {
            log_error!("failed to switch overlay mode: {e}");
        }
        log_info!("overlay mode set to {mode:?}");
    }

    pub fn toggle_mode(&mut self) {
        let next = match self.mode {
            OverlayMode::Interactive => OverlayMode::ClickThrough,
            OverlayMode::ClickThrough => OverlayMode::Interactive,
        };
        self.set_mode(next);
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Moves/resizes the platform window, but only when the requested
    /// bounds differ from the cached bounds at the pixel level.
    pub fn set_bounds(&mut self, bounds: Rect) {
        if self.bounds == bounds {
            return;
        }
        let mut shared = self.shared.borrow_mut();
        match shared.surface.move_resize(bounds) {
            Ok(()) => self.bounds = bounds,
            // Cache keeps the old bounds so the move retries next cycle.
            Err(e) => log_error!("failed to move overlay: {e}"),
        }
    }

    pub fn opacity(&self) -> f32 {
        self.shared.borrow().opacity
    }

    pub fn visibility(&self) -> Visibility {
        self.shared.borrow().visibility
    }

    /// Whether the overlay is logically visible (shown or fading in).
    pub fn is_visible(&self) -> bool {
        matches!(
            self.shared.borrow().visibility,
            Visibility::Visible | Visibility::Showing
        )
    }

    /// Sets opacity directly or as a fade to `value`.
    pub fn set_opacity(&mut self, value: f32, animate: bool) {
        let value = value.clamp(0.0, 1.0);
        if !animate {
            self.animations.stop(OPACITY_ANIM);
            self.shared.borrow_mut().apply_opacity(value);
            return;
        }
        let from = self.shared.borrow().opacity;
        let shared = Rc::clone(&self.shared);
        self.animations
            .create(OPACITY_ANIM, self.options.fade, from, value, move |v| {
                shared.borrow_mut().apply_opacity(v);
            });
        self.animations.start(OPACITY_ANIM);
    }

    /// Shows or hides the overlay, optionally through an opacity fade.
    ///
    /// A new call always replaces an in-flight fade. When showing, the
    /// platform window appears immediately and fades up; when hiding,
    /// the window stays shown until opacity drops below
    /// [`HIDE_EPSILON`], which is what prevents the pop to fully
    /// transparent before the hide lands.
    pub fn set_visible(&mut self, visible: bool, animate: bool) {
        self.set_visible_at(visible, animate, Instant::now());
    }

    /// [`set_visible`](OverlayController::set_visible) with an explicit
    /// clock for synthetic timelines.
    pub fn set_visible_at(&mut self, visible: bool, animate: bool, now: Instant) {
        if self.is_visible() == visible {
            return;
        }

        if !animate {
            self.animations.stop(OPACITY_ANIM);
            let target = if visible { self.options.opacity } else { 0.0 };
            let mut shared = self.shared.borrow_mut();
            if visible {
                if let Err(e) = shared.surface.show() {
                    log_error!("failed to show overlay: {e}");
                }
                shared.visibility = Visibility::Visible;
            } else {
                shared.platform_hide();
            }
            shared.apply_opacity(target);
            log_info!("overlay visibility set to {visible}");
            return;
        }

        let from = self.shared.borrow().opacity;
        if visible {
            {
                let mut shared = self.shared.borrow_mut();
                if let Err(e) = shared.surface.show() {
                    log_error!("failed to show overlay: {e}");
                }
                shared.visibility = Visibility::Showing;
            }
            let shared = Rc::clone(&self.shared);
            self.animations.create(
                OPACITY_ANIM,
                self.options.fade,
                from,
                self.options.opacity,
                move |v| {
                    shared.borrow_mut().apply_opacity(v);
                },
            );
            let shared = Rc::clone(&self.shared);
            self.animations.on_complete(OPACITY_ANIM, move || {
                shared.borrow_mut().visibility = Visibility::Visible;
            });
        } else {
            self.shared.borrow_mut().visibility = Visibility::Hiding;
            let shared = Rc::clone(&self.shared);
            self.animations
                .create(OPACITY_ANIM, self.options.fade, from, 0.0, move |v| {
                    let mut shared = shared.borrow_mut();
                    shared.apply_opacity(v);
                    // The platform hide waits for the fade to cross the
                    // threshold; hiding at call time would pop.
                    if v < HIDE_EPSILON && shared.visibility == Visibility::Hiding {
                        shared.platform_hide();
                    }
                });
            let shared = Rc::clone(&self.shared);
            self.animations.on_complete(OPACITY_ANIM, move || {
                let mut shared = shared.borrow_mut();
                if shared.visibility == Visibility::Hiding {
                    shared.platform_hide();
                }
            });
        }
        self.animations.start_at(OPACITY_ANIM, now);
        log_info!("overlay visibility fading to {visible}");
    }

    /// Reconciles overlay bounds with the target window.
    ///
    /// Skips entirely unless the target is running with a window.
    /// While the target is minimized the overlay bounds are frozen,
    /// not hidden, which avoids flicker on restore. An unchanged
    /// target rectangle issues no platform call.
    pub fn align_to(&mut self, target: &ProcessInfo) {
        if target.state != ProcessState::Running || target.window == 0 {
            return;
        }
        if target.is_minimized {
            return;
        }
        self.set_bounds(target.bounds);
    }

    /// Advances animations and the border highlight for this tick.
    pub fn update(&mut self, cursor: Option<Point>) {
        self.update_at(Instant::now(), cursor);
    }

    /// [`update`](OverlayController::update) with an explicit clock.
    pub fn update_at(&mut self, now: Instant, cursor: Option<Point>) {
        self.animations.update_at(now);

        let lit = cursor.is_some_and(|p| {
            self.bounds.contains(p) && self.bounds.edge_distance(p) <= self.options.edge_threshold
        });
        if lit != self.border_lit {
            self.border_lit = lit;
            let from = self.shared.borrow().border_level;
            let to = if lit { 1.0 } else { 0.0 };
            let shared = Rc::clone(&self.shared);
            self.animations
                .create(BORDER_ANIM, self.options.border_fade, from, to, move |v| {
                    shared.borrow_mut().apply_border(v);
                });
            self.animations.start_at(BORDER_ANIM, now);
        }
    }

    /// Runs a closure against the platform surface, for host-side
    /// plumbing such as composition commits and content frames.
    pub fn with_surface<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.shared.borrow_mut().surface)
    }

    /// Current border highlight level in [0, 1].
    pub fn border_level(&self) -> f32 {
        self.shared.borrow().border_level
    }

    /// Whether an opacity fade is currently in flight.
    pub fn fading(&self) -> bool {
        self.animations.is_running(OPACITY_ANIM)
    }
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod overlay_tests;
