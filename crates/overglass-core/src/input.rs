//! Input routing between the game and the overlay.
//!
//! The router never touches the OS. It combines the configured
//! interaction mode with the focus flags fed to it each tick, derives
//! per-device activity by a fixed table, and answers the three
//! questions a message pump asks before forwarding input: block it,
//! pass it through, or handle it.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::callback::CallbackSet;
use crate::log_debug;
use crate::rect::Point;

/// How input is divided between the game and the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// Overlay handles all input.
    Normal,
    /// Everything passes through to whatever is beneath.
    Passthrough,
    /// All input is swallowed.
    Blocked,
    /// The game gets input while it holds focus.
    GameFocused,
    /// The overlay gets input only while it holds focus.
    OverlayFocused,
}

/// Activity of one input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// The overlay consumes this device.
    Active,
    /// This device passes through to the window beneath.
    Inactive,
    /// This device is swallowed entirely.
    Blocked,
}

/// Derives keyboard and mouse activity from mode and focus flags.
///
/// This is the whole decision table; the first matching row wins and
/// the modes are evaluated exclusively, never combined.
pub fn derive_states(
    mode: InputMode,
    game_has_focus: bool,
    overlay_has_focus: bool,
) -> (DeviceState, DeviceState) {
    let both = |s: DeviceState| (s, s);
    match mode {
        InputMode::Normal => both(DeviceState::Active),
        InputMode::Passthrough => both(DeviceState::Inactive),
        InputMode::Blocked => both(DeviceState::Blocked),
        InputMode::GameFocused if game_has_focus => both(DeviceState::Inactive),
        InputMode::GameFocused => both(DeviceState::Active),
        InputMode::OverlayFocused if overlay_has_focus => both(DeviceState::Active),
        InputMode::OverlayFocused => both(DeviceState::Inactive),
    }
}

/// Full routing state: the mode, the derived device states, and the
/// inputs they were derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRoutingState {
    pub mode: InputMode,
    pub keyboard: DeviceState,
    pub mouse: DeviceState,
    pub game_has_focus: bool,
    pub overlay_has_focus: bool,
    pub cursor: Point,
    pub timestamp: Instant,
}

/// Old/new pair delivered to routing-change callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct InputStateChange {
    pub old: InputRoutingState,
    pub new: InputRoutingState,
}

/// The input routing state machine.
pub struct InputRouter {
    game_window: usize,
    overlay_window: usize,
    last_focused: usize,
    state: InputRoutingState,
    callbacks: CallbackSet<InputStateChange>,
}

impl InputRouter {
    pub fn new(mode: InputMode) -> Self {
        let (keyboard, mouse) = derive_states(mode, false, false);
        Self {
            game_window: 0,
            overlay_window: 0,
            last_focused: 0,
            state: InputRoutingState {
                mode,
                keyboard,
                mouse,
                game_has_focus: false,
                overlay_has_focus: false,
                cursor: Point::default(),
                timestamp: Instant::now(),
            },
            callbacks: CallbackSet::new(),
        }
    }

    /// Current routing state snapshot.
    pub fn state(&self) -> InputRoutingState {
        self.state.clone()
    }

    pub fn mode(&self) -> InputMode {
        self.state.mode
    }

    /// Switches the interaction mode and re-derives immediately.
    pub fn set_mode(&mut self, mode: InputMode) {
        if self.state.mode == mode {
            return;
        }
        let old = self.state.clone();
        self.state.mode = mode;
        self.rederive();
        log_debug!("input mode set to {mode:?}");
        self.notify_if_changed(&old);
    }

    /// Sets the game window handle and re-derives against the last
    /// known focused window.
    pub fn set_game_window(&mut self, window: usize) {
        if self.game_window == window {
            return;
        }
        self.game_window = window;
        let old = self.state.clone();
        self.refresh_focus_flags();
        self.rederive();
        self.notify_if_changed(&old);
    }

    /// Sets the overlay window handle and re-derives against the last
    /// known focused window.
    pub fn set_overlay_window(&mut self, window: usize) {
        if self.overlay_window == window {
            return;
        }
        self.overlay_window = window;
        let old = self.state.clone();
        self.refresh_focus_flags();
        self.rederive();
        self.notify_if_changed(&old);
    }

    /// Feeds the current focus sample and cursor position, re-derives,
    /// and notifies if any observed component changed.
    pub fn update(&mut self, focused_window: usize, cursor: Point) {
        let old = self.state.clone();
        self.last_focused = focused_window;
        self.refresh_focus_flags();
        self.rederive();
        self.state.cursor = cursor;
        self.state.timestamp = Instant::now();
        self.notify_if_changed(&old);
    }

    /// True only when a device is strictly blocked, independent of
    /// mode-derived passthrough.
    pub fn should_block_input(&self) -> bool {
        self.state.keyboard == DeviceState::Blocked || self.state.mouse == DeviceState::Blocked
    }

    /// True when mouse input should fall through to the window
    /// beneath. Blocked is never passed through.
    pub fn should_passthrough_mouse(&self) -> bool {
        self.state.mouse == DeviceState::Inactive
    }

    /// True when keyboard input should fall through to the window
    /// beneath. Blocked is never passed through.
    pub fn should_passthrough_keyboard(&self) -> bool {
        self.state.keyboard == DeviceState::Inactive
    }

    /// Registers a routing-change callback; returns its id.
    pub fn register_state_callback<F>(&self, callback: F) -> u64
    where
        F: FnMut(&InputStateChange) + Send + 'static,
    {
        self.callbacks.register(callback)
    }

    /// Unregisters a routing-change callback by id.
    pub fn unregister_state_callback(&self, id: u64) -> bool {
        self.callbacks.unregister(id)
    }

    fn refresh_focus_flags(&mut self) {
        self.state.game_has_focus =
            self.game_window != 0 && self.last_focused == self.game_window;
        self.state.overlay_has_focus =
            self.overlay_window != 0 && self.last_focused == self.overlay_window;
    }

    fn rederive(&mut self) {
        let (keyboard, mouse) = derive_states(
            self.state.mode,
            self.state.game_has_focus,
            self.state.overlay_has_focus,
        );
        self.state.keyboard = keyboard;
        self.state.mouse = mouse;
    }

    fn notify_if_changed(&self, old: &InputRoutingState) {
        let new = &self.state;
        let changed = old.mode != new.mode
            || old.keyboard != new.keyboard
            || old.mouse != new.mouse
            || old.game_has_focus != new.game_has_focus
            || old.overlay_has_focus != new.overlay_has_focus;
        if changed {
            self.callbacks.emit(&InputStateChange {
                old: old.clone(),
                new: new.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use DeviceState::{Active, Blocked, Inactive};
    use InputMode::{GameFocused, Normal, OverlayFocused, Passthrough};

    #[test]
    fn derivation_table_is_exhaustive() {
        // (mode, game focus, overlay focus) -> (keyboard, mouse)
        let cases = [
            (Normal, false, false, Active, Active),
            (Passthrough, false, false, Inactive, Inactive),
            (InputMode::Blocked, false, false, Blocked, Blocked),
            (GameFocused, true, false, Inactive, Inactive),
            (GameFocused, false, false, Active, Active),
            (OverlayFocused, false, true, Active, Active),
            (OverlayFocused, false, false, Inactive, Inactive),
        ];
        for (mode, game, overlay, keyboard, mouse) in cases {
            assert_eq!(
                derive_states(mode, game, overlay),
                (keyboard, mouse),
                "mode={mode:?} game={game} overlay={overlay}"
            );
        }
    }

    #[test]
    fn game_focused_with_focus_passes_input_to_game() {
        let mut router = InputRouter::new(GameFocused);
        router.set_game_window(100);
        router.update(100, Point::default());

        let state = router.state();
        assert_eq!(state.keyboard, Inactive);
        assert_eq!(state.mouse, Inactive);
        assert!(router.should_passthrough_keyboard());
        assert!(router.should_passthrough_mouse());
        assert!(!router.should_block_input());
    }

    #[test]
    fn game_focused_without_focus_activates_overlay() {
        let mut router = InputRouter::new(GameFocused);
        router.set_game_window(100);
        router.update(200, Point::default());

        assert_eq!(router.state().keyboard, Active);
        assert!(!router.should_passthrough_keyboard());
    }

    #[test]
    fn blocked_is_never_passed_through() {
        let mut router = InputRouter::new(InputMode::Blocked);
        router.update(100, Point::default());

        assert!(router.should_block_input());
        assert!(!router.should_passthrough_mouse());
        assert!(!router.should_passthrough_keyboard());
    }

    #[test]
    fn mode_change_notifies_with_old_and_new() {
        let mut router = InputRouter::new(Normal);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        router.register_state_callback(move |change: &InputStateChange| {
            s.lock()
                .unwrap()
                .push((change.old.mode, change.new.mode, change.new.keyboard));
        });

        router.set_mode(Passthrough);
        router.set_mode(Passthrough); // same mode: silent

        assert_eq!(*seen.lock().unwrap(), vec![(Normal, Passthrough, Inactive)]);
    }

    #[test]
    fn focus_flip_under_game_focused_notifies() {
        let mut router = InputRouter::new(GameFocused);
        router.set_game_window(100);
        router.set_overlay_window(200);

        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        router.register_state_callback(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });

        router.update(100, Point::default()); // game takes focus
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        router.update(100, Point::new(5, 5)); // cursor only: silent
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        router.update(200, Point::default()); // overlay takes focus
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(router.state().overlay_has_focus);
        assert!(!router.state().game_has_focus);
    }

    #[test]
    fn clearing_game_window_drops_its_focus_flag() {
        let mut router = InputRouter::new(GameFocused);
        router.set_game_window(100);
        router.update(100, Point::default());
        assert!(router.state().game_has_focus);

        router.set_game_window(0);
        assert!(!router.state().game_has_focus);
        assert_eq!(router.state().keyboard, Active);
    }

    #[test]
    fn overlay_focused_tracks_overlay_only() {
        let mut router = InputRouter::new(OverlayFocused);
        router.set_overlay_window(200);

        router.update(200, Point::default());
        assert_eq!(router.state().keyboard, Active);

        router.update(100, Point::default());
        assert_eq!(router.state().keyboard, Inactive);
        assert!(router.should_passthrough_keyboard());
    }

    #[test]
    fn cursor_and_timestamp_update_without_notification() {
        let mut router = InputRouter::new(Normal);
        router.update(0, Point::new(10, 20));
        assert_eq!(router.state().cursor, Point::new(10, 20));
    }
}
