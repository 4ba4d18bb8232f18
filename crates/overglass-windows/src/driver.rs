//! The host loop.
//!
//! Builds every subsystem from configuration, wires the monitoring
//! outputs into the input router and the overlay controller, and then
//! ticks: pump Win32 messages, apply monitoring updates, route input,
//! align, animate, commit. Within one tick the monitoring updates are
//! fully applied before the controller or compositor consume them.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use overglass_core::config::{self, Action, Config};
use overglass_core::focus::FocusTracker;
use overglass_core::input::InputRouter;
use overglass_core::overlay::{OverlayController, OverlayOptions};
use overglass_core::process::{ProcessInfo, ProcessMonitor, ProcessState};
use overglass_core::window_state::{WindowState, WindowStateTracker};
use overglass_core::{OverlayResult, log, log_debug, log_error, log_info};

use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, MSG, PM_REMOVE, PeekMessageW, TranslateMessage, WM_HOTKEY, WM_QUIT,
};

use crate::border::Color;
use crate::foreground::Win32Foreground;
use crate::hotkey::HotkeyManager;
use crate::monitor;
use crate::overlay_window::OverlayStack;
use crate::query::Win32WindowQuery;
use crate::resolve::Win32Resolver;

/// Host tick interval.
const TICK: Duration = Duration::from_millis(10);

/// Runs the overlay until quit is requested or the target closes
/// (when `exit_when_closed` is set).
pub fn run() -> OverlayResult<()> {
    let config = config::load();
    log::init(&config.logging);
    log_info!("Overglass started (PID: {})", std::process::id());
    log_info!(
        "Config: target('{}', '{}'), opacity={}, mode={:?}, routing={:?}",
        config.target.process,
        config.target.title,
        config.overlay.opacity,
        config.overlay.initial_mode,
        config.overlay.routing
    );

    Driver::new(&config)?.run(&config)
}

struct Driver {
    process_monitor: ProcessMonitor<Win32Resolver>,
    focus: FocusTracker<Win32Foreground>,
    windows: WindowStateTracker<Win32WindowQuery>,
    router: InputRouter,
    overlay: OverlayController<OverlayStack>,
    /// Window handle of the currently attached target, 0 when none.
    attached: usize,
    target_rx: mpsc::Receiver<ProcessInfo>,
}

impl Driver {
    fn new(config: &Config) -> OverlayResult<Self> {
        let border_color =
            Color::from_hex(&config.border.color).unwrap_or(Color { r: 0, g: 0xB4, b: 0xD8 });
        let stack = OverlayStack::new(
            config.overlay.width,
            config.overlay.height,
            border_color,
            config.border.width,
        )?;
        let options = OverlayOptions {
            opacity: config.overlay.opacity,
            fade: Duration::from_millis(config.overlay.fade_ms),
            border_fade: Duration::from_millis(config.border.fade_ms),
            edge_threshold: config.border.edge_threshold,
        };
        let mut overlay =
            OverlayController::new(stack, config.overlay.initial_mode, options);

        // Standalone placement until a target attaches.
        match monitor::centered_rect(config.overlay.width, config.overlay.height) {
            Ok(rect) => overlay.set_bounds(rect),
            Err(e) => log_error!("failed to query primary work area: {e}"),
        }

        let mut router = InputRouter::new(config.overlay.routing);
        router.set_overlay_window(overlay.handle());
        router.register_state_callback(|change| {
            log_debug!(
                "input routing: keyboard {:?} -> {:?}, mouse {:?} -> {:?}",
                change.old.keyboard,
                change.new.keyboard,
                change.old.mouse,
                change.new.mouse
            );
        });

        let process_monitor = ProcessMonitor::new(
            Win32Resolver,
            Duration::from_millis(config.target.poll_interval_ms),
        );
        let (target_tx, target_rx) = mpsc::channel::<ProcessInfo>();
        process_monitor.register_state_callback(move |info: &ProcessInfo| {
            let _ = target_tx.send(info.clone());
        });
        process_monitor.set_target(&config.target.process, &config.target.title);

        let focus = FocusTracker::new(Win32Foreground);
        focus.register_focus_callback(|sample| {
            log_debug!(
                "foreground: '{}' -> '{}'",
                sample.previous_title,
                sample.current_title
            );
        });

        Ok(Self {
            process_monitor,
            focus,
            windows: WindowStateTracker::new(Win32WindowQuery),
            router,
            overlay,
            attached: 0,
            target_rx,
        })
    }

    fn run(mut self, config: &Config) -> OverlayResult<()> {
        // Attach immediately if the initial resolution already found
        // the target, then hand polling to the background thread.
        let initial = self.process_monitor.target_info();
        if initial.state == ProcessState::Running && initial.window != 0 {
            self.attach(&initial);
        }
        self.process_monitor.start();

        let (action_tx, action_rx) = mpsc::channel::<Action>();
        let mut hotkeys = HotkeyManager::new(action_tx);
        hotkeys.register_from_config(&config.keybindings);

        if config.overlay.show_on_startup {
            self.overlay.set_visible(true, true);
        }

        let mut running = true;
        while running {
            if !pump_messages(&hotkeys) {
                break;
            }

            // Monitoring first: target transitions, focus, window
            // state. Their callbacks complete before anything below
            // consumes the state for this tick.
            let mut exit_requested = false;
            while let Ok(info) = self.target_rx.try_recv() {
                self.apply_target_change(&info, config, &mut exit_requested);
            }
            if exit_requested {
                break;
            }

            self.focus.update();
            self.windows.update();

            let cursor = Win32Foreground::cursor_position();
            self.router
                .update(self.focus.focused_window(), cursor.unwrap_or_default());

            while let Ok(action) = action_rx.try_recv() {
                match action {
                    Action::ToggleVisibility => {
                        let target = !self.overlay.is_visible();
                        self.overlay.set_visible(target, true);
                    }
                    Action::ToggleMode => self.overlay.toggle_mode(),
                    Action::Quit => running = false,
                }
            }

            // Alignment consumes the freshest tracked bounds, not the
            // monitor's last notification.
            if config.target.follow_window && self.attached != 0 {
                let mut target = self.process_monitor.target_info();
                let tracked = self.windows.window_state(self.attached);
                if tracked.state != WindowState::Invalid {
                    target.bounds = tracked.bounds;
                    target.is_minimized = tracked.state == WindowState::Minimized;
                }
                self.overlay.align_to(&target);
            }

            self.overlay.update(cursor);
            if let Err(e) = self.overlay.with_surface(|s| s.commit()) {
                log_error!("composition commit failed: {e}");
            }

            thread::sleep(TICK);
        }

        self.process_monitor.shutdown();
        log_info!("Overglass stopped");
        Ok(())
    }

    fn apply_target_change(&mut self, info: &ProcessInfo, config: &Config, exit: &mut bool) {
        match info.state {
            ProcessState::Running if info.window != 0 => {
                if self.attached != info.window {
                    self.attach(info);
                }
            }
            ProcessState::NotFound | ProcessState::Terminating => {
                if self.attached != 0 {
                    self.detach();
                    if config.target.exit_when_closed {
                        log_info!("target closed, exiting");
                        *exit = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn attach(&mut self, info: &ProcessInfo) {
        if self.attached != 0 {
            self.windows.remove_window(self.attached);
        }
        self.attached = info.window;
        self.windows.add_window(info.window);
        self.router.set_game_window(info.window);
        self.overlay.align_to(info);
        log_info!(
            "attached to '{}' (pid {}, hwnd 0x{:X})",
            info.title,
            info.process_id,
            info.window
        );
    }

    fn detach(&mut self) {
        log_info!("target window gone, detaching");
        self.windows.remove_window(self.attached);
        self.attached = 0;
        self.router.set_game_window(0);
    }
}

/// Drains the thread's message queue. Returns false on `WM_QUIT`.
fn pump_messages(hotkeys: &HotkeyManager) -> bool {
    let mut msg = MSG::default();

    // SAFETY: PeekMessageW/TranslateMessage/DispatchMessageW on the
    // current thread's queue; PM_REMOVE pops each message.
    unsafe {
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            if msg.message == WM_QUIT {
                return false;
            }
            if msg.message == WM_HOTKEY {
                hotkeys.dispatch(msg.wParam.0 as i32);
                continue;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    true
}
