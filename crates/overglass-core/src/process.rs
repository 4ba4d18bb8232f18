//! Target process monitoring.
//!
//! The monitor resolves a target process/window by name and title
//! pattern, republishes the result on a fixed cadence from a background
//! thread, and notifies subscribers only when the published state
//! actually changes. Resolution itself is delegated to a
//! [`ProcessResolver`] supplied by the platform crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::callback::CallbackSet;
use crate::rect::Rect;
use crate::{log_debug, log_info};

/// Lifecycle state of the watched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Process is not running (or no window matched).
    NotFound,
    /// Caller-set hint: the process is starting up.
    Starting,
    /// Process is running and resolved.
    Running,
    /// Caller-set hint: the process is shutting down.
    Terminating,
}

/// Everything known about the watched process after one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    /// Process image name (pattern, or resolved name when detected).
    pub name: String,
    /// Window title (pattern, or resolved title when detected).
    pub title: String,
    /// Process id, 0 when unresolved.
    pub process_id: u32,
    /// Raw window handle, 0 when unresolved.
    pub window: usize,
    pub state: ProcessState,
    pub has_focus: bool,
    pub is_minimized: bool,
    /// Last-known window bounds.
    pub bounds: Rect,
}

impl ProcessInfo {
    /// An unresolved record carrying only the search patterns.
    pub fn not_found(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            process_id: 0,
            window: 0,
            state: ProcessState::NotFound,
            has_focus: false,
            is_minimized: false,
            bounds: Rect::default(),
        }
    }
}

/// Platform seam: resolves the target from the live system.
///
/// Implementations must follow the resolution order: exact title match,
/// substring title match over all windows, then process-list scan by
/// image name with a window pass filtered by pid.
pub trait ProcessResolver: Send {
    /// Resolves the target. Never fails: an unmatched target is a
    /// normal [`ProcessState::NotFound`] result.
    fn resolve(&mut self, name_pattern: &str, title_pattern: &str) -> ProcessInfo;

    /// Returns whether the given window is the OS foreground window.
    fn window_has_focus(&self, window: usize) -> bool;
}

struct TargetState<R> {
    resolver: R,
    name_pattern: String,
    title_pattern: String,
    info: ProcessInfo,
}

struct Shared<R> {
    /// One mutex guards the resolver, the patterns, and the published
    /// snapshot, so foreground and background resolutions serialize.
    target: Mutex<TargetState<R>>,
    callbacks: CallbackSet<ProcessInfo>,
    running: AtomicBool,
}

impl<R: ProcessResolver> Shared<R> {
    /// Re-resolves the target and publishes the result.
    ///
    /// Notification fires only when the published {state, focus,
    /// minimized} triple differs from the previous publication.
    fn update(&self) {
        let changed = {
            let Ok(mut target) = self.target.lock() else {
                return;
            };
            let name = target.name_pattern.clone();
            let title = target.title_pattern.clone();
            let new_info = target.resolver.resolve(&name, &title);

            let changed = new_info.state != target.info.state
                || new_info.has_focus != target.info.has_focus
                || new_info.is_minimized != target.info.is_minimized;

            target.info = new_info;
            changed.then(|| target.info.clone())
        };

        // Callbacks run outside the publication lock so they may read
        // the monitor without deadlocking.
        if let Some(info) = changed {
            log_debug!(
                "target state changed: {:?} focus={} minimized={}",
                info.state,
                info.has_focus,
                info.is_minimized
            );
            self.callbacks.emit(&info);
        }
    }
}

/// Watches one target process from a background polling thread.
pub struct ProcessMonitor<R: ProcessResolver> {
    shared: Arc<Shared<R>>,
    interval: Duration,
    thread: Option<JoinHandle<()>>,
}

impl<R: ProcessResolver + 'static> ProcessMonitor<R> {
    /// Creates a monitor with no target. Polling starts with [`start`].
    ///
    /// [`start`]: ProcessMonitor::start
    pub fn new(resolver: R, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                target: Mutex::new(TargetState {
                    resolver,
                    name_pattern: String::new(),
                    title_pattern: String::new(),
                    info: ProcessInfo::not_found("", ""),
                }),
                callbacks: CallbackSet::new(),
                running: AtomicBool::new(false),
            }),
            interval,
            thread: None,
        }
    }

    /// Sets the target patterns and resolves them immediately.
    ///
    /// Either pattern may be empty, meaning "don't filter on this".
    /// The initial resolution publishes silently; change notifications
    /// start with the next [`update`](ProcessMonitor::update).
    pub fn set_target(&self, name_pattern: &str, title_pattern: &str) {
        let Ok(mut target) = self.shared.target.lock() else {
            return;
        };
        target.name_pattern = name_pattern.to_string();
        target.title_pattern = title_pattern.to_string();
        target.info = target.resolver.resolve(name_pattern, title_pattern);
        log_info!("target set: process '{name_pattern}' title '{title_pattern}'");
    }

    /// Re-resolves the target synchronously and notifies on change.
    pub fn update(&self) {
        self.shared.update();
    }

    /// Resolves arbitrary patterns without touching the published
    /// target. Serialized with the background thread by the same lock.
    pub fn find_process(&self, name_pattern: &str, title_pattern: &str) -> ProcessInfo {
        match self.shared.target.lock() {
            Ok(mut target) => target.resolver.resolve(name_pattern, title_pattern),
            Err(_) => ProcessInfo::not_found(name_pattern, title_pattern),
        }
    }

    /// Returns whether the given patterns resolve to a running process.
    pub fn is_process_running(&self, name_pattern: &str, title_pattern: &str) -> bool {
        self.find_process(name_pattern, title_pattern).state == ProcessState::Running
    }

    /// Resolves the window handle for the given patterns (0 if none).
    pub fn process_window(&self, name_pattern: &str, title_pattern: &str) -> usize {
        self.find_process(name_pattern, title_pattern).window
    }

    /// Returns whether the given window currently has OS focus.
    pub fn has_window_focus(&self, window: usize) -> bool {
        if window == 0 {
            return false;
        }
        match self.shared.target.lock() {
            Ok(target) => target.resolver.window_has_focus(window),
            Err(_) => false,
        }
    }

    /// Copy of the last published target snapshot.
    pub fn target_info(&self) -> ProcessInfo {
        self.shared
            .target
            .lock()
            .map(|t| t.info.clone())
            .unwrap_or_else(|_| ProcessInfo::not_found("", ""))
    }

    /// Overrides the published state with a caller hint
    /// (Starting/Terminating). Hints are not derived by resolution and
    /// notify like any other publication difference.
    pub fn set_state_hint(&self, state: ProcessState) {
        let changed = {
            let Ok(mut target) = self.shared.target.lock() else {
                return;
            };
            if target.info.state == state {
                None
            } else {
                target.info.state = state;
                Some(target.info.clone())
            }
        };
        if let Some(info) = changed {
            self.shared.callbacks.emit(&info);
        }
    }

    /// Registers a state-change callback; returns its id.
    pub fn register_state_callback<F>(&self, callback: F) -> u64
    where
        F: FnMut(&ProcessInfo) + Send + 'static,
    {
        self.shared.callbacks.register(callback)
    }

    /// Unregisters a state-change callback by id.
    pub fn unregister_state_callback(&self, id: u64) -> bool {
        self.shared.callbacks.unregister(id)
    }

    /// Starts the background polling thread. Idempotent.
    pub fn start(&mut self) {
        if self.thread.is_some() {
            return;
        }
        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        self.thread = Some(thread::spawn(move || {
            log_debug!("process monitor thread started");
            while shared.running.load(Ordering::SeqCst) {
                shared.update();
                thread::sleep(interval);
            }
            log_debug!("process monitor thread stopped");
        }));
    }

    /// Stops the polling thread and joins it.
    ///
    /// Blocks for at most one polling interval.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl<R: ProcessResolver> Drop for ProcessMonitor<R> {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Resolver scripted with a queue of results; repeats the last one.
    struct ScriptedResolver {
        results: Vec<ProcessInfo>,
        cursor: Arc<AtomicUsize>,
        focused: usize,
    }

    impl ScriptedResolver {
        fn new(results: Vec<ProcessInfo>) -> Self {
            Self {
                results,
                cursor: Arc::new(AtomicUsize::new(0)),
                focused: 0,
            }
        }
    }

    impl ProcessResolver for ScriptedResolver {
        fn resolve(&mut self, name: &str, title: &str) -> ProcessInfo {
            if self.results.is_empty() {
                return ProcessInfo::not_found(name, title);
            }
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            self.results[i.min(self.results.len() - 1)].clone()
        }

        fn window_has_focus(&self, window: usize) -> bool {
            window == self.focused
        }
    }

    fn running(window: usize, focus: bool, minimized: bool) -> ProcessInfo {
        ProcessInfo {
            name: "game.exe".into(),
            title: "Game".into(),
            process_id: 1234,
            window,
            state: ProcessState::Running,
            has_focus: focus,
            is_minimized: minimized,
            bounds: Rect::new(0, 0, 1920, 1080),
        }
    }

    #[test]
    fn unresolvable_target_reports_not_found() {
        let monitor = ProcessMonitor::new(ScriptedResolver::new(vec![]), Duration::from_millis(10));

        let info = monitor.find_process("notepad.exe", "");
        assert_eq!(info.state, ProcessState::NotFound);
        assert_eq!(info.window, 0);
        assert_eq!(info.process_id, 0);
        assert!(!monitor.is_process_running("notepad.exe", ""));
    }

    #[test]
    fn equal_resolutions_publish_silently() {
        let resolver = ScriptedResolver::new(vec![
            running(100, false, false),
            running(100, false, false),
            running(100, true, false),
        ]);
        let monitor = ProcessMonitor::new(resolver, Duration::from_millis(10));
        monitor.set_target("game.exe", "");

        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        monitor.register_state_callback(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });

        // Same {state, focus, minimized} as the set_target resolution.
        monitor.update();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Focus flipped.
        monitor.update();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resolution_failure_resets_to_not_found() {
        let resolver = ScriptedResolver::new(vec![
            running(100, false, false),
            ProcessInfo::not_found("game.exe", ""),
        ]);
        let monitor = ProcessMonitor::new(resolver, Duration::from_millis(10));
        monitor.set_target("game.exe", "");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        monitor.register_state_callback(move |info: &ProcessInfo| {
            s.lock().unwrap().push(info.state);
        });

        monitor.update();
        assert_eq!(monitor.target_info().state, ProcessState::NotFound);
        assert_eq!(*seen.lock().unwrap(), vec![ProcessState::NotFound]);
    }

    #[test]
    fn state_hints_are_caller_settable() {
        let monitor = ProcessMonitor::new(ScriptedResolver::new(vec![]), Duration::from_millis(10));
        monitor.set_target("game.exe", "");

        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        monitor.register_state_callback(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });

        monitor.set_state_hint(ProcessState::Starting);
        assert_eq!(monitor.target_info().state, ProcessState::Starting);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Re-setting the same hint is silent.
        monitor.set_state_hint(ProcessState::Starting);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_remaining_callback_fires_after_unregister() {
        let resolver = ScriptedResolver::new(vec![running(100, true, false)]);
        let monitor = ProcessMonitor::new(resolver, Duration::from_millis(10));
        monitor.set_target("", "");

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&first);
        let id1 = monitor.register_state_callback(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = Arc::clone(&second);
        monitor.register_state_callback(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        assert!(monitor.unregister_state_callback(id1));
        monitor.set_state_hint(ProcessState::Terminating);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn background_thread_polls_and_joins() {
        let cursor = Arc::new(AtomicUsize::new(0));
        let resolver = ScriptedResolver {
            results: vec![running(100, false, false)],
            cursor: Arc::clone(&cursor),
            focused: 0,
        };
        let mut monitor = ProcessMonitor::new(resolver, Duration::from_millis(5));
        monitor.start();
        thread::sleep(Duration::from_millis(40));
        monitor.shutdown();

        // The thread resolved at least once and has stopped.
        let polled = cursor.load(Ordering::SeqCst);
        assert!(polled >= 1);
        thread::sleep(Duration::from_millis(15));
        assert_eq!(cursor.load(Ordering::SeqCst), polled);
    }

    #[test]
    fn window_focus_predicate_asks_resolver() {
        let mut resolver = ScriptedResolver::new(vec![]);
        resolver.focused = 42;
        let monitor = ProcessMonitor::new(resolver, Duration::from_millis(10));

        assert!(monitor.has_window_focus(42));
        assert!(!monitor.has_window_focus(7));
        assert!(!monitor.has_window_focus(0));
    }
}
