//! Per-window state tracking.
//!
//! Tracks an explicit set of window handles and publishes old/new
//! record pairs when a tracked window's {state, focus, bounds, topmost}
//! change. Removal is the only way to stop tracking; handles that stop
//! answering queries demote to [`WindowState::Invalid`] rather than
//! disappearing.

use std::collections::BTreeMap;

use crate::callback::CallbackSet;
use crate::log_debug;
use crate::rect::Rect;

/// Display state of a tracked window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Normal,
    Minimized,
    Maximized,
    Hidden,
    /// The handle no longer names a live window.
    Invalid,
}

/// Snapshot of one tracked window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStateInfo {
    pub handle: usize,
    pub title: String,
    pub state: WindowState,
    pub bounds: Rect,
    pub has_focus: bool,
    pub process_id: u32,
    pub is_topmost: bool,
}

impl WindowStateInfo {
    /// An invalid record for a handle that cannot be queried.
    pub fn invalid(handle: usize) -> Self {
        Self {
            handle,
            title: String::new(),
            state: WindowState::Invalid,
            bounds: Rect::default(),
            has_focus: false,
            process_id: 0,
            is_topmost: false,
        }
    }
}

/// Platform seam: samples live window state.
pub trait WindowQuery {
    /// Queries the current state of a window. Returns an
    /// [`WindowStateInfo::invalid`] record when the handle is dead.
    fn query(&self, handle: usize) -> WindowStateInfo;
}

/// Old/new pair delivered to state-change callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStateChange {
    pub old: WindowStateInfo,
    pub new: WindowStateInfo,
}

/// Tracks explicit window handles and reports diffs.
pub struct WindowStateTracker<Q: WindowQuery> {
    query: Q,
    windows: BTreeMap<usize, WindowStateInfo>,
    callbacks: CallbackSet<WindowStateChange>,
}

impl<Q: WindowQuery> WindowStateTracker<Q> {
    pub fn new(query: Q) -> Self {
        Self {
            query,
            windows: BTreeMap::new(),
            callbacks: CallbackSet::new(),
        }
    }

    /// Starts tracking a handle. Returns false for the null handle, a
    /// dead window, or a handle already tracked.
    pub fn add_window(&mut self, handle: usize) -> bool {
        if handle == 0 || self.windows.contains_key(&handle) {
            return false;
        }
        let info = self.query.query(handle);
        if info.state == WindowState::Invalid {
            return false;
        }
        log_debug!("tracking window '{}' (0x{handle:X})", info.title);
        self.windows.insert(handle, info);
        true
    }

    /// Stops tracking a handle. Returns whether it was tracked.
    pub fn remove_window(&mut self, handle: usize) -> bool {
        let removed = self.windows.remove(&handle).is_some();
        if removed {
            log_debug!("untracking window 0x{handle:X}");
        }
        removed
    }

    /// Returns whether the handle is currently tracked.
    pub fn is_tracked(&self, handle: usize) -> bool {
        self.windows.contains_key(&handle)
    }

    /// Last-known record for a handle; an invalid record if untracked.
    pub fn window_state(&self, handle: usize) -> WindowStateInfo {
        self.windows
            .get(&handle)
            .cloned()
            .unwrap_or_else(|| WindowStateInfo::invalid(handle))
    }

    /// Number of tracked windows.
    pub fn tracked_count(&self) -> usize {
        self.windows.len()
    }

    /// Re-queries every tracked handle and notifies on difference.
    ///
    /// A change callback fires iff at least one of {state, focus,
    /// bounds, topmost} differs from the previous record; equal records
    /// never notify.
    pub fn update(&mut self) {
        let handles: Vec<usize> = self.windows.keys().copied().collect();
        for handle in handles {
            let new = self.query.query(handle);
            let Some(old) = self.windows.get(&handle) else {
                continue;
            };

            let changed = old.state != new.state
                || old.has_focus != new.has_focus
                || old.bounds != new.bounds
                || old.is_topmost != new.is_topmost;
            if !changed {
                continue;
            }

            let change = WindowStateChange {
                old: old.clone(),
                new: new.clone(),
            };
            self.windows.insert(handle, new);
            self.callbacks.emit(&change);
        }
    }

    /// Registers a state-change callback; returns its id.
    pub fn register_state_callback<F>(&self, callback: F) -> u64
    where
        F: FnMut(&WindowStateChange) + Send + 'static,
    {
        self.callbacks.register(callback)
    }

    /// Unregisters a state-change callback by id.
    pub fn unregister_state_callback(&self, id: u64) -> bool {
        self.callbacks.unregister(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeQuery {
        states: Arc<Mutex<HashMap<usize, WindowStateInfo>>>,
    }

    impl FakeQuery {
        fn set(&self, handle: usize, info: WindowStateInfo) {
            self.states.lock().unwrap().insert(handle, info);
        }

        fn kill(&self, handle: usize) {
            self.states.lock().unwrap().remove(&handle);
        }
    }

    impl WindowQuery for FakeQuery {
        fn query(&self, handle: usize) -> WindowStateInfo {
            self.states
                .lock()
                .unwrap()
                .get(&handle)
                .cloned()
                .unwrap_or_else(|| WindowStateInfo::invalid(handle))
        }
    }

    fn normal(handle: usize) -> WindowStateInfo {
        WindowStateInfo {
            handle,
            title: "Game".into(),
            state: WindowState::Normal,
            bounds: Rect::new(0, 0, 800, 600),
            has_focus: false,
            process_id: 10,
            is_topmost: false,
        }
    }

    #[test]
    fn add_rejects_null_dead_and_duplicate_handles() {
        let query = FakeQuery::default();
        query.set(100, normal(100));
        let mut tracker = WindowStateTracker::new(query);

        assert!(!tracker.add_window(0));
        assert!(!tracker.add_window(999));
        assert!(tracker.add_window(100));
        assert!(!tracker.add_window(100));
        assert_eq!(tracker.tracked_count(), 1);
    }

    #[test]
    fn change_fires_iff_observed_fields_differ() {
        let query = FakeQuery::default();
        query.set(100, normal(100));
        let mut tracker = WindowStateTracker::new(query.clone());
        tracker.add_window(100);

        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        tracker.register_state_callback(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });

        // Identical record: silent.
        tracker.update();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Title-only change: still silent.
        let mut retitled = normal(100);
        retitled.title = "Game - Level 2".into();
        query.set(100, retitled);
        tracker.update();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Bounds change: fires.
        let mut moved = normal(100);
        moved.bounds = Rect::new(10, 10, 800, 600);
        query.set(100, moved);
        tracker.update();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Focus change: fires.
        let mut focused = normal(100);
        focused.bounds = Rect::new(10, 10, 800, 600);
        focused.has_focus = true;
        query.set(100, focused);
        tracker.update();
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        // Topmost change: fires.
        let mut topmost = normal(100);
        topmost.bounds = Rect::new(10, 10, 800, 600);
        topmost.has_focus = true;
        topmost.is_topmost = true;
        query.set(100, topmost.clone());
        tracker.update();
        assert_eq!(fired.load(Ordering::SeqCst), 3);

        // State change: fires.
        let mut minimized = topmost.clone();
        minimized.state = WindowState::Minimized;
        query.set(100, minimized);
        tracker.update();
        assert_eq!(fired.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn change_carries_old_and_new_records() {
        let query = FakeQuery::default();
        query.set(100, normal(100));
        let mut tracker = WindowStateTracker::new(query.clone());
        tracker.add_window(100);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        tracker.register_state_callback(move |change: &WindowStateChange| {
            s.lock().unwrap().push((change.old.state, change.new.state));
        });

        let mut maximized = normal(100);
        maximized.state = WindowState::Maximized;
        query.set(100, maximized);
        tracker.update();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(WindowState::Normal, WindowState::Maximized)]
        );
    }

    #[test]
    fn dead_handle_demotes_to_invalid_once() {
        let query = FakeQuery::default();
        query.set(100, normal(100));
        let mut tracker = WindowStateTracker::new(query.clone());
        tracker.add_window(100);

        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        tracker.register_state_callback(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });

        query.kill(100);
        tracker.update();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.window_state(100).state, WindowState::Invalid);
        assert!(tracker.is_tracked(100));

        // Still dead: no further notification.
        tracker.update();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removal_is_the_only_eviction() {
        let query = FakeQuery::default();
        query.set(100, normal(100));
        let mut tracker = WindowStateTracker::new(query.clone());
        tracker.add_window(100);

        query.kill(100);
        tracker.update();
        assert!(tracker.is_tracked(100));

        assert!(tracker.remove_window(100));
        assert!(!tracker.is_tracked(100));
        assert!(!tracker.remove_window(100));
        assert_eq!(tracker.window_state(100).state, WindowState::Invalid);
    }

    #[test]
    fn only_second_callback_fires_after_unregister() {
        let query = FakeQuery::default();
        query.set(100, normal(100));
        let mut tracker = WindowStateTracker::new(query.clone());
        tracker.add_window(100);

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&first);
        let id1 = tracker.register_state_callback(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = Arc::clone(&second);
        tracker.register_state_callback(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        assert!(tracker.unregister_state_callback(id1));

        let mut focused = normal(100);
        focused.has_focus = true;
        query.set(100, focused);
        tracker.update();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
