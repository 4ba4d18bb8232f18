//! OS foreground-focus tracking.
//!
//! One sample per actual focus transition: `update` compares the
//! current foreground window against the last sample and produces a
//! before/after pair only when they differ, so subscribers never need
//! their own history to answer "did focus move away from window X".

use std::time::Instant;

use crate::callback::CallbackSet;
use crate::log_debug;

/// Platform seam: answers foreground and window-metadata queries.
pub trait ForegroundSource {
    /// The current OS foreground window, 0 when none.
    fn foreground_window(&self) -> usize;

    /// Title and owning process id for a window; `None` when the
    /// handle is no longer valid.
    fn window_info(&self, window: usize) -> Option<(String, u32)>;
}

/// A focus transition between two windows.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusSample {
    pub previous: usize,
    pub current: usize,
    pub previous_title: String,
    pub current_title: String,
    pub previous_pid: u32,
    pub current_pid: u32,
    pub timestamp: Instant,
}

impl FocusSample {
    fn empty() -> Self {
        Self {
            previous: 0,
            current: 0,
            previous_title: String::new(),
            current_title: String::new(),
            previous_pid: 0,
            current_pid: 0,
            timestamp: Instant::now(),
        }
    }
}

/// Polls the foreground window and reports transitions.
pub struct FocusTracker<S: ForegroundSource> {
    source: S,
    last: FocusSample,
    callbacks: CallbackSet<FocusSample>,
}

impl<S: ForegroundSource> FocusTracker<S> {
    /// Creates a tracker seeded with the current foreground window.
    ///
    /// The seed sample is stored silently; notifications begin with
    /// the first transition seen by [`update`](FocusTracker::update).
    pub fn new(source: S) -> Self {
        let mut last = FocusSample::empty();
        last.current = source.foreground_window();
        if let Some((title, pid)) = source.window_info(last.current) {
            last.current_title = title;
            last.current_pid = pid;
        }
        Self {
            source,
            last,
            callbacks: CallbackSet::new(),
        }
    }

    /// Samples the foreground window; emits and returns the transition
    /// if it differs from the last sample.
    pub fn update(&mut self) -> Option<FocusSample> {
        let current = self.source.foreground_window();
        if current == self.last.current {
            return None;
        }

        let (title, pid) = self.source.window_info(current).unwrap_or_default();
        let sample = FocusSample {
            previous: self.last.current,
            current,
            previous_title: std::mem::take(&mut self.last.current_title),
            current_title: title,
            previous_pid: self.last.current_pid,
            current_pid: pid,
            timestamp: Instant::now(),
        };
        self.last = sample.clone();

        log_debug!(
            "focus changed from '{}' to '{}'",
            sample.previous_title,
            sample.current_title
        );
        self.callbacks.emit(&sample);
        Some(sample)
    }

    /// The window holding focus as of the last sample.
    pub fn focused_window(&self) -> usize {
        self.last.current
    }

    /// Title of the focused window as of the last sample.
    pub fn focused_title(&self) -> &str {
        &self.last.current_title
    }

    /// Process id of the focused window as of the last sample.
    pub fn focused_process_id(&self) -> u32 {
        self.last.current_pid
    }

    /// Whether the given window held focus as of the last sample.
    pub fn has_focus(&self, window: usize) -> bool {
        window != 0 && self.last.current == window
    }

    /// Whether any window of the given process held focus as of the
    /// last sample.
    pub fn has_process_focus(&self, pid: u32) -> bool {
        pid != 0 && self.last.current_pid == pid
    }

    /// Registers a focus-change callback; returns its id.
    pub fn register_focus_callback<F>(&self, callback: F) -> u64
    where
        F: FnMut(&FocusSample) + Send + 'static,
    {
        self.callbacks.register(callback)
    }

    /// Unregisters a focus-change callback by id.
    pub fn unregister_focus_callback(&self, id: u64) -> bool {
        self.callbacks.unregister(id)
    }
}
