//! Named, restartable scalar animations.
//!
//! The engine does one thing: map elapsed time to linear progress and
//! feed the interpolated value to a callback each tick. A name
//! identifies at most one animation; creating a second animation under
//! an existing name stops and replaces the first, so two runs of the
//! same name can never overlap.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::{log_debug, log_warn};

type ValueFn = Box<dyn FnMut(f32)>;
type CompleteFn = Box<dyn FnMut()>;

struct Animation {
    duration: Duration,
    from: f32,
    to: f32,
    running: bool,
    progress: f32,
    started_at: Option<Instant>,
    on_value: ValueFn,
    on_complete: Option<CompleteFn>,
}

impl Animation {
    fn value_at(&self, progress: f32) -> f32 {
        self.from + (self.to - self.from) * progress
    }
}

/// Owns all named animations and advances the active ones.
#[derive(Default)]
pub struct AnimationManager {
    animations: BTreeMap<String, Animation>,
    active: Vec<String>,
}

impl AnimationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an animation, replacing (and stopping) any existing
    /// animation of the same name. Interpolation bounds are fixed at
    /// creation; re-create to change them.
    pub fn create<F>(&mut self, name: &str, duration: Duration, from: f32, to: f32, on_value: F)
    where
        F: FnMut(f32) + 'static,
    {
        if self.animations.remove(name).is_some() {
            self.active.retain(|n| n != name);
        }
        self.animations.insert(
            name.to_string(),
            Animation {
                duration,
                from,
                to,
                running: false,
                progress: 0.0,
                started_at: None,
                on_value: Box::new(on_value),
                on_complete: None,
            },
        );
        log_debug!("created animation '{name}'");
    }

    /// Attaches a completion callback to a registered animation.
    /// Fires exactly once per run, after the value callback has been
    /// invoked at progress 1.
    pub fn on_complete<F>(&mut self, name: &str, on_complete: F) -> bool
    where
        F: FnMut() + 'static,
    {
        match self.animations.get_mut(name) {
            Some(anim) => {
                anim.on_complete = Some(Box::new(on_complete));
                true
            }
            None => false,
        }
    }

    /// Starts (or restarts) an animation from progress 0.
    ///
    /// Starting an unregistered name is a logged no-op. Restarting a
    /// running animation resets it to progress 0 and re-fires the value
    /// callback there, using the bounds fixed at creation.
    pub fn start(&mut self, name: &str) -> bool {
        self.start_at(name, Instant::now())
    }

    /// [`start`](AnimationManager::start) with an explicit clock, so
    /// callers driving a synthetic timeline stay consistent.
    pub fn start_at(&mut self, name: &str, now: Instant) -> bool {
        let Some(anim) = self.animations.get_mut(name) else {
            log_warn!("cannot start animation '{name}': not registered");
            return false;
        };
        anim.started_at = Some(now);
        anim.running = true;
        anim.progress = 0.0;
        let value = anim.value_at(0.0);
        (anim.on_value)(value);

        if !self.active.iter().any(|n| n == name) {
            self.active.push(name.to_string());
        }
        true
    }

    /// Stops an animation without firing its completion callback.
    pub fn stop(&mut self, name: &str) -> bool {
        let Some(anim) = self.animations.get_mut(name) else {
            return false;
        };
        anim.running = false;
        self.active.retain(|n| n != name);
        true
    }

    /// Stops every running animation.
    pub fn stop_all(&mut self) {
        for anim in self.animations.values_mut() {
            anim.running = false;
        }
        self.active.clear();
    }

    /// Unregisters an animation entirely.
    pub fn remove(&mut self, name: &str) -> bool {
        self.active.retain(|n| n != name);
        self.animations.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.animations.get(name).is_some_and(|a| a.running)
    }

    /// Progress of a registered animation, in [0, 1].
    pub fn progress(&self, name: &str) -> Option<f32> {
        self.animations.get(name).map(|a| a.progress)
    }

    /// Advances all running animations against the real clock.
    /// Call once per render tick.
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Advances all running animations to `now`.
    ///
    /// Each tick fires the value callback at the clamped progress; an
    /// animation that reaches 1 fires the value callback at exactly 1,
    /// then its completion callback once, and leaves the active set
    /// the same tick. Zero-duration animations snap to 1 here.
    pub fn update_at(&mut self, now: Instant) {
        let names: Vec<String> = self.active.clone();
        let mut finished: Vec<String> = Vec::new();

        for name in names {
            let Some(anim) = self.animations.get_mut(&name) else {
                finished.push(name);
                continue;
            };
            if !anim.running {
                finished.push(name);
                continue;
            }
            let Some(started) = anim.started_at else {
                finished.push(name);
                continue;
            };

            let progress = if anim.duration.is_zero() {
                1.0
            } else {
                let elapsed = now.saturating_duration_since(started);
                (elapsed.as_secs_f32() / anim.duration.as_secs_f32()).clamp(0.0, 1.0)
            };
            anim.progress = progress;
            let value = anim.value_at(progress);
            (anim.on_value)(value);

            if progress >= 1.0 {
                anim.running = false;
                if let Some(on_complete) = anim.on_complete.as_mut() {
                    on_complete();
                }
                finished.push(name);
            }
        }

        self.active.retain(|n| !finished.contains(n));
    }

    /// Number of animations currently running.
    pub fn running_count(&self) -> usize {
        self.active.len()
    }
}
