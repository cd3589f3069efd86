//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform
//! abstraction traits defined in `hookrt-core`. Hosts construct a
//! [`StdRuntime`], build their [`RenderTree`] on top of
//! [`StdRuntime::runtime`] and call [`StdRuntime::pump`] from their event
//! loop whenever the registered waker fires.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use hookrt_core::{
    Clock, Error, Host, KeyValueStore, RenderTree, Result, Runtime, RuntimeHandle,
    RuntimeScheduler, TimerHost, TimerToken,
};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records requests in atomic flags and wakes the host loop.
pub struct StdScheduler {
    render_requested: AtomicBool,
    effect_flush_requested: AtomicBool,
    waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            render_requested: AtomicBool::new(false),
            effect_flush_requested: AtomicBool::new(false),
            waker: RwLock::new(None),
        }
    }

    /// Returns whether a render has been requested since the last call.
    pub fn take_render_request(&self) -> bool {
        self.render_requested.swap(false, Ordering::SeqCst)
    }

    /// Returns whether an effect flush has been requested since the last call.
    pub fn take_effect_flush_request(&self) -> bool {
        self.effect_flush_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever new work is scheduled.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered waker.
    pub fn clear_waker(&self) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "render_requested",
                &self.render_requested.load(Ordering::SeqCst),
            )
            .field(
                "effect_flush_requested",
                &self.effect_flush_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_render(&self) {
        self.render_requested.store(true, Ordering::SeqCst);
        self.wake();
    }

    fn schedule_effect_flush(&self) {
        self.effect_flush_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Clock implementation backed by [`std::time`].
#[derive(Debug, Default, Clone)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn elapsed_millis(&self, since: Self::Instant) -> u64 {
        since.elapsed().as_millis() as u64
    }
}

impl StdClock {
    /// Returns the elapsed time as a [`Duration`] for convenience.
    pub fn elapsed(&self, since: Instant) -> Duration {
        since.elapsed()
    }
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.borrow_mut().insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

struct Timer {
    token: TimerToken,
    due: u64,
    callback: Box<dyn FnOnce()>,
}

/// [`TimerHost`] on a virtual millisecond clock that only moves on
/// [`advance`](Self::advance).
///
/// Hosts with a real event loop feed it the elapsed time of a [`StdClock`];
/// tests move it by hand.
#[derive(Default)]
pub struct ManualTimers {
    now: Cell<u64>,
    next_token: Cell<u64>,
    pending: RefCell<Vec<Timer>>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_millis(&self) -> u64 {
        self.now.get()
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Due time of the earliest pending timer.
    pub fn next_due(&self) -> Option<u64> {
        self.pending.borrow().iter().map(|timer| timer.due).min()
    }

    /// Moves the clock forward and fires every timer that came due, earliest
    /// first. Timers scheduled by those callbacks fire too if they are due.
    /// Returns how many fired.
    pub fn advance(&self, millis: u64) -> usize {
        self.now.set(self.now.get().saturating_add(millis));
        let mut fired = 0;
        while let Some(timer) = self.pop_due() {
            log::trace!("timer {:?} fired at {}ms", timer.token, self.now.get());
            (timer.callback)();
            fired += 1;
        }
        fired
    }

    fn pop_due(&self) -> Option<Timer> {
        let mut pending = self.pending.borrow_mut();
        let now = self.now.get();
        let index = pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= now)
            .min_by_key(|(_, timer)| (timer.due, timer.token))
            .map(|(index, _)| index)?;
        Some(pending.remove(index))
    }
}

impl TimerHost for ManualTimers {
    fn schedule(&self, delay_millis: u64, callback: Box<dyn FnOnce()>) -> TimerToken {
        let token = TimerToken(self.next_token.get());
        self.next_token.set(token.0 + 1);
        self.pending.borrow_mut().push(Timer {
            token,
            due: self.now.get().saturating_add(delay_millis),
            callback,
        });
        token
    }

    fn cancel(&self, token: TimerToken) -> bool {
        let mut pending = self.pending.borrow_mut();
        let before = pending.len();
        pending.retain(|timer| timer.token != token);
        pending.len() != before
    }
}

impl fmt::Debug for ManualTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimers")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Convenience container bundling the standard scheduler and clock.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    clock: Arc<StdClock>,
    runtime: Runtime,
}

impl StdRuntime {
    /// Creates a new standard runtime instance.
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self {
            scheduler,
            clock: Arc::new(StdClock),
            runtime,
        }
    }

    /// Returns a [`hookrt_core::Runtime`] configured with the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn clock(&self) -> Arc<StdClock> {
        Arc::clone(&self.clock)
    }

    pub fn take_render_request(&self) -> bool {
        self.scheduler.take_render_request()
    }

    pub fn take_effect_flush_request(&self) -> bool {
        self.scheduler.take_effect_flush_request()
    }

    /// Registers a waker to be called when the runtime schedules new work.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_waker(waker);
    }

    pub fn clear_waker(&self) {
        self.scheduler.clear_waker();
    }

    /// Serves every pending render and effect flush request of `tree`.
    ///
    /// Returns whether any work was done. Requests that keep re-arming each
    /// other past the tree's `max_update_passes` end in
    /// [`Error::UpdateLoop`].
    pub fn pump<H: Host>(&self, tree: &mut RenderTree<H>) -> Result<bool> {
        let limit = tree.config().max_update_passes;
        let mut rounds = 0;
        loop {
            let render = self.take_render_request();
            let flush = self.take_effect_flush_request();
            if !render && !flush {
                return Ok(rounds > 0);
            }
            if rounds == limit {
                return Err(Error::UpdateLoop { passes: rounds });
            }
            rounds += 1;
            if render {
                tree.process_updates()?;
            }
            if flush {
                tree.flush_effects();
            }
        }
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs an `env_logger` backend, `info` level unless `RUST_LOG` says
/// otherwise. Repeated calls are ignored.
#[cfg(feature = "logging")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(test)]
#[path = "tests/std_runtime_tests.rs"]
mod tests;
