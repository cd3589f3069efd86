//! Host abstraction traits for the hook runtime.
//!
//! The runtime never paints, sleeps or persists anything itself. Hosts plug
//! in a scheduler that decides when queued renders and effect flushes run, a
//! [`Host`] that receives committed output, and optionally the timer and
//! storage services that composite hooks build on.

use crate::element::Element;
use crate::error::Error;
use crate::instance::InstanceId;

/// Schedules deferred work for the runtime.
///
/// Implementations only record the request; the host later calls back into
/// [`RenderTree::process_updates`](crate::RenderTree::process_updates) or
/// [`RenderTree::flush_effects`](crate::RenderTree::flush_effects) from its
/// own event loop. They must be safe to use from multiple threads.
pub trait RuntimeScheduler: Send + Sync {
    /// A setter or dispatch queued an update outside a batch.
    fn schedule_render(&self);

    /// A render committed and left effects waiting for the flush checkpoint.
    fn schedule_effect_flush(&self);
}

/// Receives the output of the runtime.
pub trait Host {
    /// Hands the rendered output of `instance` to the host's reconciliation step.
    fn commit(&mut self, instance: InstanceId, output: &Element);

    /// `instance` was unmounted and its surface can be dropped.
    fn release(&mut self, _instance: InstanceId) {}

    /// An effect body or cleanup of `instance` failed.
    fn report_effect_fault(&mut self, instance: InstanceId, error: &Error) {
        log::error!("effect of {instance} failed: {error}");
    }
}

/// Provides timing information for the host.
pub trait Clock: Send + Sync {
    /// Instant type produced by this clock implementation.
    type Instant: Copy + Send + Sync;

    /// Returns the current instant.
    fn now(&self) -> Self::Instant;

    /// Returns the number of milliseconds elapsed since `since`.
    fn elapsed_millis(&self, since: Self::Instant) -> u64;
}

/// Token identifying a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// Cancellable one-shot timers supplied by the host.
pub trait TimerHost {
    fn schedule(&self, delay_millis: u64, callback: Box<dyn FnOnce()>) -> TimerToken;

    /// Returns whether the timer was still pending.
    fn cancel(&self, token: TimerToken) -> bool;
}

/// Synchronous string key-value persistence supplied by the host.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}
