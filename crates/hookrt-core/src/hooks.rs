//! Composite hooks built only from the [`Scope`] primitives.
//!
//! Each one claims a fixed number of slots, so they follow the same
//! call-order rules as the primitives.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::deps;
use crate::deps::Deps;
use crate::effect::Cleanup;
use crate::error::Result;
use crate::memo::Callback;
use crate::owned::Owned;
use crate::platform::{KeyValueStore, TimerHost, TimerToken};
use crate::reducer::Dispatch;
use crate::scope::Scope;
use crate::state::Setter;

/// Value passed on the previous render, `None` on the first.
pub fn use_previous<T: Clone + 'static>(scope: &mut Scope<'_>, value: T) -> Result<Option<T>> {
    let previous = scope.use_ref(|| None::<T>)?;
    Ok(previous.replace(Some(value)))
}

/// Runs `f` once, after the first commit.
pub fn use_mount(scope: &mut Scope<'_>, f: impl FnOnce() + 'static) -> Result<()> {
    scope.use_effect(deps![], f)
}

/// Runs `f` when the instance unmounts.
///
/// Only the closure passed on the first render is kept.
pub fn use_unmount(scope: &mut Scope<'_>, f: impl FnOnce() + 'static) -> Result<()> {
    scope.use_effect(deps![], move || Cleanup::new(f))
}

/// Runs `f` after every commit except the first.
pub fn use_update(scope: &mut Scope<'_>, f: impl FnOnce() + 'static) -> Result<()> {
    let mounted = scope.use_ref(|| false)?;
    scope.use_effect(Deps::always(), move || {
        if mounted.replace(true) {
            f();
        }
    })
}

/// Boolean state plus a stable callback that flips it.
pub fn use_toggle(scope: &mut Scope<'_>, initial: bool) -> Result<(bool, Callback)> {
    let (on, set_on) = scope.use_state(|| initial)?;
    let toggle = scope.use_callback(deps![set_on.clone()], move |()| set_on.update(|on| !on))?;
    Ok((on, toggle))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterAction {
    Increment,
    Decrement,
    Set(i64),
    Reset,
}

/// Integer state returned by [`use_counter`].
#[derive(Clone, Debug)]
pub struct Counter {
    pub value: i64,
    dispatch: Dispatch<CounterAction>,
}

impl Counter {
    pub fn increment(&self) {
        self.dispatch.dispatch(CounterAction::Increment);
    }

    pub fn decrement(&self) {
        self.dispatch.dispatch(CounterAction::Decrement);
    }

    pub fn set(&self, value: i64) {
        self.dispatch.dispatch(CounterAction::Set(value));
    }

    /// Back to the initial value of the first render.
    pub fn reset(&self) {
        self.dispatch.dispatch(CounterAction::Reset);
    }
}

pub fn use_counter(scope: &mut Scope<'_>, initial: i64) -> Result<Counter> {
    let (value, dispatch) = scope.use_reducer(
        |&(value, initial): &(i64, i64), action: CounterAction| match action {
            CounterAction::Increment => (value + 1, initial),
            CounterAction::Decrement => (value - 1, initial),
            CounterAction::Set(next) => (next, initial),
            CounterAction::Reset => (initial, initial),
        },
        || (initial, initial),
    )?;
    Ok(Counter {
        value: value.0,
        dispatch,
    })
}

/// `value`, delayed until it has stayed unchanged for `delay_millis`.
///
/// Every change schedules a timer on `timers`; the cleanup of the previous
/// change cancels its timer, so only the last one lands.
pub fn use_debounce<T>(
    scope: &mut Scope<'_>,
    timers: &Rc<dyn TimerHost>,
    value: T,
    delay_millis: u64,
) -> Result<T>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    let (debounced, set_debounced) = scope.use_state(|| value.clone())?;
    let timers = Rc::clone(timers);
    let latest = value.clone();
    scope.use_effect(deps![value, delay_millis], move || {
        let token = timers.schedule(delay_millis, Box::new(move || set_debounced.set(latest)));
        Cleanup::new(move || {
            timers.cancel(token);
        })
    })?;
    Ok(debounced)
}

struct Throttle<T> {
    timers: Rc<dyn TimerHost>,
    setter: Setter<T>,
    delay_millis: Cell<u64>,
    latest: RefCell<T>,
    emitted: RefCell<T>,
    window: Cell<Option<TimerToken>>,
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> Throttle<T> {
    fn offer(self: &Rc<Self>, value: T, delay_millis: u64) {
        *self.latest.borrow_mut() = value;
        self.delay_millis.set(delay_millis);
        if self.window.get().is_none() {
            self.emit();
        }
    }

    /// Publishes the latest value if it is new and opens a window during
    /// which further values are held back.
    fn emit(self: &Rc<Self>) {
        let latest = self.latest.borrow().clone();
        if *self.emitted.borrow() == latest {
            return;
        }
        self.setter.set(latest.clone());
        *self.emitted.borrow_mut() = latest;
        let throttle = Rc::clone(self);
        let token = self.timers.schedule(
            self.delay_millis.get(),
            Box::new(move || {
                throttle.window.set(None);
                throttle.emit();
            }),
        );
        self.window.set(Some(token));
    }

    fn stop(&self) {
        if let Some(token) = self.window.take() {
            self.timers.cancel(token);
        }
    }
}

/// `value`, updated at most once per `delay_millis`.
///
/// A change outside a window lands right away; changes inside one are held
/// and the newest lands when the window closes.
pub fn use_throttle<T>(
    scope: &mut Scope<'_>,
    timers: &Rc<dyn TimerHost>,
    value: T,
    delay_millis: u64,
) -> Result<T>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    let (throttled, set_throttled) = scope.use_state(|| value.clone())?;
    let throttle = scope
        .use_ref(|| {
            Rc::new(Throttle {
                timers: Rc::clone(timers),
                setter: set_throttled,
                delay_millis: Cell::new(delay_millis),
                latest: RefCell::new(value.clone()),
                emitted: RefCell::new(value.clone()),
                window: Cell::new(None),
            })
        })?
        .get();
    let offered = Rc::clone(&throttle);
    scope.use_effect(deps![value.clone(), delay_millis], move || {
        offered.offer(value, delay_millis)
    })?;
    scope.use_effect(deps![], move || Cleanup::new(move || throttle.stop()))?;
    Ok(throttled)
}

struct Ticker {
    timers: Rc<dyn TimerHost>,
    delay_millis: u64,
    callback: Owned<Box<dyn FnMut()>>,
    token: Cell<Option<TimerToken>>,
    stopped: Cell<bool>,
}

impl Ticker {
    fn arm(self: &Rc<Self>) {
        let ticker = Rc::clone(self);
        let token = self.timers.schedule(
            self.delay_millis,
            Box::new(move || {
                ticker.token.set(None);
                ticker.callback.update(|callback| callback());
                if !ticker.stopped.get() {
                    ticker.arm();
                }
            }),
        );
        self.token.set(Some(token));
    }

    fn stop(&self) {
        self.stopped.set(true);
        if let Some(token) = self.token.take() {
            self.timers.cancel(token);
        }
    }
}

/// Calls the most recently committed `callback` every `delay_millis`.
///
/// `None` pauses the interval. Changing the delay restarts it; changing only
/// the callback does not.
pub fn use_interval(
    scope: &mut Scope<'_>,
    timers: &Rc<dyn TimerHost>,
    callback: impl FnMut() + 'static,
    delay_millis: Option<u64>,
) -> Result<()> {
    let saved = scope.use_ref(|| Box::new(|| {}) as Box<dyn FnMut()>)?;
    let latest = saved.clone();
    scope.use_effect(Deps::always(), move || {
        latest.replace(Box::new(callback));
    })?;
    let timers = Rc::clone(timers);
    scope.use_effect(deps![delay_millis], move || {
        let Some(delay_millis) = delay_millis else {
            return Cleanup::none();
        };
        let ticker = Rc::new(Ticker {
            timers,
            delay_millis,
            callback: saved,
            token: Cell::new(None),
            stopped: Cell::new(false),
        });
        ticker.arm();
        Cleanup::new(move || ticker.stop())
    })
}

/// State mirrored into `store` under `key`.
///
/// The stored string is parsed on the first render, falling back to
/// `initial` when it is missing or does not parse. Every committed change is
/// written back.
pub fn use_local_storage<T>(
    scope: &mut Scope<'_>,
    store: &Rc<dyn KeyValueStore>,
    key: &str,
    initial: impl FnOnce() -> T,
) -> Result<(T, Setter<T>)>
where
    T: Clone + PartialEq + fmt::Debug + fmt::Display + FromStr + 'static,
{
    let (value, set_value) = scope.use_state(|| match store.get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("discarding unparsable stored value for `{key}`");
            initial()
        }),
        None => initial(),
    })?;
    let store = Rc::clone(store);
    let key = key.to_owned();
    let written = value.clone();
    scope.use_effect(deps![value.clone(), key.clone()], move || {
        store.set(&key, written.to_string());
    })?;
    Ok((value, set_value))
}
