use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::hooks::{
    use_counter, use_debounce, use_interval, use_local_storage, use_mount, use_previous,
    use_throttle, use_toggle, use_unmount, use_update, Counter,
};
use crate::test_support::{tree, Captured, EventLog};
use crate::{Callback, Component, Element, KeyValueStore, Setter, TimerHost, TimerToken};

#[derive(Default)]
struct FakeTimers {
    next: Cell<u64>,
    pending: RefCell<Vec<(TimerToken, u64, Box<dyn FnOnce()>)>>,
}

impl FakeTimers {
    fn fire_all(&self) -> usize {
        let due: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        let fired = due.len();
        for (_, _, callback) in due {
            callback();
        }
        fired
    }

    fn delays(&self) -> Vec<u64> {
        self.pending.borrow().iter().map(|(_, delay, _)| *delay).collect()
    }
}

impl TimerHost for FakeTimers {
    fn schedule(&self, delay_millis: u64, callback: Box<dyn FnOnce()>) -> TimerToken {
        let token = TimerToken(self.next.get());
        self.next.set(token.0 + 1);
        self.pending.borrow_mut().push((token, delay_millis, callback));
        token
    }

    fn cancel(&self, token: TimerToken) -> bool {
        let mut pending = self.pending.borrow_mut();
        let before = pending.len();
        pending.retain(|(queued, _, _)| *queued != token);
        pending.len() != before
    }
}

#[derive(Default)]
struct FakeStore(RefCell<HashMap<String, String>>);

impl KeyValueStore for FakeStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.0.borrow_mut().insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.0.borrow_mut().remove(key);
    }
}

#[test]
fn previous_value_lags_one_render() {
    let seen: Rc<RefCell<Vec<Option<u32>>>> = Rc::default();
    let component = {
        let seen = Rc::clone(&seen);
        Component::new("Previous", move |scope, value: &u32| {
            seen.borrow_mut().push(use_previous(scope, *value)?);
            Ok(Element::Empty)
        })
    };
    let mut tree = tree();
    let id = tree.mount(&component, 1).unwrap();
    tree.update(id, 2u32).unwrap();
    tree.update(id, 5u32).unwrap();
    assert_eq!(*seen.borrow(), vec![None, Some(1), Some(2)]);
}

#[test]
fn lifecycle_hooks_fire_at_mount_update_and_unmount() {
    let log = EventLog::default();
    let component = {
        let log = log.clone();
        Component::new("Lifecycle", move |scope, _: &u8| {
            let (mount_log, unmount_log, update_log) = (log.clone(), log.clone(), log.clone());
            use_mount(scope, move || mount_log.push("mount"))?;
            use_unmount(scope, move || unmount_log.push("unmount"))?;
            use_update(scope, move || update_log.push("update"))?;
            Ok(Element::Empty)
        })
    };
    let mut tree = tree();
    let id = tree.mount(&component, 0).unwrap();
    tree.flush_effects();
    assert_eq!(log.take(), ["mount"]);

    tree.update(id, 1u8).unwrap();
    tree.flush_effects();
    tree.update(id, 2u8).unwrap();
    tree.flush_effects();
    assert_eq!(log.take(), ["update", "update"]);

    tree.unmount(id).unwrap();
    assert_eq!(log.take(), ["unmount"]);
}

#[test]
fn toggle_flips_through_a_stable_callback() {
    let toggles: Rc<RefCell<Vec<Callback>>> = Rc::default();
    let component = {
        let toggles = Rc::clone(&toggles);
        Component::new("Switch", move |scope, _: &()| {
            let (on, toggle) = use_toggle(scope, false)?;
            toggles.borrow_mut().push(toggle);
            Ok(Element::text(if on { "on" } else { "off" }))
        })
    };
    let mut tree = tree();
    let id = tree.mount(&component, ()).unwrap();
    let toggle = toggles.borrow()[0].clone();
    toggle.invoke();
    tree.process_updates().unwrap();
    assert_eq!(tree.host().text(id), "on");
    toggle.invoke();
    toggle.invoke();
    tree.process_updates().unwrap();
    assert_eq!(tree.host().text(id), "on");

    let toggles = toggles.borrow();
    assert_eq!(toggles.len(), 3);
    assert!(toggles.iter().all(|seen| seen.ptr_eq(&toggles[0])));
}

#[test]
fn counter_applies_actions_and_resets_to_its_initial_value() {
    let counter: Captured<Counter> = Captured::default();
    let component = {
        let counter = counter.clone();
        Component::new("Clicks", move |scope, _: &()| {
            let current = use_counter(scope, 10)?;
            let text = current.value.to_string();
            counter.store(current);
            Ok(Element::text(text))
        })
    };
    let mut tree = tree();
    let id = tree.mount(&component, ()).unwrap();

    let handle = counter.get();
    handle.increment();
    handle.increment();
    handle.decrement();
    tree.process_updates().unwrap();
    assert_eq!(tree.host().text(id), "11");

    handle.set(-4);
    tree.process_updates().unwrap();
    assert_eq!(counter.get().value, -4);

    handle.reset();
    tree.process_updates().unwrap();
    assert_eq!(tree.host().text(id), "10");
}

#[test]
fn debounce_only_lands_the_last_value() {
    let timers = Rc::new(FakeTimers::default());
    let shared: Rc<dyn TimerHost> = timers.clone();
    let component = Component::new("Search", move |scope, query: &String| {
        let settled = use_debounce(scope, &shared, query.clone(), 300)?;
        Ok(Element::text(settled))
    });
    let mut tree = tree();
    let id = tree.mount(&component, "r".to_string()).unwrap();
    tree.flush_effects();
    assert_eq!(timers.delays(), vec![300]);

    for query in ["ru", "rus", "rust"] {
        tree.update(id, query.to_string()).unwrap();
        tree.flush_effects();
    }
    // Each change cancelled the timer of the one before.
    assert_eq!(timers.delays(), vec![300]);
    assert_eq!(tree.host().text(id), "r");

    assert_eq!(timers.fire_all(), 1);
    tree.process_updates().unwrap();
    assert_eq!(tree.host().text(id), "rust");
}

#[test]
fn debounce_timer_is_cancelled_on_unmount() {
    let timers = Rc::new(FakeTimers::default());
    let shared: Rc<dyn TimerHost> = timers.clone();
    let component = Component::new("Search", move |scope, query: &String| {
        let settled = use_debounce(scope, &shared, query.clone(), 50)?;
        Ok(Element::text(settled))
    });
    let mut tree = tree();
    let id = tree.mount(&component, "a".to_string()).unwrap();
    tree.flush_effects();
    tree.unmount(id).unwrap();
    assert!(timers.delays().is_empty());
}

#[test]
fn throttle_lands_the_first_change_and_holds_the_rest_for_the_window() {
    let timers = Rc::new(FakeTimers::default());
    let shared: Rc<dyn TimerHost> = timers.clone();
    let component = Component::new("Scroll", move |scope, offset: &u32| {
        let shown = use_throttle(scope, &shared, *offset, 100)?;
        Ok(Element::text(shown.to_string()))
    });
    let mut tree = tree();
    let id = tree.mount(&component, 0).unwrap();
    tree.run_until_idle().unwrap();
    assert!(timers.delays().is_empty());

    tree.update(id, 10u32).unwrap();
    tree.run_until_idle().unwrap();
    assert_eq!(tree.host().text(id), "10");
    assert_eq!(timers.delays(), vec![100]);

    for offset in [20u32, 30] {
        tree.update(id, offset).unwrap();
        tree.run_until_idle().unwrap();
    }
    assert_eq!(tree.host().text(id), "10");

    assert_eq!(timers.fire_all(), 1);
    tree.run_until_idle().unwrap();
    assert_eq!(tree.host().text(id), "30");
    // The trailing value opened a window of its own.
    assert_eq!(timers.delays(), vec![100]);
    assert_eq!(timers.fire_all(), 1);
    assert!(timers.delays().is_empty());

    tree.update(id, 40u32).unwrap();
    tree.run_until_idle().unwrap();
    tree.unmount(id).unwrap();
    assert!(timers.delays().is_empty());
}

#[test]
fn interval_ticks_until_paused() {
    let timers = Rc::new(FakeTimers::default());
    let shared: Rc<dyn TimerHost> = timers.clone();
    let component = Component::new("Clock", move |scope, delay: &Option<u64>| {
        let (ticks, set_ticks) = scope.use_state(|| 0u32)?;
        use_interval(scope, &shared, move || set_ticks.update(|n| n + 1), *delay)?;
        Ok(Element::text(ticks.to_string()))
    });
    let mut tree = tree();
    let id = tree.mount(&component, Some(1000)).unwrap();
    tree.flush_effects();
    assert_eq!(timers.delays(), vec![1000]);

    for _ in 0..3 {
        assert_eq!(timers.fire_all(), 1);
        tree.run_until_idle().unwrap();
    }
    assert_eq!(tree.host().text(id), "3");
    assert_eq!(timers.delays(), vec![1000]);

    tree.update(id, Some(250u64)).unwrap();
    tree.flush_effects();
    assert_eq!(timers.delays(), vec![250]);

    tree.update(id, None::<u64>).unwrap();
    tree.flush_effects();
    assert!(timers.delays().is_empty());
    assert_eq!(tree.host().text(id), "3");
}

#[test]
fn interval_is_cancelled_on_unmount() {
    let timers = Rc::new(FakeTimers::default());
    let shared: Rc<dyn TimerHost> = timers.clone();
    let component = Component::new("Clock", move |scope, _: &()| {
        use_interval(scope, &shared, || {}, Some(10))?;
        Ok(Element::Empty)
    });
    let mut tree = tree();
    let id = tree.mount(&component, ()).unwrap();
    tree.flush_effects();
    assert_eq!(timers.delays(), vec![10]);
    tree.unmount(id).unwrap();
    assert!(timers.delays().is_empty());
}

#[test]
fn local_storage_reads_the_stored_value_and_writes_changes_back() {
    let store = Rc::new(FakeStore::default());
    store.set("volume", "7".into());
    let shared: Rc<dyn KeyValueStore> = store.clone();
    let setter: Captured<Setter<u8>> = Captured::default();
    let component = {
        let setter = setter.clone();
        Component::new("Volume", move |scope, _: &()| {
            let (volume, set_volume) = use_local_storage(scope, &shared, "volume", || 5u8)?;
            setter.store(set_volume);
            Ok(Element::text(volume.to_string()))
        })
    };
    let mut tree = tree();
    let id = tree.mount(&component, ()).unwrap();
    assert_eq!(tree.host().text(id), "7");

    setter.get().set(9);
    tree.run_until_idle().unwrap();
    assert_eq!(store.get("volume").as_deref(), Some("9"));
    assert_eq!(tree.host().text(id), "9");
}

#[test]
fn local_storage_falls_back_when_the_stored_value_does_not_parse() {
    let store = Rc::new(FakeStore::default());
    store.set("volume", "loud".into());
    let shared: Rc<dyn KeyValueStore> = store.clone();
    let component = Component::new("Volume", move |scope, _: &()| {
        let (volume, _) = use_local_storage(scope, &shared, "volume", || 5u8)?;
        Ok(Element::text(volume.to_string()))
    });
    let mut tree = tree();
    let id = tree.mount(&component, ()).unwrap();
    assert_eq!(tree.host().text(id), "5");
    tree.flush_effects();
    assert_eq!(store.get("volume").as_deref(), Some("5"));
}
