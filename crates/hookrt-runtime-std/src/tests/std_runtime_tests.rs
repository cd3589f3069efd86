use super::{ManualTimers, MemoryStore, StdRuntime};
use hookrt_core::hooks::use_debounce;
use hookrt_core::{
    deps, Component, Element, Error, Host, InstanceId, KeyValueStore, RenderTree, RuntimeConfig,
    Setter, TimerHost,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct TextHost {
    texts: Vec<(InstanceId, String)>,
}

impl TextHost {
    fn last(&self) -> Option<&str> {
        self.texts.last().map(|(_, text)| text.as_str())
    }
}

impl Host for TextHost {
    fn commit(&mut self, instance: InstanceId, output: &Element) {
        self.texts.push((instance, output.text_content()));
    }
}

#[test]
fn std_runtime_requests_render_and_pump_serves_it() {
    let runtime = StdRuntime::new();
    let mut tree = RenderTree::with_runtime(TextHost::default(), runtime.runtime());
    let renders = Rc::new(Cell::new(0u32));
    let setter: Rc<RefCell<Option<Setter<i32>>>> = Rc::default();

    let component = {
        let renders = renders.clone();
        let setter = setter.clone();
        Component::new("Counter", move |scope, _: &()| {
            renders.set(renders.get() + 1);
            let (count, set_count) = scope.use_state(|| 0)?;
            setter.borrow_mut().replace(set_count);
            Ok(Element::text(count.to_string()))
        })
    };
    tree.mount(&component, ()).expect("initial render");
    assert_eq!(renders.get(), 1);
    assert!(!runtime.take_render_request());

    let set = setter.borrow().clone().expect("setter captured during render");
    set.set(1);
    assert!(runtime.take_render_request(), "set should request a render");
    assert!(!runtime.take_render_request());

    tree.process_updates().expect("process updates after state change");
    assert_eq!(renders.get(), 2, "state change should trigger a render");
    assert_eq!(tree.host().last(), Some("1"));

    set.set(2);
    assert!(runtime.pump(&mut tree).expect("pump"));
    assert_eq!(tree.host().last(), Some("2"));
    assert!(!runtime.pump(&mut tree).expect("idle pump"));
}

#[test]
fn pump_flushes_effects_and_follows_their_updates() {
    let runtime = StdRuntime::new();
    let mut tree = RenderTree::with_runtime(TextHost::default(), runtime.runtime());
    let component = Component::new("Loader", |scope, _: &()| {
        let (status, set_status) = scope.use_state(|| "loading")?;
        scope.use_effect(deps![], move || set_status.set("ready"))?;
        Ok(Element::text(status))
    });
    tree.mount(&component, ()).expect("mount");
    assert_eq!(tree.host().last(), Some("loading"));
    assert!(runtime.scheduler().take_effect_flush_request());

    // The flush request was consumed above; the effects are still queued.
    tree.flush_effects();
    assert!(runtime.pump(&mut tree).expect("pump"));
    assert_eq!(tree.host().last(), Some("ready"));
    assert_eq!(tree.pending_effects(), 0);
}

#[test]
fn pump_stops_effects_that_always_reschedule() {
    let runtime = StdRuntime::new();
    let mut tree = RenderTree::with_runtime(TextHost::default(), runtime.runtime())
        .with_config(RuntimeConfig::default().with_max_update_passes(4));
    let component = Component::new("Spinner", |scope, _: &()| {
        let (_, set_frame) = scope.use_state(|| 0u64)?;
        scope.use_effect(hookrt_core::Deps::always(), move || set_frame.update(|n| n + 1))?;
        Ok(Element::Empty)
    });
    tree.mount(&component, ()).expect("mount");
    assert_eq!(
        runtime.pump(&mut tree),
        Err(Error::UpdateLoop { passes: 4 })
    );
}

#[test]
fn waker_fires_for_render_and_flush_requests() {
    let runtime = StdRuntime::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    {
        let wakes = Arc::clone(&wakes);
        runtime.set_waker(move || {
            wakes.fetch_add(1, Ordering::SeqCst);
        });
    }
    let mut tree = RenderTree::with_runtime(TextHost::default(), runtime.runtime());
    let component = Component::new("Effect", |scope, _: &()| {
        scope.use_effect(deps![], || {})?;
        Ok(Element::Empty)
    });
    tree.mount(&component, ()).expect("mount");
    assert_eq!(wakes.load(Ordering::SeqCst), 1);

    runtime.clear_waker();
    tree.runtime().invalidate(tree.roots()[0]);
    assert_eq!(wakes.load(Ordering::SeqCst), 1);
    assert!(runtime.take_render_request());
}

#[test]
fn manual_timers_fire_in_due_order() {
    let timers = ManualTimers::new();
    let fired: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    for (label, delay) in [("late", 30), ("early", 10), ("cancelled", 20), ("tie", 10)] {
        let fired = fired.clone();
        timers.schedule(delay, Box::new(move || fired.borrow_mut().push(label)));
    }
    assert!(timers.cancel(hookrt_core::TimerToken(2)));
    assert!(!timers.cancel(hookrt_core::TimerToken(2)));
    assert_eq!(timers.next_due(), Some(10));

    assert_eq!(timers.advance(10), 2);
    assert_eq!(*fired.borrow(), ["early", "tie"]);
    assert_eq!(timers.advance(19), 0);
    assert_eq!(timers.advance(1), 1);
    assert_eq!(timers.now_millis(), 30);
    assert_eq!(timers.pending(), 0);
}

#[test]
fn manual_timers_fire_timers_scheduled_by_callbacks_when_due() {
    let timers = Rc::new(ManualTimers::new());
    let count = Rc::new(Cell::new(0));
    {
        let chained = Rc::clone(&timers);
        let count = Rc::clone(&count);
        timers.schedule(
            5,
            Box::new(move || {
                count.set(count.get() + 1);
                let count = Rc::clone(&count);
                chained.schedule(0, Box::new(move || count.set(count.get() + 1)));
            }),
        );
    }
    assert_eq!(timers.advance(5), 2);
    assert_eq!(count.get(), 2);
}

#[test]
fn debounce_runs_on_manual_timers() {
    let runtime = StdRuntime::new();
    let timers = Rc::new(ManualTimers::new());
    let shared: Rc<dyn TimerHost> = timers.clone();
    let mut tree = RenderTree::with_runtime(TextHost::default(), runtime.runtime());
    let component = Component::new("Search", move |scope, query: &String| {
        let settled = use_debounce(scope, &shared, query.clone(), 200)?;
        Ok(Element::text(settled))
    });
    let id = tree.mount(&component, "h".to_string()).expect("mount");
    runtime.pump(&mut tree).expect("pump");

    tree.update(id, "hello".to_string()).expect("update");
    runtime.pump(&mut tree).expect("pump");
    assert_eq!(timers.advance(150), 0);
    assert_eq!(tree.host().last(), Some("h"));

    assert_eq!(timers.advance(50), 1);
    runtime.pump(&mut tree).expect("pump");
    assert_eq!(tree.host().last(), Some("hello"));
}

#[test]
fn memory_store_round_trips_values() {
    let store = MemoryStore::new();
    assert!(store.is_empty());
    store.set("theme", "dark".into());
    assert_eq!(store.get("theme").as_deref(), Some("dark"));
    store.set("theme", "light".into());
    assert_eq!(store.len(), 1);
    store.remove("theme");
    assert_eq!(store.get("theme"), None);
}
