use crate::effect::{EffectRecord, EffectScheduler, PendingEffect};
use crate::test_support::{tree, EventLog};
use crate::{deps, Cleanup, Component, Deps, EffectState, Element, Error, InstanceId};

fn logging_effect(log: &EventLog, name: &'static str) -> Component<u32> {
    let log = log.clone();
    Component::new(name, move |scope, value: &u32| {
        let value = *value;
        log.push(format!("render {name} {value}"));
        let effect_log = log.clone();
        scope.use_effect(deps![value], move || {
            effect_log.push(format!("run {name} {value}"));
            let cleanup_log = effect_log.clone();
            Cleanup::new(move || cleanup_log.push(format!("cleanup {name} {value}")))
        })?;
        Ok(Element::text(value.to_string()))
    })
}

#[test]
fn effects_wait_for_the_flush_after_commit() {
    let log = EventLog::default();
    let mut tree = tree();
    let id = tree.mount(&logging_effect(&log, "a"), 1).unwrap();
    assert_eq!(log.take(), ["render a 1"]);
    assert_eq!(tree.host().text(id), "1");
    assert_eq!(tree.effect_state(id, 0), Some(EffectState::Pending));
    assert_eq!(tree.pending_effects(), 1);

    assert_eq!(tree.flush_effects(), 1);
    assert_eq!(log.take(), ["run a 1"]);
    assert_eq!(tree.effect_state(id, 0), Some(EffectState::Active));
    assert_eq!(tree.flush_effects(), 0);
}

#[test]
fn cleanup_precedes_the_next_body_only_when_deps_change() {
    let log = EventLog::default();
    let mut tree = tree();
    let id = tree.mount(&logging_effect(&log, "a"), 1).unwrap();
    tree.flush_effects();
    log.take();

    tree.update(id, 1u32).unwrap();
    tree.flush_effects();
    assert_eq!(log.take(), ["render a 1"]);

    tree.update(id, 2u32).unwrap();
    tree.flush_effects();
    assert_eq!(log.take(), ["render a 2", "cleanup a 1", "run a 2"]);
}

#[test]
fn unmount_runs_cleanups_in_reverse_declaration_order() {
    let log = EventLog::default();
    let component = {
        let log = log.clone();
        Component::new("Pair", move |scope, _: &()| {
            for name in ["first", "second"] {
                let log = log.clone();
                scope.use_effect(deps![], move || {
                    Cleanup::new(move || log.push(format!("cleanup {name}")))
                })?;
            }
            Ok(Element::Empty)
        })
    };
    let mut tree = tree();
    let id = tree.mount(&component, ()).unwrap();
    tree.flush_effects();
    tree.unmount(id).unwrap();

    assert_eq!(log.take(), ["cleanup second", "cleanup first"]);
    assert_eq!(tree.host().released, vec![id]);
}

#[test]
fn children_flush_before_parents_and_unmount_after_them() {
    let log = EventLog::default();
    let child = logging_effect(&log, "child");
    let parent = {
        let log = log.clone();
        Component::new("parent", move |scope, _: &()| {
            let effect_log = log.clone();
            scope.use_effect(deps![], move || {
                effect_log.push("run parent");
                let cleanup_log = effect_log.clone();
                Cleanup::new(move || cleanup_log.push("cleanup parent"))
            })?;
            scope.child(&child, 1)
        })
    };
    let mut tree = tree();
    let id = tree.mount(&parent, ()).unwrap();
    tree.flush_effects();
    assert_eq!(log.take(), ["render child 1", "run child 1", "run parent"]);

    tree.unmount(id).unwrap();
    assert_eq!(log.take(), ["cleanup parent", "cleanup child 1"]);
}

#[test]
fn always_deps_rerun_after_every_commit() {
    let log = EventLog::default();
    let component = {
        let log = log.clone();
        Component::new("Always", move |scope, _: &()| {
            let log = log.clone();
            scope.use_effect(Deps::always(), move || log.push("run"))?;
            Ok(Element::Empty)
        })
    };
    let mut tree = tree();
    let id = tree.mount(&component, ()).unwrap();
    tree.update(id, ()).unwrap();
    // Both renders committed before the flush: the slot runs once.
    assert_eq!(tree.flush_effects(), 1);
    tree.update(id, ()).unwrap();
    tree.flush_effects();
    assert_eq!(log.take(), ["run", "run"]);
}

#[test]
fn effect_faults_are_reported_and_do_not_unmount() {
    let component = Component::new("Faulty", |scope, _: &()| {
        scope.use_effect(deps![], || -> crate::Result<()> { Err(Error::fault("socket closed")) })?;
        scope.use_effect(deps![], || {
            Cleanup::fallible(|| Err(Error::fault("flush failed")))
        })?;
        Ok(Element::Empty)
    });
    let mut tree = tree();
    let id = tree.mount(&component, ()).unwrap();
    assert_eq!(tree.flush_effects(), 2);
    assert_eq!(
        tree.host().faults,
        vec![(id, Error::fault("socket closed"))]
    );
    assert_eq!(tree.effect_state(id, 0), Some(EffectState::Cleaned));
    assert_eq!(tree.effect_state(id, 1), Some(EffectState::Active));
    assert!(tree.is_mounted(id));

    tree.unmount(id).unwrap();
    assert_eq!(tree.host().faults.len(), 2);
    assert_eq!(tree.host().faults[1], (id, Error::fault("flush failed")));
}

#[test]
fn unmounted_instances_never_run_pending_effects() {
    let log = EventLog::default();
    let mut tree = tree();
    let id = tree.mount(&logging_effect(&log, "a"), 1).unwrap();
    tree.unmount(id).unwrap();
    assert_eq!(tree.flush_effects(), 0);
    assert_eq!(log.take(), ["render a 1"]);
}

#[test]
fn record_moves_through_its_states() {
    let log = EventLog::default();
    let mut record = EffectRecord::new();
    assert_eq!(record.state(), EffectState::Unregistered);
    assert!(record.schedule(&deps![1]));
    assert_eq!(record.state(), EffectState::Pending);

    let body_log = log.clone();
    let faults = record.run(
        deps![1],
        Box::new(move || {
            Ok(Cleanup::new(move || body_log.push("cleanup")))
        }),
    );
    assert!(faults.is_empty());
    assert_eq!(record.state(), EffectState::Active);
    assert!(!record.schedule(&deps![1]));

    assert!(record.dispose().is_none());
    assert_eq!(record.state(), EffectState::Cleaned);
    assert_eq!(log.take(), ["cleanup"]);
    // Cleanups run at most once.
    assert!(record.dispose().is_none());
    assert!(log.take().is_empty());
}

#[test]
fn scheduler_keeps_the_newest_body_per_slot() {
    let log = EventLog::default();
    let body = |label: &'static str| {
        let log = log.clone();
        PendingEffect {
            slot: 0,
            deps: Deps::always(),
            body: Box::new(move || {
                log.push(label);
                Ok(Cleanup::none())
            }),
        }
    };
    let (first, second) = (InstanceId::next(), InstanceId::next());
    let mut scheduler = EffectScheduler::default();
    scheduler.enqueue(first, vec![body("stale")], &[]);
    scheduler.enqueue(second, vec![body("second")], &[]);
    scheduler.enqueue(first, vec![body("fresh")], &[]);
    assert_eq!(scheduler.len(), 2);

    let batches = scheduler.take();
    assert!(scheduler.is_empty());
    let order: Vec<InstanceId> = batches.iter().map(|(id, _)| *id).collect();
    assert_eq!(order, vec![first, second]);
    for (_, effects) in batches {
        for effect in effects {
            (effect.body)().unwrap();
        }
    }
    assert_eq!(log.take(), ["fresh", "second"]);
}

#[test]
fn render_back_to_the_last_run_deps_withdraws_the_staged_run() {
    let log = EventLog::default();
    let mut tree = tree();
    let id = tree.mount(&logging_effect(&log, "a"), 0).unwrap();
    tree.flush_effects();
    log.take();

    tree.update(id, 1u32).unwrap();
    assert_eq!(tree.effect_state(id, 0), Some(EffectState::Pending));
    tree.update(id, 0u32).unwrap();
    assert_eq!(tree.host().text(id), "0");
    assert_eq!(tree.effect_state(id, 0), Some(EffectState::Active));
    assert_eq!(tree.pending_effects(), 0);
    assert_eq!(tree.flush_effects(), 0);
    assert_eq!(log.take(), ["render a 1", "render a 0"]);

    tree.update(id, 2u32).unwrap();
    tree.flush_effects();
    assert_eq!(log.take(), ["render a 2", "cleanup a 0", "run a 2"]);
}

#[test]
fn scheduler_drops_slots_a_newer_render_settled() {
    let log = EventLog::default();
    let body = |slot: usize, label: &'static str| {
        let log = log.clone();
        PendingEffect {
            slot,
            deps: Deps::always(),
            body: Box::new(move || {
                log.push(label);
                Ok(Cleanup::none())
            }),
        }
    };
    let (first, second) = (InstanceId::next(), InstanceId::next());
    let mut scheduler = EffectScheduler::default();
    scheduler.enqueue(first, vec![body(0, "first 0"), body(1, "first 1")], &[]);
    scheduler.enqueue(second, vec![body(0, "second 0")], &[]);
    scheduler.enqueue(first, Vec::new(), &[1]);
    assert_eq!(scheduler.len(), 2);
    scheduler.enqueue(second, Vec::new(), &[0]);
    assert_eq!(scheduler.len(), 1);

    for (_, effects) in scheduler.take() {
        for effect in effects {
            (effect.body)().unwrap();
        }
    }
    assert_eq!(log.take(), ["first 0"]);
}
