use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{
    ContainerId, ItemLifecycleController, Lifecycle, LifecycleError, LifecycleEvent,
    LifecycleRegistry, LifecycleState,
};

#[derive(Debug)]
struct Row {
    id: u64,
    label: &'static str,
}

fn row(id: u64, label: &'static str) -> Rc<Row> {
    Rc::new(Row { id, label })
}

struct Fixture {
    parent_registry: LifecycleRegistry,
    parent: Rc<dyn Lifecycle>,
    owner: Option<Rc<dyn Any>>,
    controller: ItemLifecycleController<Row>,
    log: Rc<RefCell<Vec<String>>>,
}

impl Fixture {
    fn new(parent_state: LifecycleState) -> Self {
        let parent_registry = LifecycleRegistry::new();
        parent_registry.transition_to(parent_state);
        let parent: Rc<dyn Lifecycle> = Rc::new(parent_registry.clone());
        let owner: Rc<dyn Any> = Rc::new(());
        let log = Rc::new(RefCell::new(Vec::new()));

        let attach_log = log.clone();
        let attach = Rc::new(move |data: Option<&Row>, lifecycle: &LifecycleRegistry| {
            let label = data.map(|row| row.label).unwrap_or("-");
            attach_log.borrow_mut().push(format!("attach:{label}"));
            // Watch every transition of the freshly renewed lifecycle, the
            // way user setup code subscribes reactive sources.
            let event_log = attach_log.clone();
            lifecycle.add_observer(
                LifecycleState::Initialized,
                Rc::new(move |event, _| event_log.borrow_mut().push(format!("{event:?}"))),
            );
        });
        let bind_log = log.clone();
        let bind = Rc::new(move |data: &Row| {
            bind_log.borrow_mut().push(format!("bind:{}", data.label));
        });

        let controller = ItemLifecycleController::new(
            Rc::downgrade(&owner),
            Rc::new(|a: &Row, b: &Row| a.id == b.id),
            attach,
            bind,
        );
        Self {
            parent_registry,
            parent,
            owner: Some(owner),
            controller,
            log,
        }
    }

    fn attach(&self, container: u64) {
        self.controller
            .on_attached(self.parent.clone(), ContainerId(container));
    }

    fn taken_log(&self) -> Vec<String> {
        self.log.borrow_mut().drain(..).collect()
    }
}

#[test]
fn first_attach_reaches_parent_state_without_gaps() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);

    let lifecycle = fixture.controller.lifecycle().unwrap();
    assert_eq!(lifecycle.current_state(), LifecycleState::Resumed);
    // Attach callback fired once, then every intermediate state in order.
    assert_eq!(
        fixture.taken_log(),
        vec!["attach:-", "Create", "Start", "Resume"]
    );
}

#[test]
fn attach_tracks_a_parent_below_resumed() {
    let fixture = Fixture::new(LifecycleState::Started);
    fixture.attach(1);

    let lifecycle = fixture.controller.lifecycle().unwrap();
    assert_eq!(lifecycle.current_state(), LifecycleState::Started);
    assert_eq!(fixture.taken_log(), vec!["attach:-", "Create", "Start"]);
}

#[test]
fn detach_caps_at_created_without_destroying() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);
    fixture.taken_log();

    fixture.controller.on_detached(ContainerId(1));

    let lifecycle = fixture.controller.lifecycle().unwrap();
    assert_eq!(lifecycle.current_state(), LifecycleState::Created);
    assert_eq!(fixture.taken_log(), vec!["Pause", "Stop"]);
}

#[test]
fn reattach_same_parent_reactivates_without_renewal() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);
    fixture.controller.on_detached(ContainerId(1));
    fixture.taken_log();

    fixture.attach(1);

    let lifecycle = fixture.controller.lifecycle().unwrap();
    assert_eq!(lifecycle.current_state(), LifecycleState::Resumed);
    // No second attach callback; just the walk back up.
    assert_eq!(fixture.taken_log(), vec!["Start", "Resume"]);
}

#[test]
fn attach_under_new_parent_renews() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);
    fixture.taken_log();

    let other_registry = LifecycleRegistry::new();
    other_registry.transition_to(LifecycleState::Started);
    let other_parent: Rc<dyn Lifecycle> = Rc::new(other_registry.clone());
    fixture
        .controller
        .on_attached(other_parent, ContainerId(2));

    let lifecycle = fixture.controller.lifecycle().unwrap();
    assert_eq!(lifecycle.current_state(), LifecycleState::Started);
    // Old pair fully torn down before the new one is set up.
    assert_eq!(
        fixture.taken_log(),
        vec!["Pause", "Stop", "Destroy", "attach:-", "Create", "Start"]
    );
    assert_eq!(fixture.parent_registry.observer_count(), 0);
    assert_eq!(other_registry.observer_count(), 1);
}

#[test]
fn identity_change_renews_before_bind() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);
    fixture.controller.on_data_bound(row(1, "alpha")).unwrap();
    fixture.taken_log();

    fixture.controller.on_data_bound(row(2, "beta")).unwrap();

    assert_eq!(
        fixture.taken_log(),
        vec![
            "Pause",
            "Stop",
            "Destroy",
            "attach:beta",
            "Create",
            "Start",
            "Resume",
            "bind:beta",
        ]
    );
}

#[test]
fn identity_equal_rebind_skips_renewal() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);
    fixture.controller.on_data_bound(row(1, "alpha")).unwrap();
    fixture.taken_log();

    // Same identity, different content: bind only.
    fixture.controller.on_data_bound(row(1, "alpha-v2")).unwrap();

    assert_eq!(fixture.taken_log(), vec!["bind:alpha-v2"]);
}

#[test]
fn bind_before_any_attach_skips_renewal() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.controller.on_data_bound(row(1, "alpha")).unwrap();

    assert_eq!(fixture.taken_log(), vec!["bind:alpha"]);
    assert!(matches!(
        fixture.controller.lifecycle(),
        Err(LifecycleError::NotInitialized)
    ));

    // The attach that follows sees the bound data.
    fixture.attach(1);
    assert_eq!(
        fixture.taken_log(),
        vec!["attach:alpha", "Create", "Start", "Resume"]
    );
}

#[test]
fn recycle_destroys_and_rejects_binds_until_reattach() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);
    fixture.controller.on_data_bound(row(1, "alpha")).unwrap();
    fixture.taken_log();

    fixture.controller.on_recycled();

    assert_eq!(fixture.taken_log(), vec!["Pause", "Stop", "Destroy"]);
    assert!(matches!(
        fixture.controller.lifecycle(),
        Err(LifecycleError::NotInitialized)
    ));
    assert_eq!(
        fixture.controller.on_data_bound(row(1, "alpha")),
        Err(LifecycleError::NotInitialized)
    );
    assert_eq!(fixture.parent_registry.observer_count(), 0);

    fixture.attach(7);
    fixture.taken_log();
    fixture.controller.on_data_bound(row(3, "gamma")).unwrap();
    assert!(fixture.controller.lifecycle().is_ok());
}

#[test]
fn stale_detach_is_ignored() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);
    fixture.taken_log();

    fixture.controller.on_detached(ContainerId(99));

    let lifecycle = fixture.controller.lifecycle().unwrap();
    assert_eq!(lifecycle.current_state(), LifecycleState::Resumed);
    assert!(fixture.taken_log().is_empty());
}

#[test]
fn reclaimed_owner_freezes_the_item() {
    let mut fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);
    fixture.taken_log();
    let lifecycle = fixture.controller.lifecycle().unwrap();

    fixture.owner = None; // simulate owner collection
    fixture
        .parent_registry
        .handle_event(LifecycleEvent::Pause)
        .unwrap();

    // Bridge unsubscribed instead of forwarding; state frozen.
    assert_eq!(fixture.parent_registry.observer_count(), 0);
    assert_eq!(lifecycle.current_state(), LifecycleState::Resumed);
    assert!(fixture.taken_log().is_empty());

    // Explicit teardown still works.
    fixture.controller.destroy();
    assert_eq!(lifecycle.current_state(), LifecycleState::Destroyed);
}

#[test]
fn destroy_is_idempotent() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    fixture.attach(1);
    fixture.taken_log();

    fixture.controller.destroy();
    let first = fixture.taken_log();
    fixture.controller.destroy();

    assert_eq!(first, vec!["Pause", "Stop", "Destroy"]);
    assert!(fixture.taken_log().is_empty());
    assert_eq!(fixture.parent_registry.observer_count(), 0);
}

/// Controller shared with observers registered from its own attach
/// callback, for driving structural calls from inside walk notifications.
struct SharedFixture {
    parent_registry: LifecycleRegistry,
    parent: Rc<dyn Lifecycle>,
    _owner: Rc<dyn Any>,
    controller: Rc<ItemLifecycleController<Row>>,
    log: Rc<RefCell<Vec<String>>>,
}

impl SharedFixture {
    /// `on_step` runs inside every observer notification with the shared
    /// controller handle, the renewal generation and the step's event/state.
    fn new(
        on_step: impl Fn(&ItemLifecycleController<Row>, u32, LifecycleEvent, LifecycleState)
            + 'static,
    ) -> Self {
        let parent_registry = LifecycleRegistry::new();
        parent_registry.transition_to(LifecycleState::Resumed);
        let parent: Rc<dyn Lifecycle> = Rc::new(parent_registry.clone());
        let owner: Rc<dyn Any> = Rc::new(());
        let log = Rc::new(RefCell::new(Vec::new()));
        let controller_slot: Rc<RefCell<Option<Rc<ItemLifecycleController<Row>>>>> =
            Rc::new(RefCell::new(None));
        let on_step = Rc::new(on_step);

        let attach_log = log.clone();
        let attach_slot = controller_slot.clone();
        let generation = Rc::new(Cell::new(0u32));
        let attach = Rc::new(move |_: Option<&Row>, lifecycle: &LifecycleRegistry| {
            generation.set(generation.get() + 1);
            let generation = generation.get();
            attach_log.borrow_mut().push(format!("attach#{generation}"));
            let sink = attach_log.clone();
            let slot = attach_slot.clone();
            let on_step = on_step.clone();
            lifecycle.add_observer(
                LifecycleState::Initialized,
                Rc::new(move |event, state| {
                    sink.borrow_mut().push(format!("g{generation}:{event:?}"));
                    if let Some(controller) = slot.borrow().as_ref() {
                        on_step(controller, generation, event, state);
                    }
                }),
            );
        });
        let controller = Rc::new(ItemLifecycleController::new(
            Rc::downgrade(&owner),
            Rc::new(|a: &Row, b: &Row| a.id == b.id),
            attach,
            Rc::new(|_: &Row| {}),
        ));
        *controller_slot.borrow_mut() = Some(controller.clone());
        Self {
            parent_registry,
            parent,
            _owner: owner,
            controller,
            log,
        }
    }

    fn taken_log(&self) -> Vec<String> {
        self.log.borrow_mut().drain(..).collect()
    }
}

#[test]
fn reattach_during_setup_walk_is_rejected() {
    let other_registry = LifecycleRegistry::new();
    other_registry.transition_to(LifecycleState::Resumed);
    let other_parent: Rc<dyn Lifecycle> = Rc::new(other_registry.clone());

    let fired = Rc::new(Cell::new(false));
    let reentry_parent = other_parent.clone();
    let fixture = SharedFixture::new(move |controller, generation, _, state| {
        if generation == 1 && state == LifecycleState::Started && !fired.replace(true) {
            controller.on_attached(reentry_parent.clone(), ContainerId(2));
        }
    });

    fixture
        .controller
        .on_attached(fixture.parent.clone(), ContainerId(1));

    // The re-entrant attach bounced; the first pair finished its setup walk
    // uninterleaved and no second pair was created.
    assert_eq!(
        fixture.taken_log(),
        vec!["attach#1", "g1:Create", "g1:Start", "g1:Resume"]
    );
    let lifecycle = fixture.controller.lifecycle().unwrap();
    assert_eq!(lifecycle.current_state(), LifecycleState::Resumed);
    assert_eq!(other_registry.observer_count(), 0);
    assert_eq!(fixture.parent_registry.observer_count(), 1);
}

#[test]
fn structural_calls_during_teardown_are_rejected() {
    let fixture = SharedFixture::new(move |controller, _, event, _| {
        if event == LifecycleEvent::Pause {
            controller.on_recycled();
            // lifecycle() is a read, not a structural call; it observes the
            // already-cleared pair mid-teardown.
            assert_eq!(
                controller.lifecycle().err(),
                Some(LifecycleError::NotInitialized)
            );
            controller.destroy();
        }
    });
    fixture
        .controller
        .on_attached(fixture.parent.clone(), ContainerId(1));
    fixture.taken_log();

    fixture.controller.on_recycled();

    assert_eq!(
        fixture.taken_log(),
        vec!["g1:Pause", "g1:Stop", "g1:Destroy"]
    );
    assert!(matches!(
        fixture.controller.lifecycle(),
        Err(LifecycleError::NotInitialized)
    ));
}

#[test]
fn reattach_during_detach_walk_is_rejected() {
    let reentry_registry = LifecycleRegistry::new();
    reentry_registry.transition_to(LifecycleState::Resumed);
    let reentry_parent: Rc<dyn Lifecycle> = Rc::new(reentry_registry.clone());

    let p = reentry_parent.clone();
    let fixture = SharedFixture::new(move |controller, _, event, _| {
        if event == LifecycleEvent::Pause {
            controller.on_attached(p.clone(), ContainerId(1));
        }
    });
    fixture
        .controller
        .on_attached(fixture.parent.clone(), ContainerId(1));
    fixture.taken_log();

    fixture.controller.on_detached(ContainerId(1));

    // The detach walk completed without a re-entrant reactivation.
    assert_eq!(fixture.taken_log(), vec!["g1:Pause", "g1:Stop"]);
    assert_eq!(
        fixture.controller.lifecycle().unwrap().current_state(),
        LifecycleState::Created
    );
    assert_eq!(reentry_registry.observer_count(), 0);
}

#[test]
fn lifecycle_unavailable_before_first_attach() {
    let fixture = Fixture::new(LifecycleState::Resumed);
    assert!(matches!(
        fixture.controller.lifecycle(),
        Err(LifecycleError::NotInitialized)
    ));
}
