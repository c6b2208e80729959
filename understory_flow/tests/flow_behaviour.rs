// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Queueing, reentrance, and dispatcher hand-over of the traversal engine.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use understory_flow::{
    Direction, Dispatcher, Flow, FlowError, HistoryCallback, KeyManager, Traversal,
    TraversalCallback,
};
use understory_history::{History, NavKey};

/// Equality is by name only; `tag` tells instances apart.
#[derive(Clone, Debug)]
struct Key {
    name: &'static str,
    tag: u32,
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Key {}

impl NavKey for Key {}

fn key(name: &'static str, tag: u32) -> Key {
    Key { name, tag }
}

fn flow_of<K: NavKey>(keys: impl IntoIterator<Item = K>) -> Flow<K> {
    Flow::new(History::new(keys).unwrap(), KeyManager::default())
}

fn dispatcher<K: NavKey>(
    f: impl Fn(Traversal<K>, TraversalCallback<K>) -> Result<(), FlowError> + 'static,
) -> Rc<dyn Dispatcher<K>> {
    Rc::new(f)
}

#[derive(Default)]
struct Counting {
    cleared: Cell<usize>,
}

impl<K: NavKey> HistoryCallback<K> for Counting {
    fn on_history_cleared(&self) {
        self.cleared.set(self.cleared.get() + 1);
    }
}

fn counting<K: NavKey>(flow: &Flow<K>) -> Rc<Counting> {
    let callback = Rc::new(Counting::default());
    flow.set_history_callback(Some(Rc::clone(&callback) as Rc<dyn HistoryCallback<K>>));
    callback
}

/// Completes every traversal immediately, remembering the last one.
struct Recorder<K: NavKey> {
    last: RefCell<Option<(History<K>, Direction)>>,
    count: Cell<usize>,
}

impl<K: NavKey> Recorder<K> {
    fn top(&self) -> K {
        self.last.borrow().as_ref().unwrap().0.top().clone()
    }

    fn len(&self) -> usize {
        self.last.borrow().as_ref().unwrap().0.len()
    }

    fn direction(&self) -> Direction {
        self.last.borrow().as_ref().unwrap().1
    }
}

impl<K: NavKey> Dispatcher<K> for Recorder<K> {
    fn dispatch(&self, t: Traversal<K>, cb: TraversalCallback<K>) -> Result<(), FlowError> {
        *self.last.borrow_mut() = Some((t.destination().clone(), t.direction()));
        self.count.set(self.count.get() + 1);
        cb.on_traversal_completed()
    }
}

fn attach_recorder<K: NavKey>(flow: &Flow<K>) -> Rc<Recorder<K>> {
    let recorder = Rc::new(Recorder {
        last: RefCell::new(None),
        count: Cell::new(0),
    });
    let erased = Rc::clone(&recorder) as Rc<dyn Dispatcher<K>>;
    flow.set_dispatcher(erased).unwrap();
    recorder
}

/// Holds the traversal until the test fires it.
struct Async<K: NavKey> {
    held: RefCell<Option<(Traversal<K>, TraversalCallback<K>)>>,
}

impl<K: NavKey> Async<K> {
    fn fire(&self) {
        let held = self.held.borrow_mut().take();
        let (_, callback) = held.expect("nothing dispatched");
        callback.on_traversal_completed().unwrap();
    }

    fn assert_idle(&self) {
        assert!(self.held.borrow().is_none());
    }

    fn assert_dispatching(&self, top: &K) {
        let held = self.held.borrow();
        let (traversal, _) = held.as_ref().expect("nothing dispatched");
        assert_eq!(traversal.destination().top(), top);
    }
}

impl<K: NavKey> Dispatcher<K> for Async<K> {
    fn dispatch(&self, t: Traversal<K>, cb: TraversalCallback<K>) -> Result<(), FlowError> {
        let previous = self.held.borrow_mut().replace((t, cb));
        assert!(previous.is_none(), "dispatched while busy");
        Ok(())
    }
}

fn async_dispatcher<K: NavKey>() -> (Rc<Async<K>>, Rc<dyn Dispatcher<K>>) {
    let concrete = Rc::new(Async {
        held: RefCell::new(None),
    });
    let erased = Rc::clone(&concrete) as Rc<dyn Dispatcher<K>>;
    (concrete, erased)
}

#[test]
fn forward_then_back_to_cleared() {
    let flow = flow_of([key("uno", 1)]);
    let recorder = attach_recorder(&flow);
    let history_callback = counting(&flow);

    flow.set(key("dos", 2)).unwrap();
    assert_eq!(recorder.top().name, "dos");
    assert_eq!(recorder.direction(), Direction::Forward);

    flow.set(key("tres", 3)).unwrap();
    assert_eq!(recorder.top().name, "tres");
    assert_eq!(recorder.direction(), Direction::Forward);

    assert!(flow.go_back().unwrap());
    assert_eq!(recorder.top().name, "dos");
    assert_eq!(recorder.direction(), Direction::Backward);

    assert!(flow.go_back().unwrap());
    assert_eq!(recorder.top().name, "uno");
    assert_eq!(history_callback.cleared.get(), 0);

    assert!(!flow.go_back().unwrap());
    assert_eq!(history_callback.cleared.get(), 1);
}

#[test]
fn history_changes_after_dispatch() {
    let flow = flow_of(["uno"]);
    let weak = flow.downgrade();
    let checked = Rc::new(Cell::new(0));
    let seen = Rc::clone(&checked);
    flow.set_dispatcher(dispatcher(move |t: Traversal<&'static str>, cb| {
        let committed = weak.upgrade().unwrap().history();
        assert_eq!(committed.as_slice(), ["uno"]);
        assert_eq!(Some(&committed), t.origin().or(Some(t.destination())));
        seen.set(seen.get() + 1);
        cb.on_traversal_completed()
    }))
    .unwrap();
    flow.set("dos").unwrap();
    assert_eq!(checked.get(), 2);
    assert_eq!(flow.history().as_slice(), ["uno", "dos"]);
}

#[test]
fn initial_history_goes_back_entry_by_entry() {
    let flow = flow_of([key("able", 1), key("baker", 2), key("charlie", 3)]);
    let recorder = attach_recorder(&flow);
    let history_callback = counting(&flow);

    flow.go_back().unwrap();
    assert_eq!(recorder.top().name, "baker");
    flow.go_back().unwrap();
    assert_eq!(recorder.top().name, "able");
    assert_eq!(history_callback.cleared.get(), 0);
    flow.go_back().unwrap();
    assert_eq!(history_callback.cleared.get(), 1);
}

#[test]
fn set_history_then_back() {
    let flow = flow_of([key("able", 1), key("baker", 2)]);
    let recorder = attach_recorder(&flow);
    let history_callback = counting(&flow);

    let next = History::new([key("charlie", 3), key("delta", 4)]).unwrap();
    flow.set_history(next, Direction::Forward).unwrap();
    assert_eq!(recorder.direction(), Direction::Forward);
    assert_eq!(recorder.top().tag, 4);

    flow.go_back().unwrap();
    assert_eq!(recorder.top().tag, 3);
    flow.go_back().unwrap();
    assert_eq!(history_callback.cleared.get(), 1);
}

#[test]
fn set_existing_key_goes_back() {
    let flow = flow_of([
        key("able", 1),
        key("baker", 2),
        key("charlie", 3),
        key("delta", 4),
    ]);
    let recorder = attach_recorder(&flow);

    flow.set(key("charlie", 30)).unwrap();
    assert_eq!(recorder.top().tag, 3);
    assert_eq!(recorder.len(), 3);
    assert_eq!(recorder.direction(), Direction::Backward);

    flow.go_back().unwrap();
    assert_eq!(recorder.top().name, "baker");
    assert_eq!(recorder.direction(), Direction::Backward);
}

#[test]
fn set_missing_key_pushes() {
    let flow = flow_of([key("able", 1), key("baker", 2)]);
    let recorder = attach_recorder(&flow);

    flow.set(key("charlie", 3)).unwrap();
    assert_eq!(recorder.top().name, "charlie");
    assert_eq!(recorder.len(), 3);
    assert_eq!(recorder.direction(), Direction::Forward);
}

#[test]
fn set_bottom_key_keeps_original_instance() {
    let flow = flow_of([key("able", 1), key("baker", 2)]);
    let recorder = attach_recorder(&flow);

    flow.set(key("able", 10)).unwrap();
    assert_eq!(recorder.top().tag, 1);
    assert_eq!(recorder.len(), 1);
    assert_eq!(recorder.direction(), Direction::Backward);
}

#[test]
fn replace_history_leaves_one_entry() {
    let flow = flow_of([key("able", 1), key("baker", 2), key("charlie", 3)]);
    let recorder = attach_recorder(&flow);

    flow.replace_history(key("delta", 4), Direction::Replace).unwrap();
    assert_eq!(recorder.top().tag, 4);
    assert_eq!(recorder.len(), 1);
    assert_eq!(recorder.direction(), Direction::Replace);
}

#[test]
fn replace_top_keeps_length() {
    let flow = flow_of([key("able", 1), key("baker", 2), key("charlie", 3)]);
    let recorder = attach_recorder(&flow);

    flow.replace_top(key("delta", 4), Direction::Replace).unwrap();
    assert_eq!(recorder.top().tag, 4);
    assert_eq!(recorder.len(), 3);
    assert_eq!(recorder.direction(), Direction::Replace);
}

#[test]
fn set_history_keeps_original_prefix() {
    let flow = flow_of([
        key("able", 1),
        key("baker", 2),
        key("charlie", 3),
        key("delta", 4),
    ]);
    let recorder = attach_recorder(&flow);

    let next = History::new([
        key("able", 10),
        key("baker", 20),
        key("echo", 50),
        key("foxtrot", 60),
    ])
    .unwrap();
    flow.set_history(next, Direction::Replace).unwrap();
    assert_eq!(recorder.len(), 4);
    assert_eq!(recorder.top().tag, 60);

    flow.go_back().unwrap();
    assert_eq!(recorder.top().tag, 50);
    flow.go_back().unwrap();
    assert_eq!(recorder.top().tag, 2);
    flow.go_back().unwrap();
    assert_eq!(recorder.top().tag, 1);
}

#[test]
fn second_dispatcher_is_bootstrapped() {
    let flow = flow_of(["able"]);
    let (first, first_erased) = async_dispatcher();
    flow.set_dispatcher(Rc::clone(&first_erased)).unwrap();
    first.assert_dispatching(&"able");
    first.fire();
    first.assert_idle();

    flow.remove_dispatcher(&first_erased);
    let (second, second_erased) = async_dispatcher();
    flow.set_dispatcher(second_erased).unwrap();
    second.assert_dispatching(&"able");
    second.fire();
    second.assert_idle();
}

#[test]
fn hanging_traversal_survives_dispatcher_change() {
    let flow = flow_of(["able"]);
    let (first, first_erased) = async_dispatcher();
    flow.set_dispatcher(Rc::clone(&first_erased)).unwrap();
    first.fire();

    flow.set("baker").unwrap();
    first.assert_dispatching(&"baker");
    flow.remove_dispatcher(&first_erased);

    let (second, second_erased) = async_dispatcher();
    flow.set_dispatcher(second_erased).unwrap();
    second.assert_idle();

    first.fire();
    second.assert_dispatching(&"baker");
    second.fire();
    second.assert_idle();
    assert!(flow.is_idle());
}

#[test]
fn enqueued_traversals_survive_dispatcher_change() {
    let flow = flow_of(["able"]);
    let (first, first_erased) = async_dispatcher();
    flow.set_dispatcher(Rc::clone(&first_erased)).unwrap();
    first.fire();

    flow.remove_dispatcher(&first_erased);
    flow.set("baker").unwrap();
    flow.set("charlie").unwrap();

    let (second, second_erased) = async_dispatcher();
    flow.set_dispatcher(second_erased).unwrap();
    second.assert_dispatching(&"baker");
    second.fire();
    second.assert_dispatching(&"charlie");
    second.fire();
    second.assert_idle();
}

#[test]
fn removing_a_different_dispatcher_is_ignored() {
    let flow = flow_of(["able"]);
    let recorder = attach_recorder(&flow);
    let (_, stranger) = async_dispatcher();
    flow.remove_dispatcher(&stranger);
    flow.set("baker").unwrap();
    assert_eq!(recorder.top(), "baker");
}

#[test]
fn set_compares_by_value() {
    let flow = flow_of([
        String::from("able"),
        String::from("baker"),
        String::from("charlie"),
    ]);
    let recorder = attach_recorder(&flow);
    let history_callback = counting(&flow);

    flow.set(String::from("baker")).unwrap();
    assert_eq!(recorder.len(), 2);
    assert_eq!(recorder.direction(), Direction::Backward);
    flow.go_back().unwrap();
    assert_eq!(recorder.top(), "able");
    flow.go_back().unwrap();
    assert_eq!(history_callback.cleared.get(), 1);
}

#[test]
fn reentrant_set_runs_after_completion() {
    let flow = flow_of(["catalog"]);
    let weak = flow.downgrade();
    flow.set_dispatcher(dispatcher(move |t: Traversal<&'static str>, cb| {
        let flow = weak.upgrade().unwrap();
        match *t.destination().top() {
            "detail" => flow.set("loading")?,
            "loading" => flow.set("error")?,
            _ => {}
        }
        cb.on_traversal_completed()
    }))
    .unwrap();
    flow.set("detail").unwrap();
    assert_eq!(
        flow.history().as_slice(),
        ["catalog", "detail", "loading", "error"]
    );
}

#[test]
fn reentrant_set_then_back() {
    let flow = flow_of(["catalog"]);
    let weak = flow.downgrade();
    let loading = Cell::new(true);
    flow.set_dispatcher(dispatcher(move |t: Traversal<&'static str>, cb| {
        let flow = weak.upgrade().unwrap();
        let top = *t.destination().top();
        if loading.get() {
            match top {
                "detail" => flow.set("loading")?,
                "loading" => flow.set("error")?,
                "error" => {
                    loading.set(false);
                    flow.go_back()?;
                }
                _ => {}
            }
        } else if top == "loading" {
            flow.go_back()?;
        }
        cb.on_traversal_completed()
    }))
    .unwrap();
    flow.set("detail").unwrap();
    assert_eq!(flow.history().as_slice(), ["catalog", "detail"]);
}

#[test]
fn reentrant_set_history_then_set() {
    let flow = flow_of(["catalog"]);
    let weak = flow.downgrade();
    flow.set_dispatcher(dispatcher(move |t: Traversal<&'static str>, cb| {
        let flow = weak.upgrade().unwrap();
        match *t.destination().top() {
            "detail" => {
                let next = History::new(["detail", "loading"])?;
                flow.set_history(next, Direction::Forward)?;
            }
            "loading" => flow.set("error")?,
            _ => {}
        }
        cb.on_traversal_completed()
    }))
    .unwrap();
    flow.set("detail").unwrap();
    assert_eq!(flow.history().as_slice(), ["detail", "loading", "error"]);
}

type Callbacks = Rc<RefCell<VecDeque<TraversalCallback<&'static str>>>>;

fn queueing(flow: &Flow<&'static str>) -> (Callbacks, Rc<RefCell<Vec<&'static str>>>) {
    let callbacks: Callbacks = Rc::default();
    let tops = Rc::new(RefCell::new(Vec::new()));
    let (queue, seen) = (Rc::clone(&callbacks), Rc::clone(&tops));
    flow.set_dispatcher(dispatcher(move |t: Traversal<&'static str>, cb| {
        seen.borrow_mut().push(*t.destination().top());
        queue.borrow_mut().push_back(cb);
        Ok(())
    }))
    .unwrap();
    (callbacks, tops)
}

fn complete_all(callbacks: &Callbacks) -> usize {
    let mut completed = 0;
    loop {
        let next = callbacks.borrow_mut().pop_front();
        let Some(callback) = next else {
            return completed;
        };
        callback.on_traversal_completed().unwrap();
        completed += 1;
    }
}

#[test]
fn go_back_queues_up() {
    let flow = flow_of(["catalog"]);
    let (callbacks, tops) = queueing(&flow);
    let history_callback = counting(&flow);

    flow.set("detail").unwrap();
    flow.set("error").unwrap();
    assert!(flow.go_back().unwrap());
    assert_eq!(history_callback.cleared.get(), 0);

    assert_eq!(complete_all(&callbacks), 4);
    assert_eq!(tops.borrow().last(), Some(&"detail"));
    assert_eq!(flow.history().as_slice(), ["catalog", "detail"]);
}

#[test]
fn overflowing_queued_backs_clear_the_queue() {
    let flow = flow_of(["catalog"]);
    let (callbacks, tops) = queueing(&flow);
    let history_callback = counting(&flow);

    flow.set("detail").unwrap();
    for _ in 0..20 {
        assert!(flow.go_back().unwrap());
        assert_eq!(history_callback.cleared.get(), 0);
    }

    assert_eq!(complete_all(&callbacks), 3);
    assert_eq!(tops.borrow().last(), Some(&"catalog"));
    assert_eq!(flow.history().as_slice(), ["catalog"]);
    assert_eq!(history_callback.cleared.get(), 1);
    assert!(flow.is_idle());
}

#[test]
fn reentrance_waits_for_callback() {
    let flow = flow_of(["catalog"]);
    let weak = flow.downgrade();
    let last: Rc<RefCell<Option<TraversalCallback<&'static str>>>> = Rc::default();
    let slot = Rc::clone(&last);
    flow.set_dispatcher(dispatcher(move |t: Traversal<&'static str>, cb| {
        *slot.borrow_mut() = Some(cb);
        let flow = weak.upgrade().unwrap();
        match *t.destination().top() {
            "detail" => flow.set("loading"),
            "loading" => flow.set("error"),
            _ => Ok(()),
        }
    }))
    .unwrap();
    let complete = || {
        let callback = last.borrow().clone().unwrap();
        callback.on_traversal_completed().unwrap();
    };

    complete();
    flow.set("detail").unwrap();
    assert_eq!(flow.history().as_slice(), ["catalog"]);
    complete();
    assert_eq!(flow.history().as_slice(), ["catalog", "detail"]);
    complete();
    assert_eq!(flow.history().as_slice(), ["catalog", "detail", "loading"]);
    complete();
    assert_eq!(
        flow.history().as_slice(),
        ["catalog", "detail", "loading", "error"]
    );
}

#[test]
fn completing_twice_fails() {
    let flow = flow_of(["catalog"]);
    let (callbacks, _) = queueing(&flow);
    let callback = callbacks.borrow_mut().pop_front().unwrap();
    callback.on_traversal_completed().unwrap();
    assert!(callback.is_completed());
    assert_eq!(
        callback.on_traversal_completed(),
        Err(FlowError::AlreadyCompleted)
    );
}

#[test]
fn callback_outliving_flow_is_detached() {
    let flow = flow_of(["catalog"]);
    let (callbacks, _) = queueing(&flow);
    let callback = callbacks.borrow_mut().pop_front().unwrap();
    drop(flow);
    assert_eq!(callback.on_traversal_completed(), Err(FlowError::Detached));
}

#[test]
fn bootstrap_dispatches_current_history() {
    let flow = flow_of(["catalog"]);
    let recorder = attach_recorder(&flow);
    assert_eq!(recorder.top(), "catalog");
    assert_eq!(recorder.direction(), Direction::Replace);
    assert_eq!(recorder.count.get(), 1);
}

#[test]
fn pending_traversal_replaces_bootstrap() {
    let flow = flow_of(["catalog"]);
    flow.set("detail").unwrap();
    let recorder = attach_recorder(&flow);
    assert_eq!(recorder.count.get(), 1);
    assert_eq!(recorder.top(), "detail");
    assert_eq!(flow.history().as_slice(), ["catalog", "detail"]);
}

#[test]
fn all_pending_traversals_fire() {
    let flow = flow_of(["catalog"]);
    flow.set("loading").unwrap();
    flow.set("detail").unwrap();
    flow.set("error").unwrap();
    let (callbacks, _) = queueing(&flow);

    let first = callbacks.borrow_mut().pop_front().unwrap();
    first.on_traversal_completed().unwrap();
    assert_eq!(flow.history().as_slice(), ["catalog", "loading"]);
    let second = callbacks.borrow_mut().pop_front().unwrap();
    second.on_traversal_completed().unwrap();
    assert_eq!(flow.history().as_slice(), ["catalog", "loading", "detail"]);
}

#[test]
fn clearing_dispatcher_mid_traversal_pauses() {
    let flow = flow_of(["catalog"]);
    let weak = flow.downgrade();
    let me: Rc<RefCell<Option<Rc<dyn Dispatcher<&'static str>>>>> = Rc::default();
    let this = Rc::clone(&me);
    let first = dispatcher(move |_: Traversal<&'static str>, cb| {
        let flow = weak.upgrade().unwrap();
        flow.set("loading")?;
        if let Some(this) = this.borrow().as_ref() {
            flow.remove_dispatcher(this);
        }
        cb.on_traversal_completed()
    });
    *me.borrow_mut() = Some(Rc::clone(&first));
    flow.set_dispatcher(first).unwrap();
    assert_eq!(flow.history().as_slice(), ["catalog"]);

    flow.set_dispatcher(dispatcher(|_: Traversal<&'static str>, cb| {
        cb.on_traversal_completed()
    }))
    .unwrap();
    assert_eq!(flow.history().as_slice(), ["catalog", "loading"]);
    me.borrow_mut().take();
}

#[test]
fn dispatcher_set_mid_flight_waits_for_bootstrap() {
    let flow = flow_of(["catalog"]);
    let (callbacks, _) = queueing(&flow);
    let recorder = attach_recorder(&flow);
    assert_eq!(recorder.count.get(), 0);

    assert_eq!(complete_all(&callbacks), 1);
    assert_eq!(recorder.count.get(), 1);
    assert_eq!(recorder.top(), "catalog");
}

#[test]
fn dispatcher_set_mid_flight_with_queue_needs_no_bootstrap() {
    let flow = flow_of(["catalog"]);
    let weak = flow.downgrade();
    let last: Rc<RefCell<Option<TraversalCallback<&'static str>>>> = Rc::default();
    let slot = Rc::clone(&last);
    flow.set_dispatcher(dispatcher(move |_: Traversal<&'static str>, cb| {
        weak.upgrade().unwrap().set("detail")?;
        *slot.borrow_mut() = Some(cb);
        Ok(())
    }))
    .unwrap();
    let recorder = attach_recorder(&flow);
    assert_eq!(recorder.count.get(), 0);

    let callback = last.borrow_mut().take().unwrap();
    callback.on_traversal_completed().unwrap();
    assert_eq!(recorder.count.get(), 1);
    assert_eq!(recorder.top(), "detail");
    assert_eq!(recorder.len(), 2);
}

#[test]
fn traversals_queued_after_dispatcher_removed_wait_for_next() {
    let flow = flow_of(["catalog"]);
    let weak = flow.downgrade();
    let last: Rc<RefCell<Option<TraversalCallback<&'static str>>>> = Rc::default();
    let slot = Rc::clone(&last);
    let me: Rc<RefCell<Option<Rc<dyn Dispatcher<&'static str>>>>> = Rc::default();
    let this = Rc::clone(&me);
    let first = dispatcher(move |_: Traversal<&'static str>, cb| {
        *slot.borrow_mut() = Some(cb);
        let flow = weak.upgrade().unwrap();
        if let Some(this) = this.borrow().as_ref() {
            flow.remove_dispatcher(this);
        }
        flow.set("loading")
    });
    *me.borrow_mut() = Some(Rc::clone(&first));
    flow.set_dispatcher(first).unwrap();
    assert_eq!(flow.history().as_slice(), ["catalog"]);

    let recorder = attach_recorder(&flow);
    assert_eq!(recorder.count.get(), 0);
    let callback = last.borrow_mut().take().unwrap();
    callback.on_traversal_completed().unwrap();
    assert_eq!(recorder.count.get(), 1);
    assert_eq!(flow.history().as_slice(), ["catalog", "loading"]);
    me.borrow_mut().take();
}

#[test]
fn queued_traversal_without_dispatcher_stays_queued() {
    let flow = flow_of(["catalog"]);
    let (first, first_erased) = async_dispatcher();
    flow.set_dispatcher(Rc::clone(&first_erased)).unwrap();
    flow.set("detail").unwrap();
    flow.remove_dispatcher(&first_erased);
    first.fire();
    first.assert_idle();
    assert!(!flow.is_idle());
    assert_eq!(flow.history().as_slice(), ["catalog"]);
}

#[test]
fn dispatcher_errors_reach_the_caller() {
    let flow = flow_of(["catalog"]);
    let failing = dispatcher(|t: Traversal<&'static str>, cb| {
        if *t.destination().top() == "broken" {
            return Err(FlowError::Codec(String::from("cannot render")));
        }
        cb.on_traversal_completed()
    });
    flow.set_dispatcher(failing).unwrap();
    assert_eq!(
        flow.set("broken"),
        Err(FlowError::Codec(String::from("cannot render")))
    );
}
