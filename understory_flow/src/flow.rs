// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The traversal engine.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::mem;

use understory_history::{Builder, History, HistoryError, NavKey};
use understory_scope::{ScopeManager, Services};

use crate::callback::HistoryCallback;
use crate::diff::{distinct, entering, leaving};
use crate::dispatcher::Dispatcher;
use crate::error::FlowError;
use crate::key_manager::KeyManager;
use crate::state::State;
use crate::traversal::{Direction, Traversal, TraversalCallback, TraversalState};

#[derive(Clone, Debug)]
enum Operation<K> {
    /// Render the current history to a newly attached dispatcher.
    Bootstrap,
    Set(K),
    GoBack,
    SetHistory(History<K>, Direction),
}

/// A queued request. The queue is owned by its head; `next` links run in
/// enqueue order.
struct PendingTraversal<K> {
    operation: Operation<K>,
    state: Rc<Cell<TraversalState>>,
    /// Set when the traversal changes the history; bootstraps leave it empty.
    next_history: Option<History<K>>,
    next: Option<Box<Self>>,
}

impl<K> PendingTraversal<K> {
    fn new(operation: Operation<K>) -> Box<Self> {
        Box::new(Self {
            operation,
            state: Rc::new(Cell::new(TraversalState::Enqueued)),
            next_history: None,
            next: None,
        })
    }

    fn enqueue(&mut self, pending: Box<Self>) {
        match self.next.as_mut() {
            Some(next) => next.enqueue(pending),
            None => self.next = Some(pending),
        }
    }

    fn queue_len(&self) -> usize {
        1 + self.next.as_ref().map_or(0, |next| next.queue_len())
    }
}

/// The head's work, computed under the engine's borrow and finished after
/// its keys are set up.
enum Begin<K: NavKey> {
    Idle,
    Prepare {
        /// Keys to set up before the head can be dispatched, in order.
        set_up: Vec<K>,
        head: Prepared<K>,
    },
    Cleared {
        released: Vec<K>,
        callback: Option<Rc<dyn HistoryCallback<K>>>,
    },
}

struct Prepared<K: NavKey> {
    dispatcher: Rc<dyn Dispatcher<K>>,
    state: Rc<Cell<TraversalState>>,
    /// Whether preparing this head marked the history keys as set up.
    claimed_history: bool,
    origin: Option<History<K>>,
    destination: History<K>,
    direction: Direction,
}

struct Dispatch<K: NavKey> {
    dispatcher: Rc<dyn Dispatcher<K>>,
    traversal: Traversal<K>,
    callback: TraversalCallback<K>,
}

enum AfterCommit<K> {
    RunNext,
    Wait,
    /// The queue drained; these keys left the history.
    Release(Vec<K>),
}

struct FlowInner<K: NavKey> {
    history: History<K>,
    keys: KeyManager<K>,
    dispatcher: Option<Rc<dyn Dispatcher<K>>>,
    history_callback: Option<Rc<dyn HistoryCallback<K>>>,
    pending: Option<Box<PendingTraversal<K>>>,
    /// Keys that left the committed history; released once the queue drains.
    tear_down_keys: Vec<K>,
    /// Whether the keys of the committed history hold a use.
    scopes_ready: bool,
    /// Set while the head's keys are being set up.
    preparing: bool,
}

/// Holds the current history and serializes every change to it.
///
/// A `Flow` is a cheap handle; clones share one engine. All methods may be
/// called from inside [`Dispatcher::dispatch`], a completion callback, a
/// [`ServicesFactory`](understory_scope::ServicesFactory) or a
/// [`ModelScope`](understory_scope::ModelScope). Navigation requested while a
/// traversal's keys are being set up is queued behind it.
///
/// ## Traversals
///
/// Each navigation request becomes a traversal in a queue. The head of the
/// queue is dispatched as soon as a dispatcher is attached; the rest wait until
/// the head's [`TraversalCallback`] is completed. Completing commits the
/// traversal's destination as the new history. Keys that left the history are
/// released only when the queue is empty, so keys that leave and come back
/// while requests are queued keep their services and saved state.
///
/// ## Usage
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use understory_flow::{Direction, Dispatcher, Flow, KeyManager, Traversal, TraversalCallback};
/// use understory_history::History;
///
/// let shown = Rc::new(RefCell::new(Vec::new()));
/// let log = Rc::clone(&shown);
/// let dispatcher: Rc<dyn Dispatcher<&'static str>> = Rc::new(
///     move |t: Traversal<&'static str>, cb: TraversalCallback<&'static str>| {
///         log.borrow_mut().push((*t.destination().top(), t.direction()));
///         cb.on_traversal_completed()
///     },
/// );
///
/// let flow = Flow::new(History::single("home"), KeyManager::default());
/// flow.set_dispatcher(dispatcher).unwrap();
/// flow.set("detail").unwrap();
/// assert!(flow.go_back().unwrap());
/// assert_eq!(
///     *shown.borrow(),
///     [
///         ("home", Direction::Replace),
///         ("detail", Direction::Forward),
///         ("home", Direction::Backward),
///     ]
/// );
/// ```
pub struct Flow<K: NavKey> {
    inner: Rc<RefCell<FlowInner<K>>>,
}

impl<K: NavKey> Clone for Flow<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: NavKey> fmt::Debug for Flow<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Flow");
        if let Ok(inner) = self.inner.try_borrow() {
            s.field("history", &inner.history)
                .field("pending", &inner.pending.as_ref().map_or(0, |p| p.queue_len()))
                .field("has_dispatcher", &inner.dispatcher.is_some());
        }
        s.finish_non_exhaustive()
    }
}

/// A non-owning [`Flow`] handle, held by traversals and callbacks.
pub struct WeakFlow<K: NavKey> {
    inner: Weak<RefCell<FlowInner<K>>>,
}

impl<K: NavKey> Clone for WeakFlow<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<K: NavKey> fmt::Debug for WeakFlow<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakFlow")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<K: NavKey> WeakFlow<K> {
    /// The engine, if it is still alive.
    pub fn upgrade(&self) -> Option<Flow<K>> {
        self.inner.upgrade().map(|inner| Flow { inner })
    }
}

impl<K: NavKey> Flow<K> {
    /// Create an engine showing `history`, with no dispatcher attached.
    pub fn new(history: History<K>, keys: KeyManager<K>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FlowInner {
                history,
                keys,
                dispatcher: None,
                history_callback: None,
                pending: None,
                tear_down_keys: Vec::new(),
                scopes_ready: false,
                preparing: false,
            })),
        }
    }

    /// A handle that does not keep the engine alive.
    pub fn downgrade(&self) -> WeakFlow<K> {
        WeakFlow {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The committed history.
    ///
    /// While a traversal is dispatched this is still its origin.
    pub fn history(&self) -> History<K> {
        self.inner.borrow().history.clone()
    }

    /// Whether no traversal is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.inner.borrow().pending.is_none()
    }

    /// The installed history callback.
    pub fn history_callback(&self) -> Option<Rc<dyn HistoryCallback<K>>> {
        self.inner.borrow().history_callback.clone()
    }

    /// Install or remove the history callback.
    pub fn set_history_callback(&self, callback: Option<Rc<dyn HistoryCallback<K>>>) {
        self.inner.borrow_mut().history_callback = callback;
    }

    /// Attach `dispatcher`; it may be asked to dispatch before this returns.
    ///
    /// When nothing is queued behind the current traversal, a bootstrap
    /// traversal rendering the current history is queued for the new
    /// dispatcher. A traversal that was queued while no dispatcher was
    /// attached runs now instead. A traversal already handed to a previous
    /// dispatcher is not affected.
    pub fn set_dispatcher(&self, dispatcher: Rc<dyn Dispatcher<K>>) -> Result<(), FlowError> {
        enum Next {
            Bootstrap,
            Execute,
            Wait,
        }

        let next = {
            let mut inner = self.inner.borrow_mut();
            inner.dispatcher = Some(dispatcher);
            match inner.pending.as_deref() {
                None => Next::Bootstrap,
                Some(head) => match head.state.get() {
                    TraversalState::Dispatched if head.next.is_none() => Next::Bootstrap,
                    TraversalState::Dispatched => Next::Wait,
                    TraversalState::Enqueued => Next::Execute,
                    TraversalState::Finished => return Err(FlowError::HangingTraversal),
                },
            }
        };
        tracing::debug!("dispatcher attached");
        match next {
            Next::Bootstrap => self.enqueue(Operation::Bootstrap),
            Next::Execute => self.execute_head(),
            Next::Wait => Ok(()),
        }
    }

    /// Detach `dispatcher` if it is the attached one.
    ///
    /// Queued traversals, including those that follow an in-flight one, wait
    /// until a dispatcher is attached again.
    pub fn remove_dispatcher(&self, dispatcher: &Rc<dyn Dispatcher<K>>) {
        let mut inner = self.inner.borrow_mut();
        if inner
            .dispatcher
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, dispatcher))
        {
            inner.dispatcher = None;
            tracing::debug!("dispatcher detached");
        }
    }

    /// Make `key` the top of the history.
    ///
    /// - Equal to the current top: the history is dispatched unchanged with
    ///   [`Direction::Replace`], or with its top replaced by `key` when `key`
    ///   is non-preservable.
    /// - Equal to a lower entry: everything above that entry is popped and the
    ///   entry itself is kept (or replaced by `key` when non-preservable);
    ///   [`Direction::Backward`].
    /// - Otherwise `key` is pushed; [`Direction::Forward`].
    pub fn set(&self, key: K) -> Result<(), FlowError> {
        self.enqueue(Operation::Set(key))
    }

    /// Pop the top key.
    ///
    /// Returns `false`, after calling
    /// [`on_history_cleared`](HistoryCallback::on_history_cleared), when the
    /// history has a single entry and no traversal is pending. A queued go-back
    /// that finds a single entry when it runs clears the engine instead:
    /// released keys are torn down, all saved state is dropped, the rest of
    /// the queue is discarded and the history callback is told.
    pub fn go_back(&self) -> Result<bool, FlowError> {
        let (can_go_back, callback) = {
            let inner = self.inner.borrow();
            let pending = inner
                .pending
                .as_ref()
                .is_some_and(|head| head.state.get() != TraversalState::Finished);
            (
                inner.history.len() > 1 || pending,
                inner.history_callback.clone(),
            )
        };
        if !can_go_back {
            tracing::debug!("nothing to go back to");
            if let Some(callback) = callback {
                callback.on_history_cleared();
            }
            return Ok(false);
        }
        self.enqueue(Operation::GoBack)?;
        Ok(true)
    }

    /// Replace the history, keeping the original instances of the longest
    /// equal prefix it shares with the current one.
    pub fn set_history(&self, history: History<K>, direction: Direction) -> Result<(), FlowError> {
        self.enqueue(Operation::SetHistory(history, direction))
    }

    /// Replace the whole history with `key`.
    pub fn replace_history(&self, key: K, direction: Direction) -> Result<(), FlowError> {
        self.set_history(History::single(key), direction)
    }

    /// Replace the top of the current history with `key`.
    pub fn replace_top(&self, key: K, direction: Direction) -> Result<(), FlowError> {
        let mut builder = self.history().build_upon();
        builder.pop()?;
        builder.push(key);
        self.set_history(builder.build()?, direction)
    }

    /// Services of a key that is set up.
    pub fn services(&self, key: &K) -> Result<Rc<Services<K>>, FlowError> {
        self.inner.borrow().keys.find_services(key)
    }

    /// A live shared model.
    pub fn model<T: Any>(&self, scope: &str, tag: &str) -> Result<Rc<T>, FlowError> {
        self.inner.borrow().keys.model(scope, tag)
    }

    /// Run `f` on the saved state of `key`, creating it if needed.
    ///
    /// # Panics
    ///
    /// If `f` calls back into this engine.
    pub fn with_state<R>(&self, key: &K, f: impl FnOnce(&mut State<K>) -> R) -> R {
        f(self.inner.borrow_mut().keys.state_mut(key))
    }

    /// Read the engine's per-key resources.
    ///
    /// # Panics
    ///
    /// If `f` mutates this engine.
    pub fn with_keys<R>(&self, f: impl FnOnce(&KeyManager<K>) -> R) -> R {
        f(&self.inner.borrow().keys)
    }

    pub(crate) fn add_states(&self, states: impl IntoIterator<Item = State<K>>) {
        let mut inner = self.inner.borrow_mut();
        for state in states {
            inner.keys.add_state(state);
        }
    }

    /// Release every key this engine holds a use of, including the keys
    /// entering with a dispatched traversal that has not completed.
    pub(crate) fn tear_down_all(&self) -> Result<(), FlowError> {
        let released = {
            let mut inner = self.inner.borrow_mut();
            let inner = &mut *inner;
            if !inner.scopes_ready {
                return Ok(());
            }
            inner.scopes_ready = false;
            let mut released = mem::take(&mut inner.tear_down_keys);
            if let Some(next) = inner.pending.as_deref().and_then(|h| h.next_history.as_ref()) {
                released.extend(entering(&inner.history, next).into_iter().rev());
            }
            released.extend(distinct(inner.history.as_slice()).into_iter().rev().cloned());
            released
        };
        self.release_keys(&released)?;
        tracing::debug!("all keys torn down");
        Ok(())
    }

    fn enqueue(&self, operation: Operation<K>) -> Result<(), FlowError> {
        let run = {
            let mut inner = self.inner.borrow_mut();
            let inner = &mut *inner;
            tracing::trace!(?operation, "traversal enqueued");
            let pending = PendingTraversal::new(operation);
            match inner.pending.as_mut() {
                Some(head) => {
                    head.enqueue(pending);
                    false
                }
                None => {
                    inner.pending = Some(pending);
                    inner.dispatcher.is_some()
                }
            }
        };
        if run { self.execute_head() } else { Ok(()) }
    }

    fn execute_head(&self) -> Result<(), FlowError> {
        let begin = self.inner.borrow_mut().begin_head()?;
        let (set_up, head) = match begin {
            Begin::Idle => return Ok(()),
            Begin::Cleared { released, callback } => {
                self.release_keys(&released)?;
                if let Some(callback) = callback {
                    callback.on_history_cleared();
                }
                return Ok(());
            }
            Begin::Prepare { set_up, head } => (set_up, head),
        };
        self.set_up_keys(&set_up);
        let finished = self.inner.borrow_mut().finish_head(head, self.downgrade());
        match finished {
            Ok(Dispatch {
                dispatcher,
                traversal,
                callback,
            }) => dispatcher.dispatch(traversal, callback),
            Err(err) => {
                let rollback: Vec<K> = set_up.into_iter().rev().collect();
                self.release_keys(&rollback)?;
                Err(err)
            }
        }
    }

    pub(crate) fn complete(&self, state: &Rc<Cell<TraversalState>>) -> Result<(), FlowError> {
        let after = self.inner.borrow_mut().commit_head(state)?;
        match after {
            AfterCommit::RunNext => self.execute_head(),
            AfterCommit::Wait => Ok(()),
            AfterCommit::Release(keys) => self.release_keys(&keys),
        }
    }

    /// Register one use of each key, models first, then services from the
    /// outermost dependency in. Factories and model scopes run while the
    /// engine is not borrowed.
    fn set_up_keys(&self, keys: &[K]) {
        let factories = self.inner.borrow().keys.scopes().factories();
        for key in keys {
            let missing = self.inner.borrow_mut().keys.models_mut().retain(key);
            for (scope, relation) in missing {
                let model = scope.create_model(&relation.tag);
                self.inner
                    .borrow_mut()
                    .keys
                    .models_mut()
                    .insert(key, relation, model);
            }

            let mut parent: Option<Rc<Services<K>>> = None;
            for step in ScopeManager::set_up_steps(key) {
                let retained = self.inner.borrow_mut().keys.scopes_mut().retain(&step.key);
                let services = match retained {
                    Some(services) => services,
                    None => {
                        let base = if step.nested { parent.take() } else { None };
                        let mut binder = self.inner.borrow().keys.scopes().binder(step.key, base);
                        for factory in factories.iter() {
                            factory.bind_services(&mut binder);
                        }
                        self.inner.borrow_mut().keys.scopes_mut().insert(binder)
                    }
                };
                parent = Some(services);
            }
        }
    }

    /// Release one use of each key, in order, the way
    /// [`KeyManager::tear_down`] does but without holding the engine.
    fn release_keys(&self, keys: &[K]) -> Result<(), FlowError> {
        if keys.is_empty() {
            return Ok(());
        }
        let factories = self.inner.borrow().keys.scopes().factories();
        for key in keys {
            for step in ScopeManager::set_up_steps(key).into_iter().rev() {
                let released = self.inner.borrow_mut().keys.scopes_mut().release(&step.key)?;
                if let Some(services) = released {
                    for factory in factories.iter().rev() {
                        factory.tear_down_services(&services);
                    }
                }
            }
            // Dropped models are released after the borrow ends.
            let dropped = self.inner.borrow_mut().keys.models_mut().release(key);
            drop(dropped);
        }
        Ok(())
    }
}

impl<K: NavKey> FlowInner<K> {
    /// Work out the head's destination and the keys it needs.
    ///
    /// Nothing changes when this fails; the head stays enqueued.
    fn begin_head(&mut self) -> Result<Begin<K>, FlowError> {
        if self.preparing {
            return Ok(Begin::Idle);
        }
        let dispatcher = self.dispatcher.clone().ok_or(FlowError::NoDispatcher)?;
        let Some(head) = self.pending.as_deref() else {
            return Ok(Begin::Idle);
        };
        if head.state.get() != TraversalState::Enqueued {
            return Err(FlowError::HangingTraversal);
        }
        let state = Rc::clone(&head.state);
        let operation = head.operation.clone();

        let next = match operation {
            Operation::Bootstrap => None,
            Operation::Set(key) => Some(self.destination_for_set(key)?),
            Operation::GoBack => {
                if self.history.len() <= 1 {
                    // The history shrank while this request was queued.
                    return Ok(self.clear());
                }
                let mut builder = self.history.build_upon();
                builder.pop()?;
                Some((builder.build()?, Direction::Backward))
            }
            Operation::SetHistory(history, direction) => Some((
                preserve_equivalent_prefix(&self.history, &history)?,
                direction,
            )),
        };

        let mut set_up = Vec::new();
        let claimed_history = !self.scopes_ready;
        if claimed_history {
            set_up.extend(distinct(self.history.as_slice()).into_iter().cloned());
            self.scopes_ready = true;
        }
        let (origin, destination, direction) = match next {
            None => (None, self.history.clone(), Direction::Replace),
            Some((destination, direction)) => {
                set_up.extend(entering(&self.history, &destination));
                (Some(self.history.clone()), destination, direction)
            }
        };
        self.preparing = true;
        Ok(Begin::Prepare {
            set_up,
            head: Prepared {
                dispatcher,
                state,
                claimed_history,
                origin,
                destination,
                direction,
            },
        })
    }

    /// Mark the prepared head dispatched once its incoming services resolve.
    ///
    /// On failure the head stays enqueued and the caller releases the keys
    /// it set up.
    fn finish_head(
        &mut self,
        head: Prepared<K>,
        flow: WeakFlow<K>,
    ) -> Result<Dispatch<K>, FlowError> {
        self.preparing = false;
        let Prepared {
            dispatcher,
            state,
            claimed_history,
            origin,
            destination,
            direction,
        } = head;
        let owned = self.pending.as_deref().is_some_and(|pending| {
            Rc::ptr_eq(&pending.state, &state) && state.get() == TraversalState::Enqueued
        });
        let incoming = if owned {
            self.keys.incoming_services(destination.top())
        } else {
            Err(FlowError::HangingTraversal)
        };
        let incoming = match incoming {
            Ok(incoming) => incoming,
            Err(err) => {
                if claimed_history {
                    self.scopes_ready = false;
                }
                return Err(err);
            }
        };

        if let Some(pending) = self.pending.as_deref_mut() {
            if origin.is_some() {
                pending.next_history = Some(destination.clone());
            }
            pending.state.set(TraversalState::Dispatched);
        }
        tracing::debug!(
            top = ?destination.top(),
            ?direction,
            bootstrap = origin.is_none(),
            "dispatching traversal"
        );
        Ok(Dispatch {
            dispatcher,
            traversal: Traversal::new(origin, destination, direction, incoming, flow.clone()),
            callback: TraversalCallback::new(flow, state),
        })
    }

    fn destination_for_set(&self, key: K) -> Result<(History<K>, Direction), HistoryError> {
        let history = &self.history;
        if key == *history.top() {
            if !key.is_non_preservable() {
                return Ok((history.clone(), Direction::Replace));
            }
            let mut builder = history.build_upon();
            builder.pop()?;
            builder.push(key);
            return Ok((builder.build()?, Direction::Replace));
        }

        let mut builder = history.build_upon();
        let direction = match history.position(&key) {
            Some(found) => {
                builder.pop_count(history.len() - found)?;
                if key.is_non_preservable() {
                    builder.push(key);
                } else {
                    builder.push(history.as_slice()[found].clone());
                }
                Direction::Backward
            }
            None => {
                builder.push(key);
                Direction::Forward
            }
        };
        Ok((builder.build()?, direction))
    }

    /// Commit the head, which must own `state`.
    fn commit_head(
        &mut self,
        state: &Rc<Cell<TraversalState>>,
    ) -> Result<AfterCommit<K>, FlowError> {
        let mut head = match self.pending.take() {
            Some(head) if Rc::ptr_eq(&head.state, state) => head,
            other => {
                self.pending = other;
                return Err(FlowError::HangingTraversal);
            }
        };
        if let Some(next_history) = head.next_history.take() {
            // After a full teardown the old history holds no uses to release.
            if self.scopes_ready {
                self.tear_down_keys
                    .extend(leaving(&self.history, &next_history));
            }
            self.history = next_history;
        }
        head.state.set(TraversalState::Finished);
        self.pending = head.next.take();
        tracing::debug!(top = ?self.history.top(), "traversal completed");

        if self.pending.is_some() {
            return Ok(if self.dispatcher.is_some() {
                AfterCommit::RunNext
            } else {
                AfterCommit::Wait
            });
        }
        let released = mem::take(&mut self.tear_down_keys);
        if !released.is_empty() {
            tracing::debug!(count = released.len(), "tearing down released keys");
        }
        self.keys.clear_states_except(&self.history);
        Ok(AfterCommit::Release(released))
    }

    fn clear(&mut self) -> Begin<K> {
        let released = mem::take(&mut self.tear_down_keys);
        self.keys.clear_states();
        if let Some(head) = self.pending.take() {
            head.state.set(TraversalState::Finished);
        }
        tracing::debug!("history cleared by queued go-back");
        Begin::Cleared {
            released,
            callback: self.history_callback.clone(),
        }
    }
}

/// `proposed`, reusing the instances of `current` for the longest prefix of
/// equal entries. A non-preservable entry ends the prefix.
pub(crate) fn preserve_equivalent_prefix<K: NavKey>(
    current: &History<K>,
    proposed: &History<K>,
) -> Result<History<K>, HistoryError> {
    let mut old = current.frames_from_bottom();
    let mut new = proposed.frames_from_bottom();
    let mut preserving = Builder::new();
    for entry in new.by_ref() {
        if entry.is_non_preservable() {
            preserving.push(entry.clone());
            break;
        }
        match old.next() {
            Some(original) if original == entry => {
                preserving.push(original.clone());
            }
            _ => {
                preserving.push(entry.clone());
                break;
            }
        }
    }
    preserving.push_all(new.cloned());
    preserving.build()
}
