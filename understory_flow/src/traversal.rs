// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One transition from an origin history to a destination history.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use understory_history::{History, NavKey};
use understory_scope::Services;

use crate::error::FlowError;
use crate::flow::WeakFlow;
use crate::state::State;

/// How a traversal moves through the history.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Deeper into the stack.
    Forward,
    /// Back towards the bottom.
    Backward,
    /// Neither; the stack was replaced or re-rendered.
    Replace,
}

/// Lifecycle of a queued traversal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TraversalState {
    /// Waiting in the queue.
    Enqueued,
    /// Handed to the dispatcher, waiting for its completion callback.
    Dispatched,
    /// Completed.
    Finished,
}

/// The change a [`Dispatcher`](crate::Dispatcher) is asked to render.
///
/// Besides the two histories, a traversal resolves the services of the
/// destination's top key (and, for a composite key, of its constituents) so the
/// dispatcher never has to look them up, and it gives access to the saved
/// [`State`] of any key.
pub struct Traversal<K: NavKey> {
    origin: Option<History<K>>,
    destination: History<K>,
    direction: Direction,
    incoming: Vec<(K, Rc<Services<K>>)>,
    flow: WeakFlow<K>,
}

impl<K: NavKey> Clone for Traversal<K> {
    fn clone(&self) -> Self {
        Self {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            direction: self.direction,
            incoming: self.incoming.clone(),
            flow: self.flow.clone(),
        }
    }
}

impl<K: NavKey> fmt::Debug for Traversal<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traversal")
            .field("origin", &self.origin)
            .field("destination", &self.destination)
            .field("direction", &self.direction)
            .field("incoming", &self.incoming)
            .finish_non_exhaustive()
    }
}

impl<K: NavKey> Traversal<K> {
    pub(crate) fn new(
        origin: Option<History<K>>,
        destination: History<K>,
        direction: Direction,
        incoming: Vec<(K, Rc<Services<K>>)>,
        flow: WeakFlow<K>,
    ) -> Self {
        Self {
            origin,
            destination,
            direction,
            incoming,
            flow,
        }
    }

    /// The history being left; `None` for a bootstrap traversal.
    pub fn origin(&self) -> Option<&History<K>> {
        self.origin.as_ref()
    }

    /// The history being entered.
    pub fn destination(&self) -> &History<K> {
        &self.destination
    }

    /// Which way the traversal moves.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Services of the destination's top key, preceded by those of its
    /// constituents when the key is composite.
    pub fn incoming_services(&self) -> &[(K, Rc<Services<K>>)] {
        &self.incoming
    }

    /// Services of any key that is set up, such as the origin's top.
    pub fn services(&self, key: &K) -> Result<Rc<Services<K>>, FlowError> {
        self.flow.upgrade().ok_or(FlowError::Detached)?.services(key)
    }

    /// Run `f` on the saved state of `key`, creating it if needed.
    ///
    /// `f` must not call back into the engine.
    pub fn with_state<R>(&self, key: &K, f: impl FnOnce(&mut State<K>) -> R) -> Result<R, FlowError> {
        Ok(self.flow.upgrade().ok_or(FlowError::Detached)?.with_state(key, f))
    }
}

/// Completion handle for one dispatched traversal.
///
/// Call [`on_traversal_completed`](Self::on_traversal_completed) exactly once,
/// synchronously from `dispatch` or at any later time. Until then every further
/// navigation request is queued.
pub struct TraversalCallback<K: NavKey> {
    flow: WeakFlow<K>,
    state: Rc<Cell<TraversalState>>,
}

impl<K: NavKey> Clone for TraversalCallback<K> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl<K: NavKey> fmt::Debug for TraversalCallback<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalCallback")
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl<K: NavKey> TraversalCallback<K> {
    pub(crate) fn new(flow: WeakFlow<K>, state: Rc<Cell<TraversalState>>) -> Self {
        Self { flow, state }
    }

    /// Whether this traversal has already been completed.
    pub fn is_completed(&self) -> bool {
        self.state.get() == TraversalState::Finished
    }

    /// Commit the traversal and let the engine move on.
    ///
    /// The next queued traversal, if any, is dispatched before this returns;
    /// errors it raises are returned here.
    pub fn on_traversal_completed(&self) -> Result<(), FlowError> {
        match self.state.get() {
            TraversalState::Dispatched => {}
            TraversalState::Finished => return Err(FlowError::AlreadyCompleted),
            TraversalState::Enqueued => return Err(FlowError::NotDispatched),
        }
        let flow = self.flow.upgrade().ok_or(FlowError::Detached)?;
        flow.complete(&self.state)
    }
}
