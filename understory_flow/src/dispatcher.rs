// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render collaborator contract and a default implementation.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use understory_history::NavKey;
use understory_scope::Services;

use crate::error::FlowError;
use crate::traversal::{Direction, Traversal, TraversalCallback};

/// Applies traversals to the display.
///
/// `dispatch` must arrange for `callback` to be completed exactly once, either
/// before returning or later. A dispatcher that never completes stalls the
/// engine. Navigation calls made from inside `dispatch` are queued behind the
/// current traversal.
///
/// Closures of the right shape are dispatchers:
///
/// ```
/// use std::rc::Rc;
/// use understory_flow::{Dispatcher, FlowError, Traversal, TraversalCallback};
///
/// let dispatcher: Rc<dyn Dispatcher<&'static str>> = Rc::new(
///     |traversal: Traversal<&'static str>, callback: TraversalCallback<&'static str>| {
///         println!("showing {}", traversal.destination().top());
///         callback.on_traversal_completed()
///     },
/// );
/// # let _ = dispatcher;
/// ```
pub trait Dispatcher<K: NavKey> {
    /// Render `traversal`, then complete `callback`.
    ///
    /// Errors are returned to whoever caused the traversal to execute.
    fn dispatch(
        &self,
        traversal: Traversal<K>,
        callback: TraversalCallback<K>,
    ) -> Result<(), FlowError>;
}

impl<K, F> Dispatcher<K> for F
where
    K: NavKey,
    F: Fn(Traversal<K>, TraversalCallback<K>) -> Result<(), FlowError>,
{
    fn dispatch(
        &self,
        traversal: Traversal<K>,
        callback: TraversalCallback<K>,
    ) -> Result<(), FlowError> {
        self(traversal, callback)
    }
}

/// A top-key change handed to a [`KeyChanger`].
pub struct KeyChange<K: NavKey> {
    /// Top of the origin; `None` on bootstrap.
    pub outgoing: Option<K>,
    /// Top of the destination.
    pub incoming: K,
    /// Direction of the traversal.
    pub direction: Direction,
    /// Services of `incoming`, preceded by those of its constituents.
    pub incoming_services: Vec<(K, Rc<Services<K>>)>,
    /// The traversal, for saving and restoring view state.
    pub traversal: Traversal<K>,
}

impl<K: NavKey> fmt::Debug for KeyChange<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyChange")
            .field("outgoing", &self.outgoing)
            .field("incoming", &self.incoming)
            .field("direction", &self.direction)
            .field("incoming_services", &self.incoming_services)
            .finish_non_exhaustive()
    }
}

/// Swaps the displayed top key.
///
/// Implementations should restore the incoming key's state and, when there is
/// an outgoing key, save its state first.
pub trait KeyChanger<K: NavKey> {
    /// Show `change.incoming`, then complete `callback`.
    fn change_key(
        &self,
        change: KeyChange<K>,
        callback: TraversalCallback<K>,
    ) -> Result<(), FlowError>;
}

/// A [`Dispatcher`] that only looks at the top keys of the two histories.
///
/// When the incoming top equals the outgoing top the traversal completes
/// without consulting the [`KeyChanger`].
#[derive(Clone, Debug, Default)]
pub struct DefaultKeyDispatcher<C> {
    changer: C,
}

impl<C> DefaultKeyDispatcher<C> {
    /// Wrap `changer`.
    pub fn new(changer: C) -> Self {
        Self { changer }
    }

    /// The wrapped key changer.
    pub fn changer(&self) -> &C {
        &self.changer
    }
}

impl<K: NavKey, C: KeyChanger<K>> Dispatcher<K> for DefaultKeyDispatcher<C> {
    fn dispatch(
        &self,
        traversal: Traversal<K>,
        callback: TraversalCallback<K>,
    ) -> Result<(), FlowError> {
        let incoming = traversal.destination().top().clone();
        let outgoing = traversal.origin().map(|origin| origin.top().clone());
        if outgoing.as_ref() == Some(&incoming) {
            tracing::trace!(key = ?incoming, "top unchanged, skipping key change");
            return callback.on_traversal_completed();
        }
        let change = KeyChange {
            outgoing,
            incoming,
            direction: traversal.direction(),
            incoming_services: traversal.incoming_services().to_vec(),
            traversal,
        };
        self.changer.change_key(change, callback)
    }
}
