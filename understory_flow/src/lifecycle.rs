// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binding a [`Flow`] to the lifecycle of a host that may be recreated.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use understory_history::{History, NavKey};
use understory_scope::{ModelScope, ServicesFactory};

use crate::callback::{HistoryCallback, NotPersistentHistoryCallback};
use crate::dispatcher::Dispatcher;
use crate::error::FlowError;
use crate::flow::Flow;
use crate::key_manager::KeyManager;
use crate::persist::{KeyParceler, NoParceler, SavedHistory, SavedState};
use crate::state::State;
use crate::traversal::Direction;

/// Everything needed to install a [`Flow`] in a host.
///
/// Without a [key parceler](Self::key_parceler) histories are never saved or
/// restored. The default history callback is [`NotPersistentHistoryCallback`].
pub struct FlowConfig<K: NavKey, P = NoParceler> {
    default_history: History<K>,
    factories: Vec<Box<dyn ServicesFactory<K>>>,
    model_scopes: Vec<Box<dyn ModelScope>>,
    history_callback: Rc<dyn HistoryCallback<K>>,
    parceler: Option<P>,
}

impl<K: NavKey, P: fmt::Debug> fmt::Debug for FlowConfig<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowConfig")
            .field("default_history", &self.default_history)
            .field("factories", &self.factories.len())
            .field("model_scopes", &self.model_scopes.len())
            .field("parceler", &self.parceler)
            .finish_non_exhaustive()
    }
}

impl<K: NavKey> FlowConfig<K> {
    /// Start a configuration whose default history is `default_key` alone.
    pub fn new(default_key: K) -> Self {
        Self {
            default_history: History::single(default_key),
            factories: Vec::new(),
            model_scopes: Vec::new(),
            history_callback: Rc::new(NotPersistentHistoryCallback),
            parceler: None,
        }
    }
}

impl<K: NavKey, P: KeyParceler<K>> FlowConfig<K, P> {
    /// The history shown when nothing is restored.
    pub fn default_history(mut self, history: History<K>) -> Self {
        self.default_history = history;
        self
    }

    /// Add a services factory; factories bind in the order they are added.
    pub fn services_factory(mut self, factory: impl ServicesFactory<K> + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// Add a model scope.
    pub fn model_scope(mut self, scope: impl ModelScope + 'static) -> Self {
        self.model_scopes.push(Box::new(scope));
        self
    }

    /// Replace the history callback.
    pub fn history_callback(mut self, callback: impl HistoryCallback<K> + 'static) -> Self {
        self.history_callback = Rc::new(callback);
        self
    }

    /// Persist histories with `parceler`.
    pub fn key_parceler<Q: KeyParceler<K>>(self, parceler: Q) -> FlowConfig<K, Q> {
        FlowConfig {
            default_history: self.default_history,
            factories: self.factories,
            model_scopes: self.model_scopes,
            history_callback: self.history_callback,
            parceler: Some(parceler),
        }
    }

    /// Finish configuration; `dispatcher` renders for the first host.
    pub fn build(self, dispatcher: Rc<dyn Dispatcher<K>>) -> LifecycleIntegration<K, P> {
        LifecycleIntegration {
            default_history: self.default_history,
            history_callback: self.history_callback,
            parceler: self.parceler,
            dispatcher,
            keys: Some(KeyManager::new(self.factories, self.model_scopes)),
            flow: None,
            dispatcher_set: false,
        }
    }
}

/// Retained coordinator between a [`Flow`] and a host that can be destroyed
/// and recreated (for example on a configuration change) while the navigation
/// state lives on.
///
/// ## Usage
///
/// The host forwards its lifecycle events:
///
/// - [`on_host_created`](Self::on_host_created) whenever a host instance is
///   created, after handing over that host's dispatcher with
///   [`set_host_dispatcher`](Self::set_host_dispatcher) on recreation.
/// - [`on_resume`](Self::on_resume) and [`on_pause`](Self::on_pause).
/// - [`on_save`](Self::on_save) to obtain the payload to persist.
/// - [`on_new_intent`](Self::on_new_intent) for deep links.
/// - [`on_destroy`](Self::on_destroy) once the coordinator itself goes away.
pub struct LifecycleIntegration<K: NavKey, P = NoParceler> {
    default_history: History<K>,
    history_callback: Rc<dyn HistoryCallback<K>>,
    parceler: Option<P>,
    dispatcher: Rc<dyn Dispatcher<K>>,
    /// Per-key resources, until the flow takes them over.
    keys: Option<KeyManager<K>>,
    flow: Option<Flow<K>>,
    dispatcher_set: bool,
}

impl<K: NavKey, P: fmt::Debug> fmt::Debug for LifecycleIntegration<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleIntegration")
            .field("default_history", &self.default_history)
            .field("parceler", &self.parceler)
            .field("flow", &self.flow)
            .field("dispatcher_set", &self.dispatcher_set)
            .finish_non_exhaustive()
    }
}

impl<K: NavKey, P: KeyParceler<K>> LifecycleIntegration<K, P> {
    /// The engine, once the first host has been created.
    pub fn flow(&self) -> Option<&Flow<K>> {
        self.flow.as_ref()
    }

    /// Whether the dispatcher is currently attached.
    pub fn is_dispatcher_set(&self) -> bool {
        self.dispatcher_set
    }

    /// Replace the dispatcher; each host instance brings its own.
    ///
    /// Takes effect the next time the dispatcher is attached.
    pub fn set_host_dispatcher(&mut self, dispatcher: Rc<dyn Dispatcher<K>>) {
        self.dispatcher = dispatcher;
    }

    /// A host instance was created.
    ///
    /// The first time, the history is restored from `saved` (passed through
    /// [`on_restore_history`](HistoryCallback::on_restore_history)), else from
    /// `intent`, else the default history is used; the engine is created and
    /// the dispatcher attached. Later calls only re-attach the dispatcher.
    pub fn on_host_created(
        &mut self,
        saved: Option<SavedHistory<P::Parcel>>,
        intent: Option<SavedHistory<P::Parcel>>,
    ) -> Result<(), FlowError> {
        if let Some(flow) = &self.flow {
            tracing::debug!("host recreated, re-attaching dispatcher");
            flow.set_dispatcher(Rc::clone(&self.dispatcher))?;
            self.dispatcher_set = true;
            return Ok(());
        }

        let mut history = None;
        let mut states = Vec::new();
        if let Some((restored, saved_states)) = decode(self.parceler.as_ref(), saved)? {
            tracing::debug!(len = restored.len(), "history restored from saved state");
            states = saved_states;
            history = self.history_callback.on_restore_history(restored);
        }
        if history.is_none()
            && let Some((restored, intent_states)) = decode(self.parceler.as_ref(), intent)?
        {
            tracing::debug!(len = restored.len(), "history restored from intent");
            states.extend(intent_states);
            history = Some(restored);
        }
        let history = history.unwrap_or_else(|| self.default_history.clone());

        let mut keys = self.keys.take().unwrap_or_default();
        for state in states {
            keys.add_state(state);
        }
        let flow = Flow::new(history, keys);
        flow.set_history_callback(Some(Rc::clone(&self.history_callback)));
        self.flow = Some(flow.clone());
        flow.set_dispatcher(Rc::clone(&self.dispatcher))?;
        self.dispatcher_set = true;
        Ok(())
    }

    /// The host resumed; re-attach the dispatcher if it was detached.
    pub fn on_resume(&mut self) -> Result<(), FlowError> {
        let flow = self.flow.as_ref().ok_or(FlowError::NotCreated)?;
        if !self.dispatcher_set {
            flow.set_dispatcher(Rc::clone(&self.dispatcher))?;
            self.dispatcher_set = true;
        }
        Ok(())
    }

    /// The host paused; detach its dispatcher.
    pub fn on_pause(&mut self) -> Result<(), FlowError> {
        let flow = self.flow.as_ref().ok_or(FlowError::NotCreated)?;
        flow.remove_dispatcher(&self.dispatcher);
        self.dispatcher_set = false;
        Ok(())
    }

    /// The payload to persist, or `None` when there is nothing to save.
    ///
    /// The history passes through
    /// [`on_save_history`](HistoryCallback::on_save_history) first. Keys that
    /// are not persistent are then skipped whatever the callback returned, and
    /// every other key is saved with its state.
    pub fn on_save(&self) -> Result<Option<SavedHistory<P::Parcel>>, FlowError> {
        let flow = self.flow.as_ref().ok_or(FlowError::NotCreated)?;
        let Some(parceler) = &self.parceler else {
            return Ok(None);
        };
        let Some(history) = self.history_callback.on_save_history(flow.history()) else {
            return Ok(None);
        };
        let entries: Vec<_> = flow.with_keys(|keys| {
            history
                .frames_from_bottom()
                .filter(|key| key.is_persistent())
                .map(|key| match keys.states().get(key) {
                    Some(state) => SavedState::from_state(state, parceler),
                    None => SavedState::from_state(&State::new(key.clone()), parceler),
                })
                .collect()
        });
        if entries.is_empty() {
            return Ok(None);
        }
        tracing::debug!(len = entries.len(), "history saved");
        Ok(Some(SavedHistory { entries }))
    }

    /// The host received a deep link; replace the history with it.
    pub fn on_new_intent(&mut self, intent: SavedHistory<P::Parcel>) -> Result<(), FlowError> {
        let flow = self.flow.clone().ok_or(FlowError::NotCreated)?;
        if let Some((history, states)) = decode(self.parceler.as_ref(), Some(intent))? {
            flow.add_states(states);
            flow.set_history(history, Direction::Replace)?;
        }
        Ok(())
    }

    /// The coordinator is going away for good; release every key's services
    /// and models.
    pub fn on_destroy(&mut self) -> Result<(), FlowError> {
        let flow = self.flow.as_ref().ok_or(FlowError::NotCreated)?;
        flow.remove_dispatcher(&self.dispatcher);
        self.dispatcher_set = false;
        flow.tear_down_all()
    }
}

fn decode<K: NavKey, P: KeyParceler<K>>(
    parceler: Option<&P>,
    payload: Option<SavedHistory<P::Parcel>>,
) -> Result<Option<(History<K>, Vec<State<K>>)>, FlowError> {
    match (payload, parceler) {
        (Some(payload), Some(parceler)) => payload.restore(parceler),
        _ => Ok(None),
    }
}
