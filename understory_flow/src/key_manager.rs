// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Everything the engine keeps per key: services, shared models, and saved state.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;

use understory_history::{History, KeyShape, NavKey};
use understory_scope::{ModelManager, ModelScope, ScopeManager, Services, ServicesFactory};

use crate::error::FlowError;
use crate::state::{State, StateStore};

/// Per-key resources owned by one [`Flow`](crate::Flow).
#[derive(Debug)]
pub struct KeyManager<K> {
    scopes: ScopeManager<K>,
    models: ModelManager<K>,
    states: StateStore<K>,
}

impl<K: NavKey> Default for KeyManager<K> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl<K: NavKey> KeyManager<K> {
    /// Create a manager binding services with `factories` and creating models with `model_scopes`.
    pub fn new(
        factories: Vec<Box<dyn ServicesFactory<K>>>,
        model_scopes: Vec<Box<dyn ModelScope>>,
    ) -> Self {
        Self {
            scopes: ScopeManager::new(factories),
            models: ModelManager::new(model_scopes),
            states: StateStore::new(),
        }
    }

    /// Register one use of `key` with the scope and model managers.
    pub fn set_up(&mut self, key: &K) -> Rc<Services<K>> {
        self.models.set_up(key);
        self.scopes.set_up(key)
    }

    /// Release one use of `key`.
    pub fn tear_down(&mut self, key: &K) -> Result<(), FlowError> {
        self.scopes.tear_down(key)?;
        self.models.tear_down(key);
        Ok(())
    }

    /// The services bag of a key that is set up.
    pub fn find_services(&self, key: &K) -> Result<Rc<Services<K>>, FlowError> {
        Ok(self.scopes.find_services(key)?)
    }

    /// The bags handed to a dispatcher for `key`: those of a composite's
    /// constituents, in order, followed by the key's own.
    pub fn incoming_services(&self, key: &K) -> Result<Vec<(K, Rc<Services<K>>)>, FlowError> {
        let mut out = Vec::new();
        if let KeyShape::Composite(parts) = key.shape() {
            for part in parts {
                let services = self.find_services(&part)?;
                out.push((part, services));
            }
        }
        out.push((key.clone(), self.find_services(key)?));
        Ok(out)
    }

    /// A live shared model.
    pub fn model<T: Any>(&self, scope: &str, tag: &str) -> Result<Rc<T>, FlowError> {
        Ok(self.models.model(scope, tag)?)
    }

    /// Whether saved state exists for `key`.
    pub fn has_state(&self, key: &K) -> bool {
        self.states.contains(key)
    }

    /// Store restored state unless `key` already has some.
    pub fn add_state(&mut self, state: State<K>) {
        if !self.states.contains(state.key()) {
            self.states.insert(state);
        }
    }

    /// The saved state of `key`, created on first reference.
    pub fn state_mut(&mut self, key: &K) -> &mut State<K> {
        self.states.get_or_create(key)
    }

    /// Drop saved state of keys not in `history`.
    pub fn clear_states_except(&mut self, history: &History<K>) {
        self.states.retain_history(history);
    }

    /// Drop all saved state.
    pub fn clear_states(&mut self) {
        self.states.clear();
    }

    /// The scope manager.
    pub fn scopes(&self) -> &ScopeManager<K> {
        &self.scopes
    }

    /// The model manager.
    pub fn models(&self) -> &ModelManager<K> {
        &self.models
    }

    pub(crate) fn scopes_mut(&mut self) -> &mut ScopeManager<K> {
        &mut self.scopes
    }

    pub(crate) fn models_mut(&mut self) -> &mut ModelManager<K> {
        &mut self.models
    }

    /// The saved states.
    pub fn states(&self) -> &StateStore<K> {
        &self.states
    }
}
