// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Models shared by tag across keys.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use understory_history::{ModelRelation, NavKey};

use crate::error::ScopeError;

/// Creates the models of one named scope.
pub trait ModelScope {
    /// Name keys use in [`ModelRelation::scope`](understory_history::ModelRelation::scope).
    fn name(&self) -> &'static str;

    /// Create the model for `tag`; called when its first user is set up.
    fn create_model(&self, tag: &str) -> Rc<dyn Any>;
}

struct TaggedModel<K> {
    tag: String,
    model: Rc<dyn Any>,
    users: Vec<K>,
}

struct ScopeModels<K> {
    scope: Rc<dyn ModelScope>,
    models: Vec<TaggedModel<K>>,
}

/// A model a key needs that does not exist yet, as reported by
/// [`ModelManager::retain`].
pub type MissingModel = (Rc<dyn ModelScope>, ModelRelation);

/// Reference-counts shared models by their users.
///
/// Relations naming a scope that is not registered are ignored.
///
/// [`set_up`](Self::set_up) and [`tear_down`](Self::tear_down) call into the
/// scopes directly. [`retain`](Self::retain), [`insert`](Self::insert) and
/// [`release`](Self::release) split the same bookkeeping so that models can be
/// created and dropped while the manager is not borrowed.
pub struct ModelManager<K> {
    scopes: Vec<ScopeModels<K>>,
}

impl<K: fmt::Debug> fmt::Debug for ModelManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for scope in &self.scopes {
            for model in &scope.models {
                list.entry(&(scope.scope.name(), &model.tag, &model.users));
            }
        }
        list.finish()
    }
}

impl<K: NavKey> Default for ModelManager<K> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<K: NavKey> ModelManager<K> {
    /// Create a manager for the given scopes.
    pub fn new(scopes: Vec<Box<dyn ModelScope>>) -> Self {
        Self {
            scopes: scopes
                .into_iter()
                .map(|scope| ScopeModels {
                    scope: Rc::from(scope),
                    models: Vec::new(),
                })
                .collect(),
        }
    }

    /// Register `key` as a user of every model it declares.
    pub fn set_up(&mut self, key: &K) {
        for (scope, relation) in self.retain(key) {
            let model = scope.create_model(&relation.tag);
            self.insert(key, relation, model);
        }
    }

    /// Remove `key` as a user; models left without users are dropped.
    pub fn tear_down(&mut self, key: &K) {
        drop(self.release(key));
    }

    /// Register `key` as a user of the declared models that exist.
    ///
    /// Returns the relations whose model must still be created and handed to
    /// [`insert`](Self::insert).
    pub fn retain(&mut self, key: &K) -> Vec<MissingModel> {
        let mut missing = Vec::new();
        for relation in key.model_relations() {
            let Some(scope) = self.scope_mut(relation.scope) else {
                continue;
            };
            match scope.models.iter_mut().find(|m| m.tag == relation.tag) {
                Some(model) => model.users.push(key.clone()),
                None => missing.push((Rc::clone(&scope.scope), relation)),
            }
        }
        missing
    }

    /// Store `model` for `relation` with `key` as its first user.
    ///
    /// If the model appeared in the meantime, `key` joins its users and
    /// `model` is discarded.
    pub fn insert(&mut self, key: &K, relation: ModelRelation, model: Rc<dyn Any>) {
        let Some(scope) = self.scope_mut(relation.scope) else {
            return;
        };
        if let Some(existing) = scope.models.iter_mut().find(|m| m.tag == relation.tag) {
            existing.users.push(key.clone());
            return;
        }
        tracing::debug!(scope = relation.scope, tag = %relation.tag, "model created");
        scope.models.push(TaggedModel {
            tag: relation.tag,
            model,
            users: alloc::vec![key.clone()],
        });
    }

    /// Remove `key` as a user, returning the models it was the last user of.
    pub fn release(&mut self, key: &K) -> Vec<Rc<dyn Any>> {
        let mut dropped = Vec::new();
        for relation in key.model_relations() {
            let Some(scope) = self.scope_mut(relation.scope) else {
                continue;
            };
            let Some(i) = scope.models.iter().position(|m| m.tag == relation.tag) else {
                continue;
            };
            let model = &mut scope.models[i];
            if let Some(u) = model.users.iter().position(|u| u == key) {
                model.users.remove(u);
            }
            if model.users.is_empty() {
                tracing::debug!(scope = relation.scope, tag = %relation.tag, "model dropped");
                dropped.push(scope.models.remove(i).model);
            }
        }
        dropped
    }

    /// The live model tagged `tag` in `scope`.
    pub fn model<T: Any>(&self, scope: &str, tag: &str) -> Result<Rc<T>, ScopeError> {
        self.scopes
            .iter()
            .find(|s| s.scope.name() == scope)
            .and_then(|s| s.models.iter().find(|m| m.tag == tag))
            .and_then(|m| Rc::clone(&m.model).downcast::<T>().ok())
            .ok_or_else(|| ScopeError::NoModel {
                scope: scope.to_string(),
                tag: tag.to_string(),
            })
    }

    /// Number of keys currently using the model tagged `tag` in `scope`.
    pub fn users(&self, scope: &str, tag: &str) -> usize {
        self.scopes
            .iter()
            .find(|s| s.scope.name() == scope)
            .and_then(|s| s.models.iter().find(|m| m.tag == tag))
            .map_or(0, |m| m.users.len())
    }

    fn scope_mut(&mut self, name: &str) -> Option<&mut ScopeModels<K>> {
        self.scopes.iter_mut().find(|s| s.scope.name() == name)
    }
}
