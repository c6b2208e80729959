// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Usage-counted scope registry.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use understory_history::{KeyShape, NavKey};

use crate::error::ScopeError;
use crate::services::{Binder, Services, ServicesFactory};

struct ManagedServices<K> {
    key: K,
    services: Rc<Services<K>>,
    /// Uses as a leaf and as a direct structural dependency.
    uses: usize,
}

/// One use registered by [`ScopeManager::set_up`].
///
/// [`ScopeManager::set_up_steps`] lists them dependencies first; tearing a key
/// down releases the same keys in reverse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetUpStep<K> {
    /// The key receiving a use.
    pub key: K,
    /// Whether the key's bag chains to the bag of the previous step (its
    /// parent) rather than to the root.
    pub nested: bool,
}

/// Owns the capability bag of every key in use.
///
/// A node exists exactly while its usage count is positive; the root bag is
/// permanent. Nodes are kept in creation order and matched by key equality.
///
/// ## Usage
///
/// - [`set_up`](Self::set_up) when a key starts being used.
/// - [`find_services`](Self::find_services) to read its bag.
/// - [`tear_down`](Self::tear_down) once for every `set_up` when the key stops being used.
///
/// Owners that must not be borrowed while factories run can drive the same
/// bookkeeping one step at a time with [`set_up_steps`](Self::set_up_steps),
/// [`retain`](Self::retain), [`binder`](Self::binder), [`insert`](Self::insert)
/// and [`release`](Self::release), calling the [`factories`](Self::factories)
/// themselves.
pub struct ScopeManager<K> {
    root: Rc<Services<K>>,
    nodes: Vec<ManagedServices<K>>,
    factories: Rc<[Box<dyn ServicesFactory<K>>]>,
}

impl<K: fmt::Debug> fmt::Debug for ScopeManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uses: Vec<(&K, usize)> = self.nodes.iter().map(|n| (&n.key, n.uses)).collect();
        f.debug_struct("ScopeManager")
            .field("uses", &uses)
            .field("factories", &self.factories.len())
            .finish_non_exhaustive()
    }
}

impl<K: NavKey> Default for ScopeManager<K> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<K: NavKey> ScopeManager<K> {
    /// Create a manager; factories bind in the given order and tear down in reverse.
    pub fn new(factories: Vec<Box<dyn ServicesFactory<K>>>) -> Self {
        Self {
            root: Rc::new(Services::root()),
            nodes: Vec::new(),
            factories: Rc::from(factories),
        }
    }

    /// The permanent root bag.
    pub fn root(&self) -> &Rc<Services<K>> {
        &self.root
    }

    /// The registered factories, in binding order.
    pub fn factories(&self) -> Rc<[Box<dyn ServicesFactory<K>>]> {
        Rc::clone(&self.factories)
    }

    /// Current usage count of `key`, or `None` when it has no node.
    pub fn uses(&self, key: &K) -> Option<usize> {
        self.position(key).map(|i| self.nodes[i].uses)
    }

    /// Number of live nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The bag of a key that has been set up.
    pub fn find_services(&self, key: &K) -> Result<Rc<Services<K>>, ScopeError> {
        match self.position(key) {
            Some(i) => Ok(Rc::clone(&self.nodes[i].services)),
            None => Err(ScopeError::NotSetUp {
                key: format!("{key:?}"),
            }),
        }
    }

    /// Register one use of `key`, creating its bag (and those of its structural
    /// dependencies) as needed. Returns the key's bag.
    ///
    /// Hierarchical ancestry must be acyclic.
    pub fn set_up(&mut self, key: &K) -> Rc<Services<K>> {
        let factories = self.factories();
        let mut last = Rc::clone(&self.root);
        for step in Self::set_up_steps(key) {
            last = match self.retain(&step.key) {
                Some(services) => services,
                None => {
                    let mut binder = self.binder(step.key, step.nested.then_some(last));
                    for factory in factories.iter() {
                        factory.bind_services(&mut binder);
                    }
                    self.insert(binder)
                }
            };
        }
        last
    }

    /// Release one use of `key`, then of its structural dependencies.
    ///
    /// The key's bag is discarded when its count reaches zero. Releasing a key
    /// with no node is an [`OverDecremented`](ScopeError::OverDecremented) error.
    pub fn tear_down(&mut self, key: &K) -> Result<(), ScopeError> {
        let factories = self.factories();
        for step in Self::set_up_steps(key).into_iter().rev() {
            if let Some(services) = self.release(&step.key)? {
                for factory in factories.iter().rev() {
                    factory.tear_down_services(&services);
                }
            }
        }
        Ok(())
    }

    /// The uses [`set_up`](Self::set_up) registers for `key`: composite
    /// constituents and hierarchical ancestors first, `key` itself last.
    pub fn set_up_steps(key: &K) -> Vec<SetUpStep<K>> {
        let mut steps = Vec::new();
        Self::collect_steps(key, &mut steps);
        steps
    }

    fn collect_steps(key: &K, steps: &mut Vec<SetUpStep<K>>) {
        let nested = match key.shape() {
            KeyShape::Plain => false,
            KeyShape::Composite(parts) => {
                for part in &parts {
                    Self::collect_steps(part, steps);
                }
                false
            }
            KeyShape::Hierarchical(parent) => {
                Self::collect_steps(&parent, steps);
                true
            }
        };
        steps.push(SetUpStep {
            key: key.clone(),
            nested,
        });
    }

    /// Register a use of `key` if it already has a bag, returning the bag.
    ///
    /// `None` means the bag has to be built with [`binder`](Self::binder) and
    /// stored with [`insert`](Self::insert).
    pub fn retain(&mut self, key: &K) -> Option<Rc<Services<K>>> {
        let i = self.position(key)?;
        let node = &mut self.nodes[i];
        node.uses += 1;
        Some(Rc::clone(&node.services))
    }

    /// Start a bag for `key` chained to `parent`, or to the root when `None`.
    pub fn binder(&self, key: K, parent: Option<Rc<Services<K>>>) -> Binder<K> {
        Binder::new(parent.unwrap_or_else(|| Rc::clone(&self.root)), key)
    }

    /// Store the bag built in `binder` with one use, returning it.
    ///
    /// If a bag for the key appeared in the meantime, that bag receives the
    /// use instead and the new one is discarded.
    pub fn insert(&mut self, binder: Binder<K>) -> Rc<Services<K>> {
        if let Some(services) = self.retain(binder.key()) {
            return services;
        }
        let services = Rc::new(binder.build());
        let Some(key) = services.key().cloned() else {
            return services;
        };
        tracing::debug!(key = ?key, "scope created");
        self.nodes.push(ManagedServices {
            key,
            services: Rc::clone(&services),
            uses: 1,
        });
        services
    }

    /// Release one use of `key` alone, without its dependencies.
    ///
    /// Returns the bag when this was the last use; its factories have not
    /// been told yet.
    pub fn release(&mut self, key: &K) -> Result<Option<Rc<Services<K>>>, ScopeError> {
        let Some(i) = self.position(key) else {
            return Err(ScopeError::OverDecremented {
                key: format!("{key:?}"),
            });
        };
        let node = &mut self.nodes[i];
        node.uses -= 1;
        if node.uses > 0 {
            return Ok(None);
        }
        let node = self.nodes.remove(i);
        tracing::debug!(key = ?key, "scope discarded");
        Ok(Some(node.services))
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.nodes.iter().position(|n| n.key == *key)
    }
}
