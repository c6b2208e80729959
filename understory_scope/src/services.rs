// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capability bags and the factories that fill them.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use core::any::Any;
use core::fmt;

/// Immutable bag of named capabilities owned by one key.
///
/// Lookups that miss locally continue in the parent bag, up to the root.
/// Capabilities are stored type-erased; [`get`](Self::get) downcasts to the
/// requested type and yields `None` on a type mismatch.
pub struct Services<K> {
    key: Option<K>,
    parent: Option<Rc<Self>>,
    services: BTreeMap<String, Rc<dyn Any>>,
}

impl<K: fmt::Debug> fmt::Debug for Services<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("key", &self.key)
            .field("names", &self.services.keys())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl<K> Services<K> {
    /// The permanent root bag: no key, no capabilities, no parent.
    pub(crate) fn root() -> Self {
        Self {
            key: None,
            parent: None,
            services: BTreeMap::new(),
        }
    }

    /// The key owning this bag; `None` for the root.
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// The bag this one falls through to.
    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    /// Look up `name` here, then in each ancestor.
    pub fn get<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        let mut current = Some(self);
        while let Some(bag) = current {
            if let Some(found) = bag.services.get(name) {
                return Rc::clone(found).downcast::<T>().ok();
            }
            current = bag.parent.as_deref();
        }
        None
    }

    /// Whether `name` resolves here or in an ancestor.
    pub fn contains(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(bag) = current {
            if bag.services.contains_key(name) {
                return true;
            }
            current = bag.parent.as_deref();
        }
        false
    }

    /// Names bound directly in this bag, in sorted order.
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

/// Staging area for a new [`Services`] bag, handed to each [`ServicesFactory`].
///
/// Bindings made here shadow the parent's; [`get`](Self::get) sees both, so
/// a factory can build on capabilities bound by an ancestor or by a factory
/// that ran earlier for the same key.
pub struct Binder<K> {
    key: K,
    base: Rc<Services<K>>,
    services: BTreeMap<String, Rc<dyn Any>>,
}

impl<K: fmt::Debug> fmt::Debug for Binder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("key", &self.key)
            .field("names", &self.services.keys())
            .finish_non_exhaustive()
    }
}

impl<K> Binder<K> {
    pub(crate) fn new(base: Rc<Services<K>>, key: K) -> Self {
        Self {
            key,
            base,
            services: BTreeMap::new(),
        }
    }

    /// The key whose bag is being built.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Bind `service` under `name`, replacing an earlier binding of this binder.
    pub fn bind<T: Any>(&mut self, name: impl Into<String>, service: T) -> &mut Self {
        self.services.insert(name.into(), Rc::new(service));
        self
    }

    /// Bind an already shared capability under `name`.
    pub fn bind_shared(&mut self, name: impl Into<String>, service: Rc<dyn Any>) -> &mut Self {
        self.services.insert(name.into(), service);
        self
    }

    /// Look up `name` in this binder, then in the parent chain.
    pub fn get<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        match self.services.get(name) {
            Some(found) => Rc::clone(found).downcast::<T>().ok(),
            None => self.base.get(name),
        }
    }

    pub(crate) fn build(self) -> Services<K> {
        Services {
            key: Some(self.key),
            parent: Some(self.base),
            services: self.services,
        }
    }
}

/// Fills and releases the capability bags of keys.
pub trait ServicesFactory<K> {
    /// Bind whatever capabilities `binder`'s key needs.
    fn bind_services(&self, binder: &mut Binder<K>);

    /// Release resources bound for a bag that is being discarded.
    fn tear_down_services(&self, services: &Services<K>) {
        let _ = services;
    }
}
