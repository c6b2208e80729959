// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key relationship model: shapes, markers, and model relations.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;

/// Structural relation of a key to other keys.
///
/// Returned by [`NavKey::shape`]. Scope managers walk this to decide which
/// scopes must exist before the key's own scope can be created, and in which
/// order they are released.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyShape<K> {
    /// No structural relation to other keys.
    Plain,
    /// Ordered constituents; the key's scope depends on all of them.
    Composite(Vec<K>),
    /// A single parent; the key's scope nests inside the parent's scope.
    Hierarchical(K),
}

bitflags::bitflags! {
    /// Markers a key can carry.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeyFlags: u8 {
        /// Equal occurrences of the key are always fresh instances; the engine
        /// never keeps an older value in place of the one it was given.
        const NON_PRESERVABLE = 0b0000_0001;
        /// The key is dropped by the default save filter and never persisted.
        const NOT_PERSISTENT  = 0b0000_0010;
    }
}

/// A shared model a key uses, identified by the model scope's name and a tag.
///
/// All keys declaring the same `(scope, tag)` share one model instance for as
/// long as at least one of them is in the history.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRelation {
    /// Name of the model scope that creates the model.
    pub scope: &'static str,
    /// Tag distinguishing models within the scope.
    pub tag: String,
}

impl ModelRelation {
    /// Create a relation to the model tagged `tag` in `scope`.
    pub fn new(scope: &'static str, tag: impl Into<String>) -> Self {
        Self {
            scope,
            tag: tag.into(),
        }
    }
}

/// An application key identifying one navigable screen or state.
///
/// Keys are compared by value (`Eq`). Everything else is optional: the
/// defaults describe a plain key with no markers and no shared models.
pub trait NavKey: Clone + Eq + Debug + 'static {
    /// Structural relation of this key to other keys.
    fn shape(&self) -> KeyShape<Self> {
        KeyShape::Plain
    }

    /// Markers for this key.
    fn flags(&self) -> KeyFlags {
        KeyFlags::empty()
    }

    /// Shared models this key uses.
    fn model_relations(&self) -> Vec<ModelRelation> {
        Vec::new()
    }

    /// Shorthand for testing [`KeyFlags::NON_PRESERVABLE`].
    #[inline]
    fn is_non_preservable(&self) -> bool {
        self.flags().contains(KeyFlags::NON_PRESERVABLE)
    }

    /// Shorthand for testing [`KeyFlags::NOT_PERSISTENT`].
    #[inline]
    fn is_persistent(&self) -> bool {
        !self.flags().contains(KeyFlags::NOT_PERSISTENT)
    }
}

impl NavKey for &'static str {}

impl NavKey for String {}
