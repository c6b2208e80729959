// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable history and its builder.

use alloc::format;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::Rev;
use core::slice::Iter;

use crate::error::HistoryError;

/// The navigation stack at a point in time.
///
/// Never empty: index `0` of [`as_slice`](Self::as_slice) is the bottom (oldest)
/// entry and the last element is the [`top`](Self::top).
///
/// ## Usage
///
/// - Create with [`History::new`] or [`History::single`].
/// - Read with [`top`](Self::top), [`peek`](Self::peek), [`frames_from_top`](Self::frames_from_top)
///   and [`frames_from_bottom`](Self::frames_from_bottom).
/// - Derive a new stack with [`build_upon`](Self::build_upon).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct History<K> {
    keys: Vec<K>,
}

impl<K> History<K> {
    /// Build a history from keys ordered bottom to top.
    pub fn new(keys: impl IntoIterator<Item = K>) -> Result<Self, HistoryError> {
        let keys: Vec<K> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(HistoryError::Empty);
        }
        Ok(Self { keys })
    }

    /// A history holding exactly one key.
    pub fn single(key: K) -> Self {
        Self {
            keys: alloc::vec![key],
        }
    }

    /// Number of entries; always at least one.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; present for API symmetry with [`Builder::is_empty`].
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The frontmost entry.
    pub fn top(&self) -> &K {
        // Non-empty by construction.
        &self.keys[self.keys.len() - 1]
    }

    /// Entry `index` positions below the top; `0` is the top.
    pub fn peek(&self, index: usize) -> Option<&K> {
        let len = self.keys.len();
        if index < len {
            Some(&self.keys[len - index - 1])
        } else {
            None
        }
    }

    /// Entries from the bottom (oldest) to the top.
    pub fn frames_from_bottom(&self) -> Iter<'_, K> {
        self.keys.iter()
    }

    /// Entries from the top down to the bottom.
    pub fn frames_from_top(&self) -> Rev<Iter<'_, K>> {
        self.keys.iter().rev()
    }

    /// Entries bottom to top as a slice.
    pub fn as_slice(&self) -> &[K] {
        &self.keys
    }

    /// Consume the history, returning its keys bottom to top.
    pub fn into_vec(self) -> Vec<K> {
        self.keys
    }
}

impl<K: PartialEq> History<K> {
    /// Whether any entry equals `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    /// Position (from the bottom) of the first entry equal to `key`.
    pub fn position(&self, key: &K) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }
}

impl<K: Clone> History<K> {
    /// Start a builder holding a copy of this history.
    ///
    /// Keys popped from the builder and pushed back later keep whatever state
    /// the engine tracks for them, since that state is keyed by equality and
    /// is only released once the key has left the committed history.
    pub fn build_upon(&self) -> Builder<K> {
        Builder {
            keys: self.keys.clone(),
        }
    }

    /// A history holding only the entries for which `keep` returns true, or
    /// `None` if nothing is kept.
    pub fn filtered(&self, mut keep: impl FnMut(&K) -> bool) -> Option<Self> {
        let keys: Vec<K> = self.keys.iter().filter(|k| keep(k)).cloned().collect();
        if keys.is_empty() {
            None
        } else {
            Some(Self { keys })
        }
    }
}

impl<'a, K> IntoIterator for &'a History<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// Mutable staging area for a new [`History`].
///
/// Unlike a history, a builder may be empty while it is being edited; only
/// [`build`](Self::build) requires at least one entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Builder<K> {
    keys: Vec<K>,
}

impl<K> Builder<K> {
    /// An empty builder.
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Number of staged entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The last pushed entry, if any.
    pub fn peek(&self) -> Option<&K> {
        self.keys.last()
    }

    /// Push a key on top.
    pub fn push(&mut self, key: K) -> &mut Self {
        self.keys.push(key);
        self
    }

    /// Push every key in order; the last one ends up on top.
    pub fn push_all(&mut self, keys: impl IntoIterator<Item = K>) -> &mut Self {
        self.keys.extend(keys);
        self
    }

    /// Remove and return the top entry.
    pub fn pop(&mut self) -> Result<K, HistoryError> {
        self.keys.pop().ok_or(HistoryError::PopEmpty)
    }

    /// Remove `count` entries from the top.
    pub fn pop_count(&mut self, count: usize) -> Result<&mut Self, HistoryError> {
        let len = self.keys.len();
        if count > len {
            return Err(HistoryError::PopCount { count, len });
        }
        self.keys.truncate(len - count);
        Ok(self)
    }

    /// Remove every entry.
    pub fn clear(&mut self) -> &mut Self {
        self.keys.clear();
        self
    }

    /// Build a history from the staged entries.
    ///
    /// The builder keeps its entries and may continue to be edited; the
    /// returned history is unaffected by later changes.
    pub fn build(&self) -> Result<History<K>, HistoryError>
    where
        K: Clone,
    {
        History::new(self.keys.iter().cloned())
    }
}

impl<K: PartialEq + Debug> Builder<K> {
    /// Pop until an entry equal to `key` is on top.
    ///
    /// Fails, leaving the builder empty, when no entry equals `key`.
    pub fn pop_to(&mut self, key: &K) -> Result<&mut Self, HistoryError> {
        while let Some(top) = self.keys.last() {
            if top == key {
                return Ok(self);
            }
            self.keys.pop();
        }
        Err(HistoryError::NotFound {
            key: format!("{key:?}"),
        })
    }
}

impl<K> From<History<K>> for Builder<K> {
    fn from(history: History<K>) -> Self {
        Self { keys: history.keys }
    }
}
