// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Saved view state per key.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use understory_history::History;

use crate::error::FlowError;

/// Render state saved for one key: an opaque bundle and per-widget blobs.
///
/// Widgets are identified by non-zero ids; id zero means "no id" and cannot
/// carry state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State<K> {
    key: K,
    bundle: Option<Vec<u8>>,
    widgets: BTreeMap<u32, Vec<u8>>,
}

impl<K> State<K> {
    /// Empty state for `key`.
    pub fn new(key: K) -> Self {
        Self {
            key,
            bundle: None,
            widgets: BTreeMap::new(),
        }
    }

    /// The key this state belongs to.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The application bundle, if one was stored.
    pub fn bundle(&self) -> Option<&[u8]> {
        self.bundle.as_deref()
    }

    /// Replace the application bundle.
    pub fn set_bundle(&mut self, bundle: Option<Vec<u8>>) {
        self.bundle = bundle;
    }

    /// Save the state of widget `id`, replacing what was saved before.
    pub fn save_widget(&mut self, id: u32, blob: Vec<u8>) -> Result<(), FlowError> {
        if id == 0 {
            return Err(FlowError::InvalidWidgetId);
        }
        self.widgets.insert(id, blob);
        Ok(())
    }

    /// Saved state of widget `id`; `None` when nothing was saved.
    pub fn restore_widget(&self, id: u32) -> Option<&[u8]> {
        self.widgets.get(&id).map(Vec::as_slice)
    }

    /// Saved widgets in ascending id order.
    pub fn widgets(&self) -> impl Iterator<Item = (u32, &[u8])> {
        self.widgets.iter().map(|(id, blob)| (*id, blob.as_slice()))
    }

    /// Whether neither a bundle nor any widget state is stored.
    pub fn is_empty(&self) -> bool {
        self.bundle.is_none() && self.widgets.is_empty()
    }
}

/// Saved states matched by key equality, in insertion order.
#[derive(Clone, Debug)]
pub struct StateStore<K> {
    states: Vec<State<K>>,
}

impl<K> Default for StateStore<K> {
    fn default() -> Self {
        Self { states: Vec::new() }
    }
}

impl<K: PartialEq + Clone> StateStore<K> {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no state is stored.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether a state exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.states.iter().any(|s| s.key == *key)
    }

    /// The state of `key`, if one exists.
    pub fn get(&self, key: &K) -> Option<&State<K>> {
        self.states.iter().find(|s| s.key == *key)
    }

    /// The state of `key`, created empty on first reference.
    pub fn get_or_create(&mut self, key: &K) -> &mut State<K> {
        let i = match self.states.iter().position(|s| s.key == *key) {
            Some(i) => i,
            None => {
                self.states.push(State::new(key.clone()));
                self.states.len() - 1
            }
        };
        &mut self.states[i]
    }

    /// Store `state`, replacing any state of an equal key.
    pub fn insert(&mut self, state: State<K>) {
        match self.states.iter_mut().find(|s| s.key == state.key) {
            Some(slot) => *slot = state,
            None => self.states.push(state),
        }
    }

    /// Drop every state whose key is not in `history`.
    pub fn retain_history(&mut self, history: &History<K>) {
        self.states.retain(|s| history.contains(&s.key));
    }

    /// Drop every state.
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn widget_zero_is_rejected() {
        let mut state = State::new("home");
        assert_eq!(state.save_widget(0, vec![1]), Err(FlowError::InvalidWidgetId));
        assert!(state.is_empty());
        state.save_widget(7, vec![1, 2]).unwrap();
        assert_eq!(state.restore_widget(7), Some(&[1_u8, 2][..]));
        assert_eq!(state.restore_widget(8), None);
    }

    #[test]
    fn store_creates_lazily_and_collects_by_history() {
        let mut store = StateStore::new();
        store.get_or_create(&"a").set_bundle(Some(vec![1]));
        store.get_or_create(&"b");
        store.get_or_create(&"a").save_widget(3, vec![9]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&"a").and_then(State::bundle), Some(&[1_u8][..]));

        store.retain_history(&History::single("a"));
        assert!(store.contains(&"a"));
        assert!(!store.contains(&"b"));
    }

    #[test]
    fn insert_replaces_equal_key() {
        let mut store = StateStore::new();
        store.get_or_create(&"a").set_bundle(Some(vec![1]));
        store.insert(State::new("a"));
        assert_eq!(store.len(), 1);
        assert!(store.get(&"a").is_some_and(State::is_empty));
    }
}
