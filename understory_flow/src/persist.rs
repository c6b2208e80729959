// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persisted form of a history and its saved state.

use alloc::string::ToString;
use alloc::vec::Vec;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use understory_history::{History, NavKey};

use crate::error::FlowError;
use crate::state::State;

/// Converts keys to and from a serializable representation.
pub trait KeyParceler<K> {
    /// The persisted form of a key.
    type Parcel: Serialize + DeserializeOwned;

    /// Encode `key`.
    fn to_parcel(&self, key: &K) -> Self::Parcel;

    /// Decode a key; fails with [`FlowError::Codec`] on an unknown parcel.
    fn to_key(&self, parcel: Self::Parcel) -> Result<K, FlowError>;
}

/// Persists keys that are themselves serde types.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityParceler;

impl<K: Clone + Serialize + DeserializeOwned> KeyParceler<K> for IdentityParceler {
    type Parcel = K;

    fn to_parcel(&self, key: &K) -> K {
        key.clone()
    }

    fn to_key(&self, parcel: K) -> Result<K, FlowError> {
        Ok(parcel)
    }
}

/// Placeholder for configurations that do not persist histories.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoParceler;

impl<K> KeyParceler<K> for NoParceler {
    type Parcel = ();

    fn to_parcel(&self, _key: &K) {}

    fn to_key(&self, _parcel: ()) -> Result<K, FlowError> {
        Err(FlowError::Codec("no key parceler is configured".to_string()))
    }
}

/// One persisted history entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState<P> {
    /// The encoded key.
    pub key: P,
    /// The application bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<Vec<u8>>,
    /// Widget states by non-zero id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub widgets: Vec<(u32, Vec<u8>)>,
}

impl<P> SavedState<P> {
    /// Encode `state` with `parceler`.
    pub fn from_state<K>(state: &State<K>, parceler: &impl KeyParceler<K, Parcel = P>) -> Self {
        Self {
            key: parceler.to_parcel(state.key()),
            bundle: state.bundle().map(<[u8]>::to_vec),
            widgets: state
                .widgets()
                .map(|(id, blob)| (id, blob.to_vec()))
                .collect(),
        }
    }

    /// Decode into a [`State`].
    pub fn into_state<K>(
        self,
        parceler: &impl KeyParceler<K, Parcel = P>,
    ) -> Result<State<K>, FlowError> {
        let mut state = State::new(parceler.to_key(self.key)?);
        state.set_bundle(self.bundle);
        for (id, blob) in self.widgets {
            state.save_widget(id, blob)?;
        }
        Ok(state)
    }
}

/// A persisted history, bottom to top.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedHistory<P> {
    /// Persisted entries, bottom to top.
    pub entries: Vec<SavedState<P>>,
}

impl<P> Default for SavedHistory<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<P> SavedHistory<P> {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode the history and the states saved with it.
    ///
    /// An empty payload decodes to `None`.
    pub fn restore<K: NavKey>(
        self,
        parceler: &impl KeyParceler<K, Parcel = P>,
    ) -> Result<Option<(History<K>, Vec<State<K>>)>, FlowError> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let states = self
            .entries
            .into_iter()
            .map(|entry| entry.into_state(parceler))
            .collect::<Result<Vec<_>, _>>()?;
        let history = History::new(states.iter().map(|state| state.key().clone()))?;
        Ok(Some((history, states)))
    }
}

/// Encode `history` as a payload that carries no saved state, for starting a
/// host at a given history.
pub fn history_to_intent<K: NavKey, Q: KeyParceler<K>>(
    history: &History<K>,
    parceler: &Q,
) -> SavedHistory<Q::Parcel> {
    SavedHistory {
        entries: history
            .frames_from_bottom()
            .map(|key| SavedState {
                key: parceler.to_parcel(key),
                bundle: None,
                widgets: Vec::new(),
            })
            .collect(),
    }
}
