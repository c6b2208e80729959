// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enter/leave sets between two histories.
//!
//! Keys are compared by value and each distinct key is reported once, no
//! matter how often it occurs. Entering keys come bottom to top so that
//! older entries are set up first; leaving keys come top to bottom.

use alloc::vec::Vec;

use understory_history::History;

/// Distinct keys of `keys`, first occurrences only, in order.
pub(crate) fn distinct<K: PartialEq>(keys: &[K]) -> Vec<&K> {
    let mut out: Vec<&K> = Vec::with_capacity(keys.len());
    for key in keys {
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

/// Keys of `new` that `old` does not contain, bottom to top.
pub(crate) fn entering<K: PartialEq + Clone>(old: &History<K>, new: &History<K>) -> Vec<K> {
    distinct(new.as_slice())
        .into_iter()
        .filter(|key| !old.contains(key))
        .cloned()
        .collect()
}

/// Keys of `old` that `new` does not contain, top to bottom.
pub(crate) fn leaving<K: PartialEq + Clone>(old: &History<K>, new: &History<K>) -> Vec<K> {
    let mut out = entering(new, old);
    out.reverse();
    out
}
