// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

/// Misuse of a [`History`](crate::History) or [`Builder`](crate::Builder).
///
/// These indicate a defect in the calling code rather than a recoverable condition.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// A history was built from an empty sequence of keys.
    #[error("history may not be empty")]
    Empty,
    /// [`Builder::pop`](crate::Builder::pop) was called on an empty builder.
    #[error("cannot pop from an empty builder")]
    PopEmpty,
    /// [`Builder::pop_count`](crate::Builder::pop_count) asked for more entries than exist.
    #[error("cannot pop {count} elements, history only has {len}")]
    PopCount {
        /// Requested number of pops.
        count: usize,
        /// Entries available.
        len: usize,
    },
    /// [`Builder::pop_to`](crate::Builder::pop_to) was given a key that is not in the builder.
    #[error("{key} not found in history")]
    NotFound {
        /// Debug rendering of the missing key.
        key: String,
    },
}
