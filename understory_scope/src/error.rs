// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

/// Inconsistent use of a [`ScopeManager`](crate::ScopeManager) or [`ModelManager`](crate::ModelManager).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// Services were requested for a key that was never set up.
    #[error("no services currently exist for key {key}")]
    NotSetUp {
        /// Debug rendering of the key.
        key: String,
    },
    /// A key was torn down more often than it was set up.
    #[error("over-decremented uses of key {key}")]
    OverDecremented {
        /// Debug rendering of the key.
        key: String,
    },
    /// A model was requested that no set-up key uses.
    #[error("no model currently exists for tag {tag} in scope {scope}")]
    NoModel {
        /// Model scope name.
        scope: String,
        /// Model tag.
        tag: String,
    },
}
