// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

use understory_history::HistoryError;
use understory_scope::ScopeError;

/// Failures reported by the navigation engine and its lifecycle glue.
///
/// Apart from [`Codec`](Self::Codec), every variant signals a defect in the
/// embedding application; none is retried.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// A traversal callback was completed a second time.
    #[error("on_traversal_completed already called for this traversal")]
    AlreadyCompleted,
    /// A traversal callback was completed before its traversal was dispatched.
    #[error("traversal not yet dispatched")]
    NotDispatched,
    /// A traversal had to execute while no dispatcher was attached.
    #[error("no dispatcher is attached")]
    NoDispatcher,
    /// The pending traversal was found in a state it can never be in at that point.
    #[error("hanging traversal in unexpected state")]
    HangingTraversal,
    /// A callback or traversal outlived its engine.
    #[error("the flow this handle belongs to has been dropped")]
    Detached,
    /// Widget state was saved under the reserved id zero.
    #[error("cannot save state for a widget with no id")]
    InvalidWidgetId,
    /// A lifecycle event arrived before the host was created.
    #[error("the host has not been created yet")]
    NotCreated,
    /// A key could not be encoded or decoded by its parceler.
    #[error("key codec failed: {0}")]
    Codec(String),
    /// A history operation failed.
    #[error(transparent)]
    History(#[from] HistoryError),
    /// A scope or model operation failed.
    #[error(transparent)]
    Scope(#[from] ScopeError),
}
