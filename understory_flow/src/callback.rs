// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hooks around persisting, restoring, and emptying the history.

use understory_history::{History, NavKey};

/// Hooks the engine and the lifecycle glue call at the edges of a history's life.
///
/// Every method has a default: histories pass through unchanged and clearing
/// does nothing.
pub trait HistoryCallback<K: NavKey> {
    /// Adjust a history restored from a save, before it is first dispatched.
    /// Returning `None` falls back to the intent or default history.
    fn on_restore_history(&self, history: History<K>) -> Option<History<K>> {
        Some(history)
    }

    /// Adjust a history before it is saved. Returning `None` saves nothing.
    ///
    /// Keys that are not persistent are left out of the save even when the
    /// returned history keeps them.
    fn on_save_history(&self, history: History<K>) -> Option<History<K>> {
        Some(history)
    }

    /// Called when going back is requested with nothing left to go back to.
    fn on_history_cleared(&self) {}
}

/// Drops keys marked [`NOT_PERSISTENT`](understory_history::KeyFlags::NOT_PERSISTENT)
/// from saved histories.
#[derive(Copy, Clone, Debug, Default)]
pub struct NotPersistentHistoryCallback;

impl<K: NavKey> HistoryCallback<K> for NotPersistentHistoryCallback {
    fn on_save_history(&self, history: History<K>) -> Option<History<K>> {
        history.filtered(K::is_persistent)
    }
}
