// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_flow --heading-base-level=0

//! Understory Flow: a single-threaded navigation engine over key histories.
//!
//! ## Overview
//!
//! A [`Flow`] holds the committed [`History`](understory_history::History) of an application and
//! turns every navigation request into a traversal. Traversals run one at a time through a queue:
//! the head is handed to the attached [`Dispatcher`], which renders it (possibly asynchronously)
//! and then completes its [`TraversalCallback`]. Completion commits the destination and starts
//! the next queued traversal. Requests made while no dispatcher is attached wait in the queue.
//!
//! Alongside the history the engine keeps per-key resources in a [`KeyManager`]:
//!
//! - a [`Services`](understory_scope::Services) bag for every key in use, set up when the key
//!   enters the history and torn down once it has left and the queue is empty;
//! - shared models, counted by the keys that declare them;
//! - a saved [`State`] per key, retained only while the key remains in the history.
//!
//! ## Dispatching
//!
//! [`Dispatcher`] sees both histories. [`DefaultKeyDispatcher`] narrows that to the top keys and
//! hands a [`KeyChange`] to a [`KeyChanger`], skipping traversals whose top did not change.
//!
//! ## Hosting
//!
//! [`LifecycleIntegration`], built from a [`FlowConfig`], binds an engine to a host that can be
//! destroyed and recreated. It restores the history from a [`SavedHistory`] or an intent payload,
//! attaches and detaches the host's dispatcher on resume and pause, and produces the payload to
//! persist on save. Keys are encoded with a [`KeyParceler`] through serde.
//!
//! ## Minimal example
//!
//! ```
//! use std::rc::Rc;
//! use understory_flow::{Dispatcher, FlowConfig, Traversal, TraversalCallback};
//!
//! let dispatcher: Rc<dyn Dispatcher<&'static str>> = Rc::new(
//!     |traversal: Traversal<&'static str>, callback: TraversalCallback<&'static str>| {
//!         println!("{:?} to {}", traversal.direction(), traversal.destination().top());
//!         callback.on_traversal_completed()
//!     },
//! );
//!
//! let mut host = FlowConfig::new("home").build(dispatcher);
//! host.on_host_created(None, None).unwrap();
//!
//! let flow = host.flow().unwrap().clone();
//! flow.set("inbox").unwrap();
//! flow.set("message").unwrap();
//! flow.set("inbox").unwrap();
//! assert_eq!(flow.history().as_slice(), ["home", "inbox"]);
//! assert!(flow.go_back().unwrap());
//! assert!(!flow.go_back().unwrap());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod callback;
mod diff;
mod dispatcher;
mod error;
mod flow;
mod key_manager;
mod lifecycle;
mod persist;
mod state;
mod traversal;

pub use callback::{HistoryCallback, NotPersistentHistoryCallback};
pub use dispatcher::{DefaultKeyDispatcher, Dispatcher, KeyChange, KeyChanger};
pub use error::FlowError;
pub use flow::{Flow, WeakFlow};
pub use key_manager::KeyManager;
pub use lifecycle::{FlowConfig, LifecycleIntegration};
pub use persist::{
    IdentityParceler, KeyParceler, NoParceler, SavedHistory, SavedState, history_to_intent,
};
pub use state::{State, StateStore};
pub use traversal::{Direction, Traversal, TraversalCallback};
