// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_scope --heading-base-level=0

//! Understory Scope: reference-counted service scopes for navigation keys.
//!
//! ## Overview
//!
//! Every key that is in use owns a [`Services`] bag: an immutable map of named capabilities
//! chained to a parent bag. Lookups fall through to ancestors and return `None` when no ancestor
//! binds the name. The [`ScopeManager`] creates a bag the first time a key is [set up](ScopeManager::set_up)
//! and discards it when the last use is [torn down](ScopeManager::tear_down).
//!
//! Bags are populated by [`ServicesFactory`] implementations. Each factory gets a [`Binder`] for
//! the new key and may bind any number of capabilities; the binder already sees the parent's
//! capabilities, so a factory can build on what an ancestor provides.
//!
//! ## Structure
//!
//! The key's [`KeyShape`](understory_history::KeyShape) decides the chain:
//!
//! - `Plain` keys chain to the permanent root bag.
//! - `Composite` keys set up every constituent first, then chain to the root bag. They are torn
//!   down before their constituents, which are released in reverse order.
//! - `Hierarchical` keys set up the parent chain first and chain to the parent's bag. They are
//!   torn down before their ancestors.
//!
//! ## Shared models
//!
//! [`ModelManager`] complements the per-key bags with models shared by tag across unrelated keys.
//! A key declares the models it uses with [`NavKey::model_relations`](understory_history::NavKey::model_relations);
//! the model lives while at least one such key is set up.
//!
//! ## Minimal example
//!
//! ```
//! use understory_scope::{Binder, ScopeManager, ServicesFactory};
//!
//! struct Greeter;
//! impl ServicesFactory<&'static str> for Greeter {
//!     fn bind_services(&self, binder: &mut Binder<&'static str>) {
//!         if *binder.key() == "home" {
//!             binder.bind("greeting", String::from("hello"));
//!         }
//!     }
//! }
//!
//! let factories: Vec<Box<dyn ServicesFactory<&'static str>>> = vec![Box::new(Greeter)];
//! let mut scopes = ScopeManager::new(factories);
//! scopes.set_up(&"home");
//! let services = scopes.find_services(&"home").unwrap();
//! assert_eq!(services.get::<String>("greeting").as_deref().map(String::as_str), Some("hello"));
//! scopes.tear_down(&"home").unwrap();
//! assert!(scopes.find_services(&"home").is_err());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod manager;
mod models;
mod services;

pub use error::ScopeError;
pub use manager::{ScopeManager, SetUpStep};
pub use models::{MissingModel, ModelManager, ModelScope};
pub use services::{Binder, Services, ServicesFactory};
