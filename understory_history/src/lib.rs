// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_history --heading-base-level=0

//! Understory History: immutable navigation stacks of application keys.
//!
//! ## Overview
//!
//! A [`History`] is an ordered, never-empty stack of keys, bottom (oldest) to top (frontmost).
//! Keys are application values implementing [`NavKey`]; the crate never looks inside them beyond
//! equality, their [`KeyShape`], and their [`KeyFlags`].
//!
//! New stacks are made from old ones with a [`Builder`] obtained from [`History::build_upon`].
//! A built history is isolated from its builder, so later pushes and pops never leak into it.
//!
//! ## Key shapes
//!
//! - [`KeyShape::Plain`]: no structural relation to other keys.
//! - [`KeyShape::Composite`]: an ordered list of constituent keys, for example a dialog that
//!   wraps the screen behind it.
//! - [`KeyShape::Hierarchical`]: a single parent key; scopes owned by the key nest inside the
//!   parent's.
//!
//! Higher layers (scoped services, the traversal engine) match on the shape exhaustively.
//!
//! ## Identity
//!
//! Keys may carry data that does not take part in their `Eq` implementation. When a navigation
//! operation finds an equal key already on the stack it keeps the value that is already there
//! (identity preserving), unless the key is marked [`KeyFlags::NON_PRESERVABLE`].
//!
//! ## Example
//!
//! ```
//! use understory_history::History;
//!
//! let history = History::new(["able", "baker", "charlie"]).unwrap();
//! assert_eq!(history.top(), &"charlie");
//! assert_eq!(history.peek(2), Some(&"able"));
//!
//! let mut builder = history.build_upon();
//! builder.pop_to(&"able").unwrap().push("delta");
//! let next = builder.build().unwrap();
//! assert_eq!(next.as_slice(), &["able", "delta"]);
//! // The original is untouched.
//! assert_eq!(history.len(), 3);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod history;
mod key;

pub use error::HistoryError;
pub use history::{Builder, History};
pub use key::{KeyFlags, KeyShape, ModelRelation, NavKey};
