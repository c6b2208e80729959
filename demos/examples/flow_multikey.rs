// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composite keys.
//!
//! A confirmation dialog is a key made of the screen it covers. While the
//! dialog is up, the covered screen's services stay alive even though that
//! screen is no longer in the history on its own.
//!
//! Run:
//! - `cargo run -p understory_demos --example flow_multikey`

use std::cell::Cell;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use understory_flow::{
    Direction, Dispatcher, Flow, FlowError, KeyManager, Traversal, TraversalCallback,
};
use understory_history::{History, KeyShape, NavKey};
use understory_scope::{Binder, ServicesFactory};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Screen {
    One,
    Two,
    /// A dialog shown over another screen.
    Dialog(Box<Screen>),
}

impl NavKey for Screen {
    fn shape(&self) -> KeyShape<Self> {
        match self {
            Self::Dialog(behind) => KeyShape::Composite(vec![(**behind).clone()]),
            _ => KeyShape::Plain,
        }
    }
}

/// Counts how many times each screen's presenter was created.
#[derive(Default)]
struct Presenters {
    created: Rc<Cell<u32>>,
}

struct Presenter {
    id: u32,
}

impl ServicesFactory<Screen> for Presenters {
    fn bind_services(&self, binder: &mut Binder<Screen>) {
        if matches!(binder.key(), Screen::Dialog(_)) {
            return;
        }
        let id = self.created.get() + 1;
        self.created.set(id);
        binder.bind("presenter", Presenter { id });
    }
}

struct Render;

impl Dispatcher<Screen> for Render {
    fn dispatch(
        &self,
        traversal: Traversal<Screen>,
        callback: TraversalCallback<Screen>,
    ) -> Result<(), FlowError> {
        let layers: Vec<String> = traversal
            .incoming_services()
            .iter()
            .map(|(key, services)| match services.get::<Presenter>("presenter") {
                Some(p) => format!("{key:?} (presenter #{})", p.id),
                None => format!("{key:?}"),
            })
            .collect();
        println!("{:?}: {}", traversal.direction(), layers.join(" under "));
        callback.on_traversal_completed()
    }
}

fn main() -> Result<(), FlowError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let presenters = Presenters::default();
    let created = Rc::clone(&presenters.created);
    let factories: Vec<Box<dyn ServicesFactory<Screen>>> = vec![Box::new(presenters)];
    let flow = Flow::new(
        History::single(Screen::One),
        KeyManager::new(factories, Vec::new()),
    );
    flow.set_dispatcher(Rc::new(Render))?;

    flow.set(Screen::Two)?;
    // Replace Two with a dialog over Two: Two's presenter is reused.
    flow.replace_top(Screen::Dialog(Box::new(Screen::Two)), Direction::Forward)?;
    assert_eq!(created.get(), 2, "Two's presenter should be reused");

    flow.go_back()?;
    flow.with_keys(|keys| {
        println!("live scopes after closing the dialog: {}", keys.scopes().len());
    });
    Ok(())
}
