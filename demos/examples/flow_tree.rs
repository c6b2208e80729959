// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical keys and shared models.
//!
//! The contact list provides storage to everything nested under it. Editing a
//! contact spans two screens (name, then email) that share one editor model,
//! which is committed back to storage when the last editing screen leaves.
//!
//! Run:
//! - `cargo run -p understory_demos --example flow_tree`

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use understory_flow::{
    Direction, Dispatcher, Flow, FlowError, KeyManager, Traversal, TraversalCallback,
};
use understory_history::{History, KeyShape, ModelRelation, NavKey};
use understory_scope::{Binder, ModelScope, ServicesFactory};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Screen {
    Contacts,
    EditName(u32),
    EditEmail(u32),
}

impl NavKey for Screen {
    fn shape(&self) -> KeyShape<Self> {
        match self {
            Self::Contacts => KeyShape::Plain,
            Self::EditName(_) | Self::EditEmail(_) => KeyShape::Hierarchical(Self::Contacts),
        }
    }

    fn model_relations(&self) -> Vec<ModelRelation> {
        match self {
            Self::EditName(id) | Self::EditEmail(id) => {
                vec![ModelRelation::new("editors", id.to_string())]
            }
            Self::Contacts => Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
struct Contact {
    name: String,
    email: String,
}

type Storage = RefCell<Vec<Contact>>;

struct ContactServices;

impl ServicesFactory<Screen> for ContactServices {
    fn bind_services(&self, binder: &mut Binder<Screen>) {
        if *binder.key() == Screen::Contacts {
            let storage: Storage = RefCell::new(vec![Contact {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            }]);
            binder.bind("storage", storage);
        }
    }
}

/// Editors start empty; the first editing screen fills them from storage.
struct Editors;

impl ModelScope for Editors {
    fn name(&self) -> &'static str {
        "editors"
    }

    fn create_model(&self, _tag: &str) -> Rc<dyn Any> {
        Rc::new(RefCell::new(None::<Contact>))
    }
}

type Editor = RefCell<Option<Contact>>;

fn main() -> Result<(), FlowError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let factories: Vec<Box<dyn ServicesFactory<Screen>>> = vec![Box::new(ContactServices)];
    let models: Vec<Box<dyn ModelScope>> = vec![Box::new(Editors)];
    let flow = Flow::new(
        History::single(Screen::Contacts),
        KeyManager::new(factories, models),
    );

    let weak = flow.downgrade();
    let dispatcher: Rc<dyn Dispatcher<Screen>> = Rc::new(
        move |traversal: Traversal<Screen>, callback: TraversalCallback<Screen>| {
            let top = traversal.destination().top().clone();
            let services = traversal.services(&top)?;
            // Lookups fall through to the contact list's bag.
            let storage = services.get::<Storage>("storage");
            if let (Screen::EditName(id) | Screen::EditEmail(id), Some(storage)) = (&top, storage)
            {
                let flow = weak.upgrade().ok_or(FlowError::Detached)?;
                let editor = flow.model::<Editor>("editors", &id.to_string())?;
                let mut editing = editor.borrow_mut();
                if editing.is_none() {
                    *editing = storage.borrow().get(*id as usize).cloned();
                }
                println!("{top:?} editing {:?}", editing.as_ref().map(|c| &c.name));
            } else {
                println!("{top:?}");
            }
            callback.on_traversal_completed()
        },
    );
    flow.set_dispatcher(dispatcher)?;

    flow.set(Screen::EditName(0))?;
    let editor = flow.model::<Editor>("editors", "0")?;
    if let Some(contact) = editor.borrow_mut().as_mut() {
        contact.name = "Ada Lovelace".to_string();
    }

    // The email screen shares the editor created for the name screen.
    flow.replace_top(Screen::EditEmail(0), Direction::Forward)?;
    if let Some(contact) = editor.borrow_mut().as_mut() {
        contact.email = "ada@analytical.engine".to_string();
    }

    // Save: write the edit back and leave the editing screens.
    let storage = flow.services(&Screen::Contacts)?;
    if let (Some(storage), Some(edited)) = (
        storage.get::<Storage>("storage"),
        editor.borrow().clone(),
    ) {
        storage.borrow_mut()[0] = edited;
        println!("saved {:?}", storage.borrow()[0]);
    }
    flow.set(Screen::Contacts)?;
    assert!(
        flow.model::<Editor>("editors", "0").is_err(),
        "editor should be dropped once no editing screen is left"
    );
    Ok(())
}
