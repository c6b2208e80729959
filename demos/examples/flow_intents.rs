// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deep links and saved state.
//!
//! A deep link carries a whole history encoded as JSON. The host starts at that
//! history, receives a second link while running, and finally saves its state
//! so a new process can pick up where it left off.
//!
//! Run:
//! - `cargo run -p understory_demos --example flow_intents`

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use understory_flow::{
    Dispatcher, FlowConfig, FlowError, IdentityParceler, SavedHistory, Traversal,
    TraversalCallback, history_to_intent,
};
use understory_history::{History, KeyFlags, NavKey};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Screen {
    Home,
    Album { id: u32 },
    Track { album: u32, number: u8 },
    /// Transient confirmation; never persisted.
    Shared,
}

impl NavKey for Screen {
    fn flags(&self) -> KeyFlags {
        match self {
            Self::Shared => KeyFlags::NOT_PERSISTENT,
            _ => KeyFlags::empty(),
        }
    }
}

fn printing() -> Rc<dyn Dispatcher<Screen>> {
    Rc::new(
        |traversal: Traversal<Screen>, callback: TraversalCallback<Screen>| {
            println!("{:?} {:?}", traversal.direction(), traversal.destination().top());
            callback.on_traversal_completed()
        },
    )
}

fn codec(err: serde_json::Error) -> FlowError {
    FlowError::Codec(err.to_string())
}

fn link(history: &History<Screen>) -> Result<String, FlowError> {
    serde_json::to_string(&history_to_intent(history, &IdentityParceler)).map_err(codec)
}

fn main() -> Result<(), FlowError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = || {
        FlowConfig::new(Screen::Home)
            .key_parceler(IdentityParceler)
            .build(printing())
    };

    let first = link(&History::new([Screen::Home, Screen::Album { id: 7 }])?)?;
    println!("link: {first}");
    let intent: SavedHistory<Screen> = serde_json::from_str(&first).map_err(codec)?;

    let mut glue = config();
    glue.on_host_created(None, Some(intent))?;
    let flow = glue.flow().ok_or(FlowError::NotCreated)?.clone();
    flow.set(Screen::Track {
        album: 7,
        number: 2,
    })?;
    flow.with_state(&Screen::Album { id: 7 }, |state| {
        state.set_bundle(Some(b"scroll=480".to_vec()));
    });

    // A second link while running replaces the history, keeping the shared prefix.
    let second = link(&History::new([
        Screen::Home,
        Screen::Album { id: 7 },
        Screen::Shared,
    ])?)?;
    glue.on_new_intent(serde_json::from_str(&second).map_err(codec)?)?;

    let Some(saved) = glue.on_save()? else {
        println!("nothing to save");
        return Ok(());
    };
    let json = serde_json::to_string_pretty(&saved).map_err(codec)?;
    println!("saved:\n{json}");

    // A new process restores without the transient confirmation.
    let mut restored = config();
    restored.on_host_created(Some(serde_json::from_str(&json).map_err(codec)?), None)?;
    let flow = restored.flow().ok_or(FlowError::NotCreated)?;
    assert_eq!(
        flow.history().as_slice(),
        [Screen::Home, Screen::Album { id: 7 }]
    );
    Ok(())
}
