// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flow basics.
//!
//! A welcome screen asks for a name and pushes a hello screen. The "view" is a
//! line of text; its scroll position is saved on the way out and restored when
//! the screen comes back.
//!
//! Run:
//! - `cargo run -p understory_demos --example flow_basic`
//! - `RUST_LOG=understory_flow=debug cargo run -p understory_demos --example flow_basic`

use std::cell::RefCell;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use understory_flow::{
    DefaultKeyDispatcher, FlowConfig, FlowError, KeyChange, KeyChanger, TraversalCallback,
};
use understory_history::NavKey;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Screen {
    Welcome,
    Hello { name: String },
}

impl NavKey for Screen {}

/// What is on screen, and how far it has been scrolled.
#[derive(Debug, Default)]
struct Frame {
    showing: Option<Screen>,
    scroll: u8,
}

struct Changer {
    frame: Rc<RefCell<Frame>>,
}

impl KeyChanger<Screen> for Changer {
    fn change_key(
        &self,
        change: KeyChange<Screen>,
        callback: TraversalCallback<Screen>,
    ) -> Result<(), FlowError> {
        let mut frame = self.frame.borrow_mut();
        if let Some(outgoing) = &change.outgoing {
            let scroll = frame.scroll;
            change
                .traversal
                .with_state(outgoing, |state| state.set_bundle(Some(vec![scroll])))?;
        }
        frame.scroll = change
            .traversal
            .with_state(&change.incoming, |state| {
                state.bundle().and_then(|b| b.first().copied())
            })?
            .unwrap_or(0);
        println!(
            "{:?} -> {:?} (scroll {})",
            change.direction, change.incoming, frame.scroll
        );
        frame.showing = Some(change.incoming);
        drop(frame);
        callback.on_traversal_completed()
    }
}

fn main() -> Result<(), FlowError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let frame = Rc::new(RefCell::new(Frame::default()));
    let dispatcher = DefaultKeyDispatcher::new(Changer {
        frame: Rc::clone(&frame),
    });
    let mut host = FlowConfig::new(Screen::Welcome).build(Rc::new(dispatcher));
    host.on_host_created(None, None)?;
    let flow = host.flow().ok_or(FlowError::NotCreated)?.clone();

    // The user scrolls the welcome screen, then submits a name.
    frame.borrow_mut().scroll = 12;
    flow.set(Screen::Hello {
        name: "Ada".to_string(),
    })?;

    // Back restores the welcome screen's scroll position.
    flow.go_back()?;
    assert_eq!(frame.borrow().scroll, 12, "scroll should be restored");
    assert_eq!(frame.borrow().showing, Some(Screen::Welcome));

    // Nothing left: the host would finish here.
    if !flow.go_back()? {
        println!("history exhausted, closing");
    }
    Ok(())
}
