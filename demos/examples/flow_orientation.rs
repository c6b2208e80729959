// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Completing a traversal from a recreated host.
//!
//! Some screens only render in landscape. When one is requested in portrait,
//! the dispatcher asks for a rotation and leaves the traversal hanging. The
//! rotation destroys the host; the new host's dispatcher is attached, completes
//! the hanging traversal, and is then bootstrapped with the landscape screen.
//!
//! Run:
//! - `cargo run -p understory_demos --example flow_orientation`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use understory_flow::{Dispatcher, FlowConfig, FlowError, Traversal, TraversalCallback};
use understory_history::NavKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Screen {
    Menu,
    Video,
}

impl Screen {
    fn requires_landscape(self) -> bool {
        self == Self::Video
    }
}

impl NavKey for Screen {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Orientation {
    Portrait,
    Landscape,
}

/// State that outlives host instances.
#[derive(Default)]
struct Device {
    rotation_requested: Cell<bool>,
    hanging: RefCell<Option<TraversalCallback<Screen>>>,
}

/// The dispatcher of one host instance.
struct HostDispatcher {
    orientation: Orientation,
    device: Rc<Device>,
}

impl Dispatcher<Screen> for HostDispatcher {
    fn dispatch(
        &self,
        traversal: Traversal<Screen>,
        callback: TraversalCallback<Screen>,
    ) -> Result<(), FlowError> {
        let top = *traversal.destination().top();
        if top.requires_landscape() && self.orientation == Orientation::Portrait {
            println!("{top:?} needs landscape; rotating");
            self.device.rotation_requested.set(true);
            *self.device.hanging.borrow_mut() = Some(callback);
            return Ok(());
        }
        println!("{:?} host shows {top:?}", self.orientation);
        callback.on_traversal_completed()
    }
}

fn host(orientation: Orientation, device: &Rc<Device>) -> Rc<dyn Dispatcher<Screen>> {
    Rc::new(HostDispatcher {
        orientation,
        device: Rc::clone(device),
    })
}

fn main() -> Result<(), FlowError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let device = Rc::new(Device::default());
    let mut glue = FlowConfig::new(Screen::Menu).build(host(Orientation::Portrait, &device));
    glue.on_host_created(None, None)?;
    let flow = glue.flow().ok_or(FlowError::NotCreated)?.clone();

    flow.set(Screen::Video)?;
    assert!(device.rotation_requested.get(), "rotation should be requested");
    assert_eq!(flow.history().as_slice(), [Screen::Menu]);

    // The portrait host goes away and a landscape one is created.
    glue.on_pause()?;
    glue.set_host_dispatcher(host(Orientation::Landscape, &device));
    glue.on_host_created(None, None)?;

    // The new host finishes what the old one started.
    let hanging = device.hanging.borrow_mut().take();
    if let Some(callback) = hanging {
        callback.on_traversal_completed()?;
    }
    assert_eq!(flow.history().as_slice(), [Screen::Menu, Screen::Video]);
    assert!(flow.is_idle());
    Ok(())
}
