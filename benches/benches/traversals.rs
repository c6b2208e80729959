// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_flow::{Dispatcher, Flow, KeyManager, Traversal, TraversalCallback};
use understory_history::{History, KeyShape, NavKey};
use understory_scope::{Binder, ServicesFactory};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Screen {
    Root,
    Page(u32),
    Detail(u32),
}

impl NavKey for Screen {
    fn shape(&self) -> KeyShape<Self> {
        match self {
            Self::Detail(page) => KeyShape::Hierarchical(Self::Page(*page)),
            _ => KeyShape::Plain,
        }
    }
}

struct Counter;

impl ServicesFactory<Screen> for Counter {
    fn bind_services(&self, binder: &mut Binder<Screen>) {
        binder.bind("visits", RefCell::new(0_u32));
    }
}

fn new_flow(with_services: bool) -> Flow<Screen> {
    let factories: Vec<Box<dyn ServicesFactory<Screen>>> = if with_services {
        vec![Box::new(Counter)]
    } else {
        Vec::new()
    };
    Flow::new(
        History::single(Screen::Root),
        KeyManager::new(factories, Vec::new()),
    )
}

fn immediate() -> Rc<dyn Dispatcher<Screen>> {
    Rc::new(|traversal: Traversal<Screen>, callback: TraversalCallback<Screen>| {
        black_box(traversal.destination().len());
        callback.on_traversal_completed()
    })
}

type Held = Rc<RefCell<VecDeque<TraversalCallback<Screen>>>>;

fn holding() -> (Held, Rc<dyn Dispatcher<Screen>>) {
    let held: Held = Rc::default();
    let sink = Rc::clone(&held);
    let dispatcher: Rc<dyn Dispatcher<Screen>> = Rc::new(
        move |_traversal: Traversal<Screen>, callback: TraversalCallback<Screen>| {
            sink.borrow_mut().push_back(callback);
            Ok(())
        },
    );
    (held, dispatcher)
}

fn bench_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync");
    for &n in &[16_u32, 64, 256] {
        group.throughput(Throughput::Elements(u64::from(n) * 2));
        for (label, with_services) in [("plain", false), ("services", true)] {
            group.bench_function(format!("push_pop_{label}_n{n}"), |b| {
                b.iter_batched(
                    || {
                        let flow = new_flow(with_services);
                        let _ = flow.set_dispatcher(immediate());
                        flow
                    },
                    |flow| {
                        for i in 0..n {
                            let _ = flow.set(Screen::Page(i));
                        }
                        for _ in 0..n {
                            let _ = flow.go_back();
                        }
                        black_box(flow.history().len());
                    },
                    BatchSize::SmallInput,
                );
            });
        }
        group.bench_function(format!("nested_n{n}"), |b| {
            b.iter_batched(
                || {
                    let flow = new_flow(true);
                    let _ = flow.set_dispatcher(immediate());
                    flow
                },
                |flow| {
                    for i in 0..n {
                        let _ = flow.set(Screen::Page(i));
                        let _ = flow.set(Screen::Detail(i));
                        let _ = flow.go_back();
                    }
                    black_box(flow.history().len());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_queued(c: &mut Criterion) {
    let mut group = c.benchmark_group("queued");
    for &n in &[16_u32, 64, 256] {
        group.throughput(Throughput::Elements(u64::from(n)));
        group.bench_function(format!("drain_n{n}"), |b| {
            b.iter_batched(
                || {
                    let flow = new_flow(true);
                    let (held, dispatcher) = holding();
                    let _ = flow.set_dispatcher(dispatcher);
                    for i in 0..n {
                        let _ = flow.set(Screen::Page(i));
                    }
                    (flow, held)
                },
                |(flow, held)| {
                    loop {
                        let next = held.borrow_mut().pop_front();
                        let Some(callback) = next else { break };
                        let _ = callback.on_traversal_completed();
                    }
                    black_box(flow.is_idle());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sync, bench_queued);
criterion_main!(benches);
