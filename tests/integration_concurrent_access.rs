/// Concurrent access integration tests
///
/// A built container serves lookups and runtime injection from many threads at
/// once; these tests check that every thread observes the same beans.

use crossbeam_utils::thread;
use ferrous_beans::{
    scan, BoxError, Component, Context, Descriptor, FactoryBean, Inject, InjectVec, NamedBean,
    SearchLevel,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

trait Worker: Send + Sync {
    fn id(&self) -> usize;
}

struct Node {
    id: usize,
}

impl Worker for Node {
    fn id(&self) -> usize {
        self.id
    }
}

impl NamedBean for Node {
    fn bean_name(&self) -> String {
        format!("node-{}", self.id)
    }
}

impl Component for Node {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.provides::<dyn Worker>(|n| n).named()
    }
}

struct Shared {
    serial: usize,
}

struct SharedFactory {
    calls: AtomicUsize,
}

impl FactoryBean for SharedFactory {
    type Output = Shared;

    fn object(&self) -> Result<Arc<Shared>, BoxError> {
        Ok(Arc::new(Shared {
            serial: self.calls.fetch_add(1, Ordering::SeqCst),
        }))
    }
}

impl Component for SharedFactory {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.factory()
    }
}

struct Job {
    workers: InjectVec<dyn Worker>,
    shared: Inject<Shared>,
}

impl Component for Job {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.inject("workers", |j| &j.workers)
            .inject("shared", |j| &j.shared)
    }
}

fn build(nodes: usize) -> (Context, Arc<SharedFactory>) {
    let factory = Arc::new(SharedFactory {
        calls: AtomicUsize::new(0),
    });
    let mut entries = scan![factory.clone()];
    for id in 0..nodes {
        entries.extend(scan![Arc::new(Node { id })]);
    }
    (Context::create(entries).unwrap(), factory)
}

#[test]
fn test_concurrent_lookups_agree() {
    let (ctx, _) = build(16);
    let barrier = Barrier::new(8);

    thread::scope(|s| {
        for t in 0..8 {
            let ctx = &ctx;
            let barrier = &barrier;
            s.spawn(move |_| {
                barrier.wait();
                for round in 0..50 {
                    let workers = ctx.bean_of::<dyn Worker>(SearchLevel::Nearest);
                    assert_eq!(workers.len(), 16);
                    let name = format!("node-{}", (t + round) % 16);
                    let named = ctx.lookup(&name, SearchLevel::Nearest);
                    assert_eq!(named.len(), 1);
                    assert_eq!(named[0].name(), name);
                }
            });
        }
    })
    .unwrap();

    ctx.close().unwrap();
}

#[test]
fn test_concurrent_inject_shares_singleton_output() {
    let (ctx, factory) = build(4);

    let jobs: Vec<Arc<Job>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = &ctx;
                s.spawn(move |_| {
                    let job = Arc::new(Job {
                        workers: InjectVec::new(),
                        shared: Inject::new(),
                    });
                    ctx.inject(&job).unwrap();
                    job
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
    let first = jobs[0].shared.required();
    for job in &jobs {
        assert_eq!(job.workers.len(), 4);
        assert!(Arc::ptr_eq(&job.shared.required(), &first));
        assert_eq!(job.shared.required().serial, 0);
    }
    ctx.close().unwrap();
}
