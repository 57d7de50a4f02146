use ferrous_beans::{
    scan, BeansError, BoxError, Component, Context, Descriptor, FactoryBean, Inject, InjectMap,
    Lazy, NamedBean, SearchLevel,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Connection {
    serial: usize,
}

struct ConnectionFactory {
    made: AtomicUsize,
    shared: bool,
}

impl ConnectionFactory {
    fn new(shared: bool) -> Self {
        Self {
            made: AtomicUsize::new(0),
            shared,
        }
    }
}

impl FactoryBean for ConnectionFactory {
    type Output = Connection;

    fn object(&self) -> Result<Arc<Connection>, BoxError> {
        let serial = self.made.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Connection { serial }))
    }

    fn singleton(&self) -> bool {
        self.shared
    }
}

impl Component for ConnectionFactory {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.factory()
    }
}

struct Consumer {
    conn: Inject<Connection>,
}

impl Consumer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            conn: Inject::new(),
        })
    }
}

impl Component for Consumer {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.inject("conn", |c| &c.conn)
    }
}

#[test]
fn test_singleton_factory_shares_one_instance() {
    let factory = Arc::new(ConnectionFactory::new(true));
    let first = Consumer::new();
    let second = Consumer::new();

    let ctx = Context::create(scan![first.clone(), factory.clone(), second.clone()]).unwrap();

    assert!(Arc::ptr_eq(&first.conn.required(), &second.conn.required()));
    assert_eq!(factory.made.load(Ordering::SeqCst), 1);

    let produced = ctx.bean_of::<Connection>(SearchLevel::Nearest);
    assert_eq!(produced.len(), 1);
    assert!(Arc::ptr_eq(
        &produced[0].object_as::<Connection>().unwrap(),
        &first.conn.required()
    ));
    ctx.close().unwrap();
}

#[test]
fn test_non_singleton_factory_produces_per_consumer() {
    let factory = Arc::new(ConnectionFactory::new(false));
    let first = Consumer::new();
    let second = Consumer::new();

    let ctx = Context::create(scan![factory.clone(), first.clone(), second.clone()]).unwrap();

    let a = first.conn.required();
    let b = second.conn.required();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(a.serial, b.serial);

    // every produced instance is listed
    let produced = ctx.bean_of::<Connection>(SearchLevel::Nearest);
    assert_eq!(produced.len(), factory.made.load(Ordering::SeqCst));
    ctx.close().unwrap();
}

#[test]
fn test_produced_handle_points_at_factory() {
    let ctx = Context::create(scan![Arc::new(ConnectionFactory::new(true))]).unwrap();

    let handle = &ctx.bean_of::<Connection>(SearchLevel::Nearest)[0];
    let factory = handle.factory_bean().unwrap();
    assert!(factory.object_as::<ConnectionFactory>().is_some());
    assert_eq!(handle.to_string(), "<FactoryBean ConnectionFactory->Connection>");
    assert!(handle.name().ends_with("Connection"));

    let err = handle.reload().unwrap_err();
    assert!(matches!(err, BeansError::Reload { .. }));
    ctx.close().unwrap();
}

#[test]
fn test_factory_object_name() {
    struct Named;
    impl FactoryBean for Named {
        type Output = Connection;

        fn object(&self) -> Result<Arc<Connection>, BoxError> {
            Ok(Arc::new(Connection { serial: 7 }))
        }

        fn object_name(&self) -> Option<String> {
            Some("primary-connection".into())
        }
    }
    impl Component for Named {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.factory()
        }
    }

    let ctx = Context::create(scan![Arc::new(Named)]).unwrap();
    let found = ctx.lookup("primary-connection", SearchLevel::Nearest);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].object_as::<Connection>().unwrap().serial, 7);
    ctx.close().unwrap();
}

#[test]
fn test_repeated_factory_output_is_rejected() {
    struct Other;
    impl FactoryBean for Other {
        type Output = Connection;

        fn object(&self) -> Result<Arc<Connection>, BoxError> {
            Ok(Arc::new(Connection { serial: 0 }))
        }
    }
    impl Component for Other {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.factory()
        }
    }

    let err = Context::create(scan![
        Arc::new(ConnectionFactory::new(true)),
        Arc::new(Other),
    ])
    .unwrap_err();

    assert!(matches!(err, BeansError::Scan { .. }));
    assert!(matches!(err.root(), BeansError::RepeatedFactory { .. }));
}

#[test]
fn test_factory_failure_is_wrapped() {
    struct Failing;
    impl FactoryBean for Failing {
        type Output = Connection;

        fn object(&self) -> Result<Arc<Connection>, BoxError> {
            Err("host unreachable".into())
        }
    }
    impl Component for Failing {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.factory()
        }
    }

    let err = Context::create(scan![Arc::new(Failing), Consumer::new()]).unwrap_err();
    match &err {
        BeansError::Factory { output, .. } => assert!(output.ends_with("Connection")),
        other => panic!("expected Factory, got {:?}", other),
    }
    assert!(err.to_string().contains("host unreachable"));
}

#[test]
fn test_lazy_slot_on_factory_output_is_rejected() {
    struct Deferred {
        conn: Lazy<Connection>,
    }
    impl Component for Deferred {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.inject("conn", |d| &d.conn)
        }
    }

    let err = Context::create(scan![
        Arc::new(ConnectionFactory::new(true)),
        Arc::new(Deferred { conn: Lazy::new() }),
    ])
    .unwrap_err();
    assert!(matches!(err, BeansError::LazyFactory { .. }));
}

#[test]
fn test_factory_of_trait_objects() {
    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }
    struct Fixed;
    impl Clock for Fixed {
        fn now(&self) -> u64 {
            42
        }
    }
    struct ClockFactory;
    impl FactoryBean for ClockFactory {
        type Output = dyn Clock;

        fn object(&self) -> Result<Arc<dyn Clock>, BoxError> {
            Ok(Arc::new(Fixed))
        }
    }
    impl Component for ClockFactory {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.factory()
        }
    }
    struct Scheduler {
        clock: Inject<dyn Clock>,
    }
    impl Component for Scheduler {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.inject("clock", |s| &s.clock)
        }
    }

    let scheduler = Arc::new(Scheduler {
        clock: Inject::new(),
    });
    let ctx = Context::create(scan![scheduler.clone(), Arc::new(ClockFactory)]).unwrap();
    assert_eq!(scheduler.clock.required().now(), 42);
    ctx.close().unwrap();
}

#[test]
fn test_child_consumes_parent_factory_output() {
    let factory = Arc::new(ConnectionFactory::new(true));
    let parent = Context::create(scan![factory.clone()]).unwrap();

    let consumer = Consumer::new();
    let child = parent.extend(scan![consumer.clone()]).unwrap();

    let parent_conn = parent.bean_of::<Connection>(SearchLevel::Nearest)[0]
        .object_as::<Connection>()
        .unwrap();
    assert!(Arc::ptr_eq(&consumer.conn.required(), &parent_conn));
    assert_eq!(factory.made.load(Ordering::SeqCst), 1);

    child.close().unwrap();
    parent.close().unwrap();
}

trait Pool: Send + Sync {
    fn url(&self) -> String;
}

struct PooledConnection {
    url: String,
}

impl Pool for PooledConnection {
    fn url(&self) -> String {
        self.url.clone()
    }
}

struct PoolFactory;

impl FactoryBean for PoolFactory {
    type Output = PooledConnection;

    fn object(&self) -> Result<Arc<PooledConnection>, BoxError> {
        Ok(Arc::new(PooledConnection {
            url: "pool://primary".into(),
        }))
    }
}

impl Component for PoolFactory {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.factory().factory_provides::<dyn Pool>(|c| c)
    }
}

struct UsesPool {
    pool: Inject<dyn Pool>,
}

impl Component for UsesPool {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.inject("pool", |u| &u.pool)
    }
}

#[test]
fn test_factory_output_injected_as_capability() {
    let consumer = Arc::new(UsesPool { pool: Inject::new() });
    let ctx = Context::create(scan![Arc::new(PoolFactory), consumer.clone()]).unwrap();

    assert_eq!(consumer.pool.required().url(), "pool://primary");

    let handles = ctx.bean_of::<dyn Pool>(SearchLevel::Nearest);
    assert_eq!(handles.len(), 1);
    assert!(handles[0].factory_bean().is_some());
    let pool = handles[0].object_as::<dyn Pool>().unwrap();
    assert!(Arc::ptr_eq(&pool, &consumer.pool.required()));
    ctx.close().unwrap();
}

struct Standby;

impl Pool for Standby {
    fn url(&self) -> String {
        "pool://standby".into()
    }
}

impl Component for Standby {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.provides::<dyn Pool>(|s| s)
    }
}

struct StandbyFactory;

impl FactoryBean for StandbyFactory {
    type Output = Standby;

    fn object(&self) -> Result<Arc<Standby>, BoxError> {
        Ok(Arc::new(Standby))
    }
}

impl Component for StandbyFactory {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.factory()
    }
}

#[test]
fn test_capability_match_checks_every_bean_of_a_type() {
    // the placeholder registered first does not provide the capability
    let consumer = Arc::new(UsesPool { pool: Inject::new() });
    let ctx = Context::create(scan![
        Arc::new(StandbyFactory),
        Arc::new(Standby),
        consumer.clone(),
    ])
    .unwrap();

    assert_eq!(consumer.pool.required().url(), "pool://standby");
    let handles = ctx.bean_of::<dyn Pool>(SearchLevel::Nearest);
    assert_eq!(handles.len(), 1);
    assert!(handles[0].factory_bean().is_none());
    ctx.close().unwrap();
}

trait Replica: Send + Sync {
    fn region(&self) -> usize;
}

struct RegionConnection<const N: usize>;

impl<const N: usize> Replica for RegionConnection<N> {
    fn region(&self) -> usize {
        N
    }
}

impl<const N: usize> NamedBean for RegionConnection<N> {
    fn bean_name(&self) -> String {
        format!("replica-{}", N)
    }
}

struct RegionFactory<const N: usize>;

impl<const N: usize> FactoryBean for RegionFactory<N> {
    type Output = RegionConnection<N>;

    fn object(&self) -> Result<Arc<RegionConnection<N>>, BoxError> {
        Ok(Arc::new(RegionConnection))
    }

    fn object_name(&self) -> Option<String> {
        Some("replica".into())
    }
}

impl<const N: usize> Component for RegionFactory<N> {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.factory()
            .factory_provides::<dyn Replica>(|c| c)
            .factory_named()
    }
}

struct Replicas {
    by_name: InjectMap<dyn Replica>,
}

impl Component for Replicas {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.inject("by_name", |r| &r.by_name)
    }
}

struct Pinned {
    replica: Inject<dyn Replica>,
}

impl Component for Pinned {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.inject_with("replica", "bean=replica-2", |p| &p.replica)
    }
}

#[test]
fn test_named_factory_outputs_key_maps_and_lookups() {
    let replicas = Arc::new(Replicas {
        by_name: InjectMap::new(),
    });
    let ctx = Context::create(scan![
        Arc::new(RegionFactory::<1>),
        Arc::new(RegionFactory::<2>),
        replicas.clone(),
    ])
    .unwrap();

    assert_eq!(replicas.by_name.keys(), vec!["replica-1", "replica-2"]);
    assert_eq!(replicas.by_name.get("replica-2").unwrap().region(), 2);

    let found = ctx.lookup("replica-1", SearchLevel::Nearest);
    assert_eq!(found.len(), 1);
    assert!(found[0].factory_bean().is_some());
    assert!(ctx.lookup("replica", SearchLevel::Nearest).is_empty());

    let pinned = Arc::new(Pinned {
        replica: Inject::new(),
    });
    ctx.inject(&pinned).unwrap();
    assert_eq!(pinned.replica.required().region(), 2);
    ctx.close().unwrap();
}
