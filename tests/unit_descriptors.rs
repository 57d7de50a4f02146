/// Unit tests for descriptors: modifier parsing, search levels and slot metadata

use ferrous_beans::{
    scan, BeansError, Component, Context, Descriptor, Inject, InjectMap, InjectVec, Lazy,
    Modifiers, SearchLevel, SlotKind, TypeKey,
};
use std::sync::Arc;

#[test]
fn test_search_level_from_integer() {
    assert_eq!(SearchLevel::from_level(0), Some(SearchLevel::Nearest));
    assert_eq!(SearchLevel::from_level(1), Some(SearchLevel::Generations(1)));
    assert_eq!(SearchLevel::from_level(4), Some(SearchLevel::Generations(4)));
    assert_eq!(SearchLevel::from_level(-1), Some(SearchLevel::All));
    assert_eq!(SearchLevel::from_level(-2), None);
    assert_eq!(SearchLevel::default(), SearchLevel::Nearest);
}

#[test]
fn test_modifier_parsing() {
    let m = Modifiers::parse(" lazy , optional,level=3 ").unwrap();
    assert!(m.lazy);
    assert!(m.optional);
    assert_eq!(m.level, SearchLevel::Generations(3));
    assert_eq!(m.qualifier, None);

    // empty qualifier means no qualifier
    assert_eq!(Modifiers::parse("bean=").unwrap().qualifier, None);
    assert!(Modifiers::parse("level=two").is_err());
}

trait Sink: Send + Sync {}

struct Console;
impl Sink for Console {}
impl Component for Console {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.provides::<dyn Sink>(|c| c)
    }
}

struct Logger {
    primary: Inject<dyn Sink>,
    all: InjectVec<dyn Sink>,
    by_name: InjectMap<dyn Sink>,
    fallback: Lazy<Console>,
}

impl Component for Logger {
    fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
        d.inject("primary", |l| &l.primary)
            .inject_with("all", "level=-1", |l| &l.all)
            .inject_with("by_name", "optional", |l| &l.by_name)
            .inject("fallback", |l| &l.fallback)
            .name("logger")
            .order(3)
    }
}

#[test]
fn test_injection_metadata_reflects_descriptor() {
    let logger = Arc::new(Logger {
        primary: Inject::new(),
        all: InjectVec::new(),
        by_name: InjectMap::new(),
        fallback: Lazy::new(),
    });
    let ctx = Context::create(scan![Arc::new(Console), logger.clone()]).unwrap();

    let handle = &ctx.lookup("logger", SearchLevel::Nearest)[0];
    let injections = handle.injections();
    let kinds: Vec<SlotKind> = injections.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SlotKind::Single,
            SlotKind::Collection,
            SlotKind::Map,
            SlotKind::Accessor
        ]
    );
    assert_eq!(injections[0].element, TypeKey::of::<dyn Sink>());
    assert_eq!(injections[1].modifiers.level, SearchLevel::All);
    assert!(injections[2].modifiers.optional);
    assert!(injections[3].is_lazy());
    assert!(!injections[0].is_lazy());

    assert!(logger.primary.is_injected());
    assert_eq!(logger.all.len(), 1);
    assert!(logger.fallback.get().is_some());
    ctx.close().unwrap();
}

#[test]
fn test_descriptor_errors_abort_creation() {
    struct Twice {
        a: Inject<Console>,
    }
    impl Component for Twice {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.inject("a", |t| &t.a).inject_with("a", "optional", |t| &t.a)
        }
    }

    let err = Context::create(scan![Arc::new(Console), Arc::new(Twice { a: Inject::new() })])
        .unwrap_err();
    match err.root() {
        BeansError::Descriptor { bean, reason } => {
            assert!(bean.ends_with("Twice"));
            assert!(reason.contains("declared twice"));
        }
        other => panic!("expected Descriptor, got {:?}", other),
    }
}
