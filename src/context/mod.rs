//! The bean container.
//!
//! A [`Context`] is built in one blocking call: scan entries are registered,
//! every slot is wired, and the graph is constructed in dependency order. After
//! that the container serves concurrent lookups and runtime injection until it is
//! closed.

mod construct;
mod handle;
mod registry;

pub use handle::BeanHandle;
pub(crate) use registry::Registry;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Once;

use crate::config::ContextConfig;
use crate::descriptors::{extract_erased, AnyArc, DescriptorCache, SearchLevel};
use crate::error::BeansResult;
use crate::internal::DisposeBag;
use crate::key::TypeKey;
use crate::lifecycle::Lifecycle;
use crate::observer::{ContextObserver, Observers, TracingObserver};
use crate::registration::{Arena, BeanId, BeanRecord, PendingBean};
use crate::scan::{Registrar, Scan};
use crate::traits::Component;

/// A dependency-injection container.
///
/// Cloning is cheap and yields another handle to the same container.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{scan, BoxError, Component, Context, Descriptor, Inject, InitializingBean};
/// use std::sync::Arc;
///
/// struct Database {
///     url: String,
/// }
/// impl Component for Database {}
///
/// struct UserService {
///     db: Inject<Database>,
/// }
///
/// impl InitializingBean for UserService {
///     fn post_construct(&self) -> Result<(), BoxError> {
///         assert!(self.db.required().url.starts_with("postgres"));
///         Ok(())
///     }
/// }
///
/// impl Component for UserService {
///     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
///         d.inject("db", |s| &s.db).post_construct()
///     }
/// }
///
/// let service = Arc::new(UserService { db: Inject::new() });
/// let ctx = Context::create(scan![
///     Arc::new(Database { url: "postgres://localhost".into() }),
///     service.clone(),
/// ])
/// .unwrap();
///
/// assert_eq!(service.db.required().url, "postgres://localhost");
/// ctx.close().unwrap();
/// ```
#[derive(Clone)]
pub struct Context {
    pub(crate) inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    pub(crate) me: Weak<ContextInner>,
    pub(crate) parent: Option<Context>,
    pub(crate) config: ContextConfig,
    pub(crate) observers: Observers,
    /// Observers added on the builder, handed down to children.
    inherited: Vec<Arc<dyn ContextObserver>>,
    pub(crate) arena: Arena,
    /// Scan-time type map; fixed once the container is built.
    pub(crate) core: HashMap<TypeKey, Vec<BeanId>>,
    pub(crate) core_order: Vec<TypeKey>,
    pub(crate) registry: Registry,
    pub(crate) descriptors: Arc<DescriptorCache>,
    pub(crate) disposables: DisposeBag,
    close_once: Once,
    closed: AtomicBool,
}

impl Context {
    /// Builds a container from scan entries with the default configuration.
    ///
    /// Any registration, wiring or construction failure is returned; when a
    /// post-construction hook fails, beans constructed so far are destroyed first.
    pub fn create(entries: Vec<Scan>) -> BeansResult<Context> {
        ContextBuilder::new().create(entries)
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// Builds a child container that can resolve beans of this one.
    ///
    /// The child inherits this container's configuration and observers. Closing
    /// the child never destroys beans of the parent.
    pub fn extend(&self, entries: Vec<Scan>) -> BeansResult<Context> {
        ContextBuilder {
            config: self.inner.config.clone(),
            observers: self.inner.inherited.clone(),
            parent: Some(self.clone()),
        }
        .create(entries)
    }

    pub fn parent(&self) -> Option<&Context> {
        self.inner.parent.as_ref()
    }

    /// Types registered in this container, in registration order.
    pub fn core(&self) -> Vec<TypeKey> {
        self.inner.core_order.clone()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    /// Beans satisfying `key`, searched across generations per `level`.
    ///
    /// Factory outputs are listed once per produced instance.
    pub fn bean(&self, key: TypeKey, level: SearchLevel) -> Vec<BeanHandle> {
        let mut found: Vec<BeanHandle> = Vec::new();
        for generation in self.inner.lineage(level) {
            let list = generation.expand_produced(generation.find(key));
            if list.is_empty() {
                continue;
            }
            found.extend(list.into_iter().map(BeanHandle::new));
            if !level.aggregates() {
                break;
            }
        }
        found
    }

    /// Typed form of [`Context::bean`].
    pub fn bean_of<K: ?Sized + 'static>(&self, level: SearchLevel) -> Vec<BeanHandle> {
        self.bean(TypeKey::of::<K>(), level)
    }

    /// Beans registered under `name`, searched across generations per `level`.
    pub fn lookup(&self, name: &str, level: SearchLevel) -> Vec<BeanHandle> {
        let mut found: Vec<BeanHandle> = Vec::new();
        for generation in self.inner.lineage(level) {
            let list = generation.find_by_name(name);
            if list.is_empty() {
                continue;
            }
            found.extend(list.into_iter().map(BeanHandle::new));
            if !level.aggregates() {
                break;
            }
        }
        found
    }

    /// Injects beans of this container into an object it does not own.
    ///
    /// Every slot is cleared first, so injecting twice does not accumulate
    /// collection entries. The descriptor of `T` is cached.
    pub fn inject<T: Component>(&self, target: &Arc<T>) -> BeansResult<()> {
        let object: AnyArc = target.clone();
        let def = self.inner.descriptors.get_or_extract(
            TypeKey::of::<T>(),
            &object,
            extract_erased::<T>,
        )?;
        self.inner.inject_object(&object, &def)
    }

    /// Destroys beans in reverse construction order. Runs once; later calls return `Ok`.
    pub fn close(&self) -> BeansResult<()> {
        let mut result = Ok(());
        self.inner.close_once.call_once(|| {
            result = self.inner.destroy_all();
        });
        result
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Context [beans: {}, types: {}, depth: {}]",
            self.inner.arena.len(),
            self.inner.core_order.len(),
            self.inner.lineage(SearchLevel::All).count(),
        )
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("core", &self.inner.core_order)
            .field("config", &self.inner.config)
            .field("observers", &self.inner.observers.len())
            .field("descriptors", &self.inner.descriptors.len())
            .field("closed", &self.is_closed())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

impl ContextInner {
    #[allow(clippy::too_many_arguments)]
    fn new(
        me: &Weak<ContextInner>,
        parent: Option<Context>,
        config: ContextConfig,
        observers: Observers,
        inherited: Vec<Arc<dyn ContextObserver>>,
        descriptors: Arc<DescriptorCache>,
        self_bean: PendingBean,
        pending: Vec<PendingBean>,
    ) -> Self {
        let arena = Arena::default();
        for bean in std::iter::once(self_bean).chain(pending) {
            arena.push_with(|id| BeanRecord::new(id, me.clone(), bean));
        }

        let mut core: HashMap<TypeKey, Vec<BeanId>> = HashMap::new();
        let mut core_order = Vec::new();
        for record in arena.snapshot() {
            if let Some(factory) = record.factory {
                arena.record(factory).state.lock().produced.push(record.id);
            }
            core.entry(record.key)
                .or_insert_with(|| {
                    core_order.push(record.key);
                    Vec::new()
                })
                .push(record.id);
        }
        arena.record(0).set_lifecycle(Lifecycle::Initialized);

        Self {
            me: me.clone(),
            parent,
            config,
            observers,
            inherited,
            arena,
            core,
            core_order,
            registry: Registry::default(),
            descriptors,
            disposables: DisposeBag::default(),
            close_once: Once::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// This container and its ancestors, limited by `level`.
    pub(crate) fn lineage(&self, level: SearchLevel) -> impl Iterator<Item = &ContextInner> {
        std::iter::successors(Some(self), |&generation| generation.parent_inner())
            .take(level.span().unwrap_or(usize::MAX))
    }

    fn parent_inner(&self) -> Option<&ContextInner> {
        self.parent.as_ref().map(|parent| &*parent.inner)
    }

    /// Records of this container registered under `name`.
    fn find_by_name(&self, name: &str) -> Vec<Arc<BeanRecord>> {
        if let Some(list) = self.registry.find_by_name(name) {
            return list;
        }
        let list: Vec<Arc<BeanRecord>> = self
            .arena
            .snapshot()
            .into_iter()
            .filter(|record| record.object().is_some() && record.name() == name)
            .collect();
        if !list.is_empty() {
            self.registry.add_names(name, &list);
        }
        list
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) && !self.disposables.is_empty() {
            tracing::warn!(
                pending = self.disposables.len(),
                "container dropped without close(), destroy hooks were not run"
            );
        }
    }
}

/// Builder for a [`Context`] with explicit configuration and observers.
///
/// ```rust
/// use ferrous_beans::{Context, ContextConfig};
///
/// let ctx = Context::builder()
///     .verbose(true)
///     .recover_panics(false)
///     .create(Vec::new())
///     .unwrap();
/// assert!(ctx.config().verbose);
/// assert!(!ctx.config().recover_panics);
/// // the container registers itself
/// assert_eq!(ctx.core().len(), 1);
/// ctx.close().unwrap();
/// ```
#[derive(Default)]
pub struct ContextBuilder {
    config: ContextConfig,
    observers: Vec<Arc<dyn ContextObserver>>,
    parent: Option<Context>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn recover_panics(mut self, recover: bool) -> Self {
        self.config.recover_panics = recover;
        self
    }

    /// Adds an observer after the built-in [`TracingObserver`].
    pub fn observer(mut self, observer: Arc<dyn ContextObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Makes the built container a child of `parent`.
    pub fn parent(mut self, parent: &Context) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn create(self, entries: Vec<Scan>) -> BeansResult<Context> {
        let ContextBuilder {
            config,
            observers: inherited,
            parent,
        } = self;

        let mut observers = Observers::new();
        observers.add(Arc::new(TracingObserver::new(config.verbose)));
        for observer in &inherited {
            observers.add(observer.clone());
        }

        let descriptors = parent
            .as_ref()
            .map(|p| p.inner.descriptors.clone())
            .unwrap_or_default();

        let pending = Registrar::new(&descriptors, &observers, 1).register(entries)?;
        let self_key = TypeKey::of::<ContextRef>();
        let self_object: AnyArc = Arc::new(ContextRef::detached());
        let self_def =
            descriptors.get_or_extract(self_key, &self_object, extract_erased::<ContextRef>)?;

        let inner = Arc::new_cyclic(|me: &Weak<ContextInner>| {
            let self_bean = PendingBean {
                key: self_key,
                def: self_def,
                object: Some(Arc::new(ContextRef { inner: me.clone() })),
                name: self_key.name().to_string(),
                order: None,
                factory: None,
            };
            ContextInner::new(
                me,
                parent,
                config,
                observers,
                inherited,
                descriptors,
                self_bean,
                pending,
            )
        });
        let context = Context { inner };

        if let Err(err) = context.inner.wire() {
            context.inner.mark_closed();
            return Err(err);
        }
        if let Err(err) = context.inner.construct_all() {
            if let Err(close_err) = context.close() {
                tracing::warn!(
                    error = %close_err,
                    "rollback after failed construction reported errors"
                );
            }
            return Err(err);
        }
        Ok(context)
    }
}

/// The container as a bean: inject `Inject<ContextRef>` to reach the owning container.
///
/// Holds the container weakly, so beans referencing it do not keep it alive.
pub struct ContextRef {
    inner: Weak<ContextInner>,
}

impl ContextRef {
    fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    /// The container, while it is alive.
    pub fn context(&self) -> Option<Context> {
        self.inner.upgrade().map(|inner| Context { inner })
    }
}

impl Component for ContextRef {}

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRef")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
