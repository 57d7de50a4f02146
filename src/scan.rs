//! Scan entries and the registrar that turns them into pending beans.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::descriptors::{extract_erased, AnyArc, DescriptorCache, ExtractFn};
use crate::error::{BeansError, BeansResult};
use crate::key::TypeKey;
use crate::observer::Observers;
use crate::registration::{BeanId, PendingBean};
use crate::traits::{Component, Scanner};

/// One entry of the list handed to [`Context::create`](crate::Context::create).
///
/// Build entries with [`scan!`](crate::scan) or the `From` conversions:
/// `Arc<T>` for a bean, `Vec<Scan>` for a nested list, `Option<_>` where `None`
/// is skipped, and `Box<dyn Scanner>` for a provider of more entries.
pub enum Scan {
    Bean(BeanEntry),
    List(Vec<Scan>),
    Provider(Box<dyn Scanner>),
    Nil,
}

impl Scan {
    pub fn bean<T: Component>(object: Arc<T>) -> Self {
        Scan::Bean(BeanEntry::new(object))
    }

    /// A zero-argument function, registered as [`FnBean<R>`].
    pub fn function<R: 'static>(f: impl Fn() -> R + Send + Sync + 'static) -> Self {
        Scan::bean(Arc::new(FnBean::<R>::new(f)))
    }

    pub fn provider(scanner: impl Scanner + 'static) -> Self {
        Scan::Provider(Box::new(scanner))
    }

    pub fn list(items: impl IntoIterator<Item = Scan>) -> Self {
        Scan::List(items.into_iter().collect())
    }
}

impl fmt::Debug for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scan::Bean(entry) => f.debug_tuple("Bean").field(&entry.key).finish(),
            Scan::List(items) => f.debug_tuple("List").field(items).finish(),
            Scan::Provider(_) => f.write_str("Provider"),
            Scan::Nil => f.write_str("Nil"),
        }
    }
}

impl<T: Component> From<Arc<T>> for Scan {
    fn from(object: Arc<T>) -> Self {
        Scan::bean(object)
    }
}

impl From<Vec<Scan>> for Scan {
    fn from(items: Vec<Scan>) -> Self {
        Scan::List(items)
    }
}

impl<S: Into<Scan>> From<Option<S>> for Scan {
    fn from(item: Option<S>) -> Self {
        item.map_or(Scan::Nil, Into::into)
    }
}

impl From<Box<dyn Scanner>> for Scan {
    fn from(scanner: Box<dyn Scanner>) -> Self {
        Scan::Provider(scanner)
    }
}

/// Builds a `Vec<Scan>` from beans, lists, options and providers.
///
/// ```rust
/// use ferrous_beans::{scan, Component, Scan};
/// use std::sync::Arc;
///
/// struct Clock;
/// impl Component for Clock {}
///
/// let maybe: Option<Arc<Clock>> = None;
/// let entries: Vec<Scan> = scan![Arc::new(Clock), maybe, scan![Arc::new(Clock)]];
/// assert_eq!(entries.len(), 3);
/// ```
#[macro_export]
macro_rules! scan {
    ($($entry:expr),* $(,)?) => {
        vec![$($crate::Scan::from($entry)),*]
    };
}

/// A zero-argument function registered as a bean.
///
/// The function's type key is `FnBean<R, Tag>`. Functions returning the same
/// type are told apart by a marker `Tag`, usually through a type alias.
///
/// ```rust
/// use ferrous_beans::{scan, Component, Context, Descriptor, FnBean, Inject, SearchLevel};
/// use std::sync::Arc;
///
/// struct Routes;
/// type RouteNames = FnBean<Vec<&'static str>, Routes>;
///
/// struct Server {
///     routes: Inject<RouteNames>,
/// }
///
/// impl Component for Server {
///     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
///         d.inject("routes", |s| &s.routes)
///     }
/// }
///
/// let server = Arc::new(Server { routes: Inject::new() });
/// let ctx = Context::create(scan![
///     Arc::new(RouteNames::new(|| vec!["/health"])),
///     server.clone(),
/// ])
/// .unwrap();
/// assert_eq!(server.routes.get().unwrap().call(), vec!["/health"]);
/// assert_eq!(ctx.bean_of::<RouteNames>(SearchLevel::Nearest).len(), 1);
/// ctx.close().unwrap();
/// ```
pub struct FnBean<R, Tag = ()> {
    call: Box<dyn Fn() -> R + Send + Sync>,
    _tag: PhantomData<fn() -> Tag>,
}

impl<R, Tag> FnBean<R, Tag> {
    pub fn new(f: impl Fn() -> R + Send + Sync + 'static) -> Self {
        Self {
            call: Box::new(f),
            _tag: PhantomData,
        }
    }

    pub fn call(&self) -> R {
        (self.call)()
    }
}

impl<R: 'static, Tag: 'static> Component for FnBean<R, Tag> {}

impl<R, Tag> fmt::Debug for FnBean<R, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(std::any::type_name::<Self>())
    }
}

/// A bean object with the extraction routine of its concrete type.
pub struct BeanEntry {
    key: TypeKey,
    object: AnyArc,
    extract: ExtractFn,
}

impl BeanEntry {
    pub fn new<T: Component>(object: Arc<T>) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            object,
            extract: extract_erased::<T>,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }
}

/// Flattens scan entries into pending beans, registering factory placeholders
/// ahead of their factories.
pub(crate) struct Registrar<'a> {
    cache: &'a DescriptorCache,
    observers: &'a Observers,
    first_id: BeanId,
    pending: Vec<PendingBean>,
    /// Factory output type to the factory type declaring it.
    outputs: HashMap<TypeKey, TypeKey>,
}

impl<'a> Registrar<'a> {
    pub(crate) fn new(
        cache: &'a DescriptorCache,
        observers: &'a Observers,
        first_id: BeanId,
    ) -> Self {
        Self {
            cache,
            observers,
            first_id,
            pending: Vec::new(),
            outputs: HashMap::new(),
        }
    }

    pub(crate) fn register(mut self, entries: Vec<Scan>) -> BeansResult<Vec<PendingBean>> {
        for (i, entry) in entries.into_iter().enumerate() {
            self.visit(entry, i.to_string())?;
        }
        Ok(self.pending)
    }

    fn visit(&mut self, entry: Scan, position: String) -> BeansResult<()> {
        match entry {
            Scan::Nil => {
                tracing::trace!(%position, "skipping empty scan entry");
                Ok(())
            }
            Scan::List(items) => self.visit_all(items, &position),
            Scan::Provider(scanner) => self.visit_all(scanner.beans(), &position),
            Scan::Bean(bean) => {
                let key = bean.key;
                self.add(bean).map_err(|source| BeansError::Scan {
                    position,
                    bean: key.name(),
                    source: Box::new(source),
                })
            }
        }
    }

    fn visit_all(&mut self, items: Vec<Scan>, position: &str) -> BeansResult<()> {
        for (j, item) in items.into_iter().enumerate() {
            self.visit(item, format!("{}.{}", position, j))?;
        }
        Ok(())
    }

    fn add(&mut self, bean: BeanEntry) -> BeansResult<()> {
        let def = self.cache.get_or_extract(bean.key, &bean.object, bean.extract)?;
        let name = def
            .hooks
            .name(&bean.object)
            .unwrap_or_else(|| bean.key.name().to_string());
        let order = def.hooks.order(&bean.object);

        if let (Some(factory), Some(placeholder)) = (def.factory(), def.produces.clone()) {
            let output = factory.output();
            if let Some(first) = self.outputs.get(&output) {
                return Err(BeansError::RepeatedFactory {
                    output: output.name(),
                    first: first.name(),
                    second: bean.key.name(),
                });
            }
            self.outputs.insert(output, bean.key);

            let factory_id = self.first_id + self.pending.len() + 1;
            let produced_name = factory
                .object_name(&bean.object)
                .unwrap_or_else(|| output.name().to_string());
            self.observers
                .factory_scanned(bean.key, output, factory.singleton(&bean.object));
            self.pending.push(PendingBean {
                key: output,
                def: placeholder,
                object: None,
                name: produced_name,
                order: None,
                factory: Some(factory_id),
            });
        }

        self.observers.scanned(&name, bean.key);
        self.pending.push(PendingBean {
            key: bean.key,
            def,
            object: Some(bean.object),
            name,
            order,
            factory: None,
        });
        Ok(())
    }
}
