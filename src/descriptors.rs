//! Bean descriptors: the build-time metadata a bean type declares about itself.
//!
//! A [`Descriptor`] is built by [`Component::describe`](crate::Component::describe)
//! and turned into an erased `BeanDef` once per type. The definition drives
//! candidate matching (which capabilities the bean provides), slot wiring and
//! lifecycle hooks.

use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{BeansError, BeansResult, BoxError};
use crate::key::TypeKey;
use crate::slot::{Slot, SlotKind, View};
use crate::traits::{
    Component, DisposableBean, FactoryBean, InitializingBean, NamedBean, OrderedBean,
};

/// Type-erased shared bean object.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// How far up the container hierarchy a slot looks for candidates.
///
/// Parsed from the integer `level` modifier:
///
/// | level | meaning |
/// |-------|---------|
/// | `0` (default) | nearest generation that has candidates |
/// | `1` | this container only |
/// | `n > 1` | this container and `n - 1` ancestors |
/// | `-1` | every generation |
///
/// Single-value slots always take the first non-empty generation in range.
/// Collection and map slots gather every generation in range, except at level 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchLevel {
    #[default]
    Nearest,
    Generations(u32),
    All,
}

impl SearchLevel {
    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            0 => Some(SearchLevel::Nearest),
            -1 => Some(SearchLevel::All),
            n if n > 0 => Some(SearchLevel::Generations(n as u32)),
            _ => None,
        }
    }

    /// Number of generations searched, `None` when unbounded.
    pub(crate) fn span(&self) -> Option<usize> {
        match self {
            SearchLevel::Generations(n) => Some(*n as usize),
            SearchLevel::Nearest | SearchLevel::All => None,
        }
    }

    pub(crate) fn aggregates(&self) -> bool {
        !matches!(self, SearchLevel::Nearest)
    }
}

/// Parsed injection modifiers.
///
/// The attribute string is a comma separated list: `optional`, `lazy`,
/// `bean=<name>` and `level=<n>`. Unknown keys are ignored and a repeated key
/// keeps its last value.
///
/// ```rust
/// use ferrous_beans::{Modifiers, SearchLevel};
///
/// let m = Modifiers::parse("optional, bean=primary, level=-1").unwrap();
/// assert!(m.optional);
/// assert!(!m.lazy);
/// assert_eq!(m.qualifier.as_deref(), Some("primary"));
/// assert_eq!(m.level, SearchLevel::All);
///
/// assert!(Modifiers::parse("level=up").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub optional: bool,
    pub lazy: bool,
    pub qualifier: Option<String>,
    pub level: SearchLevel,
}

impl Modifiers {
    pub fn parse(attrs: &str) -> Result<Self, String> {
        let mut modifiers = Modifiers::default();
        for pair in attrs.split(',') {
            let mut kv = pair.splitn(2, '=');
            let key = kv.next().unwrap_or_default().trim();
            let value = kv.next().map(str::trim);
            match key {
                "optional" => modifiers.optional = true,
                "lazy" => modifiers.lazy = true,
                "bean" => {
                    modifiers.qualifier = value.filter(|v| !v.is_empty()).map(str::to_string);
                }
                "level" => {
                    let raw = value.unwrap_or_default();
                    modifiers.level = raw
                        .parse::<i32>()
                        .ok()
                        .and_then(SearchLevel::from_level)
                        .ok_or_else(|| format!("invalid search level '{}'", raw))?;
                }
                _ => {}
            }
        }
        Ok(modifiers)
    }
}

/// One validated injection slot of a bean type.
#[derive(Debug, Clone)]
pub struct InjectionDef {
    pub field: &'static str,
    pub element: TypeKey,
    pub kind: SlotKind,
    pub modifiers: Modifiers,
}

impl InjectionDef {
    /// Lazy slots add no construction edge.
    pub fn is_lazy(&self) -> bool {
        self.modifiers.lazy || self.kind == SlotKind::Accessor
    }

    pub(crate) fn describe(&self, bean: &str) -> String {
        format!("{}->{}", bean, self.field)
    }
}

trait FieldAccess<T>: Send + Sync {
    fn slot<'a>(&self, target: &'a T) -> &'a dyn Slot;
}

struct Accessor<T, S> {
    access: fn(&T) -> &S,
}

impl<T: 'static, S: Slot + 'static> FieldAccess<T> for Accessor<T, S> {
    fn slot<'a>(&self, target: &'a T) -> &'a dyn Slot {
        (self.access)(target)
    }
}

struct FieldSpec<T> {
    name: &'static str,
    attrs: String,
    access: Box<dyn FieldAccess<T>>,
}

struct Embedded {
    field: &'static str,
    capability: TypeKey,
}

pub(crate) trait Cast: Send + Sync {
    fn key(&self) -> TypeKey;
    fn view(&self, object: &AnyArc) -> Option<View>;
}

struct Provided<T, C: ?Sized> {
    coerce: fn(Arc<T>) -> Arc<C>,
}

impl<T, C> Cast for Provided<T, C>
where
    T: Send + Sync + 'static,
    C: ?Sized + Send + Sync + 'static,
{
    fn key(&self) -> TypeKey {
        TypeKey::of::<C>()
    }

    fn view(&self, object: &AnyArc) -> Option<View> {
        let typed = object.clone().downcast::<T>().ok()?;
        Some(Box::new((self.coerce)(typed)))
    }
}

fn same<T>(object: Arc<T>) -> Arc<T> {
    object
}

/// Capability of a factory output; the produced object is erased as `Arc<Arc<O>>`.
struct OutputCast<O: ?Sized, C: ?Sized> {
    coerce: fn(Arc<O>) -> Arc<C>,
}

impl<O, C> Cast for OutputCast<O, C>
where
    O: ?Sized + Send + Sync + 'static,
    C: ?Sized + Send + Sync + 'static,
{
    fn key(&self) -> TypeKey {
        TypeKey::of::<C>()
    }

    fn view(&self, object: &AnyArc) -> Option<View> {
        let produced = object.downcast_ref::<Arc<O>>()?.clone();
        Some(Box::new((self.coerce)(produced)))
    }
}

/// Naming hook of a factory output.
pub(crate) trait OutputName: Send + Sync {
    fn name(&self, object: &AnyArc) -> Option<String>;
}

struct NamedOutput<O: ?Sized> {
    naming: fn(&O) -> String,
}

impl<O: ?Sized + Send + Sync + 'static> OutputName for NamedOutput<O> {
    fn name(&self, object: &AnyArc) -> Option<String> {
        let produced = object.downcast_ref::<Arc<O>>()?;
        Some((self.naming)(produced))
    }
}

/// Declaration of a bean type's slots, capabilities and hooks.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{Component, Descriptor, Inject, InjectVec, Lazy, NamedBean};
///
/// trait Handler: Send + Sync {}
///
/// struct Router {
///     handlers: InjectVec<dyn Handler>,
///     fallback: Inject<dyn Handler>,
///     parent: Lazy<Router>,
/// }
///
/// impl NamedBean for Router {
///     fn bean_name(&self) -> String {
///         "router".into()
///     }
/// }
///
/// impl Component for Router {
///     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
///         d.inject("handlers", |r| &r.handlers)
///             .inject_with("fallback", "optional, bean=default", |r| &r.fallback)
///             .inject("parent", |r| &r.parent)
///             .named()
///     }
/// }
/// ```
pub struct Descriptor<T> {
    fields: Vec<FieldSpec<T>>,
    embedded: Vec<Embedded>,
    provides: Vec<Box<dyn Cast>>,
    naming: Option<fn(&T) -> String>,
    ordering: Option<fn(&T) -> i32>,
    initializer: Option<fn(&T) -> Result<(), BoxError>>,
    destroyer: Option<fn(&T) -> Result<(), BoxError>>,
    factory: Option<Arc<dyn FactoryHooks>>,
    output_casts: Vec<Box<dyn Cast>>,
    output_naming: Option<Box<dyn OutputName>>,
    name: Option<String>,
    order: Option<i32>,
}

impl<T: Component> Descriptor<T> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            embedded: Vec::new(),
            provides: Vec::new(),
            naming: None,
            ordering: None,
            initializer: None,
            destroyer: None,
            factory: None,
            output_casts: Vec::new(),
            output_naming: None,
            name: None,
            order: None,
        }
    }

    /// Declares an injection slot with default modifiers.
    pub fn inject<S: Slot + 'static>(self, field: &'static str, access: fn(&T) -> &S) -> Self {
        self.inject_with(field, "", access)
    }

    /// Declares an injection slot with a modifier string, see [`Modifiers::parse`].
    pub fn inject_with<S: Slot + 'static>(
        mut self,
        field: &'static str,
        attrs: &str,
        access: fn(&T) -> &S,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: field,
            attrs: attrs.to_string(),
            access: Box::new(Accessor { access }),
        });
        self
    }

    /// Marks a field as an embedded implementation of `C`.
    ///
    /// The bean is then not a candidate for `C` even when it provides it, and the
    /// field itself can not be an injection slot.
    pub fn embed<C: ?Sized + 'static>(mut self, field: &'static str) -> Self {
        self.embedded.push(Embedded {
            field,
            capability: TypeKey::of::<C>(),
        });
        self
    }

    /// Declares that the bean can be injected as `C`, usually a trait object.
    ///
    /// ```rust
    /// use ferrous_beans::{Component, Descriptor};
    ///
    /// trait Storage: Send + Sync {}
    ///
    /// struct Disk;
    /// impl Storage for Disk {}
    ///
    /// impl Component for Disk {
    ///     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
    ///         d.provides::<dyn Storage>(|disk| disk)
    ///     }
    /// }
    /// ```
    pub fn provides<C>(mut self, coerce: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.provides.push(Box::new(Provided { coerce }));
        self
    }

    /// Uses [`NamedBean::bean_name`] as the bean name.
    pub fn named(mut self) -> Self
    where
        T: NamedBean,
    {
        self.naming = Some(<T as NamedBean>::bean_name);
        self
    }

    /// Uses [`OrderedBean::bean_order`] as the collection sort key.
    pub fn ordered(mut self) -> Self
    where
        T: OrderedBean,
    {
        self.ordering = Some(<T as OrderedBean>::bean_order);
        self
    }

    /// Runs [`InitializingBean::post_construct`] once dependencies are ready.
    pub fn post_construct(mut self) -> Self
    where
        T: InitializingBean,
    {
        self.initializer = Some(<T as InitializingBean>::post_construct);
        self
    }

    /// Runs [`DisposableBean::destroy`] when the container closes.
    pub fn dispose(mut self) -> Self
    where
        T: DisposableBean,
    {
        self.destroyer = Some(<T as DisposableBean>::destroy);
        self
    }

    /// Registers the bean as a factory of [`FactoryBean::Output`].
    pub fn factory(mut self) -> Self
    where
        T: FactoryBean,
    {
        self.factory = Some(Arc::new(FactoryOf::<T>(PhantomData)));
        self
    }

    /// Declares that objects produced by this factory can be injected as `C`.
    ///
    /// ```rust
    /// use ferrous_beans::{BoxError, Component, Descriptor, FactoryBean};
    /// use std::sync::Arc;
    ///
    /// trait Pool: Send + Sync {}
    ///
    /// struct Connection;
    /// impl Pool for Connection {}
    ///
    /// struct Connector;
    ///
    /// impl FactoryBean for Connector {
    ///     type Output = Connection;
    ///
    ///     fn object(&self) -> Result<Arc<Connection>, BoxError> {
    ///         Ok(Arc::new(Connection))
    ///     }
    /// }
    ///
    /// impl Component for Connector {
    ///     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
    ///         d.factory().factory_provides::<dyn Pool>(|c| c)
    ///     }
    /// }
    /// ```
    pub fn factory_provides<C>(mut self, coerce: fn(Arc<T::Output>) -> Arc<C>) -> Self
    where
        T: FactoryBean,
        C: ?Sized + Send + Sync + 'static,
    {
        self.output_casts.push(Box::new(OutputCast { coerce }));
        self
    }

    /// Names every produced object with its own [`NamedBean::bean_name`].
    pub fn factory_named(mut self) -> Self
    where
        T: FactoryBean,
        T::Output: NamedBean,
    {
        self.output_naming = Some(Box::new(NamedOutput::<T::Output> {
            naming: <T::Output as NamedBean>::bean_name,
        }));
        self
    }

    /// Fixed bean name, used when the bean does not implement [`NamedBean`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Fixed sort key, used when the bean does not implement [`OrderedBean`].
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    fn into_def(mut self, object: &T) -> BeansResult<BeanDef> {
        let bean = type_name::<T>();
        let invalid = |reason: String| BeansError::Descriptor { bean, reason };

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            if !seen.insert(spec.name) {
                return Err(invalid(format!("field '{}' is declared twice", spec.name)));
            }
            if self.embedded.iter().any(|e| e.field == spec.name) {
                return Err(invalid(format!(
                    "field '{}' embeds a capability and can not be injected",
                    spec.name
                )));
            }
            let modifiers = Modifiers::parse(&spec.attrs)
                .map_err(|reason| invalid(format!("field '{}': {}", spec.name, reason)))?;
            let slot = spec.access.slot(object);
            fields.push(InjectionDef {
                field: spec.name,
                element: slot.element(),
                kind: slot.kind(),
                modifiers,
            });
        }

        let casts = std::mem::take(&mut self.output_casts);
        let naming = self.output_naming.take();
        let produces = match &self.factory {
            Some(factory) => Some(Arc::new(factory.placeholder(casts, naming))),
            None if casts.is_empty() && naming.is_none() => None,
            None => {
                return Err(invalid(
                    "factory output capabilities declared without factory()".to_string(),
                ))
            }
        };

        self.provides.insert(0, Box::new(Provided::<T, T> { coerce: same }));
        let provides = self.provides.iter().map(|cast| cast.key()).collect();
        let not_implements = self.embedded.iter().map(|e| e.capability).collect();

        Ok(BeanDef {
            key: TypeKey::of::<T>(),
            fields,
            provides,
            not_implements,
            produces,
            hooks: Arc::new(self),
        })
    }
}

/// Erased access to a bean's slots and hooks.
pub(crate) trait BeanHooks: Send + Sync {
    fn view(&self, object: &AnyArc, key: TypeKey) -> Option<View>;
    fn slot<'a>(&self, object: &'a AnyArc, field: usize) -> Option<&'a dyn Slot>;
    fn name(&self, object: &AnyArc) -> Option<String>;
    fn order(&self, object: &AnyArc) -> Option<i32>;
    fn has_post_construct(&self) -> bool;
    fn post_construct(&self, object: &AnyArc) -> Result<(), BoxError>;
    fn has_destroy(&self) -> bool;
    fn destroy(&self, object: &AnyArc) -> Result<(), BoxError>;
    fn factory(&self) -> Option<&dyn FactoryHooks>;
}

impl<T: Component> BeanHooks for Descriptor<T> {
    fn view(&self, object: &AnyArc, key: TypeKey) -> Option<View> {
        self.provides
            .iter()
            .find(|cast| cast.key() == key)
            .and_then(|cast| cast.view(object))
    }

    fn slot<'a>(&self, object: &'a AnyArc, field: usize) -> Option<&'a dyn Slot> {
        let typed = object.downcast_ref::<T>()?;
        Some(self.fields.get(field)?.access.slot(typed))
    }

    fn name(&self, object: &AnyArc) -> Option<String> {
        match (self.naming, object.downcast_ref::<T>()) {
            (Some(naming), Some(typed)) => Some(naming(typed)),
            _ => self.name.clone(),
        }
    }

    fn order(&self, object: &AnyArc) -> Option<i32> {
        match (self.ordering, object.downcast_ref::<T>()) {
            (Some(ordering), Some(typed)) => Some(ordering(typed)),
            _ => self.order,
        }
    }

    fn has_post_construct(&self) -> bool {
        self.initializer.is_some()
    }

    fn post_construct(&self, object: &AnyArc) -> Result<(), BoxError> {
        match (self.initializer, object.downcast_ref::<T>()) {
            (Some(init), Some(typed)) => init(typed),
            _ => Ok(()),
        }
    }

    fn has_destroy(&self) -> bool {
        self.destroyer.is_some()
    }

    fn destroy(&self, object: &AnyArc) -> Result<(), BoxError> {
        match (self.destroyer, object.downcast_ref::<T>()) {
            (Some(destroy), Some(typed)) => destroy(typed),
            _ => Ok(()),
        }
    }

    fn factory(&self) -> Option<&dyn FactoryHooks> {
        self.factory.as_deref()
    }
}

/// Erased access to a factory bean.
pub(crate) trait FactoryHooks: Send + Sync {
    fn output(&self) -> TypeKey;
    fn singleton(&self, factory: &AnyArc) -> bool;
    fn object_name(&self, factory: &AnyArc) -> Option<String>;
    /// Produced object erased as `Arc<Arc<Output>>`.
    fn produce(&self, factory: &AnyArc) -> Result<AnyArc, BoxError>;
    /// Definition shared by the placeholder and every produced bean.
    fn placeholder(
        &self,
        casts: Vec<Box<dyn Cast>>,
        naming: Option<Box<dyn OutputName>>,
    ) -> BeanDef;
}

struct FactoryOf<T>(PhantomData<fn() -> T>);

impl<T: Component + FactoryBean> FactoryHooks for FactoryOf<T> {
    fn output(&self) -> TypeKey {
        TypeKey::of::<T::Output>()
    }

    fn singleton(&self, factory: &AnyArc) -> bool {
        factory.downcast_ref::<T>().map_or(true, |f| f.singleton())
    }

    fn object_name(&self, factory: &AnyArc) -> Option<String> {
        factory.downcast_ref::<T>().and_then(|f| f.object_name())
    }

    fn produce(&self, factory: &AnyArc) -> Result<AnyArc, BoxError> {
        let typed = factory
            .downcast_ref::<T>()
            .ok_or("factory object has an unexpected type")?;
        let produced = typed.object()?;
        Ok(Arc::new(produced) as AnyArc)
    }

    fn placeholder(
        &self,
        casts: Vec<Box<dyn Cast>>,
        naming: Option<Box<dyn OutputName>>,
    ) -> BeanDef {
        let key = TypeKey::of::<T::Output>();
        let mut provides = vec![key];
        provides.extend(casts.iter().map(|cast| cast.key()));
        BeanDef {
            key,
            fields: Vec::new(),
            provides,
            not_implements: Vec::new(),
            produces: None,
            hooks: Arc::new(Produced::<T::Output> {
                casts,
                naming,
                _output: PhantomData,
            }),
        }
    }
}

struct Produced<O: ?Sized> {
    casts: Vec<Box<dyn Cast>>,
    naming: Option<Box<dyn OutputName>>,
    _output: PhantomData<fn() -> Arc<O>>,
}

impl<O: ?Sized + Send + Sync + 'static> BeanHooks for Produced<O> {
    fn view(&self, object: &AnyArc, key: TypeKey) -> Option<View> {
        if key == TypeKey::of::<O>() {
            let produced = object.downcast_ref::<Arc<O>>()?.clone();
            return Some(Box::new(produced));
        }
        self.casts
            .iter()
            .find(|cast| cast.key() == key)
            .and_then(|cast| cast.view(object))
    }

    fn slot<'a>(&self, _object: &'a AnyArc, _field: usize) -> Option<&'a dyn Slot> {
        None
    }

    fn name(&self, object: &AnyArc) -> Option<String> {
        self.naming.as_ref().and_then(|naming| naming.name(object))
    }

    fn order(&self, _object: &AnyArc) -> Option<i32> {
        None
    }

    fn has_post_construct(&self) -> bool {
        false
    }

    fn post_construct(&self, _object: &AnyArc) -> Result<(), BoxError> {
        Ok(())
    }

    fn has_destroy(&self) -> bool {
        false
    }

    fn destroy(&self, _object: &AnyArc) -> Result<(), BoxError> {
        Ok(())
    }

    fn factory(&self) -> Option<&dyn FactoryHooks> {
        None
    }
}

/// Erased definition of one bean type.
pub(crate) struct BeanDef {
    pub(crate) key: TypeKey,
    pub(crate) fields: Vec<InjectionDef>,
    pub(crate) provides: Vec<TypeKey>,
    pub(crate) not_implements: Vec<TypeKey>,
    /// Placeholder definition of a factory's output.
    pub(crate) produces: Option<Arc<BeanDef>>,
    pub(crate) hooks: Arc<dyn BeanHooks>,
}

impl BeanDef {
    /// Whether a bean of this definition is a candidate for `key`.
    pub(crate) fn implements(&self, key: TypeKey) -> bool {
        self.provides.contains(&key) && !self.not_implements.contains(&key)
    }

    pub(crate) fn view(&self, object: &AnyArc, key: TypeKey) -> Option<View> {
        if !self.implements(key) {
            return None;
        }
        self.hooks.view(object, key)
    }

    pub(crate) fn slot<'a>(&self, object: &'a AnyArc, field: usize) -> Option<&'a dyn Slot> {
        self.hooks.slot(object, field)
    }

    pub(crate) fn factory(&self) -> Option<&dyn FactoryHooks> {
        self.hooks.factory()
    }
}

impl fmt::Debug for BeanDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDef")
            .field("key", &self.key)
            .field("fields", &self.fields)
            .field("provides", &self.provides)
            .field("not_implements", &self.not_implements)
            .finish()
    }
}

/// Extracts the definition of `T` from one of its instances.
pub(crate) fn extract<T: Component>(object: &T) -> BeansResult<BeanDef> {
    T::describe(Descriptor::new()).into_def(object)
}

/// [`extract`] behind an erased object, for scan entries.
pub(crate) fn extract_erased<T: Component>(object: &AnyArc) -> BeansResult<BeanDef> {
    let typed = object
        .downcast_ref::<T>()
        .ok_or(BeansError::TypeMismatch(type_name::<T>()))?;
    extract(typed)
}

pub(crate) type ExtractFn = fn(&AnyArc) -> BeansResult<BeanDef>;

/// Per-type definition cache, shared by scanning and runtime injection.
#[derive(Default)]
pub(crate) struct DescriptorCache {
    defs: RwLock<HashMap<TypeKey, Arc<BeanDef>>>,
}

impl DescriptorCache {
    pub(crate) fn get_or_extract(
        &self,
        key: TypeKey,
        object: &AnyArc,
        extract: ExtractFn,
    ) -> BeansResult<Arc<BeanDef>> {
        if let Some(def) = self.defs.read().get(&key) {
            return Ok(def.clone());
        }
        let def = Arc::new(extract(object)?);
        Ok(self.defs.write().entry(key).or_insert(def).clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.defs.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{Inject, InjectMap, Lazy};

    trait Storage: Send + Sync {}

    struct Disk;
    impl Storage for Disk {}
    impl Component for Disk {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.provides::<dyn Storage>(|disk| disk)
        }
    }

    struct Twice {
        a: Inject<Disk>,
    }
    impl Component for Twice {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.inject("a", |t| &t.a).inject("a", |t| &t.a)
        }
    }

    struct Embeds {
        storage: Inject<dyn Storage>,
    }
    impl Storage for Embeds {}
    impl Component for Embeds {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.provides::<dyn Storage>(|e| e)
                .embed::<dyn Storage>("storage")
        }
    }

    struct Slots {
        disks: InjectMap<Disk>,
        back: Lazy<Disk>,
    }
    impl Component for Slots {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.inject_with("disks", "level=2, bean=main", |s| &s.disks)
                .inject("back", |s| &s.back)
        }
    }

    struct Mint;
    impl FactoryBean for Mint {
        type Output = Disk;

        fn object(&self) -> Result<Arc<Disk>, BoxError> {
            Ok(Arc::new(Disk))
        }
    }
    impl Component for Mint {
        fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
            d.factory_provides::<dyn Storage>(|disk| disk)
        }
    }

    #[test]
    fn output_capabilities_need_factory() {
        let err = extract(&Mint).unwrap_err();
        assert!(err.to_string().contains("without factory()"));
    }

    #[test]
    fn factory_placeholder_views_output_capabilities() {
        struct Minted;
        impl FactoryBean for Minted {
            type Output = Disk;

            fn object(&self) -> Result<Arc<Disk>, BoxError> {
                Ok(Arc::new(Disk))
            }
        }
        impl Component for Minted {
            fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
                d.factory().factory_provides::<dyn Storage>(|disk| disk)
            }
        }

        let def = extract(&Minted).unwrap();
        let placeholder = def.produces.clone().unwrap();
        assert!(placeholder.implements(TypeKey::of::<Disk>()));
        assert!(placeholder.implements(TypeKey::of::<dyn Storage>()));

        let produced: AnyArc = Arc::new(Arc::new(Disk));
        let view = placeholder
            .view(&produced, TypeKey::of::<dyn Storage>())
            .unwrap();
        assert!(view.downcast::<Arc<dyn Storage>>().is_ok());
    }

    #[test]
    fn modifiers_last_value_wins_and_unknown_keys_are_ignored() {
        let m = Modifiers::parse("bean=a, colour=red, bean=b, level=1").unwrap();
        assert_eq!(m.qualifier.as_deref(), Some("b"));
        assert_eq!(m.level, SearchLevel::Generations(1));
        assert!(!m.optional);
        assert_eq!(Modifiers::parse("").unwrap(), Modifiers::default());
    }

    #[test]
    fn modifiers_reject_levels_below_minus_one() {
        assert!(Modifiers::parse("level=-2").is_err());
        assert!(Modifiers::parse("level=").is_err());
    }

    #[test]
    fn provided_capabilities_are_views_of_the_same_object() {
        let disk: AnyArc = Arc::new(Disk);
        let def = extract_erased::<Disk>(&disk).unwrap();
        assert!(def.implements(TypeKey::of::<Disk>()));
        assert!(def.implements(TypeKey::of::<dyn Storage>()));

        let view = def.view(&disk, TypeKey::of::<dyn Storage>()).unwrap();
        assert!(view.downcast::<Arc<dyn Storage>>().is_ok());
        assert!(def.view(&disk, TypeKey::of::<String>()).is_none());
    }

    #[test]
    fn duplicate_field_is_a_descriptor_error() {
        let twice = Twice { a: Inject::new() };
        let err = extract(&twice).unwrap_err();
        assert!(matches!(err, BeansError::Descriptor { .. }));
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn embedded_capability_is_excluded_and_not_injectable() {
        let embeds = Embeds {
            storage: Inject::new(),
        };
        let err = extract(&embeds).unwrap_err();
        assert!(err.to_string().contains("embeds a capability"));
    }

    #[test]
    fn slot_kinds_and_modifiers_are_recorded() {
        let slots = Slots {
            disks: InjectMap::new(),
            back: Lazy::new(),
        };
        let def = extract(&slots).unwrap();
        assert_eq!(def.fields.len(), 2);
        assert_eq!(def.fields[0].kind, SlotKind::Map);
        assert_eq!(def.fields[0].element, TypeKey::of::<Disk>());
        assert_eq!(def.fields[0].modifiers.qualifier.as_deref(), Some("main"));
        assert!(!def.fields[0].is_lazy());
        assert!(def.fields[1].is_lazy());
    }

    #[test]
    fn cache_extracts_once_per_type() {
        let cache = DescriptorCache::default();
        let a: AnyArc = Arc::new(Disk);
        let b: AnyArc = Arc::new(Disk);
        let first = cache
            .get_or_extract(TypeKey::of::<Disk>(), &a, extract_erased::<Disk>)
            .unwrap();
        let second = cache
            .get_or_extract(TypeKey::of::<Disk>(), &b, extract_erased::<Disk>)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }
}
