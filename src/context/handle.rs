//! Handles to beans returned by container lookups.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::{AnyArc, InjectionDef};
use crate::error::{BeansError, BeansResult};
use crate::key::TypeKey;
use crate::lifecycle::Lifecycle;
use crate::registration::BeanRecord;

/// One bean of a container.
///
/// ```rust
/// use ferrous_beans::{scan, Component, Context, Lifecycle, SearchLevel};
/// use std::sync::Arc;
///
/// struct Clock;
/// impl Component for Clock {}
///
/// let clock = Arc::new(Clock);
/// let ctx = Context::create(scan![clock.clone()]).unwrap();
///
/// let handles = ctx.bean_of::<Clock>(SearchLevel::Nearest);
/// assert_eq!(handles.len(), 1);
/// let handle = &handles[0];
/// assert!(Arc::ptr_eq(&handle.object_as::<Clock>().unwrap(), &clock));
/// assert_eq!(handle.lifecycle(), Lifecycle::Initialized);
/// assert!(handle.factory_bean().is_none());
/// ctx.close().unwrap();
/// ```
#[derive(Clone)]
pub struct BeanHandle {
    record: Arc<BeanRecord>,
}

impl BeanHandle {
    pub(crate) fn new(record: Arc<BeanRecord>) -> Self {
        Self { record }
    }

    pub fn name(&self) -> String {
        self.record.name()
    }

    /// Concrete type, or the declared output type for factory-produced beans.
    pub fn type_key(&self) -> TypeKey {
        self.record.key
    }

    pub fn implements(&self, key: TypeKey) -> bool {
        self.record.def.implements(key)
    }

    pub fn implements_type<K: ?Sized + 'static>(&self) -> bool {
        self.implements(TypeKey::of::<K>())
    }

    /// The type-erased object.
    ///
    /// For factory-produced beans this holds the produced `Arc<Output>`; prefer
    /// [`BeanHandle::object_as`] for typed access.
    pub fn object(&self) -> Option<AnyArc> {
        self.record.object()
    }

    /// The object viewed as `K`: its concrete type or any capability it provides.
    pub fn object_as<K: ?Sized + 'static>(&self) -> Option<Arc<K>> {
        let view = self.record.view(TypeKey::of::<K>())?;
        view.downcast::<Arc<K>>().ok().map(|boxed| *boxed)
    }

    /// Handle of the factory bean that produced this bean.
    pub fn factory_bean(&self) -> Option<BeanHandle> {
        let factory = self.record.factory?;
        let owner = self.record.owner.upgrade()?;
        Some(BeanHandle::new(owner.arena.record(factory)))
    }

    /// Injection slots declared by the bean type.
    pub fn injections(&self) -> Vec<InjectionDef> {
        self.record.def.fields.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.record.lifecycle()
    }

    /// Runs the destroy hook then the post-construct hook again, keeping the object.
    ///
    /// Fails for factory-produced beans and for beans not yet initialized.
    pub fn reload(&self) -> BeansResult<()> {
        let owner = self
            .record
            .owner
            .upgrade()
            .ok_or_else(|| BeansError::ContextGone(self.record.name()))?;
        owner.reload(&self.record)
    }
}

impl fmt::Display for BeanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.factory_bean() {
            Some(factory) => write!(
                f,
                "<FactoryBean {}->{}>",
                factory.type_key().short_name(),
                self.record.key.short_name()
            ),
            None => write!(f, "<Bean {}>", self.record.key.short_name()),
        }
    }
}

impl fmt::Debug for BeanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.record, f)
    }
}
