//! Injection slots: the fields a bean exposes for the container to fill.
//!
//! Each wrapper owns interior-mutable storage so the container can assign into a
//! bean that is already shared behind an `Arc`.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::key::TypeKey;

/// Type-erased `Arc<K>` handed to a slot whose element type is `K`.
pub type View = Box<dyn std::any::Any + Send + Sync>;

/// How a slot consumes candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Exactly one candidate.
    Single,
    /// Every candidate, in order.
    Collection,
    /// Every candidate, keyed by bean name.
    Map,
    /// One candidate held weakly; implies lazy.
    Accessor,
}

/// A candidate offered to a slot.
pub struct Wired {
    pub name: String,
    pub view: View,
}

/// Why a slot refused a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// The view does not hold an `Arc` of the slot's element type.
    TypeMismatch(&'static str),
    /// A map slot already holds a bean under this name.
    DuplicateKey(String),
}

/// Storage the container injects into.
///
/// Implemented by [`Inject`], [`InjectVec`], [`InjectMap`] and [`Lazy`].
pub trait Slot: Send + Sync {
    /// Key of the element type candidates must provide.
    fn element(&self) -> TypeKey;

    fn kind(&self) -> SlotKind;

    /// Drops previously injected values.
    fn clear(&self);

    fn accept(&self, value: Wired) -> Result<(), SlotError>;
}

fn unwrap_view<T: ?Sized + Send + Sync + 'static>(view: View) -> Result<Arc<T>, SlotError> {
    view.downcast::<Arc<T>>()
        .map(|boxed| *boxed)
        .map_err(|_| SlotError::TypeMismatch(type_name::<T>()))
}

/// Single-value slot.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{Component, Context, Descriptor, Inject, scan};
/// use std::sync::Arc;
///
/// struct Database;
/// impl Component for Database {}
///
/// struct Repo {
///     db: Inject<Database>,
/// }
///
/// impl Component for Repo {
///     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
///         d.inject("db", |r| &r.db)
///     }
/// }
///
/// let repo = Arc::new(Repo { db: Inject::new() });
/// let ctx = Context::create(scan![Arc::new(Database), repo.clone()]).unwrap();
/// assert!(repo.db.get().is_some());
/// ctx.close().unwrap();
/// ```
pub struct Inject<T: ?Sized> {
    value: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> Inject<T> {
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    /// The injected value, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        self.value.read().clone()
    }

    /// The injected value.
    ///
    /// # Panics
    ///
    /// Panics if nothing was injected, which only happens for optional slots or
    /// before the owning container finished wiring.
    pub fn required(&self) -> Arc<T> {
        self.get().unwrap_or_else(|| {
            panic!("slot of type {} was not injected", type_name::<T>())
        })
    }

    pub fn is_injected(&self) -> bool {
        self.value.read().is_some()
    }
}

impl<T: ?Sized> Default for Inject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Slot for Inject<T> {
    fn element(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn kind(&self) -> SlotKind {
        SlotKind::Single
    }

    fn clear(&self) {
        *self.value.write() = None;
    }

    fn accept(&self, value: Wired) -> Result<(), SlotError> {
        *self.value.write() = Some(unwrap_view::<T>(value.view)?);
        Ok(())
    }
}

impl<T: ?Sized> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("element", &type_name::<T>())
            .field("injected", &self.is_injected())
            .finish()
    }
}

/// Collection slot: every matching bean, ordered beans first.
pub struct InjectVec<T: ?Sized> {
    values: RwLock<Vec<Arc<T>>>,
}

impl<T: ?Sized> InjectVec<T> {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the injected values.
    pub fn get(&self) -> Vec<Arc<T>> {
        self.values.read().clone()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl<T: ?Sized> Default for InjectVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Slot for InjectVec<T> {
    fn element(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn kind(&self) -> SlotKind {
        SlotKind::Collection
    }

    fn clear(&self) {
        self.values.write().clear();
    }

    fn accept(&self, value: Wired) -> Result<(), SlotError> {
        let item = unwrap_view::<T>(value.view)?;
        self.values.write().push(item);
        Ok(())
    }
}

impl<T: ?Sized> fmt::Debug for InjectVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectVec")
            .field("element", &type_name::<T>())
            .field("len", &self.len())
            .finish()
    }
}

/// Map slot keyed by bean name.
pub struct InjectMap<T: ?Sized> {
    values: RwLock<BTreeMap<String, Arc<T>>>,
}

impl<T: ?Sized> InjectMap<T> {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.values.read().get(name).cloned()
    }

    /// Bean names, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Arc<T>> {
        self.values.read().clone()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl<T: ?Sized> Default for InjectMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Slot for InjectMap<T> {
    fn element(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn kind(&self) -> SlotKind {
        SlotKind::Map
    }

    fn clear(&self) {
        self.values.write().clear();
    }

    fn accept(&self, value: Wired) -> Result<(), SlotError> {
        let item = unwrap_view::<T>(value.view)?;
        let mut values = self.values.write();
        if values.contains_key(&value.name) {
            return Err(SlotError::DuplicateKey(value.name));
        }
        values.insert(value.name, item);
        Ok(())
    }
}

impl<T: ?Sized> fmt::Debug for InjectMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectMap")
            .field("element", &type_name::<T>())
            .field("keys", &self.keys())
            .finish()
    }
}

/// Deferred accessor slot.
///
/// Always lazy: it adds no construction edge, so two beans may hold `Lazy`
/// references to each other. The reference is weak; it resolves while the
/// owning container is alive.
pub struct Lazy<T: ?Sized> {
    value: RwLock<Option<Weak<T>>>,
}

impl<T: ?Sized> Lazy<T> {
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.value.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_injected(&self) -> bool {
        self.value.read().is_some()
    }
}

impl<T: ?Sized> Default for Lazy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Slot for Lazy<T> {
    fn element(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn kind(&self) -> SlotKind {
        SlotKind::Accessor
    }

    fn clear(&self) {
        *self.value.write() = None;
    }

    fn accept(&self, value: Wired) -> Result<(), SlotError> {
        let strong = unwrap_view::<T>(value.view)?;
        *self.value.write() = Some(Arc::downgrade(&strong));
        Ok(())
    }
}

impl<T: ?Sized> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("element", &type_name::<T>())
            .field("injected", &self.is_injected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn hello(&self) -> &'static str;
    }

    struct English;

    impl Greeter for English {
        fn hello(&self) -> &'static str {
            "hello"
        }
    }

    fn wired<T: ?Sized + Send + Sync + 'static>(name: &str, value: Arc<T>) -> Wired {
        Wired {
            name: name.to_string(),
            view: Box::new(value),
        }
    }

    #[test]
    fn inject_accepts_trait_object_views() {
        let slot: Inject<dyn Greeter> = Inject::new();
        let value: Arc<dyn Greeter> = Arc::new(English);
        slot.accept(wired("en", value)).unwrap();
        assert_eq!(slot.required().hello(), "hello");
    }

    #[test]
    fn inject_rejects_wrong_view() {
        let slot: Inject<String> = Inject::new();
        let err = slot.accept(wired("n", Arc::new(5u32))).unwrap_err();
        assert_eq!(err, SlotError::TypeMismatch("alloc::string::String"));
        assert!(!slot.is_injected());
    }

    #[test]
    fn map_refuses_duplicate_names() {
        let slot: InjectMap<u32> = InjectMap::new();
        slot.accept(wired("a", Arc::new(1u32))).unwrap();
        let err = slot.accept(wired("a", Arc::new(2u32))).unwrap_err();
        assert_eq!(err, SlotError::DuplicateKey("a".into()));
        assert_eq!(*slot.get("a").unwrap(), 1);
    }

    #[test]
    fn lazy_does_not_keep_value_alive() {
        let slot: Lazy<u32> = Lazy::new();
        let value = Arc::new(7u32);
        slot.accept(wired("v", value.clone())).unwrap();
        assert_eq!(slot.get().as_deref(), Some(&7));
        drop(value);
        assert!(slot.get().is_none());
        assert!(slot.is_injected());
    }

    #[test]
    fn clear_resets_collections() {
        let slot: InjectVec<u32> = InjectVec::new();
        slot.accept(wired("a", Arc::new(1u32))).unwrap();
        slot.accept(wired("b", Arc::new(2u32))).unwrap();
        assert_eq!(slot.len(), 2);
        slot.clear();
        assert!(slot.is_empty());
    }
}
