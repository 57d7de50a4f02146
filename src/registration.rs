//! Bean records and the arena that owns them.
//!
//! Records reference each other by [`BeanId`] (their index in the arena), so
//! dependency edges never form `Arc` cycles.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use smallvec::SmallVec;

use crate::context::ContextInner;
use crate::descriptors::{AnyArc, BeanDef};
use crate::key::TypeKey;
use crate::lifecycle::Lifecycle;
use crate::slot::{View, Wired};

/// Index of a record in its container's arena.
pub(crate) type BeanId = usize;

/// A bean as produced by scanning, before its container exists.
pub(crate) struct PendingBean {
    pub(crate) key: TypeKey,
    pub(crate) def: Arc<BeanDef>,
    /// `None` for factory placeholders.
    pub(crate) object: Option<AnyArc>,
    pub(crate) name: String,
    pub(crate) order: Option<i32>,
    pub(crate) factory: Option<BeanId>,
}

/// A factory output a bean waits for: delivered into `field` once the factory is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FactoryDependency {
    pub(crate) factory: BeanId,
    pub(crate) field: usize,
}

/// Mutable part of a record.
pub(crate) struct BeanState {
    pub(crate) name: String,
    pub(crate) object: Option<AnyArc>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) order: Option<i32>,
    /// Non-lazy beans of the same container that must initialize first.
    pub(crate) dependencies: SmallVec<[BeanId; 4]>,
    pub(crate) factory_dependencies: Vec<FactoryDependency>,
    /// Records holding this factory's outputs, placeholder first.
    pub(crate) produced: Vec<BeanId>,
}

pub(crate) struct BeanRecord {
    pub(crate) id: BeanId,
    pub(crate) key: TypeKey,
    pub(crate) def: Arc<BeanDef>,
    /// Factory bean producing this record's object.
    pub(crate) factory: Option<BeanId>,
    pub(crate) owner: Weak<ContextInner>,
    pub(crate) state: Mutex<BeanState>,
    /// Held for the whole construction (or reload) of the bean.
    pub(crate) construction: ReentrantMutex<()>,
}

impl BeanRecord {
    pub(crate) fn new(id: BeanId, owner: Weak<ContextInner>, pending: PendingBean) -> Self {
        let lifecycle = if pending.object.is_some() {
            Lifecycle::Created
        } else {
            Lifecycle::Allocated
        };
        Self {
            id,
            key: pending.key,
            def: pending.def,
            factory: pending.factory,
            owner,
            state: Mutex::new(BeanState {
                name: pending.name,
                object: pending.object,
                lifecycle,
                order: pending.order,
                dependencies: SmallVec::new(),
                factory_dependencies: Vec::new(),
                produced: Vec::new(),
            }),
            construction: ReentrantMutex::new(()),
        }
    }

    pub(crate) fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    pub(crate) fn object(&self) -> Option<AnyArc> {
        self.state.lock().object.clone()
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    pub(crate) fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.state.lock().lifecycle = lifecycle;
    }

    pub(crate) fn order(&self) -> Option<i32> {
        self.state.lock().order
    }

    /// Whether the object comes from a factory bean.
    pub(crate) fn is_produced(&self) -> bool {
        self.factory.is_some()
    }

    pub(crate) fn view(&self, key: TypeKey) -> Option<View> {
        let object = self.object()?;
        self.def.view(&object, key)
    }

    /// The object as a slot candidate of element type `key`.
    pub(crate) fn wired(&self, key: TypeKey) -> Option<Wired> {
        let view = self.view(key)?;
        Some(Wired {
            name: self.name(),
            view,
        })
    }

    pub(crate) fn belongs_to(&self, owner: &Weak<ContextInner>) -> bool {
        Weak::ptr_eq(&self.owner, owner)
    }
}

impl fmt::Debug for BeanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BeanRecord")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("name", &state.name)
            .field("lifecycle", &state.lifecycle)
            .field("factory", &self.factory)
            .finish()
    }
}

/// Append-only store of a container's records.
#[derive(Default)]
pub(crate) struct Arena {
    records: RwLock<Vec<Arc<BeanRecord>>>,
}

impl Arena {
    /// Record by id. Ids are only minted by [`Arena::push_with`], so they are always in range.
    pub(crate) fn record(&self, id: BeanId) -> Arc<BeanRecord> {
        self.records.read()[id].clone()
    }

    pub(crate) fn push_with(&self, make: impl FnOnce(BeanId) -> BeanRecord) -> Arc<BeanRecord> {
        let mut records = self.records.write();
        let record = Arc::new(make(records.len()));
        records.push(record.clone());
        record
    }

    /// Records in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<BeanRecord>> {
        self.records.read().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.read().len()
    }
}
