//! Lookup cache of a container: type and name to the records that satisfy them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::key::TypeKey;
use crate::registration::BeanRecord;

#[derive(Default)]
pub(crate) struct Registry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    by_type: HashMap<TypeKey, Vec<Arc<BeanRecord>>>,
    by_name: HashMap<String, Vec<Arc<BeanRecord>>>,
}

impl Registry {
    pub(crate) fn find_by_type(&self, key: TypeKey) -> Option<Vec<Arc<BeanRecord>>> {
        self.inner.read().by_type.get(&key).cloned()
    }

    pub(crate) fn find_by_name(&self, name: &str) -> Option<Vec<Arc<BeanRecord>>> {
        self.inner.read().by_name.get(name).cloned()
    }

    /// Caches the candidates of `key`; the first list recorded for a key wins.
    pub(crate) fn add_list(&self, key: TypeKey, list: &[Arc<BeanRecord>]) {
        let mut inner = self.inner.write();
        if inner.by_type.contains_key(&key) {
            return;
        }
        inner.by_type.insert(key, list.to_vec());
    }

    /// Adds a factory-produced bean to an already indexed name.
    ///
    /// By type it stays reachable through its placeholder, which stands for every
    /// instance of the factory.
    pub(crate) fn add_produced(&self, record: &Arc<BeanRecord>) {
        let mut inner = self.inner.write();
        if let Some(list) = inner.by_name.get_mut(&record.name()) {
            add_unique(list, record);
        }
    }

    /// Indexes the complete list of beans named `name`.
    pub(crate) fn add_names(&self, name: &str, list: &[Arc<BeanRecord>]) {
        let mut inner = self.inner.write();
        let entry = inner.by_name.entry(name.to_string()).or_default();
        for record in list {
            add_unique(entry, record);
        }
    }
}

fn add_unique(list: &mut Vec<Arc<BeanRecord>>, record: &Arc<BeanRecord>) {
    if !list.iter().any(|r| Arc::ptr_eq(r, record)) {
        list.push(record.clone());
    }
}
