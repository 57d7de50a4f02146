//! Resolution engine: matching slots to candidates and binding them.
//!
//! A slot's element type is matched verbatim against the container's type map
//! first; when absent, every registered type is tested for the capability. The
//! search walks container generations per the slot's [`SearchLevel`], then the
//! qualifier filter and multiplicity rules decide what is assigned.

use std::sync::Arc;

use crate::context::ContextInner;
use crate::descriptors::{AnyArc, BeanDef, InjectionDef, SearchLevel};
use crate::error::{BeansError, BeansResult};
use crate::key::TypeKey;
use crate::registration::{BeanRecord, FactoryDependency};
use crate::slot::{Slot, SlotError, SlotKind};

/// Assigns `candidate` into `slot`, viewed as the slot's element type.
pub(crate) fn deliver(
    slot: &dyn Slot,
    slot_name: &str,
    element: TypeKey,
    candidate: &BeanRecord,
) -> BeansResult<()> {
    let wired = candidate
        .wired(element)
        .ok_or(BeansError::TypeMismatch(element.name()))?;
    slot.accept(wired).map_err(|err| match err {
        SlotError::DuplicateKey(key) => BeansError::DuplicateMapKey {
            key,
            slot: slot_name.to_string(),
        },
        SlotError::TypeMismatch(name) => BeansError::TypeMismatch(name),
    })
}

/// Ordered candidates first by ascending key, then the rest in discovery order.
pub(crate) fn sort_by_order(candidates: &mut [Arc<BeanRecord>]) {
    candidates.sort_by_key(|record| match record.order() {
        Some(order) => (0, order),
        None => (1, 0),
    });
}

fn names(candidates: &[Arc<BeanRecord>]) -> Vec<String> {
    candidates.iter().map(|record| record.name()).collect()
}

fn aggregates(kind: SlotKind) -> bool {
    matches!(kind, SlotKind::Collection | SlotKind::Map)
}

fn slot_of<'a>(def: &BeanDef, object: &'a AnyArc, field: usize) -> BeansResult<&'a dyn Slot> {
    def.slot(object, field)
        .ok_or(BeansError::TypeMismatch(def.key.name()))
}

impl ContextInner {
    /// Candidates of `key` in this generation only, uncached, in registration order.
    pub(crate) fn matching(&self, key: TypeKey) -> Vec<Arc<BeanRecord>> {
        if let Some(ids) = self.core.get(&key) {
            return ids.iter().map(|id| self.arena.record(*id)).collect();
        }
        let mut found = Vec::new();
        for registered in &self.core_order {
            for id in &self.core[registered] {
                let record = self.arena.record(*id);
                if record.def.implements(key) {
                    found.push(record);
                }
            }
        }
        // registration order across types
        found.sort_by_key(|record| record.id);
        found
    }

    /// Candidates of `key` in this generation, through the registry cache.
    pub(crate) fn find(&self, key: TypeKey) -> Vec<Arc<BeanRecord>> {
        if let Some(list) = self.registry.find_by_type(key) {
            return list;
        }
        let list = self.matching(key);
        if !list.is_empty() {
            self.registry.add_list(key, &list);
        }
        list
    }

    /// Candidates across generations.
    ///
    /// Without aggregation (single-value slots, or level 0) the first generation
    /// that has candidates wins. Otherwise every generation in range contributes.
    pub(crate) fn candidates(
        &self,
        key: TypeKey,
        level: SearchLevel,
        aggregate: bool,
    ) -> Vec<Arc<BeanRecord>> {
        let mut found = Vec::new();
        for generation in self.lineage(level) {
            let list = generation.find(key);
            if list.is_empty() {
                continue;
            }
            found.extend(list);
            if !(aggregate && level.aggregates()) {
                break;
            }
        }
        found
    }

    /// Replaces factory placeholders with every instance produced so far.
    pub(crate) fn expand_produced(&self, list: Vec<Arc<BeanRecord>>) -> Vec<Arc<BeanRecord>> {
        let mut out: Vec<Arc<BeanRecord>> = Vec::with_capacity(list.len());
        let mut push = |record: Arc<BeanRecord>| {
            if !out.iter().any(|r| Arc::ptr_eq(r, &record)) {
                out.push(record);
            }
        };
        for record in list {
            match record.factory {
                Some(factory) => {
                    let produced = self.arena.record(factory).state.lock().produced.clone();
                    for id in produced {
                        let instance = self.arena.record(id);
                        if instance.object().is_some() {
                            push(instance);
                        }
                    }
                }
                None => push(record),
            }
        }
        out
    }

    /// Factory bean owning a placeholder, looked up in the placeholder's own container.
    fn factory_of(&self, placeholder: &BeanRecord) -> Option<Arc<BeanRecord>> {
        let factory = placeholder.factory?;
        if placeholder.belongs_to(&self.me) {
            return Some(self.arena.record(factory));
        }
        placeholder
            .owner
            .upgrade()
            .map(|owner| owner.arena.record(factory))
    }

    fn filter_qualified(
        &self,
        injection: &InjectionDef,
        slot_name: &str,
        candidates: Vec<Arc<BeanRecord>>,
    ) -> BeansResult<Vec<Arc<BeanRecord>>> {
        let Some(qualifier) = injection.modifiers.qualifier.as_deref() else {
            return Ok(candidates);
        };
        let all = names(&candidates);
        let chosen: Vec<_> = candidates
            .into_iter()
            .filter(|record| record.name() == qualifier)
            .collect();
        if chosen.is_empty() && !all.is_empty() && !injection.modifiers.optional {
            return Err(BeansError::QualifierNotFound {
                qualifier: qualifier.to_string(),
                required: injection.element.name(),
                slot: slot_name.to_string(),
                candidates: all,
            });
        }
        Ok(chosen)
    }

    /// Binds every declared slot of every scanned bean.
    ///
    /// Slots are processed grouped by element type, in order of first appearance,
    /// so a missing type is reported once with all of its requesters.
    pub(crate) fn wire(&self) -> BeansResult<()> {
        let mut groups: Vec<(TypeKey, Vec<(Arc<BeanRecord>, usize)>)> = Vec::new();
        for record in self.arena.snapshot() {
            for (field, injection) in record.def.fields.iter().enumerate() {
                let entry = (record.clone(), field);
                match groups.iter_mut().find(|(key, _)| *key == injection.element) {
                    Some((_, slots)) => slots.push(entry),
                    None => groups.push((injection.element, vec![entry])),
                }
            }
        }

        for (key, slots) in groups {
            let mut missing = Vec::new();
            for (owner, field) in slots {
                let injection = &owner.def.fields[field];
                let slot_name = injection.describe(&owner.name());
                let found = self.candidates(
                    key,
                    injection.modifiers.level,
                    aggregates(injection.kind),
                );
                let chosen = self.filter_qualified(injection, &slot_name, found)?;
                if chosen.is_empty() {
                    if injection.modifiers.optional {
                        self.observers.skipped_optional(&slot_name, key);
                    } else {
                        missing.push(slot_name);
                    }
                    continue;
                }
                self.bind(&owner, field, &slot_name, chosen)?;
            }
            if !missing.is_empty() {
                return Err(BeansError::Unresolved {
                    required: key.name(),
                    required_by: missing,
                });
            }
        }
        Ok(())
    }

    fn bind(
        &self,
        owner: &Arc<BeanRecord>,
        field: usize,
        slot_name: &str,
        mut chosen: Vec<Arc<BeanRecord>>,
    ) -> BeansResult<()> {
        let injection = &owner.def.fields[field];
        let object = owner
            .object()
            .ok_or(BeansError::TypeMismatch(owner.key.name()))?;
        let slot = slot_of(&owner.def, &object, field)?;

        match injection.kind {
            SlotKind::Single | SlotKind::Accessor if chosen.len() > 1 => {
                return Err(BeansError::Ambiguous {
                    slot: slot_name.to_string(),
                    candidates: names(&chosen),
                });
            }
            SlotKind::Collection => sort_by_order(&mut chosen),
            _ => {}
        }

        let wired = names(&chosen);
        for candidate in &chosen {
            if candidate.is_produced() {
                self.bind_produced(owner, field, slot, slot_name, candidate)?;
                continue;
            }
            deliver(slot, slot_name, injection.element, candidate)?;
            if !injection.is_lazy() && candidate.belongs_to(&self.me) {
                owner.state.lock().dependencies.push(candidate.id);
            }
        }
        self.observers.wired(slot_name, &wired);
        Ok(())
    }

    /// A factory output in this container becomes a factory dependency edge;
    /// one from an ancestor is produced right away, the ancestor being built.
    fn bind_produced(
        &self,
        owner: &BeanRecord,
        field: usize,
        slot: &dyn Slot,
        slot_name: &str,
        placeholder: &Arc<BeanRecord>,
    ) -> BeansResult<()> {
        let injection = &owner.def.fields[field];
        let factory = self
            .factory_of(placeholder)
            .ok_or_else(|| BeansError::ContextGone(placeholder.name()))?;
        if injection.is_lazy() {
            return Err(BeansError::LazyFactory {
                output: placeholder.key.name(),
                factory: factory.key.name(),
                slot: slot_name.to_string(),
            });
        }
        if placeholder.belongs_to(&self.me) {
            owner.state.lock().factory_dependencies.push(FactoryDependency {
                factory: factory.id,
                field,
            });
            return Ok(());
        }
        let ancestor = placeholder
            .owner
            .upgrade()
            .ok_or_else(|| BeansError::ContextGone(placeholder.name()))?;
        let (produced, _) = ancestor.produce(factory.id)?;
        deliver(slot, slot_name, injection.element, &produced)
    }

    /// Runtime injection into an object the container does not own.
    pub(crate) fn inject_object(&self, object: &AnyArc, def: &BeanDef) -> BeansResult<()> {
        for (field, injection) in def.fields.iter().enumerate() {
            let slot = slot_of(def, object, field)?;
            slot.clear();
            let slot_name = injection.describe(def.key.name());
            let found = self.candidates(
                injection.element,
                injection.modifiers.level,
                aggregates(injection.kind),
            );
            let mut chosen = self.filter_qualified(injection, &slot_name, found)?;
            if chosen.is_empty() {
                if injection.modifiers.optional {
                    self.observers.skipped_optional(&slot_name, injection.element);
                    continue;
                }
                return Err(BeansError::Unresolved {
                    required: injection.element.name(),
                    required_by: vec![slot_name],
                });
            }
            match injection.kind {
                SlotKind::Single | SlotKind::Accessor if chosen.len() > 1 => {
                    return Err(BeansError::Ambiguous {
                        slot: slot_name,
                        candidates: names(&chosen),
                    });
                }
                SlotKind::Collection => sort_by_order(&mut chosen),
                _ => {}
            }

            for candidate in chosen {
                let candidate = if candidate.is_produced() {
                    let factory = self
                        .factory_of(&candidate)
                        .ok_or_else(|| BeansError::ContextGone(candidate.name()))?;
                    if injection.is_lazy() {
                        return Err(BeansError::LazyFactory {
                            output: candidate.key.name(),
                            factory: factory.key.name(),
                            slot: slot_name,
                        });
                    }
                    let owner = candidate
                        .owner
                        .upgrade()
                        .ok_or_else(|| BeansError::ContextGone(candidate.name()))?;
                    owner.produce(factory.id)?.0
                } else {
                    candidate
                };
                if !injection.is_lazy() && !candidate.lifecycle().is_ready() {
                    return Err(BeansError::NotInitialized {
                        slot: slot_name,
                        bean: candidate.name(),
                    });
                }
                deliver(slot, &slot_name, injection.element, &candidate)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::extract_erased;
    use crate::registration::PendingBean;
    use crate::traits::Component;
    use std::sync::Weak;

    struct Plain;
    impl Component for Plain {}

    fn record(id: usize, order: Option<i32>) -> Arc<BeanRecord> {
        let object: AnyArc = Arc::new(Plain);
        let def = Arc::new(extract_erased::<Plain>(&object).unwrap());
        Arc::new(BeanRecord::new(
            id,
            Weak::new(),
            PendingBean {
                key: TypeKey::of::<Plain>(),
                def,
                object: Some(object),
                name: format!("plain{}", id),
                order,
                factory: None,
            },
        ))
    }

    #[test]
    fn ordered_first_then_discovery_order() {
        let mut list = vec![
            record(0, None),
            record(1, Some(5)),
            record(2, None),
            record(3, Some(-1)),
            record(4, Some(5)),
        ];
        sort_by_order(&mut list);
        let ids: Vec<usize> = list.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 4, 0, 2]);
    }
}
