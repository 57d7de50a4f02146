//! Construction scheduler and teardown.

use std::sync::Arc;
use std::time::Instant;

use super::ContextInner;
use crate::error::{BeansError, BeansResult};
use crate::internal::{with_fault_catch, ConstructionStack};
use crate::lifecycle::Lifecycle;
use crate::registration::{BeanId, BeanRecord};
use crate::resolution::deliver;

impl ContextInner {
    /// Drives every registered bean to `Initialized`, in registration order.
    pub(crate) fn construct_all(&self) -> BeansResult<()> {
        for key in &self.core_order {
            for id in &self.core[key] {
                self.construct(*id, &mut ConstructionStack::new())?;
            }
        }
        Ok(())
    }

    /// Depth-first construction of one bean.
    ///
    /// Factory dependencies are produced and delivered first, then dependency
    /// edges are constructed, then the post-construct hook runs. A factory
    /// placeholder instead constructs its factory and asks it for the object.
    pub(crate) fn construct(&self, id: BeanId, stack: &mut ConstructionStack) -> BeansResult<()> {
        let record = self.arena.record(id);
        let _construction = record.construction.lock();
        let name = record.name();

        match record.lifecycle() {
            Lifecycle::Initialized => return Ok(()),
            Lifecycle::Constructing if stack.contains(id) => return Err(stack.cycle(id, &name)),
            Lifecycle::Constructing => return Ok(()),
            _ => {}
        }

        let started = Instant::now();
        record.set_lifecycle(Lifecycle::Constructing);
        stack.push(id, &name)?;
        let prepared = self.prepare(&record, stack);
        stack.pop();
        prepared?;

        if record.is_produced() {
            return Ok(());
        }

        if record.def.hooks.has_post_construct() {
            let object = record
                .object()
                .ok_or(BeansError::TypeMismatch(record.key.name()))?;
            self.run_hook(&name, "post construct", || {
                record
                    .def
                    .hooks
                    .post_construct(&object)
                    .map_err(|source| BeansError::PostConstruct {
                        chain: stack.chain(&name),
                        source,
                    })
            })?;
        }

        if record.def.hooks.has_destroy() {
            self.disposables.push(id);
        }
        record.set_lifecycle(Lifecycle::Initialized);
        self.observers.constructed(&name, started.elapsed());
        Ok(())
    }

    fn prepare(&self, record: &Arc<BeanRecord>, stack: &mut ConstructionStack) -> BeansResult<()> {
        if let Some(factory) = record.factory {
            self.construct(factory, stack)?;
            if record.object().is_none() {
                self.produce(factory)?;
            }
            return Ok(());
        }

        let factory_dependencies = record.state.lock().factory_dependencies.clone();
        if !factory_dependencies.is_empty() {
            let object = record
                .object()
                .ok_or(BeansError::TypeMismatch(record.key.name()))?;
            let owner_name = record.name();
            for dependency in factory_dependencies {
                self.construct(dependency.factory, stack)?;
                let (produced, _) = self.produce(dependency.factory)?;
                let injection = &record.def.fields[dependency.field];
                let slot = record
                    .def
                    .slot(&object, dependency.field)
                    .ok_or(BeansError::TypeMismatch(record.key.name()))?;
                deliver(
                    slot,
                    &injection.describe(&owner_name),
                    injection.element,
                    &produced,
                )?;
            }
        }

        let dependencies = record.state.lock().dependencies.clone();
        for dependency in dependencies {
            self.construct(dependency, stack)?;
        }
        Ok(())
    }

    /// Runs a user hook behind the fault boundary and reports failures.
    pub(crate) fn run_hook<T>(
        &self,
        bean: &str,
        stage: &'static str,
        hook: impl FnOnce() -> BeansResult<T>,
    ) -> BeansResult<T> {
        let result = with_fault_catch(self.config.recover_panics, bean, stage, hook);
        if let Err(err) = &result {
            self.observers.fault(bean, stage, &err.to_string());
        }
        result
    }

    /// Destroys the disposal list in reverse, collecting every failure.
    pub(crate) fn destroy_all(&self) -> BeansResult<()> {
        let mut errors = Vec::new();
        for id in self.disposables.drain_reverse() {
            let record = self.arena.record(id);
            let _construction = record.construction.lock();
            if let Err(err) = self.destroy_bean(&record) {
                errors.push(err);
            }
        }
        self.mark_closed();
        BeansError::combine(errors)
    }

    fn destroy_bean(&self, record: &BeanRecord) -> BeansResult<()> {
        let name = record.name();
        record.set_lifecycle(Lifecycle::Destroying);
        let result = match record.object() {
            Some(object) => self.run_hook(&name, "destroy", || {
                record
                    .def
                    .hooks
                    .destroy(&object)
                    .map_err(|source| BeansError::Destroy {
                        bean: name.clone(),
                        source,
                    })
            }),
            None => Ok(()),
        };
        record.set_lifecycle(Lifecycle::Destroyed);
        if result.is_ok() {
            self.observers.destroyed(&name);
        }
        result
    }

    /// Destroys then re-initializes one bean in place.
    ///
    /// A failure in either hook leaves the bean `Destroyed` and drops it from the
    /// disposal list, so close never runs its destroy hook again.
    pub(crate) fn reload(&self, record: &BeanRecord) -> BeansResult<()> {
        if let Some(factory) = record.factory {
            return Err(BeansError::Reload {
                bean: record.name(),
                factory: self.arena.record(factory).key.name(),
            });
        }
        let _construction = record.construction.lock();
        let name = record.name();
        if record.lifecycle() != Lifecycle::Initialized {
            return Err(BeansError::NotInitialized {
                slot: "reload".to_string(),
                bean: name,
            });
        }

        let reloaded = self.rerun_hooks(record, &name);
        match &reloaded {
            Ok(()) => record.set_lifecycle(Lifecycle::Initialized),
            Err(_) => {
                record.set_lifecycle(Lifecycle::Destroyed);
                self.disposables.remove(record.id);
            }
        }
        reloaded
    }

    fn rerun_hooks(&self, record: &BeanRecord, name: &str) -> BeansResult<()> {
        if record.def.hooks.has_destroy() {
            self.destroy_bean(record)?;
        }
        record.set_lifecycle(Lifecycle::Constructing);
        if !record.def.hooks.has_post_construct() {
            return Ok(());
        }
        let object = record
            .object()
            .ok_or(BeansError::TypeMismatch(record.key.name()))?;
        self.run_hook(name, "post construct", || {
            record
                .def
                .hooks
                .post_construct(&object)
                .map_err(|source| BeansError::PostConstruct {
                    chain: name.to_string(),
                    source,
                })
        })
    }
}
