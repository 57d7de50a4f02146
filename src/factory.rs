//! Factory indirection: producing placeholder objects from factory beans.

use std::sync::Arc;

use crate::context::ContextInner;
use crate::error::{BeansError, BeansResult};
use crate::lifecycle::Lifecycle;
use crate::registration::{BeanId, BeanRecord, PendingBean};

impl ContextInner {
    /// Asks the factory bean `factory_id` for an object.
    ///
    /// Fills the placeholder on first use. Afterwards a singleton factory returns
    /// the placeholder again, while a non-singleton factory produces into a new
    /// record per call. The flag reports whether an object was created.
    /// A produced object with a naming hook renames its record.
    ///
    /// The factory bean must already be initialized.
    pub(crate) fn produce(&self, factory_id: BeanId) -> BeansResult<(Arc<BeanRecord>, bool)> {
        let factory = self.arena.record(factory_id);
        let _construction = factory.construction.lock();

        let hooks = factory
            .def
            .factory()
            .ok_or(BeansError::TypeMismatch(factory.key.name()))?;
        let factory_object = factory
            .object()
            .ok_or(BeansError::TypeMismatch(factory.key.name()))?;
        let head_id = factory
            .state
            .lock()
            .produced
            .first()
            .copied()
            .ok_or(BeansError::TypeMismatch(hooks.output().name()))?;
        let head = self.arena.record(head_id);

        let target = if head.object().is_none() {
            head
        } else if hooks.singleton(&factory_object) {
            return Ok((head, false));
        } else {
            let instance = self.arena.push_with(|id| {
                BeanRecord::new(
                    id,
                    self.me.clone(),
                    PendingBean {
                        key: head.key,
                        def: head.def.clone(),
                        object: None,
                        name: head.name(),
                        order: None,
                        factory: Some(factory_id),
                    },
                )
            });
            factory.state.lock().produced.push(instance.id);
            instance
        };

        let factory_name = factory.name();
        let produced = self.run_hook(&factory_name, "factory", || {
            hooks
                .produce(&factory_object)
                .map_err(|source| BeansError::Factory {
                    factory: factory.key.name(),
                    output: target.key.name(),
                    source,
                })
        })?;
        if target.def.view(&produced, target.key).is_none() {
            return Err(BeansError::Factory {
                factory: factory.key.name(),
                output: target.key.name(),
                source: format!("produced object is not a '{}'", target.key).into(),
            });
        }

        let own_name = target.def.hooks.name(&produced);
        {
            let mut state = target.state.lock();
            if let Some(name) = own_name {
                state.name = name;
            }
            state.object = Some(produced);
            state.lifecycle = Lifecycle::Initialized;
        }
        self.registry.add_produced(&target);
        self.observers.produced(&factory_name, &target.name());
        Ok((target, true))
    }
}
