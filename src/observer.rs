//! Diagnostic observers for container lifecycle events.
//!
//! Every container dispatches scan, wiring, construction and teardown events to
//! its observers. [`TracingObserver`] is always installed and forwards them to
//! `tracing`: at `debug` level when the container is verbose, `trace` otherwise.

use std::sync::Arc;
use std::time::Duration;

use crate::key::TypeKey;

/// Hooks for observing container events.
///
/// All methods have empty defaults; implement the ones you need.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{Context, ContextObserver};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl ContextObserver for Counter {
///     fn constructed(&self, _bean: &str, _elapsed: std::time::Duration) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let counter = Arc::new(Counter::default());
/// let ctx = Context::builder()
///     .observer(counter.clone())
///     .create(Vec::new())
///     .unwrap();
/// ctx.close().unwrap();
/// ```
pub trait ContextObserver: Send + Sync {
    /// A bean was registered from the scan list.
    fn scanned(&self, _bean: &str, _key: TypeKey) {}

    /// A factory bean was registered; its output placeholder comes first.
    fn factory_scanned(&self, _factory: TypeKey, _output: TypeKey, _singleton: bool) {}

    /// A slot received its candidates.
    fn wired(&self, _slot: &str, _candidates: &[String]) {}

    /// An optional slot found no candidate.
    fn skipped_optional(&self, _slot: &str, _required: TypeKey) {}

    /// A bean reached `Initialized`.
    fn constructed(&self, _bean: &str, _elapsed: Duration) {}

    /// A factory produced a bean.
    fn produced(&self, _factory: &str, _bean: &str) {}

    /// A bean's destroy hook ran.
    fn destroyed(&self, _bean: &str) {}

    /// A user hook failed or panicked.
    fn fault(&self, _bean: &str, _stage: &str, _message: &str) {}
}

/// Observer that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    verbose: bool,
}

impl TracingObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

macro_rules! emit {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::debug!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    };
}

impl ContextObserver for TracingObserver {
    fn scanned(&self, bean: &str, key: TypeKey) {
        emit!(self.verbose, bean, key = %key, "registered bean");
    }

    fn factory_scanned(&self, factory: TypeKey, output: TypeKey, singleton: bool) {
        emit!(
            self.verbose,
            factory = %factory,
            output = %output,
            singleton,
            "registered factory bean"
        );
    }

    fn wired(&self, slot: &str, candidates: &[String]) {
        emit!(self.verbose, slot, candidates = ?candidates, "injected");
    }

    fn skipped_optional(&self, slot: &str, required: TypeKey) {
        emit!(self.verbose, slot, required = %required, "skip optional injection");
    }

    fn constructed(&self, bean: &str, elapsed: Duration) {
        emit!(self.verbose, bean, ?elapsed, "constructed");
    }

    fn produced(&self, factory: &str, bean: &str) {
        emit!(self.verbose, factory, bean, "factory produced bean");
    }

    fn destroyed(&self, bean: &str) {
        emit!(self.verbose, bean, "destroyed");
    }

    fn fault(&self, bean: &str, stage: &str, message: &str) {
        tracing::warn!(bean, stage, message, "bean hook failed");
    }
}

/// Observers of one container.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ContextObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn ContextObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn scanned(&self, bean: &str, key: TypeKey) {
        for observer in &self.observers {
            observer.scanned(bean, key);
        }
    }

    #[inline]
    pub(crate) fn factory_scanned(&self, factory: TypeKey, output: TypeKey, singleton: bool) {
        for observer in &self.observers {
            observer.factory_scanned(factory, output, singleton);
        }
    }

    #[inline]
    pub(crate) fn wired(&self, slot: &str, candidates: &[String]) {
        for observer in &self.observers {
            observer.wired(slot, candidates);
        }
    }

    #[inline]
    pub(crate) fn skipped_optional(&self, slot: &str, required: TypeKey) {
        for observer in &self.observers {
            observer.skipped_optional(slot, required);
        }
    }

    #[inline]
    pub(crate) fn constructed(&self, bean: &str, elapsed: Duration) {
        for observer in &self.observers {
            observer.constructed(bean, elapsed);
        }
    }

    #[inline]
    pub(crate) fn produced(&self, factory: &str, bean: &str) {
        for observer in &self.observers {
            observer.produced(factory, bean);
        }
    }

    #[inline]
    pub(crate) fn destroyed(&self, bean: &str) {
        for observer in &self.observers {
            observer.destroyed(bean);
        }
    }

    #[inline]
    pub(crate) fn fault(&self, bean: &str, stage: &str, message: &str) {
        for observer in &self.observers {
            observer.fault(bean, stage, message);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ContextObserver for Recorder {
        fn scanned(&self, bean: &str, _key: TypeKey) {
            self.0.lock().push(format!("scan {}", bean));
        }

        fn destroyed(&self, bean: &str) {
            self.0.lock().push(format!("destroy {}", bean));
        }
    }

    #[test]
    fn dispatches_to_every_observer_in_order() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let mut observers = Observers::new();
        assert_eq!(observers.len(), 0);
        observers.add(first.clone());
        observers.add(second.clone());
        observers.add(Arc::new(TracingObserver::new(true)));

        observers.scanned("a", TypeKey::of::<u8>());
        observers.constructed("a", Duration::from_millis(1));
        observers.destroyed("a");

        assert_eq!(observers.len(), 3);
        assert_eq!(*first.0.lock(), vec!["scan a", "destroy a"]);
        assert_eq!(*second.0.lock(), vec!["scan a", "destroy a"]);
    }
}
