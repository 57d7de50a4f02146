//! Optional capabilities a bean may implement.
//!
//! A capability only takes effect once the bean's [`Descriptor`](crate::Descriptor)
//! opts into it (`named()`, `ordered()`, `post_construct()`, `dispose()`, `factory()`).
//! Rust has no runtime interface probing, so the opt-in is how the container learns
//! which hooks exist.

use std::sync::Arc;

use crate::error::BoxError;
use crate::scan::Scan;

/// Bean with a self-declared name, used for qualifiers, lookups and map keys.
pub trait NamedBean {
    fn bean_name(&self) -> String;
}

/// Bean with a sort key; ordered beans come first in collection slots, ascending.
pub trait OrderedBean {
    fn bean_order(&self) -> i32;
}

/// Post-construction hook, run after every non-lazy dependency is initialized.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BoxError, Component, Descriptor, InitializingBean};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Pool {
///     ready: AtomicBool,
/// }
///
/// impl InitializingBean for Pool {
///     fn post_construct(&self) -> Result<(), BoxError> {
///         self.ready.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// impl Component for Pool {
///     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
///         d.post_construct()
///     }
/// }
/// ```
pub trait InitializingBean {
    fn post_construct(&self) -> Result<(), BoxError>;
}

/// Destruction hook, run when the owning container closes (reverse construction order).
pub trait DisposableBean {
    fn destroy(&self) -> Result<(), BoxError>;
}

/// Bean that produces other beans.
///
/// The container registers a placeholder for [`Output`](FactoryBean::Output) at scan
/// time and asks the factory for the real object during construction, after the
/// factory bean itself is initialized. A singleton factory is asked at most once; a
/// non-singleton factory is asked once per consuming slot.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BoxError, Component, Descriptor, FactoryBean};
/// use std::sync::Arc;
///
/// struct Connection {
///     url: String,
/// }
///
/// struct ConnectionFactory {
///     url: String,
/// }
///
/// impl FactoryBean for ConnectionFactory {
///     type Output = Connection;
///
///     fn object(&self) -> Result<Arc<Connection>, BoxError> {
///         Ok(Arc::new(Connection { url: self.url.clone() }))
///     }
/// }
///
/// impl Component for ConnectionFactory {
///     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
///         d.factory()
///     }
/// }
/// ```
pub trait FactoryBean {
    /// Produced type; may be a trait object such as `dyn Storage`.
    type Output: ?Sized + Send + Sync + 'static;

    fn object(&self) -> Result<Arc<Self::Output>, BoxError>;

    /// Whether one instance is shared by every consumer.
    fn singleton(&self) -> bool {
        true
    }

    /// Name given to produced beans; defaults to the output type name.
    fn object_name(&self) -> Option<String> {
        None
    }
}

/// Supplier of additional scan entries, expanded recursively at registration.
pub trait Scanner: Send + Sync {
    fn beans(&self) -> Vec<Scan>;
}
