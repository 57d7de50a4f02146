//! The trait every bean type implements.

use crate::descriptors::Descriptor;

/// A type the container can manage.
///
/// `describe` declares the bean's injection slots, the capabilities it can be
/// injected as, and the lifecycle hooks it opts into. It is evaluated once per type
/// and cached. The default describes a bean with no slots and no hooks.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{Component, Descriptor, Inject};
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
/// ```
pub trait Component: Sized + Send + Sync + 'static {
    fn describe(descriptor: Descriptor<Self>) -> Descriptor<Self> {
        descriptor
    }
}
