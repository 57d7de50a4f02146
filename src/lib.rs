//! # ferrous-beans
//!
//! Bean-graph dependency injection for Rust: hand the container a list of
//! already-built objects, and it wires their declared slots, runs lifecycle hooks
//! in dependency order and tears everything down in reverse.
//!
//! ## Features
//!
//! - **Slot injection**: single values, ordered collections, name-keyed maps and lazy accessors
//! - **Capabilities**: beans are injectable as any `dyn Trait` they declare
//! - **Factory beans**: singleton and per-consumer production of other beans, whose outputs
//!   can be injected as capabilities and named by themselves
//! - **Function beans**: zero-argument functions registered and injected through [`FnBean`]
//! - **Cycle detection**: non-lazy cycles fail with the full path; lazy slots break cycles
//! - **Hierarchical containers**: children resolve from ancestors by search level
//! - **Deterministic teardown**: destroy hooks run once, in reverse construction order
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_beans::{scan, Component, Context, Descriptor, Inject, InjectVec};
//! use std::sync::Arc;
//!
//! trait Plugin: Send + Sync {
//!     fn name(&self) -> &'static str;
//! }
//!
//! struct Audit;
//! impl Plugin for Audit {
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//! }
//! impl Component for Audit {
//!     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
//!         d.provides::<dyn Plugin>(|a| a)
//!     }
//! }
//!
//! struct Database;
//! impl Component for Database {}
//!
//! struct App {
//!     db: Inject<Database>,
//!     plugins: InjectVec<dyn Plugin>,
//! }
//! impl Component for App {
//!     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
//!         d.inject("db", |a| &a.db).inject("plugins", |a| &a.plugins)
//!     }
//! }
//!
//! let app = Arc::new(App {
//!     db: Inject::new(),
//!     plugins: InjectVec::new(),
//! });
//! let ctx = Context::create(scan![Arc::new(Database), Arc::new(Audit), app.clone()]).unwrap();
//!
//! assert!(app.db.is_injected());
//! assert_eq!(app.plugins.get()[0].name(), "audit");
//! ctx.close().unwrap();
//! ```
//!
//! ## Lazy Slots
//!
//! A [`Lazy`] slot adds no construction edge, so it can close a cycle:
//!
//! ```rust
//! use ferrous_beans::{scan, Component, Context, Descriptor, Lazy};
//! use std::sync::Arc;
//!
//! struct Node {
//!     this: Lazy<Node>,
//! }
//! impl Component for Node {
//!     fn describe(d: Descriptor<Self>) -> Descriptor<Self> {
//!         d.inject("this", |n| &n.this)
//!     }
//! }
//!
//! let node = Arc::new(Node { this: Lazy::new() });
//! let ctx = Context::create(scan![node.clone()]).unwrap();
//! assert!(Arc::ptr_eq(&node.this.get().unwrap(), &node));
//! ctx.close().unwrap();
//! ```

pub mod config;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod observer;
pub mod scan;
pub mod slot;
pub mod traits;

// Internal modules
mod factory;
mod internal;
mod registration;
mod resolution;

pub use config::ContextConfig;
pub use context::{BeanHandle, Context, ContextBuilder, ContextRef};
pub use descriptors::{AnyArc, Descriptor, InjectionDef, Modifiers, SearchLevel};
pub use error::{BeansError, BeansResult, BoxError};
pub use key::TypeKey;
pub use lifecycle::Lifecycle;
pub use observer::{ContextObserver, TracingObserver};
pub use scan::{BeanEntry, FnBean, Scan};
pub use slot::{Inject, InjectMap, InjectVec, Lazy, Slot, SlotError, SlotKind, View, Wired};
pub use traits::{
    Component, DisposableBean, FactoryBean, InitializingBean, NamedBean, OrderedBean, Scanner,
};
