//! Traits implemented by bean types.

mod capabilities;
mod component;

pub use capabilities::{
    DisposableBean, FactoryBean, InitializingBean, NamedBean, OrderedBean, Scanner,
};
pub use component::Component;
