//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::{with_fault_catch, ConstructionStack};
pub(crate) use dispose_bag::DisposeBag;
