//! DOM arena: slotmap-backed node tree with isolated scopes, locators, and
//! mutation records.

pub mod mutation;
pub mod node;
pub mod query;
pub mod selector;
pub mod tree;

pub use mutation::{MutationRecord, RemovedNode};
pub use node::{NodeData, NodeId, NodeKind};
pub use selector::{Selector, SelectorError};
pub use tree::{Dom, DomError, Placement};
