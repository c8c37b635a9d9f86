//! # gilt-elements
//!
//! A component lifecycle runtime for custom elements living in a retained,
//! slotmap-backed node tree.
//!
//! Every custom element goes through the same lifecycle: environment gates,
//! registration, a mount one paint later, and a ready checkpoint one paint
//! after that. Declarative attributes decide where content renders (`anchor`),
//! whether it gets its own isolated scope (`flat`), and what it renders
//! (`template`). The runtime owns the services that lifecycle needs and
//! exposes them as explicitly constructed values, never globals.
//!
//! ## Core Systems
//!
//! - **[`dom`]**: Node arena with isolated scopes, locators, mutation records
//! - **[`component`]**: Component trait, instances, lifecycle, gates, anchors
//! - **[`registry`]**: Identity and name lookup with async `wait_for`
//! - **[`event`]**: Composed-path events and the deduplicating listener table
//! - **[`watcher`]**: Per-scope predicate → action mutation filters
//! - **[`schedule`]**: Paint and microtask queues, frame sources
//! - **[`template`]**: Template loaders
//! - **[`runtime`]**: The runtime tying everything together
//! - **[`config`]**: Runtime configuration and host environment
//! - **[`testing`]**: Headless pilot, recording probe, tree dumps

// Foundation
pub mod config;
pub mod dom;

// Lifecycle services
pub mod component;
pub mod event;
pub mod registry;
pub mod schedule;
pub mod template;
pub mod watcher;

// Runtime
pub mod runtime;

// Test support
pub mod testing;

pub use component::{Component, ComponentId, Context, LifecycleEvent, LifecycleState};
pub use config::{DeviceClass, Environment, Orientation, RuntimeConfig};
pub use dom::{NodeData, NodeId, Placement};
pub use event::{Callback, Event, EventDetail};
pub use runtime::Runtime;
