//! Component system: override points, instances, lifecycle, gates, anchors.

pub mod anchor;
pub mod gate;
pub mod instance;
pub mod lifecycle;
pub mod traits;

pub use anchor::{AnchorError, AnchorSpec, AnchorTarget, ResolveError, ResolvedTarget};
pub use gate::{Gate, GateSet};
pub use instance::{ComponentConfig, ComponentId, ComponentInstance, MountArtifact};
pub use lifecycle::{LifecycleEvent, LifecycleJournal, LifecycleState};
pub use traits::{Component, Context};
