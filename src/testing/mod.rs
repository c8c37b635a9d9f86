//! Headless testing helpers: Pilot, Probe, tree dumps.
//!
//! Use the [`Pilot`] to drive a [`Runtime`](crate::runtime::Runtime) frame by
//! frame, [`Probe`] as a component that records its hook calls, and
//! [`dump_tree`] to capture the composed tree as text for snapshot-style
//! assertions.

pub mod pilot;
pub mod snapshot;

pub use pilot::{Pilot, Probe};
pub use snapshot::{describe, dump_tree};
