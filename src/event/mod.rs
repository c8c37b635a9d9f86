//! Event system: events, composed bubble path, listener attachment registry.

pub mod event;
pub mod listener;

pub use event::{composed_path, Event, EventDetail};
pub use listener::{Callback, CallbackResult, ListenerHandle, ListenerKey, ListenerRegistry};
