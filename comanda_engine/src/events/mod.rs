//! Events emitted by the order engine.
//!
//! Components that must react to order lifecycle changes without blocking the request that caused them (notably the
//! delivery notification) subscribe through [`EventHooks`]. Each hook gets its own bounded queue and worker.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
