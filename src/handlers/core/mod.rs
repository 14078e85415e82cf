//! Core handler infrastructure: the handler trait, the per-command context,
//! the command registry and the dispatcher that feeds session queues.

pub mod context;
pub mod dispatch;
pub mod registry;
pub mod traits;

pub use context::Context;
pub use dispatch::Dispatcher;
pub use registry::{CommandSpec, Registry};
pub use traits::Handler;
