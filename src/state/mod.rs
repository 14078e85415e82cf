//! State management module.
//!
//! Contains the Matrix (shared server state), sessions with their
//! registration stage and command queue, and related entities.

pub mod caps;
pub mod events;
pub mod machine;
pub mod matrix;
pub mod queue;
pub mod session;
mod uid;

pub use caps::CapabilityRegistry;
pub use events::{EventSink, SessionEvent};
pub use machine::{Stage, StageCell};
pub use matrix::{Matrix, NickInUse, ServerInfo};
pub use queue::{CommandQueue, Pushed};
pub use session::{Session, SessionState};
pub use uid::{Uid, UidGenerator};
