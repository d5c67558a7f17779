//! The `session` module holds the per-connection heart of the bridge.
//!
//! Each WebSocket connection is owned by exactly one [`Session`], a small
//! state machine that validates control messages against its current state,
//! owns at most one broker adapter, and turns broker events into client
//! notifications. The [`SessionRegistry`] tracks every live session and
//! bounds how many may exist at once.

pub mod machine;
pub mod registry;

pub use machine::{Session, SessionState};
pub use registry::SessionRegistry;
