//! Connection management
//!
//! Live sockets and the registry that indexes them by user and room.

mod connection;
mod registry;

pub use connection::{Connection, ConnectionState, EnqueueError, Outbound};
pub use registry::{JoinOutcome, LeaveOutcome, Registry, RemovedConnection};
