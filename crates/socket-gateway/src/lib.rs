//! # socket-gateway
//!
//! WebSocket gateway delivering contest events to live clients.
//!
//! Clients join rooms (`contest:<id>`) over the socket; domain events consumed
//! from the event log are turned into envelopes and fanned out through the
//! cross-instance bus to every gateway instance, each of which delivers to the
//! connections it holds.

pub mod bridge;
pub mod connection;
pub mod events;
pub mod handlers;
pub mod hub;
pub mod protocol;
pub mod server;
pub mod telemetry;

pub use server::{run, Gateway};
