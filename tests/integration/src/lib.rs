//! Integration test utilities for the socket gateway
//!
//! This crate provides helpers for running end-to-end tests against
//! in-process gateways over HTTP and WebSocket.

pub mod fixtures;
pub mod helpers;

pub use helpers::*;
