//! Module Exports
//!
//! This file exports the networking pieces of the car.
//!
//! # Modules
//! - `link`: network-join state machine and the startup wait for an address.
//! - `server`: HTTP control server, routes and request extraction.

/// Module for tracking network join progress.
pub mod link;
/// Module for the HTTP control server.
pub mod server;
