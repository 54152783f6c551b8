//! Utility re-exports and helper macros for the differential-drive car.
//!
//! This module re-exports core components, timing, and connection helpers,
//! and provides the embedded web assets:
//!
//! - `connection`: HTTP control server and network-join state machine
//! - `controllers`: motor driver, command interpreter and safety supervisor
//! - `math`: speed bounds shared by the controllers
//! - `frontend`: HTML control page served at `/`
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod connection;
pub mod controllers;
pub(crate) mod frontend;
pub mod math;

pub use connection::link::{wait_for_network, NetworkJoin};
pub use connection::server::run as http;
pub use controllers::{MotionConfig, MotionSystem};
pub use embassy_time::*;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
