//! Core drivers and utilities for an HTTP-controlled differential-drive car on
//! no-std embedded platforms.
//!
//! For a runnable host build, see `ddc-app/mock-mcu`.
#![no_std]

pub mod utils;
