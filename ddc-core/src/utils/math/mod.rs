//! Math utilities for the differential-drive car.
//!
//! This module bounds signed speed requests to the range the PWM outputs accept.

pub mod speed;
